//! Block-syntax control flow: `run <selector> {`, `loop <selector> {` and
//! stray closing braces.

use super::{Outcome, Parser, Statement, StatementHandler, StatementTable};
use crate::ast::{Iteration, Node};
use crate::features::{ControlFlowSyntax, FeatureSet};
use crate::lexer::block_header;
use cmdflow_core::{CommandGrammar, SelectorKind};

pub const ERR_DISABLED: &str = "'run' and 'loop' statements not enabled when 'control flow v2' is \
                                enabled, consider disabling it with 'pragma disable cfv2'";
pub const ERR_EXTRA_CLOSING: &str = "extraneous '}' (consider removing it)";

pub fn register<G: CommandGrammar>(table: &mut StatementTable<G>) {
    table.register("run", StatementHandler::gated(parse_run, blocks_enabled, ERR_DISABLED));
    table.register("loop", StatementHandler::gated(parse_loop, blocks_enabled, ERR_DISABLED));
    table.register("}", StatementHandler::new(parse_closing_brace));
}

fn blocks_enabled(features: &FeatureSet) -> bool {
    features.control_flow() == ControlFlowSyntax::Blocks
}

fn parse_run<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    parse_iteration(parser, statement, SelectorKind::Run)
}

fn parse_loop<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    parse_iteration(parser, statement, SelectorKind::Loop)
}

fn parse_iteration<G: CommandGrammar>(
    parser: &mut Parser<'_, G>,
    statement: &Statement,
    kind: SelectorKind,
) -> Outcome<G::Action> {
    // Without a trailing `{` this is an ordinary command that happens to
    // start with the keyword.
    let Some(header) = block_header(&statement.text) else {
        return Outcome::Fallthrough;
    };
    if header.keyword != kind.keyword() {
        return Outcome::Fallthrough;
    }

    parser.advance();

    let selector = match parser.grammar().parse_selector(kind, header.selector) {
        Ok(selector) => Some(selector),
        Err(err) => {
            parser.diagnostics().error(
                statement.line,
                format!("failed to parse '{}' control flow statement: {}", kind, err),
            );
            None
        }
    };

    let body = parser.parse_block(
        statement.line,
        "}",
        &format!("unclosed '{}' statement", kind),
        statement.in_subroutine,
    );

    let iteration = Iteration {
        selector,
        body,
        line: statement.line,
    };

    Outcome::Node(match kind {
        SelectorKind::Run => Node::Run(iteration),
        SelectorKind::Loop => Node::Loop(iteration),
    })
}

/// A `}` that no block is waiting for.
fn parse_closing_brace<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    parser.diagnostics().error(statement.line, ERR_EXTRA_CLOSING);
    parser.advance();
    Outcome::Consumed
}
