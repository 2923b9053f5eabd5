//! `subroutine <name> ... end`, `subroutine_call <name>` and
//! `subroutine_return`, all behind `pragma enable subroutines`.

use super::{Outcome, Parser, Statement, StatementHandler, StatementTable};
use crate::ast::{Node, SubroutineDefinition};
use crate::features::FeatureSet;
use crate::lexer::words;
use cmdflow_core::CommandGrammar;

pub const ERR_DISABLED: &str =
    "subroutines are not enabled, use 'pragma enable subroutines' to enable this feature";
pub const ERR_UNCLOSED: &str = "unclosed subroutine definition";
pub const ERR_NOT_TOP_LEVEL: &str = "subroutine definition is only allowed at the top level";
pub const ERR_BAD_DEFINITION: &str = "bad subroutine definition, expected 'subroutine <identifier>'";
pub const ERR_BAD_CALL: &str = "bad subroutine call, expected 'subroutine_call <identifier>'";
pub const ERR_RETURN_PARAMETERS: &str = "subroutine_return takes no parameters";
pub const ERR_RETURN_OUTSIDE: &str = "subroutine_return is not valid outside of a subroutine";

/// Line that closes a subroutine body.
pub const TERMINATOR: &str = "end";

pub fn register<G: CommandGrammar>(table: &mut StatementTable<G>) {
    let enabled: fn(&FeatureSet) -> bool = FeatureSet::is_subroutines;

    table.register("subroutine", StatementHandler::gated(parse_definition, enabled, ERR_DISABLED));
    table.register("subroutine_call", StatementHandler::gated(parse_call, enabled, ERR_DISABLED));
    table.register("subroutine_return", StatementHandler::gated(parse_return, enabled, ERR_DISABLED));
}

fn parse_definition<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    parser.advance();

    if !statement.top_level {
        parser.diagnostics().error(statement.line, ERR_NOT_TOP_LEVEL);
    }

    let parts = words(&statement.text);
    if parts.len() != 2 {
        parser.diagnostics().error(statement.line, ERR_BAD_DEFINITION);
    }
    // Without a name there is nothing to attach the body to; what follows
    // is parsed at the current level.
    let Some(name) = parts.get(1) else {
        return Outcome::Consumed;
    };

    let body = parser.parse_block(statement.line, TERMINATOR, ERR_UNCLOSED, true);

    Outcome::Node(Node::SubroutineDefinition(SubroutineDefinition {
        name: name.to_string(),
        line: statement.line,
        body,
    }))
}

/// Whether the target exists is only known once every definition has been
/// declared, so that check happens during codegen.
fn parse_call<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    parser.advance();

    let parts = words(&statement.text);
    if parts.len() != 2 {
        parser.diagnostics().error(statement.line, ERR_BAD_CALL);
    }
    let Some(name) = parts.get(1) else {
        return Outcome::Consumed;
    };

    Outcome::Node(Node::SubroutineCall {
        name: name.to_string(),
        line: statement.line,
    })
}

fn parse_return<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    parser.advance();

    if words(&statement.text).len() != 1 {
        parser.diagnostics().error(statement.line, ERR_RETURN_PARAMETERS);
    }
    if !statement.in_subroutine {
        parser.diagnostics().error(statement.line, ERR_RETURN_OUTSIDE);
    }

    Outcome::Node(Node::SubroutineReturn)
}
