//! Always-available statements: `pragma`, `return` and `break`.

use super::{Outcome, Parser, Statement, StatementHandler, StatementTable};
use crate::ast::Node;
use crate::lexer::words;
use cmdflow_core::CommandGrammar;

pub const ERR_PRAGMA_SYNTAX: &str =
    "failed to parse pragma: expected 'pragma enable <flag>' or 'pragma disable <flag>'";

pub fn register<G: CommandGrammar>(table: &mut StatementTable<G>) {
    table.register("pragma", StatementHandler::new(parse_pragma));
    table.register("return", StatementHandler::new(parse_return));
    table.register("break", StatementHandler::new(parse_break));
}

/// `pragma enable|disable <flag>`. Always consumes the line.
fn parse_pragma<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    parser.advance();

    let result = match words(&statement.text).as_slice() {
        ["pragma", "enable", flag] => parser.features_mut().enable(flag),
        ["pragma", "disable", flag] => parser.features_mut().disable(flag),
        _ => {
            parser.diagnostics().error(statement.line, ERR_PRAGMA_SYNTAX);
            return Outcome::Consumed;
        }
    };

    match result {
        Ok(()) => tracing::trace!(pragma = %statement.text, "feature flags updated"),
        Err(err) => parser.diagnostics().error(statement.line, err.to_string()),
    }

    Outcome::Consumed
}

/// Bare `return`: end the invocation here. Anything longer is a command.
fn parse_return<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    if statement.text != "return" {
        return Outcome::Fallthrough;
    }

    parser.advance();
    Outcome::Node(Node::Exit)
}

/// Bare `break`. Whether a loop encloses it is checked during codegen.
fn parse_break<G: CommandGrammar>(parser: &mut Parser<'_, G>, statement: &Statement) -> Outcome<G::Action> {
    if statement.text != "break" {
        return Outcome::Fallthrough;
    }

    parser.advance();
    Outcome::Node(Node::Break {
        line: statement.line,
    })
}
