//! Tokenization of logical statement lines.
//!
//! Uses the logos crate. A statement is mostly opaque host text, so the
//! lexer only distinguishes words, quoted strings and braces. That is
//! enough to split a statement into words and a `run ... {` /
//! `loop ... {` header from its selector.

use logos::Logos;
use std::ops::Range;

/// Token types for statement lines
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
pub enum Token {
    #[token("{")]
    OpenBrace,

    #[token("}")]
    CloseBrace,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    Quoted(String),

    #[regex(r#"[^ \t\r\n\f{}"]+"#, |lex| lex.slice().to_string())]
    Word(String),
}

/// Lexer wrapper that yields each token with its byte span
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
}

impl<'source> Lexer<'source> {
    /// Create a new lexer for the given statement text
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
        }
    }

    /// Get the slice of the current token
    pub fn slice(&self) -> &'source str {
        self.inner.slice()
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = (Token, Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.inner.next()?;
        let span = self.inner.span();

        // An unterminated quote is the only lexing failure; keep it as a word
        // so the host grammar gets to report it.
        let token = token.unwrap_or_else(|_| Token::Word(self.inner.slice().to_string()));

        Some((token, span))
    }
}

/// The statement's first whitespace-delimited word, used to key the
/// dispatch table. Braces do not split it: `run{` is not `run`.
pub fn leading_keyword(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// Every token of the statement as a source slice.
pub fn words(text: &str) -> Vec<&str> {
    Lexer::new(text).map(|(_, span)| &text[span]).collect()
}

/// A `<keyword> <selector> {` block opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader<'a> {
    pub keyword: &'a str,
    pub selector: &'a str,
}

/// Split a block-opening statement into keyword and selector text.
///
/// Returns `None` unless the statement starts with a word and ends with `{`.
pub fn block_header(text: &str) -> Option<BlockHeader<'_>> {
    let tokens: Vec<_> = Lexer::new(text).collect();

    let (first, first_span) = tokens.first()?;
    let (last, last_span) = tokens.last()?;

    if tokens.len() < 2 || !matches!(first, Token::Word(_)) || *last != Token::OpenBrace {
        return None;
    }

    Some(BlockHeader {
        keyword: &text[first_span.clone()],
        selector: text[first_span.end..last_span.start].trim(),
    })
}
