//! Line assembly: raw source lines to logical statements.
//!
//! Merges `\` continuations, drops blank lines and `#` comments, and rejects
//! legacy `/`-prefixed lines with a hint.

use crate::diagnostic::Diagnostics;

/// Trailing marker that joins a line with the next physical line.
pub const CONTINUATION_MARKER: char = '\\';

/// Line comment marker.
pub const COMMENT_MARKER: char = '#';

pub const ERR_LINE_CONTINUATION: &str = "line continuation at end of input";
pub const ERR_DOUBLE_SLASH: &str = "use '#' not '//' for comments";

/// One logical statement and the 0-based physical line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    pub number: usize,
}

/// Assemble raw lines into logical statements, reporting malformed input.
pub fn assemble_lines<S: AsRef<str>>(lines: &[S], diagnostics: &mut Diagnostics) -> Vec<SourceLine> {
    let mut entries = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let number = index;
        let mut text = lines[index].as_ref().trim().to_string();

        while text.ends_with(CONTINUATION_MARKER) {
            text.pop();
            index += 1;
            match lines.get(index) {
                Some(next) => text.push_str(next.as_ref().trim()),
                None => {
                    diagnostics.error(lines.len() - 1, ERR_LINE_CONTINUATION);
                    break;
                }
            }
        }
        index += 1;

        let text = text.trim();
        if text.is_empty() || text.starts_with(COMMENT_MARKER) {
            continue;
        }

        if let Some(rest) = text.strip_prefix('/') {
            if rest.starts_with('/') {
                diagnostics.error(number, ERR_DOUBLE_SLASH);
            } else {
                let command = rest.split_whitespace().next().unwrap_or_default();
                diagnostics.error(
                    number,
                    format!("unknown command (did you mean '{}'?)", command),
                );
            }
            continue;
        }

        entries.push(SourceLine {
            text: text.to_string(),
            number,
        });
    }

    entries
}

/// Forward-only cursor over assembled statements.
#[derive(Debug, Clone)]
pub struct LineCursor {
    lines: Vec<SourceLine>,
    position: usize,
}

impl LineCursor {
    pub fn new(lines: Vec<SourceLine>) -> Self {
        Self { lines, position: 0 }
    }

    /// Statement under the cursor
    pub fn current(&self) -> Option<&SourceLine> {
        self.lines.get(self.position)
    }

    /// Move past the current statement
    pub fn advance(&mut self) {
        if self.position < self.lines.len() {
            self.position += 1;
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.lines.len()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Level;

    fn assemble(source: &str) -> (Vec<SourceLine>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let lines: Vec<&str> = source.lines().collect();
        let assembled = assemble_lines(&lines, &mut diagnostics);
        (assembled, diagnostics)
    }

    #[test]
    fn test_skips_blank_and_comments() {
        let (lines, diagnostics) = assemble("say a\n\n   # note\n  say b  ");

        assert_eq!(lines, vec![
            SourceLine { text: "say a".to_string(), number: 0 },
            SourceLine { text: "say b".to_string(), number: 3 },
        ]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_merges_continuations() {
        let (lines, diagnostics) = assemble("say \\\n  hello \\\n world\nsay b");

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "say hello world");
        assert_eq!(lines[0].number, 0);
        assert_eq!(lines[1].number, 3);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_continuation_at_end_of_input() {
        let (lines, diagnostics) = assemble("say a\nsay \\");

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "say");

        let diags: Vec<_> = diagnostics.iter().collect();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].level, Level::Error);
        assert_eq!(diags[0].line, 1);
        assert_eq!(diags[0].message, ERR_LINE_CONTINUATION);
    }

    #[test]
    fn test_slash_prefixed_lines() {
        let (lines, diagnostics) = assemble("// old comment\n/say hi\nsay ok");

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "say ok");

        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec![
            ERR_DOUBLE_SLASH,
            "unknown command (did you mean 'say'?)",
        ]);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_cursor_advances_and_stops() {
        let (lines, _) = assemble("a\nb");
        let mut cursor = LineCursor::new(lines);

        assert_eq!(cursor.current().map(|l| l.text.as_str()), Some("a"));
        cursor.advance();
        assert_eq!(cursor.current().map(|l| l.text.as_str()), Some("b"));
        cursor.advance();
        assert!(cursor.is_at_end());
        cursor.advance();
        assert_eq!(cursor.position(), 2);
    }
}
