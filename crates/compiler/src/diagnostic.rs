//! Leveled, line-tagged diagnostics and their human-readable report.

use std::fmt;
use std::fmt::Write as _;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// The compile is rejected.
    Error,
    /// Informational; the compile proceeds.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => f.write_str("ERROR"),
            Level::Warning => f.write_str("WARNING"),
        }
    }
}

/// A single message anchored at a 0-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub line: usize,
    pub message: String,
}

/// Rendered report plus the compile verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedReport {
    pub text: String,
    pub has_errors: bool,
}

/// Append-only diagnostic accumulator for one compile.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        self.report(Level::Error, line, message.into());
    }

    pub fn warning(&mut self, line: usize, message: impl Into<String>) {
        self.report(Level::Warning, line, message.into());
    }

    fn report(&mut self, level: Level, line: usize, message: String) {
        tracing::trace!(%level, line, %message, "diagnostic");
        self.entries.push(Diagnostic {
            level,
            line,
            message,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.level == Level::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Level::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Level::Warning)
    }

    fn count(&self, level: Level) -> usize {
        self.entries.iter().filter(|d| d.level == level).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Render every diagnostic with `radius` lines of context either side.
    ///
    /// Produces an empty report when there is nothing to say.
    pub fn render<S: AsRef<str>>(
        &self,
        unit: impl fmt::Display,
        radius: usize,
        source: &[S],
    ) -> RenderedReport {
        if self.entries.is_empty() {
            return RenderedReport::default();
        }

        let mut text = String::new();
        let _ = writeln!(text, "While compiling function '{}'", unit);

        for diagnostic in &self.entries {
            let _ = writeln!(
                text,
                "{} ({}:{}): {}",
                diagnostic.level,
                unit,
                diagnostic.line + 1,
                diagnostic.message
            );

            let first = diagnostic.line.saturating_sub(radius);
            let last = diagnostic.line.saturating_add(radius).min(source.len().saturating_sub(1));
            if source.is_empty() || first > last {
                continue;
            }

            let width = (last + 1).to_string().len();
            for (index, line) in source.iter().enumerate().take(last + 1).skip(first) {
                let here = index == diagnostic.line;
                let _ = write!(
                    text,
                    "{:<width$}{}{}",
                    index + 1,
                    if here { " * " } else { " | " },
                    line.as_ref(),
                    width = width
                );
                if here {
                    text.push_str(" <- HERE");
                }
                text.push('\n');
            }
        }

        RenderedReport {
            text,
            has_errors: self.has_errors(),
        }
    }
}
