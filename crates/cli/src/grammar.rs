//! Configurable stand-in for a host command grammar.
//!
//! A real host binds every statement to its own command tree. The CLI only
//! needs to tell known commands from typos, so it checks the leading word
//! against a lexicon loaded from JSON.

use anyhow::{Context, Result};
use cmdflow_core::{CommandGrammar, SelectorKind, SyntaxError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Lexicon file contents.
///
/// ```json
/// { "commands": ["say", "tp"], "selectors": ["as", "at"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Accepted leading words. Empty accepts any command.
    pub commands: Vec<String>,
    /// Accepted selector prefixes for `run`/`loop` headers.
    pub selectors: Vec<String>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        let commands = [
            "say", "tell", "tellraw", "give", "tp", "teleport", "summon", "kill", "tag", "effect",
            "setblock", "fill", "scoreboard", "function", "execute", "particle", "playsound",
        ];

        Self {
            commands: commands.iter().map(|c| c.to_string()).collect(),
            selectors: vec!["as".to_string(), "at".to_string()],
        }
    }
}

impl GrammarConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read grammar file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid grammar file: {}", path.display()))
    }

    /// Load `path` when given, otherwise use the built-in lexicon.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Opaque action produced by [`LexiconGrammar`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LexiconAction {
    Command { name: String, args: Vec<String> },
    Selector { context: String, prefix: String, target: String },
}

pub struct LexiconGrammar {
    config: GrammarConfig,
}

impl LexiconGrammar {
    pub fn new(config: GrammarConfig) -> Self {
        Self { config }
    }

    fn is_command(&self, name: &str) -> bool {
        self.config.commands.is_empty() || self.config.commands.iter().any(|c| c == name)
    }
}

impl CommandGrammar for LexiconGrammar {
    type Action = LexiconAction;

    fn parse_command(&self, text: &str) -> Result<LexiconAction, SyntaxError> {
        let mut words = text.split_whitespace();
        let Some(name) = words.next() else {
            return Err(SyntaxError::at("empty command", 0));
        };

        if !self.is_command(name) {
            return Err(SyntaxError::at(format!("unknown command '{}'", name), 0));
        }

        Ok(LexiconAction::Command {
            name: name.to_string(),
            args: words.map(str::to_string).collect(),
        })
    }

    fn parse_selector(&self, kind: SelectorKind, text: &str) -> Result<LexiconAction, SyntaxError> {
        let (prefix, target) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let target = target.trim();

        if !self.config.selectors.iter().any(|s| s == prefix) {
            return Err(SyntaxError::at(
                format!("expected one of [{}], found '{}'", self.config.selectors.join(", "), prefix),
                0,
            ));
        }
        if target.is_empty() {
            return Err(SyntaxError::at(format!("missing target after '{}'", prefix), prefix.len()));
        }

        Ok(LexiconAction::Selector {
            context: kind.to_string(),
            prefix: prefix.to_string(),
            target: target.to_string(),
        })
    }
}
