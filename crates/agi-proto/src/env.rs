//! AGI environment preamble parsing.
//!
//! Before any command exchange, Asterisk sends line-delimited `key: value`
//! pairs (the `agi_*` environment), terminated by a blank line.

use std::collections::HashMap;

/// The AGI environment sent by the peer before the first command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgiEnv {
    vars: HashMap<String, String>,
}

impl AgiEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one preamble line into a key/value pair.
    ///
    /// Returns `None` for lines without a colon or with an empty key. Values
    /// may themselves contain colons (e.g. `agi_request: agi://host:4574/x`).
    pub fn parse_line(line: &str) -> Option<(String, String)> {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some((key.to_string(), value.trim().to_string()))
    }

    /// Insert a parsed preamble line, ignoring malformed ones.
    pub fn insert_line(&mut self, line: &str) {
        if let Some((key, value)) = Self::parse_line(line) {
            self.vars.insert(key, value);
        }
    }

    /// Look up an environment value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The `agi_channel` value, when supplied.
    pub fn channel(&self) -> Option<&str> {
        self.get("agi_channel")
    }

    /// Number of environment entries.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no entries have been read.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
