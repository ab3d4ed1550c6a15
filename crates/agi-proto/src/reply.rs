//! Pure parsing of AGI reply lines.
//!
//! Replies have the shape `<code> <key>=<value>(<data>)? ...`. Parsing is a
//! pure function of the line text, independent of any stream, so it can be
//! tested without a live socket.

use std::collections::HashMap;

use crate::error::{AgiError, Result};

/// Result code of a successful reply.
pub const CODE_SUCCESS: u16 = 200;
/// Result code signalling an unknown command.
pub const CODE_INVALID_COMMAND: u16 = 510;
/// Result code opening (and closing) a multi-line usage error.
pub const CODE_USAGE: u16 = 520;

/// Parenthesized data value marking an in-band hangup inside a 200 reply.
pub const HANGUP_MARKER: &str = "hangup";

/// A reply line split into its numeric code and the remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    /// The 3-digit result code.
    pub code: u16,
    /// Everything after the code, trimmed.
    pub rest: String,
}

/// Split a reply line into its leading result code and the remainder.
pub fn parse_line(line: &str) -> Result<ReplyLine> {
    let line = line.trim();
    let digits = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if digits == 0 {
        return Err(AgiError::Malformed(line.to_string()));
    }
    let code = line[..digits]
        .parse::<u16>()
        .map_err(|_| AgiError::Malformed(line.to_string()))?;
    Ok(ReplyLine {
        code,
        rest: line[digits..].trim_start().to_string(),
    })
}

/// One `key=value(data)` token from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// The key left of `=`.
    pub key: String,
    /// The bare value right of `=`, never containing whitespace.
    pub value: String,
    /// The optional parenthesized data segment.
    pub data: Option<String>,
}

/// Tokenize `key=value(data)` pairs from the remainder of a reply line.
///
/// The parenthesized data segment is optional. When present it extends to the
/// *final* closing parenthesis of the line: Asterisk emits at most one data
/// segment per reply, last on the line, and it may contain spaces and
/// parentheses (e.g. a `CALLERID(name)` value).
pub fn parse_pairs(rest: &str) -> Vec<Pair> {
    let mut pairs = Vec::new();
    let mut s = rest.trim_start();
    while !s.is_empty() {
        let Some(eq) = s.find('=') else { break };
        let key = s[..eq].trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            break;
        }
        let after = &s[eq + 1..];
        // A value never contains whitespace; a data segment may follow with
        // or without a separating space.
        let vend = after
            .find(|c: char| c.is_whitespace() || c == '(')
            .unwrap_or(after.len());
        let value = &after[..vend];
        let mut tail = after[vend..].trim_start();
        let mut data = None;
        if let Some(body) = tail.strip_prefix('(') {
            match body.rfind(')') {
                Some(close) => {
                    data = Some(body[..close].to_string());
                    tail = body[close + 1..].trim_start();
                }
                None => {
                    // Unterminated data segment: take the remainder.
                    data = Some(body.to_string());
                    tail = "";
                }
            }
        }
        pairs.push(Pair {
            key: key.to_string(),
            value: value.to_string(),
            data,
        });
        s = tail;
    }
    pairs
}

/// The parsed pairs of a 200 reply, keyed by pair name.
///
/// Ordering of pairs on the wire is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyValues {
    pairs: HashMap<String, Pair>,
}

impl ReplyValues {
    /// Build from a token list; later duplicates win, matching Asterisk.
    pub fn from_pairs(pairs: Vec<Pair>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|p| (p.key.clone(), p)).collect(),
        }
    }

    /// Look up a pair by key.
    pub fn get(&self, key: &str) -> Option<&Pair> {
        self.pairs.get(key)
    }

    /// The `result` pair, present in every well-formed 200 reply.
    pub fn result(&self) -> Option<&Pair> {
        self.get("result")
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the reply carried no pairs at all.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over all pairs.
    pub fn iter(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }
}
