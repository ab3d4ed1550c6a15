//! Typed AGI commands and their wire encoding.

use std::fmt;

/// Wrap a string argument in double quotes.
///
/// AGI has no escape syntax; quoting only protects embedded whitespace.
/// Arguments that may contain whitespace must be quoted individually, the
/// line writer itself performs no implicit quoting.
pub fn quote(s: &str) -> String {
    format!("\"{s}\"")
}

/// The AGI command subset used by this library.
///
/// Only the operations needed to read call attributes and write a
/// correlation variable back into the switch are modelled, plus `VERBOSE`
/// for dialplan-visible diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgiCommand {
    /// `GET VARIABLE "<name>"`: read a channel variable.
    GetVariable(String),
    /// `SET VARIABLE "<name>" "<value>"`: write a channel variable.
    SetVariable(String, String),
    /// `VERBOSE "<message>" <level>`: log to the Asterisk console.
    Verbose(String, u8),
}

impl AgiCommand {
    /// Encode the command as a single line, without the trailing newline.
    pub fn encode(&self) -> String {
        match self {
            Self::GetVariable(name) => format!("GET VARIABLE {}", quote(name)),
            Self::SetVariable(name, value) => {
                format!("SET VARIABLE {} {}", quote(name), quote(value))
            }
            Self::Verbose(message, level) => format!("VERBOSE {} {}", quote(message), level),
        }
    }

    /// Static command name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetVariable(_) => "GET VARIABLE",
            Self::SetVariable(_, _) => "SET VARIABLE",
            Self::Verbose(_, _) => "VERBOSE",
        }
    }
}

impl fmt::Display for AgiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_variable_quotes_name() {
        assert_eq!(
            AgiCommand::GetVariable("CALLERID(num)".into()).encode(),
            "GET VARIABLE \"CALLERID(num)\""
        );
    }

    #[test]
    fn set_variable_quotes_both_arguments() {
        assert_eq!(
            AgiCommand::SetVariable("CALLWATCH_CALL_ID".into(), "1700000000.42".into()).encode(),
            "SET VARIABLE \"CALLWATCH_CALL_ID\" \"1700000000.42\""
        );
    }

    #[test]
    fn verbose_encodes_level_unquoted() {
        assert_eq!(
            AgiCommand::Verbose("hello world".into(), 2).encode(),
            "VERBOSE \"hello world\" 2"
        );
    }
}
