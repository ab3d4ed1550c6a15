//! Error types for the AGI protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`AgiError`].
pub type Result<T, E = AgiError> = std::result::Result<T, E>;

/// Top-level AGI protocol errors.
///
/// Session termination (peer hangup, broken pipe) is deliberately *not* an
/// error: it is reported as [`crate::session::Reply::Hangup`] so callers must
/// branch explicitly on "ended" vs "failed" vs "succeeded".
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgiError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 bytes in a reply line.
    #[error("invalid utf-8 in line: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// A line exceeded the codec's maximum length.
    #[error("line exceeds maximum length of {0} bytes")]
    LineTooLong(usize),

    /// A reply line that does not start with a numeric result code.
    #[error("malformed reply line: {0:?}")]
    Malformed(String),

    /// 510 reply: Asterisk did not recognize the command.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// 520 reply: command syntax error, carries the full multi-line usage text.
    #[error("usage error:\n{0}")]
    Usage(String),

    /// A result code this library does not know how to handle.
    #[error("unrecognized response code {code}: {line:?}")]
    UnrecognizedResponse {
        /// The numeric result code from the reply line.
        code: u16,
        /// The raw reply line.
        line: String,
    },

    /// `result=-1` inside a 200 reply: the application failed on the switch.
    #[error("application error (result=-1)")]
    App,
}

impl AgiError {
    /// Static error code string, suitable for metric labels.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Decode(_) => "decode",
            Self::LineTooLong(_) => "line_too_long",
            Self::Malformed(_) => "malformed",
            Self::InvalidCommand(_) => "invalid_command",
            Self::Usage(_) => "usage",
            Self::UnrecognizedResponse { .. } => "unrecognized_response",
            Self::App => "app",
        }
    }
}
