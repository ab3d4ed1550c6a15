//! Unified error handling for callwatch.
//!
//! Every failure inside one protocol exchange is contained at the session
//! handler boundary; nothing escapes to the listener.

use agi_proto::AgiError;
use thiserror::Error;

use crate::notify::NotifyError;

/// Errors that can occur while processing one FastAGI exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Wire protocol failure (invalid command, usage error, unrecognized
    /// response, I/O).
    #[error("protocol error: {0}")]
    Protocol(#[from] AgiError),

    /// The peer ended the session before the exchange could complete.
    /// No notification is sent; this is not a fault.
    #[error("session ended by peer")]
    SessionEnded,

    /// The attribute snapshot carried no correlation id at all.
    #[error("no correlation id in attribute snapshot")]
    MissingCorrelationId,

    /// A completion exchange referenced a call this registry has never seen;
    /// the peer sent events out of order. No record is fabricated.
    #[error("no call record for macro argument {0:?}")]
    UnknownCall(String),

    /// An update-shaped transition arrived for a call whose first post never
    /// succeeded, so there is no message to update.
    #[error("call {0} has no notification binding")]
    NoBinding(String),

    /// The notifier reported a failure; the exchange is logged and abandoned,
    /// never retried internally.
    #[error("notifier error: {0}")]
    Notify(#[from] NotifyError),
}

impl ExchangeError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Protocol(e) => e.error_code(),
            Self::SessionEnded => "session_ended",
            Self::MissingCorrelationId => "missing_correlation_id",
            Self::UnknownCall(_) => "unknown_call",
            Self::NoBinding(_) => "no_binding",
            Self::Notify(_) => "notify",
        }
    }
}

/// Result type for exchange processing.
pub type ExchangeResult<T = ()> = Result<T, ExchangeError>;
