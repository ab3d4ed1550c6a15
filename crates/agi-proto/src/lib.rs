//! # agi-proto
//!
//! A Rust library for the Asterisk Gateway Interface (AGI/FastAGI) wire
//! protocol: typed command encoding, reply parsing and an async session
//! for driving a command/response exchange over a socket.
//!
//! ## Features
//!
//! - Pure reply-line parsing (`reply`), unit-testable without a socket
//! - Typed AGI commands with correct argument quoting (`command`)
//! - AGI environment preamble parsing (`env`)
//! - Optional Tokio integration: a newline-framed codec (`line`) and an
//!   [`AgiSession`] that distinguishes success, error and session-ended
//!   outcomes
//!
//! ## Quick Start
//!
//! ```rust
//! use agi_proto::reply::{parse_line, parse_pairs};
//!
//! let reply = parse_line("200 result=1 (hello world)").unwrap();
//! assert_eq!(reply.code, 200);
//!
//! let pairs = parse_pairs(&reply.rest);
//! assert_eq!(pairs[0].key, "result");
//! assert_eq!(pairs[0].value, "1");
//! assert_eq!(pairs[0].data.as_deref(), Some("hello world"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod env;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod reply;
#[cfg(feature = "tokio")]
pub mod session;

pub use self::command::AgiCommand;
pub use self::env::AgiEnv;
pub use self::error::AgiError;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::reply::{Pair, ReplyLine, ReplyValues};
#[cfg(feature = "tokio")]
pub use self::session::{AgiSession, Reply};
