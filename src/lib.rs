//! callwatch - FastAGI to Slack call notification bridge.
//!
//! Tracks call lifecycle state (ringing, established, dial outcome, hangup)
//! from a telephony switch's FastAGI exchanges and mirrors each call into a
//! single Slack message that is posted once and updated in place.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod listener;
pub mod metrics;
pub mod notify;
pub mod state;
