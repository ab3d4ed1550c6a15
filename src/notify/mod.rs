//! Notification boundary: rendered message shape, the notifier trait and
//! the Slack implementation.

mod render;
mod slack;

pub use render::render;
pub use slack::SlackNotifier;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::state::MessageRef;

/// The rendered message attachment consumed by the chat API.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Attachment {
    pub color: String,
    pub title: String,
    pub text: String,
    pub footer: String,
}

/// Notifier errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat api error: {0}")]
    Api(String),
}

/// The outbound chat collaborator: post a new message or update a bound one.
///
/// Failures are reported, never retried internally; the caller logs and
/// abandons the current exchange.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a new message to `channel`; returns the binding for updates.
    async fn post(&self, channel: &str, attachment: Attachment)
        -> Result<MessageRef, NotifyError>;

    /// Update the message behind an existing binding in place.
    async fn update(
        &self,
        message: &MessageRef,
        attachment: Attachment,
    ) -> Result<(), NotifyError>;
}
