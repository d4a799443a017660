use std::future::Future;

use crate::content::MessageContent;
use crate::error::NotifyError;

/// Result of editing a previously sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// The message no longer exists in the sink (deleted externally).
    NotFound,
}

/// A destination that can post new messages and edit them by id.
///
/// Message ids are opaque strings owned by the sink.
pub trait NotificationSink: Send + Sync {
    /// Posts a new message and returns its id.
    fn send(
        &self,
        destination: &str,
        content: &MessageContent,
    ) -> impl Future<Output = Result<String, NotifyError>> + Send;

    /// Replaces the content of an existing message.
    fn edit(
        &self,
        destination: &str,
        message_id: &str,
        content: &MessageContent,
    ) -> impl Future<Output = Result<EditOutcome, NotifyError>> + Send;
}

/// Sink selected at startup.
///
/// [`NotificationSink`] is not object safe, so runtime selection goes
/// through this enum instead of a trait object.
#[derive(Debug)]
pub enum ConfiguredSink {
    Discord(crate::DiscordSink),
    Log(crate::LogSink),
}

impl NotificationSink for ConfiguredSink {
    async fn send(&self, destination: &str, content: &MessageContent) -> Result<String, NotifyError> {
        match self {
            ConfiguredSink::Discord(sink) => sink.send(destination, content).await,
            ConfiguredSink::Log(sink) => sink.send(destination, content).await,
        }
    }

    async fn edit(
        &self,
        destination: &str,
        message_id: &str,
        content: &MessageContent,
    ) -> Result<EditOutcome, NotifyError> {
        match self {
            ConfiguredSink::Discord(sink) => sink.edit(destination, message_id, content).await,
            ConfiguredSink::Log(sink) => sink.edit(destination, message_id, content).await,
        }
    }
}
