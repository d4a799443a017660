use std::sync::atomic::{AtomicU64, Ordering};

use crate::content::MessageContent;
use crate::error::NotifyError;
use crate::sink::{EditOutcome, NotificationSink};

/// Dry-run sink: logs every message and hands out synthetic ids.
#[derive(Debug, Default)]
pub struct LogSink {
    next_id: AtomicU64,
}

impl LogSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationSink for LogSink {
    async fn send(&self, destination: &str, content: &MessageContent) -> Result<String, NotifyError> {
        let id = format!("dry-run-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        tracing::info!(
            destination,
            message_id = %id,
            title = %content.title,
            url = %content.url,
            "[dry-run] send"
        );
        Ok(id)
    }

    async fn edit(
        &self,
        destination: &str,
        message_id: &str,
        content: &MessageContent,
    ) -> Result<EditOutcome, NotifyError> {
        tracing::info!(
            destination,
            message_id,
            title = %content.title,
            url = %content.url,
            "[dry-run] edit"
        );
        Ok(EditOutcome::Edited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> MessageContent {
        MessageContent {
            title: "t".to_owned(),
            url: "https://shop.example.com/products/t".to_owned(),
            thumbnail: None,
            description: None,
            color: 0,
            footer: String::new(),
            fields: Vec::new(),
            actions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let sink = LogSink::new();
        let a = sink.send("1", &content()).await.unwrap();
        let b = sink.send("1", &content()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(sink.edit("1", &a, &content()).await.unwrap(), EditOutcome::Edited);
    }
}
