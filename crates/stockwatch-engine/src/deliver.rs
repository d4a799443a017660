use stockwatch_notify::{EditOutcome, MessageContent, NotificationSink, NotifyError};

/// How a message reached the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Delivery {
    Edited(String),
    Sent(String),
}

impl Delivery {
    pub(crate) fn into_message_id(self) -> String {
        match self {
            Delivery::Edited(id) | Delivery::Sent(id) => id,
        }
    }
}

/// Edits `existing` in place, or sends a new message when there is no id on
/// file or the edit does not go through.
///
/// Exactly one of the two succeeds on `Ok`; a failed send is the only error.
pub(crate) async fn deliver<N: NotificationSink>(
    sink: &N,
    destination: &str,
    existing: Option<&str>,
    content: &MessageContent,
) -> Result<Delivery, NotifyError> {
    if let Some(message_id) = existing {
        match sink.edit(destination, message_id, content).await {
            Ok(EditOutcome::Edited) => return Ok(Delivery::Edited(message_id.to_owned())),
            Ok(EditOutcome::NotFound) => {
                tracing::warn!(destination, message_id, "message no longer exists, sending a new one");
            }
            Err(e) => {
                tracing::warn!(destination, message_id, error = %e, "edit failed, sending a new message");
            }
        }
    }
    sink.send(destination, content).await.map(Delivery::Sent)
}
