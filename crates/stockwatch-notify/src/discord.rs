//! Discord REST sink.
//!
//! Messages are posted as a single embed plus link-button rows:
//! `POST /channels/{channel}/messages` and
//! `PATCH /channels/{channel}/messages/{message}`.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::content::MessageContent;
use crate::error::NotifyError;
use crate::sink::{EditOutcome, NotificationSink};

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const BUTTON_STYLE_LINK: u8 = 5;

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Clone)]
pub struct DiscordSink {
    client: Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for DiscordSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSink")
            .field("api_base", &self.api_base)
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl DiscordSink {
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the HTTP client cannot be built.
    pub fn new(api_base: &str, token: &str, timeout_secs: u64) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!(
                "DiscordBot (https://github.com/stockwatch, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    fn messages_url(&self, channel: &str) -> String {
        format!("{}/channels/{channel}/messages", self.api_base)
    }

    async fn error_for(response: reqwest::Response) -> NotifyError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Ok(limit) = serde_json::from_str::<RateLimitBody>(&body) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let retry_after_ms = (limit.retry_after * 1000.0) as u64;
                return NotifyError::RateLimited { retry_after_ms };
            }
        }
        NotifyError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

/// Builds the Discord message body for `content`.
#[must_use]
pub fn message_payload(content: &MessageContent) -> Value {
    let mut embed = json!({
        "title": content.title,
        "url": content.url,
        "color": content.color,
        "footer": { "text": content.footer },
        "fields": content
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
            .collect::<Vec<_>>(),
    });
    if let Some(description) = &content.description {
        embed["description"] = json!(description);
    }
    if let Some(thumbnail) = &content.thumbnail {
        embed["thumbnail"] = json!({ "url": thumbnail });
    }

    let components: Vec<Value> = content
        .actions
        .iter()
        .map(|row| {
            json!({
                "type": COMPONENT_ACTION_ROW,
                "components": row
                    .links
                    .iter()
                    .map(|link| json!({
                        "type": COMPONENT_BUTTON,
                        "style": BUTTON_STYLE_LINK,
                        "label": link.label,
                        "url": link.url,
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({ "embeds": [embed], "components": components })
}

impl NotificationSink for DiscordSink {
    async fn send(&self, destination: &str, content: &MessageContent) -> Result<String, NotifyError> {
        let response = self
            .client
            .post(self.messages_url(destination))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .json(&message_payload(content))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body = response.text().await?;
        let created: CreatedMessage =
            serde_json::from_str(&body).map_err(|e| NotifyError::Deserialize {
                context: format!("message created in channel {destination}"),
                source: e,
            })?;
        tracing::debug!(destination, message_id = %created.id, "discord message sent");
        Ok(created.id)
    }

    async fn edit(
        &self,
        destination: &str,
        message_id: &str,
        content: &MessageContent,
    ) -> Result<EditOutcome, NotifyError> {
        let response = self
            .client
            .patch(format!("{}/{message_id}", self.messages_url(destination)))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .json(&message_payload(content))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(EditOutcome::Edited),
            StatusCode::NOT_FOUND => Ok(EditOutcome::NotFound),
            _ => Err(Self::error_for(response).await),
        }
    }
}
