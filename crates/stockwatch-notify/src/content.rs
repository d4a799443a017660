//! Sink-neutral message model.

/// One rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent {
    /// May carry strikethrough markup for sold-out or removed products.
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    /// Plain-text body shown under the title.
    pub description: Option<String>,
    /// RGB accent colour.
    pub color: u32,
    pub footer: String,
    pub fields: Vec<MessageField>,
    pub actions: Vec<ActionRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl MessageField {
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }
}

/// A row of link buttons, one row per variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRow {
    pub links: Vec<ActionLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLink {
    pub label: String,
    pub url: String,
}
