pub mod content;
pub mod discord;
pub mod error;
pub mod log_sink;
pub mod render;
pub mod sink;

pub use content::{ActionLink, ActionRow, MessageContent, MessageField};
pub use discord::DiscordSink;
pub use error::NotifyError;
pub use log_sink::LogSink;
pub use render::{ProductEvent, Renderer};
pub use sink::{ConfiguredSink, EditOutcome, NotificationSink};
