//! Shared fixtures for engine tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use stockwatch_core::{ProductHandle, ProductSnapshot, StorefrontOrigin, Variant, WatchTarget};
use stockwatch_notify::{EditOutcome, MessageContent, NotificationSink, NotifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Send,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCall {
    pub kind: CallKind,
    pub destination: String,
    pub id: String,
    pub content: MessageContent,
}

impl SinkCall {
    pub fn is_send(&self) -> bool {
        self.kind == CallKind::Send
    }

    pub fn title(&self) -> &str {
        &self.content.title
    }

    /// Value of the leading status field.
    pub fn status(&self) -> &str {
        self.content
            .fields
            .first()
            .map_or("", |f| f.value.as_str())
    }
}

/// Records every successful sink call; failure modes are toggled per test.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    next_id: AtomicU64,
    pub fail_sends: AtomicBool,
    pub fail_edits: AtomicBool,
    pub missing_edits: AtomicBool,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<SinkCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }
}

impl NotificationSink for RecordingSink {
    async fn send(&self, destination: &str, content: &MessageContent) -> Result<String, NotifyError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(NotifyError::Api {
                status: 500,
                body: "send refused".to_owned(),
            });
        }
        let id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls.lock().unwrap().push(SinkCall {
            kind: CallKind::Send,
            destination: destination.to_owned(),
            id: id.clone(),
            content: content.clone(),
        });
        Ok(id)
    }

    async fn edit(
        &self,
        destination: &str,
        message_id: &str,
        content: &MessageContent,
    ) -> Result<EditOutcome, NotifyError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(NotifyError::Api {
                status: 500,
                body: "edit refused".to_owned(),
            });
        }
        if self.missing_edits.load(Ordering::SeqCst) {
            return Ok(EditOutcome::NotFound);
        }
        self.calls.lock().unwrap().push(SinkCall {
            kind: CallKind::Edit,
            destination: destination.to_owned(),
            id: message_id.to_owned(),
            content: content.clone(),
        });
        Ok(EditOutcome::Edited)
    }
}

pub fn origin() -> StorefrontOrigin {
    StorefrontOrigin::parse("https://records.example.com").unwrap()
}

pub fn target(destination: &str) -> WatchTarget {
    WatchTarget {
        origin: origin(),
        destination: destination.to_owned(),
    }
}

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

pub fn handle(raw: &str) -> ProductHandle {
    ProductHandle::normalize(raw).unwrap()
}

/// A single-variant vinyl product.
pub fn vinyl(raw_handle: &str, price: &str, available: bool) -> ProductSnapshot {
    ProductSnapshot {
        id: format!("id-{raw_handle}"),
        title: format!("{raw_handle} vinyl"),
        handle: handle(raw_handle),
        images: vec![format!("https://cdn.example.com/{raw_handle}.jpg")],
        variants: vec![Variant {
            id: format!("v-{raw_handle}"),
            title: "Default Title".to_owned(),
            price: price.to_owned(),
            available,
        }],
        product_type: "Vinyl".to_owned(),
        tags: vec![],
        published_at: None,
        description: String::new(),
    }
}
