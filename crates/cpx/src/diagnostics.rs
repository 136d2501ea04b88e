//! 📎 Diagnostics — the message processing log, one attachment at a time.
//!
//! Every flow pins the payload it is holding onto the log at each step, so that
//! when the downstream returns a 500 at 3am the operator can see exactly what we
//! sent. Not part of the functional contract. Entirely part of the "can I go back
//! to sleep" contract.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

pub const MIME_JSON: &str = "application/json";
pub const MIME_XML: &str = "application/xml";
pub const MIME_TEXT: &str = "text/plain";

/// 📎 One named payload snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub content: String,
    pub mime_type: String,
}

/// 📒 Shared handle to the attachments of one message. Clone freely.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    attachments: Arc<Mutex<Vec<Attachment>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(&self, name: impl Into<String>, content: impl Into<String>, mime_type: &str) {
        let attachment = Attachment {
            name: name.into(),
            content: content.into(),
            mime_type: mime_type.to_string(),
        };
        debug!(
            "📎 attachment '{}' ({}, {} bytes)",
            attachment.name,
            attachment.mime_type,
            attachment.content.len()
        );
        self.attachments.lock().await.push(attachment);
    }

    pub async fn attach_json(&self, name: impl Into<String>, content: impl Into<String>) {
        self.attach(name, content, MIME_JSON).await;
    }

    pub async fn attach_xml(&self, name: impl Into<String>, content: impl Into<String>) {
        self.attach(name, content, MIME_XML).await;
    }

    pub async fn attach_text(&self, name: impl Into<String>, content: impl Into<String>) {
        self.attach(name, content, MIME_TEXT).await;
    }

    /// 📋 Snapshot of everything attached so far, oldest first.
    pub async fn attachments(&self) -> Vec<Attachment> {
        self.attachments.lock().await.clone()
    }

    pub async fn find(&self, name: &str) -> Option<Attachment> {
        self.attachments
            .lock()
            .await
            .iter()
            .find(|a| a.name == name)
            .cloned()
    }
}

/// 🔎 Guess a MIME type from what the payload looks like. Good enough for a log.
pub fn sniff_mime(content: &str) -> &'static str {
    match content.trim_start().chars().next() {
        Some('<') => MIME_XML,
        Some('{') | Some('[') => MIME_JSON,
        _ => MIME_TEXT,
    }
}
