//! 📦 The Message — one body, two dictionaries, zero guarantees.
//!
//! 🎬 COLD OPEN — INT. INTEGRATION PLATFORM — SOME TUESDAY
//!
//! A message arrives. It carries a body (JSON, XML, or a cry for help) and two
//! metadata dictionaries: headers and properties. Nobody remembers which one the
//! password lives in. Some scripts check properties. Some check headers. Some check
//! both and then check properties again, just to be sure.
//!
//! We check properties first, then headers. Once. Blank means absent. 🦆

use std::collections::HashMap;

/// 🔑 Property the platform stamps on every message with its processing log id.
pub const MESSAGE_ID_PROPERTY: &str = "SAP_MessageProcessingLogID";
/// 🔑 Header fallback for the message id when the property is missing.
pub const MESSAGE_ID_HEADER: &str = "MessageId";

/// 📦 One inbound (or outbound) message: a body and its metadata.
///
/// Lifetime: one invocation. Nothing here survives the flow that created it,
/// which is honestly the healthiest relationship in this codebase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub body: String,
    pub headers: HashMap<String, String>,
    pub properties: HashMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// 🔍 Look a key up in properties, then headers. Blank values count as absent.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        [self.properties.get(key), self.headers.get(key)]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|value| !value.trim().is_empty())
    }

    /// 🆔 The processing log id, if the platform was kind enough to give us one.
    pub fn message_id(&self) -> Option<&str> {
        self.properties
            .get(MESSAGE_ID_PROPERTY)
            .or_else(|| self.headers.get(MESSAGE_ID_HEADER))
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
    }

    /// 🔄 Same metadata, new body. How every flow step hands off to the next.
    pub fn replace_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}
