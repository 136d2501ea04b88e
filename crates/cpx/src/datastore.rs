//! 🗄️ Datastore — a staging shelf between "we got it" and "we forwarded it".
//!
//! Some flows park the upstream answer before forwarding, so an operator can
//! pull it back out when the downstream call falls over. Named stores, byte blobs,
//! an overwrite flag. Last write wins when overwrite is on; otherwise a second write
//! to the same id is refused. That is the entire consistency model. 🦆

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{IntegrationError, Result};
use crate::message::Message;

/// 🗄️ put / select / delete against a named store.
#[async_trait]
pub trait DataStore: Send + Sync + std::fmt::Debug {
    async fn put(&self, store: &str, id: &str, payload: Vec<u8>, overwrite: bool) -> Result<()>;
    async fn select(&self, store: &str, id: &str) -> Result<Option<Vec<u8>>>;
    /// 🗑️ Returns whether something was actually there to delete.
    async fn delete(&self, store: &str, id: &str) -> Result<bool>;
}

/// 🆔 Entry id for a message: its processing log id, or a fresh UUID v4.
pub fn entry_id(message: &Message) -> String {
    message
        .message_id()
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// 🧠 RAM-only store. Clone it and every clone sees the same shelves.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDataStore {
    entries: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn put(&self, store: &str, id: &str, payload: Vec<u8>, overwrite: bool) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let key = (store.to_string(), id.to_string());
        if !overwrite && entries.contains_key(&key) {
            return Err(IntegrationError::Datastore(format!(
                "entry '{id}' already exists in store '{store}' and overwrite is off"
            )));
        }
        debug!("🗄️ put {} bytes into {}/{}", payload.len(), store, id);
        entries.insert(key, payload);
        Ok(())
    }

    async fn select(&self, store: &str, id: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&(store.to_string(), id.to_string())).cloned())
    }

    async fn delete(&self, store: &str, id: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(&(store.to_string(), id.to_string())).is_some())
    }
}
