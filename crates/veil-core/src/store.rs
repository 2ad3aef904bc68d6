//! In-memory content-addressed payload store
//!
//! The reference backend for tests and single-node operation: a pure
//! map from content-derived key to payload, no network round trip.

use crate::error::Result;
use crate::manager::PrivateTransactionManager;
use crate::types::ExchangeKey;
use crate::KEY_LENGTH;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Map-backed payload store keyed by 64-byte content digests.
pub struct InMemoryStore {
    entries: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Derive the content-addressed key for a payload.
    fn content_key(payload: &[u8]) -> ExchangeKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(payload);
        let mut key = vec![0u8; KEY_LENGTH];
        hasher.finalize_xof().fill(&mut key);
        key
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrivateTransactionManager for InMemoryStore {
    async fn send(&self, payload: &[u8], _from: &str, to: &[String]) -> Result<ExchangeKey> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }
        if to.is_empty() {
            // Local-only: echo a copy of the payload as the key, stored
            // under its own bytes so a later receive still resolves it.
            let echo = payload.to_vec();
            self.entries
                .lock()
                .unwrap()
                .insert(echo.clone(), payload.to_vec());
            return Ok(echo);
        }
        let key = Self::content_key(payload);
        self.entries
            .lock()
            .unwrap()
            .insert(key.clone(), payload.to_vec());
        Ok(key)
    }

    async fn receive(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        // An unknown key means this node is not a party to the payload,
        // which is not an error.
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}
