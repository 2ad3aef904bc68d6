//! The private transaction manager facade
//!
//! Everything above the exchange layer depends on this trait alone: the
//! in-memory store, the socket-backed exchange client, and the caching
//! decorator all implement it, so backends are swappable per deployment.

use crate::error::{Error, Result};
use crate::types::ExchangeKey;
use async_trait::async_trait;
use std::sync::Arc;

/// Exchanges opaque payloads for content-derived keys with a set of
/// named peers, and resolves keys back into payloads.
#[async_trait]
pub trait PrivateTransactionManager: Send + Sync {
    /// Send `payload` to every identifier in `to` and return the
    /// content-derived key that replaces it on chain.
    ///
    /// An empty payload returns an empty key without any side effects.
    /// An empty `to` returns a byte-for-byte copy of the payload as the
    /// key: the payload is never exchanged and callers must treat the
    /// result as local-only.
    async fn send(&self, payload: &[u8], from: &str, to: &[String]) -> Result<ExchangeKey>;

    /// Resolve a key back into its payload.
    ///
    /// Returns an empty payload when the key is empty or when the local
    /// node is not a recipient of the referenced payload; neither case
    /// is an error. Only transport and protocol failures are errors.
    async fn receive(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Send a whole serialized transaction to the recipients, returning
    /// the key and a human-readable reference peers can use for lookup.
    async fn distribute(
        &self,
        payload: &[u8],
        from: &str,
        to: &[String],
    ) -> Result<(ExchangeKey, String)> {
        let key = self.send(payload, from, to).await?;
        let reference = crate::types::key_to_hex(&key);
        Ok((key, reference))
    }
}

/// A shareable manager handle.
pub type ManagerHandle = Arc<dyn PrivateTransactionManager>;

/// Placeholder manager wired when no privacy backend is configured.
///
/// Sends fail fast so a private call can never silently fall back to a
/// public transaction. Receives report no payload, since a node without
/// a backend is a recipient of nothing.
pub struct DisabledManager;

#[async_trait]
impl PrivateTransactionManager for DisabledManager {
    async fn send(&self, _payload: &[u8], _from: &str, _to: &[String]) -> Result<ExchangeKey> {
        Err(Error::ManagerNotInUse)
    }

    async fn receive(&self, _key: &[u8]) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn distribute(
        &self,
        _payload: &[u8],
        _from: &str,
        _to: &[String],
    ) -> Result<(ExchangeKey, String)> {
        Err(Error::ManagerNotInUse)
    }
}
