//! Veil Exchange - Network-backed payload exchange client
//!
//! Speaks the payload-exchange node's request/response API over its
//! local Unix domain socket and selects the deployment's manager
//! backend from configuration.

pub mod client;
pub mod config;
pub mod http;

pub use client::ExchangeClient;
pub use config::{Backend, ExchangeConfig, ManagerConfig, Timeouts};

use std::sync::Arc;
use veil_core::{Cached, DisabledManager, Error, InMemoryStore, ManagerHandle, Result};

/// Build the configured private transaction manager.
///
/// With no backend configured the disabled manager is wired, so a later
/// private call fails fast instead of leaking a public transaction. The
/// socket backend probes the exchange node before returning and is
/// wrapped in the response cache.
pub async fn build_manager(cfg: &ManagerConfig) -> Result<ManagerHandle> {
    match cfg.backend {
        Backend::Disabled => {
            tracing::info!(
                "running with private transaction manager disabled - private transactions are not supported"
            );
            Ok(Arc::new(DisabledManager))
        }
        Backend::Memory => Ok(Arc::new(InMemoryStore::new())),
        Backend::Socket => {
            let exchange = cfg.exchange.as_ref().ok_or_else(|| {
                Error::Config("socket backend requires an [exchange] section".to_string())
            })?;
            let client = ExchangeClient::connect(exchange).await?;
            Ok(Arc::new(Cached::new(client)))
        }
    }
}
