//! Veil Core - Shared types and the private transaction manager facade
//!
//! This crate provides the fundamental building blocks for the Veil
//! privacy layer: transaction and privacy-option types, the pluggable
//! `PrivateTransactionManager` trait, the in-memory content-addressed
//! payload store, and the response-cache decorator.

pub mod cache;
pub mod error;
pub mod manager;
pub mod store;
pub mod types;

pub use cache::Cached;
pub use error::{Error, Result};
pub use manager::{DisabledManager, ManagerHandle, PrivateTransactionManager};
pub use store::InMemoryStore;
pub use types::*;

/// Length in bytes of a content-derived exchange key.
pub const KEY_LENGTH: usize = 64;
