//! Veil Dispatch - Privacy-aware transaction construction
//!
//! Consumes the private transaction manager facade and turns logical
//! calls into chain-ready transactions: a single (public or private)
//! transaction, or an inner/outer privacy marker pair.

pub mod dispatch;
pub mod keytable;

pub use dispatch::{Dispatcher, Signer, TransactOpts};
pub use keytable::{spawn_watcher, KeyTable, NodeStatus, PermissionEvent};
