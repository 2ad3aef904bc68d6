//! Core data types for the Veil privacy layer

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A 20-byte account or contract address.
pub type Address = [u8; 20];

/// A content-derived reference returned by the payload exchange.
///
/// Exchanged keys are [`crate::KEY_LENGTH`] bytes; the local-only echo
/// case (empty recipient set) returns a copy of the payload instead, so
/// the type is not fixed-width.
pub type ExchangeKey = Vec<u8>;

/// Well-known address of the privacy marker precompiled contract.
///
/// Deployments may override this via configuration; the chain's default
/// slot is 0x7a.
pub const MARKER_PRECOMPILE_ADDRESS: Address = {
    let mut a = [0u8; 20];
    a[19] = 0x7a;
    a
};

/// A chain transaction as the dispatcher produces it.
///
/// Signing and broadcast belong to the chain-client collaborator; the
/// `signature` field is whatever the signer attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's account nonce.
    pub nonce: u64,
    /// Recipient address; `None` means contract creation.
    pub to: Option<Address>,
    /// Transferred value in base units.
    pub value: u64,
    /// Gas limit for execution.
    pub gas_limit: u64,
    /// Gas price in base units.
    pub gas_price: u64,
    /// Call data. For private transactions this is an exchange key,
    /// never the real payload.
    pub data: Vec<u8>,
    /// Whether the transaction body is private to the named recipients.
    pub is_private: bool,
    /// Signature attached by the signer, if any.
    pub signature: Option<Vec<u8>>,
}

/// Per-call privacy options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyOptions {
    /// Exchange identifier of the sending endpoint; empty means the
    /// local default identity.
    pub private_from: String,
    /// Exchange identifiers of the recipients. Non-empty makes the call
    /// private.
    pub private_for: Vec<String>,
    /// Route the call through the privacy marker precompile as an
    /// inner/outer transaction pair.
    pub use_privacy_marker: bool,
}

impl PrivacyOptions {
    /// A public call carries no recipients and never touches the exchange.
    pub fn is_private(&self) -> bool {
        !self.private_for.is_empty()
    }

    /// Reject invalid combinations before any exchange round trip.
    pub fn validate(&self) -> Result<()> {
        if self.use_privacy_marker && self.private_for.is_empty() {
            return Err(Error::InvalidPrivacyOptions(
                "privacy marker requires at least one recipient".to_string(),
            ));
        }
        Ok(())
    }
}

/// The dispatcher's output: one transaction, or an inner/outer privacy
/// marker pair.
///
/// The inner half of a `Marker` envelope exists only for off-chain
/// dissemination and audit; use [`TxEnvelope::broadcastable`] to obtain
/// the single transaction that may be submitted to the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEnvelope {
    /// A single chain-ready transaction (public, or directly private).
    Single(Transaction),
    /// A privacy marker pair: the private inner transaction was
    /// distributed off-chain, the public outer transaction carries its
    /// exchange key to the marker precompile.
    Marker {
        inner: Transaction,
        outer: Transaction,
    },
}

impl TxEnvelope {
    /// The only transaction that may be signed off to broadcast.
    pub fn broadcastable(&self) -> &Transaction {
        match self {
            TxEnvelope::Single(tx) => tx,
            TxEnvelope::Marker { outer, .. } => outer,
        }
    }

    /// The inner private transaction of a marker pair, if any.
    pub fn inner(&self) -> Option<&Transaction> {
        match self {
            TxEnvelope::Single(_) => None,
            TxEnvelope::Marker { inner, .. } => Some(inner),
        }
    }
}

/// Helper to format an exchange key as a hex string.
pub fn key_to_hex(key: &[u8]) -> String {
    hex::encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_without_recipients_is_rejected() {
        let opts = PrivacyOptions {
            use_privacy_marker: true,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(Error::InvalidPrivacyOptions(_))
        ));
    }

    #[test]
    fn recipients_imply_private() {
        let mut opts = PrivacyOptions::default();
        assert!(!opts.is_private());
        opts.private_for.push("tm1".to_string());
        assert!(opts.is_private());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn broadcastable_is_the_outer_half() {
        let inner = Transaction {
            nonce: 7,
            to: None,
            value: 0,
            gas_limit: 1,
            gas_price: 0,
            data: vec![1],
            is_private: true,
            signature: None,
        };
        let outer = Transaction {
            to: Some(MARKER_PRECOMPILE_ADDRESS),
            data: vec![2],
            is_private: false,
            ..inner.clone()
        };
        let envelope = TxEnvelope::Marker {
            inner: inner.clone(),
            outer: outer.clone(),
        };
        assert_eq!(envelope.broadcastable(), &outer);
        assert_eq!(envelope.inner(), Some(&inner));
        assert!(envelope.broadcastable().to == Some(MARKER_PRECOMPILE_ADDRESS));
    }
}
