//! The privacy-aware transaction dispatcher
//!
//! Decides, per call, whether to build an ordinary public transaction,
//! a single private transaction whose data is an exchange key, or an
//! inner/outer privacy marker pair. Exactly one nonce is consumed per
//! logical call regardless of branch, and no partial envelope is ever
//! returned on failure.

use veil_core::{
    Address, Error, ManagerHandle, PrivacyOptions, Result, Transaction, TxEnvelope,
};

/// Narrow signing capability supplied by the chain-client collaborator.
///
/// Signing failures are owned by that collaborator and propagated
/// unchanged.
pub trait Signer: Send + Sync {
    fn sign(&self, from: &Address, tx: Transaction) -> anyhow::Result<Transaction>;
}

/// Per-call parameters handed in by the account layer. The nonce is
/// assumed to be correctly serialized across concurrent dispatches for
/// the same account.
pub struct TransactOpts<'a> {
    pub from: Address,
    pub nonce: u64,
    pub value: u64,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub signer: &'a dyn Signer,
    pub privacy: PrivacyOptions,
}

/// Builds chain-ready transactions from logical calls.
pub struct Dispatcher {
    manager: ManagerHandle,
    marker_address: Address,
}

impl Dispatcher {
    pub fn new(manager: ManagerHandle, marker_address: Address) -> Self {
        Self {
            manager,
            marker_address,
        }
    }

    /// Dispatch one logical call.
    ///
    /// `to = None` means contract creation. Private calls exchange the
    /// input data before any transaction is built; every failure aborts
    /// with nothing constructed or signed.
    pub async fn dispatch(
        &self,
        opts: &TransactOpts<'_>,
        to: Option<Address>,
        data: Vec<u8>,
    ) -> Result<TxEnvelope> {
        opts.privacy.validate()?;

        if !opts.privacy.is_private() {
            let tx = self.sign(opts, build(opts, to, data, false))?;
            return Ok(TxEnvelope::Single(tx));
        }

        // Exchange the real payload; only its key ever reaches a
        // transaction body.
        let key = self
            .manager
            .send(&data, &opts.privacy.private_from, &opts.privacy.private_for)
            .await?;
        tracing::debug!(
            nonce = opts.nonce,
            recipients = opts.privacy.private_for.len(),
            "exchanged private payload"
        );

        let inner = self.sign(opts, build(opts, to, key, true))?;
        if !opts.privacy.use_privacy_marker {
            return Ok(TxEnvelope::Single(inner));
        }

        // Marker branch: disseminate the signed inner transaction off
        // chain and point a public marker transaction at it. Both halves
        // share the nonce since only the outer one is broadcast.
        let raw_inner = serde_json::to_vec(&inner)?;
        let (marker_key, reference) = self
            .manager
            .distribute(
                &raw_inner,
                &opts.privacy.private_from,
                &opts.privacy.private_for,
            )
            .await?;
        tracing::debug!(nonce = opts.nonce, %reference, "distributed inner private transaction");

        let outer = self.sign(
            opts,
            build(opts, Some(self.marker_address), marker_key, false),
        )?;
        Ok(TxEnvelope::Marker { inner, outer })
    }

    fn sign(&self, opts: &TransactOpts<'_>, tx: Transaction) -> Result<Transaction> {
        opts.signer.sign(&opts.from, tx).map_err(Error::Signing)
    }
}

fn build(opts: &TransactOpts<'_>, to: Option<Address>, data: Vec<u8>, is_private: bool) -> Transaction {
    Transaction {
        nonce: opts.nonce,
        to,
        value: opts.value,
        gas_limit: opts.gas_limit,
        gas_price: opts.gas_price,
        data,
        is_private,
        signature: None,
    }
}
