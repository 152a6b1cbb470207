//! Contract required from the chain read/write client.
//!
//! The flow never talks to a node directly; it consumes a [`ChainClient`]
//! supplied by the host application. Implementations submit the invite
//! secret redemption, wait for the transaction to finalize, and answer the
//! store registry's access query.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::AuthError;

/// Reference to a submitted on-chain transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionRef(
    /// The transaction hash.
    pub B256,
);

impl std::fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of waiting for a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// The transaction finalized successfully.
    Success,
    /// The transaction reverted.
    Reverted,
}

/// Chain read/write client the flow depends on.
///
/// Each operation is a single attempt; the flow performs no automatic
/// retries. Transport failures are reported as [`AuthError::Chain`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submits `secret` for on-chain redemption on behalf of `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission cannot be made.
    async fn redeem_invite_secret(
        &self,
        secret: &SecretString,
        address: Address,
    ) -> Result<TransactionRef, AuthError>;

    /// Blocks until `tx` finalizes and reports its receipt status.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be obtained.
    async fn wait_for_receipt(&self, tx: TransactionRef) -> Result<ReceiptStatus, AuthError>;

    /// Asks the store registry whether `address` holds at least `min_level`
    /// access for `store_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry read fails.
    async fn has_at_least_access(
        &self,
        store_id: B256,
        address: Address,
        min_level: u64,
    ) -> Result<bool, AuthError>;
}
