//! On-chain redemption of invite secrets and the store access check.

use alloy_primitives::{Address, B256};
use secrecy::SecretString;

use crate::chain::{ChainClient, ReceiptStatus};
use crate::error::AuthError;

/// Result of access verification for a new actor.
///
/// Write-once per flow run; absent or `granted = false` blocks progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGrant {
    /// Whether the actor holds at least the store's minimum access level.
    pub granted: bool,
}

/// Redeems an invite secret and checks the resulting identity's access.
pub struct AccessVerifier<'a> {
    chain: &'a dyn ChainClient,
    store_id: B256,
    min_access_level: u64,
}

impl<'a> AccessVerifier<'a> {
    /// Creates a verifier for `store_id` with the given threshold.
    #[must_use]
    pub fn new(chain: &'a dyn ChainClient, store_id: B256, min_access_level: u64) -> Self {
        Self {
            chain,
            store_id,
            min_access_level,
        }
    }

    /// Redeems `secret` on behalf of `address` and checks store access.
    ///
    /// The grant is positive only if the redemption transaction finalized
    /// successfully AND the registry reports at least the required access
    /// level. The caller holds the single-shot latch; this method performs
    /// exactly one submission per invocation and never retries.
    ///
    /// # Errors
    ///
    /// [`AuthError::RedemptionFailed`] if the transaction reverted;
    /// [`AuthError::Chain`] for transport failures. Waiting for the receipt
    /// is not bounded here; callers needing a deadline wrap this future.
    pub async fn redeem_and_check_access(
        &self,
        secret: &SecretString,
        address: Address,
    ) -> Result<AccessGrant, AuthError> {
        let tx = self.chain.redeem_invite_secret(secret, address).await?;
        tracing::debug!(%tx, "invite secret redemption submitted");
        match self.chain.wait_for_receipt(tx).await? {
            ReceiptStatus::Reverted => {
                tracing::warn!(%tx, "invite secret redemption reverted");
                return Err(AuthError::RedemptionFailed { tx });
            }
            ReceiptStatus::Success => {}
        }
        let granted = self
            .chain
            .has_at_least_access(self.store_id, address, self.min_access_level)
            .await?;
        tracing::info!(address = %address, granted, "store access checked");
        Ok(AccessGrant { granted })
    }
}
