use alloy_primitives::B256;
use thiserror::Error;

use crate::chain::TransactionRef;
use crate::flow::FlowStatus;
use crate::relay::Signal;

/// Error outputs from the storefront authentication flow.
///
/// Every variant is terminal for the current flow run and surfaces to
/// status observers as [`FlowStatus::Failed`]; the typed variant is returned
/// from the failing call for callers that need the failure subtype.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The wallet provider connection attempt failed.
    #[error("connection_failed: {provider}")]
    ConnectionFailed {
        /// Identifier of the provider that failed to connect.
        provider: String,
    },
    /// The invite secret redemption transaction reverted on-chain.
    #[error("redemption_failed: {tx}")]
    RedemptionFailed {
        /// Reference to the reverted transaction.
        tx: TransactionRef,
    },
    /// The actor's access level is below the store's threshold.
    #[error("access_denied: store {store_id} requires level {required}")]
    AccessDenied {
        /// Store the access check ran against.
        store_id: B256,
        /// Minimum level the store requires.
        required: u64,
    },
    /// The relay rejected the keycard enrollment.
    #[error("enrollment_failed")]
    EnrollmentFailed,
    /// The authentication handshake was rejected.
    #[error("login_failed")]
    LoginFailed,
    /// Transport or protocol failure in the chain client.
    #[error("chain_client_error: {0}")]
    Chain(String),
    /// Transport or protocol failure in the relay client.
    #[error("relay_client_error: {0}")]
    Relay(String),
    /// The checkpoint store failed to read or persist a marker.
    #[error("checkpoint_store_error: {0}")]
    Checkpoint(String),
    /// A readiness signal registration was replaced or dropped before delivery.
    #[error("signal_closed: {signal}")]
    SignalClosed {
        /// The signal whose registration was lost.
        signal: Signal,
    },
    /// The presented input is not valid for the requested operation.
    #[error("invalid_input: {attribute}: {reason}")]
    InvalidInput {
        /// Name of the offending attribute.
        attribute: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// `retry()` is only available from a failed flow.
    #[error("retry_unavailable: {status}")]
    RetryUnavailable {
        /// Status the flow was in when retry was requested.
        status: FlowStatus,
    },
}

impl AuthError {
    /// Creates a chain transport error.
    pub fn chain<S: Into<String>>(message: S) -> Self {
        Self::Chain(message.into())
    }

    /// Creates a relay transport error.
    pub fn relay<S: Into<String>>(message: S) -> Self {
        Self::Relay(message.into())
    }

    /// Creates a checkpoint store error.
    pub fn checkpoint<S: Into<String>>(message: S) -> Self {
        Self::Checkpoint(message.into())
    }

    /// Creates an invalid input error.
    pub fn invalid_input<A: Into<String>, R: Into<String>>(attribute: A, reason: R) -> Self {
        Self::InvalidInput {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}
