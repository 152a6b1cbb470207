//! Session context shared by every flow stage.

use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::chain::ChainClient;
use crate::error::AuthError;
use crate::relay::{RelayClient, RelaySignals};

/// Connection lifecycle of the wallet provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection attempted yet.
    #[default]
    Idle,
    /// A connection attempt is outstanding.
    Connecting,
    /// The wallet is connected and its address is bound.
    Connected,
    /// The last connection attempt failed.
    Failed,
}

/// A wallet bound to the session by a provider connection.
///
/// Never mutated once `Connected`; a new binding replaces it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletBinding {
    address: Address,
    state: ConnectionState,
}

impl WalletBinding {
    /// Creates a binding for a successfully connected wallet.
    #[must_use]
    pub const fn connected(address: Address) -> Self {
        Self {
            address,
            state: ConnectionState::Connected,
        }
    }

    /// The bound account address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The connection state this binding was created with.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }
}

/// Wallet provider connector.
///
/// One attempt per user action; the flow never retries a connection on its
/// own.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Connects the provider identified by `provider_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConnectionFailed`] if the provider refuses or
    /// the attempt errors.
    async fn connect(&self, provider_id: &str) -> Result<WalletBinding, AuthError>;
}

/// Derived classification of the current actor.
///
/// Never stored; recomputed from the session each time it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorClassification {
    /// First visit, carrying an invite secret to redeem.
    NewActor,
    /// Known actor without an invite secret.
    ReturningActor,
}

/// Holds the bound wallet, the optional invite secret, and handles to the
/// external collaborators. Supplied once; read by every stage.
pub struct SessionContext {
    wallet: Option<WalletBinding>,
    connection_state: ConnectionState,
    invite_secret: Option<SecretString>,
    chain: Arc<dyn ChainClient>,
    relay: Arc<dyn RelayClient>,
    signals: RelaySignals,
}

impl SessionContext {
    /// Creates a context with no wallet bound yet.
    #[must_use]
    pub fn new(
        chain: Arc<dyn ChainClient>,
        relay: Arc<dyn RelayClient>,
        signals: RelaySignals,
    ) -> Self {
        Self {
            wallet: None,
            connection_state: ConnectionState::Idle,
            invite_secret: None,
            chain,
            relay,
            signals,
        }
    }

    /// Attaches the invite secret presented by a new actor.
    pub fn set_invite_secret(&mut self, secret: SecretString) {
        self.invite_secret = Some(secret);
    }

    /// Connects a wallet through `connector` and binds it on success.
    ///
    /// A failed or incomplete attempt leaves the binding unset and the
    /// session in [`ConnectionState::Failed`]; the flow will not proceed
    /// until a later attempt succeeds.
    ///
    /// # Errors
    ///
    /// Propagates the connector's [`AuthError::ConnectionFailed`].
    pub async fn connect_wallet(
        &mut self,
        connector: &dyn WalletConnector,
        provider_id: &str,
    ) -> Result<WalletBinding, AuthError> {
        self.connection_state = ConnectionState::Connecting;
        match connector.connect(provider_id).await {
            Ok(binding) if binding.state() == ConnectionState::Connected => {
                self.connection_state = ConnectionState::Connected;
                self.wallet = Some(binding);
                tracing::info!(address = %binding.address(), "wallet bound");
                Ok(binding)
            }
            Ok(binding) => {
                self.connection_state = binding.state();
                Err(AuthError::ConnectionFailed {
                    provider: provider_id.to_string(),
                })
            }
            Err(e) => {
                self.connection_state = ConnectionState::Failed;
                Err(e)
            }
        }
    }

    /// Binds an already connected wallet directly.
    ///
    /// For hosts that run their own connection UI and hand the result over.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidInput`] if the binding is not in the
    /// `Connected` state.
    pub fn bind_wallet(&mut self, binding: WalletBinding) -> Result<(), AuthError> {
        if binding.state() != ConnectionState::Connected {
            return Err(AuthError::invalid_input(
                "wallet_binding",
                "binding must be connected",
            ));
        }
        self.connection_state = ConnectionState::Connected;
        self.wallet = Some(binding);
        tracing::info!(address = %binding.address(), "wallet bound");
        Ok(())
    }

    /// The current wallet binding, if a connection succeeded.
    #[must_use]
    pub const fn wallet(&self) -> Option<WalletBinding> {
        self.wallet
    }

    /// The session's connection state.
    #[must_use]
    pub const fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    /// The invite secret, if one was presented.
    #[must_use]
    pub const fn invite_secret(&self) -> Option<&SecretString> {
        self.invite_secret.as_ref()
    }

    /// The chain client handle.
    #[must_use]
    pub fn chain(&self) -> &dyn ChainClient {
        self.chain.as_ref()
    }

    /// The relay client handle.
    #[must_use]
    pub fn relay(&self) -> &dyn RelayClient {
        self.relay.as_ref()
    }

    /// The shared readiness signal table.
    #[must_use]
    pub const fn signals(&self) -> &RelaySignals {
        &self.signals
    }

    /// Classifies the actor from the bound wallet and the invite secret.
    ///
    /// Returns `None` while no wallet is bound; the flow stays idle then.
    /// An empty invite secret counts as absent.
    #[must_use]
    pub fn classify(&self) -> Option<ActorClassification> {
        let binding = self.wallet?;
        if binding.state() != ConnectionState::Connected {
            return None;
        }
        let has_secret = self
            .invite_secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty());
        Some(if has_secret {
            ActorClassification::NewActor
        } else {
            ActorClassification::ReturningActor
        })
    }
}
