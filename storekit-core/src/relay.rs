//! Relay client contract and the one-shot readiness signals.
//!
//! The relay client brokers keycard enrollment and login with the remote
//! authentication service. Readiness is communicated through
//! [`RelaySignals`]: a handle that registers exactly one pending listener
//! per signal name and delivers at most one notification to it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use strum::{Display, EnumString};
use tokio::sync::oneshot;

use crate::error::AuthError;

/// Readiness signals exchanged between the orchestrator and the relay.
///
/// The wire names follow the relay protocol's event names
/// (`keycard-enroll`, `login`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Signal {
    /// The relay is ready to enroll a keycard.
    KeycardEnroll,
    /// The relay is ready to run the authentication handshake.
    Login,
}

/// Stateful session client brokering enrollment and login.
///
/// Both operations are single attempts; transport failures are reported as
/// [`AuthError::Relay`]. A clean negative answer (`Ok(false)`) means the
/// service rejected the operation.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Enrolls the pending keycard with the remote authentication service.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment request cannot be delivered.
    async fn enroll_keycard(&self) -> Result<bool, AuthError>;

    /// Performs the authentication handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake cannot be delivered.
    async fn login(&self) -> Result<bool, AuthError>;
}

/// One-shot readiness notifications.
///
/// `once` registers the single pending listener for a signal (replacing any
/// earlier registration, whose listener then observes
/// [`AuthError::SignalClosed`]); `emit` consumes the registration and
/// delivers at most one notification. Cloning the handle shares the same
/// registration table.
#[derive(Debug, Default, Clone)]
pub struct RelaySignals {
    pending: Arc<Mutex<HashMap<Signal, oneshot::Sender<()>>>>,
}

impl RelaySignals {
    /// Creates an empty signal table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the single pending listener for `signal`.
    #[must_use]
    pub fn once(&self, signal: Signal) -> SignalListener {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(signal, tx);
        SignalListener { signal, rx }
    }

    /// Delivers `signal` to the pending listener, if any.
    ///
    /// The registration is consumed either way; emitting with no listener
    /// registered is a no-op.
    pub fn emit(&self, signal: Signal) {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&signal);
        match sender {
            Some(tx) => {
                if tx.send(()).is_err() {
                    tracing::debug!(%signal, "signal listener dropped before delivery");
                }
            }
            None => tracing::debug!(%signal, "signal emitted with no pending listener"),
        }
    }
}

/// A registered one-shot listener for a readiness signal.
#[derive(Debug)]
pub struct SignalListener {
    signal: Signal,
    rx: oneshot::Receiver<()>,
}

impl SignalListener {
    /// The signal this listener was registered for.
    #[must_use]
    pub const fn signal(&self) -> Signal {
        self.signal
    }

    /// Waits for the signal to be emitted.
    ///
    /// Pends indefinitely if the signal is never emitted; deadline policy is
    /// the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SignalClosed`] if the registration was replaced
    /// by a newer listener or the signal table was dropped.
    pub async fn wait(self) -> Result<(), AuthError> {
        self.rx
            .await
            .map_err(|_| AuthError::SignalClosed { signal: self.signal })
    }
}
