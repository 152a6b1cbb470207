//! Authentication handshake stage.

use crate::checkpoint::KeycardCheckpoints;
use crate::error::AuthError;
use crate::relay::{RelayClient, RelaySignals, Signal, SignalListener};

/// Performs the login handshake once its prerequisites hold.
///
/// The stage subscribes once to the login readiness signal and reacts to at
/// most one notification per registration.
pub struct LoginStage {
    listener: Option<SignalListener>,
}

impl LoginStage {
    /// Creates a stage with no listener registered yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { listener: None }
    }

    /// Registers the one-shot login readiness listener.
    ///
    /// Idempotent: an already registered listener is kept.
    pub fn prepare(&mut self, signals: &RelaySignals) {
        if self.listener.is_none() {
            self.listener = Some(signals.once(Signal::Login));
        }
    }

    /// Waits for readiness and performs the handshake.
    ///
    /// Success promotes any pending keycard marker to the enrolled marker
    /// (enrollment and login may be reported together) and clears the
    /// pending marker. A rejected handshake removes the enrolled marker —
    /// a credential that failed to authenticate is not trusted — and clears
    /// the pending marker. The pending marker never survives either branch.
    ///
    /// # Errors
    ///
    /// [`AuthError::LoginFailed`] on rejection; relay transport, signal and
    /// checkpoint errors propagate.
    pub async fn drive(
        &mut self,
        relay: &dyn RelayClient,
        checkpoints: &KeycardCheckpoints,
    ) -> Result<(), AuthError> {
        let Some(listener) = self.listener.take() else {
            return Err(AuthError::invalid_input(
                "login_stage",
                "no readiness listener registered",
            ));
        };
        listener.wait().await?;
        let authenticated = match relay.login().await {
            Ok(ok) => ok,
            Err(e) => {
                checkpoints.clear_pending()?;
                return Err(e);
            }
        };
        if authenticated {
            checkpoints.promote_pending()?;
            tracing::info!("login complete");
            Ok(())
        } else {
            checkpoints.clear_enrolled()?;
            checkpoints.clear_pending()?;
            tracing::warn!("login rejected");
            Err(AuthError::LoginFailed)
        }
    }

    /// Drops any registered listener for a fresh flow run.
    pub fn reset(&mut self) {
        self.listener = None;
    }
}

impl Default for LoginStage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::checkpoint::{KeycardId, MemoryCheckpointStore};

    struct ScriptedRelay {
        login_ok: Result<bool, ()>,
    }

    #[async_trait]
    impl RelayClient for ScriptedRelay {
        async fn enroll_keycard(&self) -> Result<bool, AuthError> {
            unreachable!("login never enrolls")
        }

        async fn login(&self) -> Result<bool, AuthError> {
            self.login_ok
                .map_err(|()| AuthError::relay("connection reset"))
        }
    }

    fn checkpoints() -> KeycardCheckpoints {
        KeycardCheckpoints::new(Arc::new(MemoryCheckpointStore::new()))
    }

    async fn drive(
        relay: &ScriptedRelay,
        checkpoints: &KeycardCheckpoints,
    ) -> Result<(), AuthError> {
        let signals = RelaySignals::new();
        let mut stage = LoginStage::new();
        stage.prepare(&signals);
        signals.emit(Signal::Login);
        stage.drive(relay, checkpoints).await
    }

    #[tokio::test]
    async fn test_success_promotes_pending_marker() {
        let checkpoints = checkpoints();
        let pending = KeycardId::random();
        checkpoints.set_pending(&pending).unwrap();
        let relay = ScriptedRelay { login_ok: Ok(true) };

        drive(&relay, &checkpoints).await.unwrap();

        assert_eq!(checkpoints.enrolled().unwrap(), Some(pending));
        assert!(checkpoints.pending().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejection_distrusts_enrolled_keycard() {
        let checkpoints = checkpoints();
        checkpoints.set_enrolled(&KeycardId::random()).unwrap();
        checkpoints.set_pending(&KeycardId::random()).unwrap();
        let relay = ScriptedRelay {
            login_ok: Ok(false),
        };

        let err = drive(&relay, &checkpoints).await.unwrap_err();

        assert!(matches!(err, AuthError::LoginFailed));
        assert!(checkpoints.enrolled().unwrap().is_none());
        assert!(checkpoints.pending().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transport_error_keeps_enrolled_marker() {
        let checkpoints = checkpoints();
        let enrolled = KeycardId::random();
        checkpoints.set_enrolled(&enrolled).unwrap();
        let relay = ScriptedRelay { login_ok: Err(()) };

        let err = drive(&relay, &checkpoints).await.unwrap_err();

        assert!(matches!(err, AuthError::Relay(_)));
        assert_eq!(checkpoints.enrolled().unwrap(), Some(enrolled));
        assert!(checkpoints.pending().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drive_without_prepare_is_rejected() {
        let checkpoints = checkpoints();
        let relay = ScriptedRelay { login_ok: Ok(true) };
        let mut stage = LoginStage::new();
        let err = stage.drive(&relay, &checkpoints).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput { .. }));
    }
}
