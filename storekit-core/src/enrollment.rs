//! Keycard enrollment stage.
//!
//! Decides from the persisted markers whether a keycard must be freshly
//! enrolled or is already trusted, then drives the enrollment off a
//! one-shot readiness signal. The stage never polls: it registers interest
//! once and, if the signal never fires, the flow simply stays pending.

use crate::checkpoint::{KeycardCheckpoints, KeycardId};
use crate::error::AuthError;
use crate::relay::{RelayClient, RelaySignals, Signal, SignalListener};

/// States of the keycard enrollment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrollmentState {
    /// Persisted markers not yet consulted.
    #[default]
    Unevaluated,
    /// A keycard is pending enrollment; waiting for relay readiness.
    EnrollmentRequired,
    /// The enrollment call is outstanding.
    EnrollmentInFlight,
    /// A keycard credential for this device is trusted.
    Trusted,
    /// The relay rejected or failed the enrollment attempt.
    EnrollmentFailed,
}

/// Drives keycard enrollment for one flow run.
///
/// The single-shot latch guarantees at most one enrollment call per run,
/// however often the surrounding conditions re-evaluate.
pub struct EnrollmentStage {
    state: EnrollmentState,
    attempted: bool,
    listener: Option<SignalListener>,
}

impl EnrollmentStage {
    /// Creates a stage in [`EnrollmentState::Unevaluated`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: EnrollmentState::Unevaluated,
            attempted: false,
            listener: None,
        }
    }

    /// The stage's current state.
    #[must_use]
    pub const fn state(&self) -> EnrollmentState {
        self.state
    }

    /// Consults the persisted markers and decides the stage's path.
    ///
    /// A pending marker (the actor opted to enroll a new keycard) requires
    /// enrollment; an enrolled marker with nothing pending means the device
    /// is already trusted. A device with neither marker mints a fresh
    /// keycard, persists it as pending, and requires enrollment. When
    /// enrollment is required the one-shot readiness listener is registered
    /// here; `evaluate` is a no-op once the stage has left `Unevaluated`.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint store cannot be read or written.
    pub fn evaluate(
        &mut self,
        checkpoints: &KeycardCheckpoints,
        signals: &RelaySignals,
    ) -> Result<EnrollmentState, AuthError> {
        if self.state != EnrollmentState::Unevaluated {
            return Ok(self.state);
        }
        if let Some(id) = checkpoints.pending()? {
            if !self.attempted {
                tracing::debug!(keycard = %id, "keycard pending enrollment");
                self.listener = Some(signals.once(Signal::KeycardEnroll));
                self.state = EnrollmentState::EnrollmentRequired;
            }
        } else if let Some(id) = checkpoints.enrolled()? {
            tracing::debug!(keycard = %id, "keycard already trusted");
            self.state = EnrollmentState::Trusted;
        } else {
            let id = KeycardId::random();
            checkpoints.set_pending(&id)?;
            tracing::info!(keycard = %id, "minted keycard for first enrollment");
            self.listener = Some(signals.once(Signal::KeycardEnroll));
            self.state = EnrollmentState::EnrollmentRequired;
        }
        Ok(self.state)
    }

    /// Waits for the readiness signal and performs the enrollment once.
    ///
    /// On success the pending marker is promoted to the enrolled marker and
    /// removed. On failure the latch is reset so a top-level retry may
    /// attempt once more; the pending marker is left in place until the
    /// overall flow concludes. States other than `EnrollmentRequired` (and
    /// the terminal `Trusted`) have nothing to drive.
    ///
    /// # Errors
    ///
    /// [`AuthError::EnrollmentFailed`] if the relay rejects the keycard;
    /// relay transport and checkpoint errors propagate.
    pub async fn drive(
        &mut self,
        relay: &dyn RelayClient,
        checkpoints: &KeycardCheckpoints,
    ) -> Result<EnrollmentState, AuthError> {
        if self.state != EnrollmentState::EnrollmentRequired {
            return Ok(self.state);
        }
        let Some(listener) = self.listener.take() else {
            return Ok(self.state);
        };
        listener.wait().await?;
        self.state = EnrollmentState::EnrollmentInFlight;
        self.attempted = true;
        match relay.enroll_keycard().await {
            Ok(true) => {
                checkpoints.promote_pending()?;
                self.state = EnrollmentState::Trusted;
                tracing::info!("keycard enrolled");
                Ok(self.state)
            }
            Ok(false) => {
                self.attempted = false;
                self.state = EnrollmentState::EnrollmentFailed;
                tracing::warn!("keycard enrollment rejected");
                Err(AuthError::EnrollmentFailed)
            }
            Err(e) => {
                self.attempted = false;
                self.state = EnrollmentState::EnrollmentFailed;
                tracing::warn!(error = %e, "keycard enrollment errored");
                Err(e)
            }
        }
    }

    /// Returns the stage to `Unevaluated` for a fresh flow run.
    pub fn reset(&mut self) {
        self.state = EnrollmentState::Unevaluated;
        self.attempted = false;
        self.listener = None;
    }
}

impl Default for EnrollmentStage {
    fn default() -> Self {
        Self::new()
    }
}
