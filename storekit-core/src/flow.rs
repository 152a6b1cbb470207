//! Top-level orchestration of the storefront authentication flow.

use std::sync::Arc;

use alloy_primitives::B256;
use strum::Display;
use tokio::sync::watch;
use uuid::Uuid;

use crate::access::{AccessGrant, AccessVerifier};
use crate::checkpoint::{CheckpointStore, KeycardCheckpoints};
use crate::config::StoreConfig;
use crate::enrollment::{EnrollmentStage, EnrollmentState};
use crate::error::AuthError;
use crate::login::LoginStage;
use crate::relay::Signal;
use crate::session::{ActorClassification, SessionContext};

/// Externally observable status of the flow.
///
/// Set at most once per flow run to `Complete` or `Failed`; terminal states
/// are sticky until an explicit [`AuthFlow::retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FlowStatus {
    /// The flow has not reached a terminal state.
    #[default]
    Pending,
    /// Authentication completed.
    Complete,
    /// The current run failed; `retry()` restarts it.
    Failed,
}

/// The authentication flow orchestrator.
///
/// Sequences wallet classification, invite-secret redemption, keycard
/// enrollment and login into one linear-with-branches run. All state
/// transitions happen inside [`run`](Self::run) on a single logical thread
/// of control; single-shot latches guard every side-effecting call against
/// re-entrant re-evaluation. The only external surface is the status
/// observable and [`retry`](Self::retry).
pub struct AuthFlow {
    session: SessionContext,
    config: StoreConfig,
    checkpoints: KeycardCheckpoints,
    enrollment: EnrollmentStage,
    login: LoginStage,
    access: Option<AccessGrant>,
    redeem_attempted: bool,
    status_tx: watch::Sender<FlowStatus>,
    run_id: Uuid,
}

impl AuthFlow {
    /// Creates a flow in `Pending` over the given session and store.
    #[must_use]
    pub fn new(session: SessionContext, config: StoreConfig, store: Arc<dyn CheckpointStore>) -> Self {
        let (status_tx, _) = watch::channel(FlowStatus::Pending);
        Self {
            session,
            config,
            checkpoints: KeycardCheckpoints::new(store),
            enrollment: EnrollmentStage::new(),
            login: LoginStage::new(),
            access: None,
            redeem_attempted: false,
            status_tx,
            run_id: Uuid::new_v4(),
        }
    }

    /// The flow's current status.
    #[must_use]
    pub fn status(&self) -> FlowStatus {
        *self.status_tx.borrow()
    }

    /// Subscribes to status updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.status_tx.subscribe()
    }

    /// The session context.
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Mutable session context, e.g. to bind a wallet before running.
    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    /// The enrollment stage's current state, for observability.
    #[must_use]
    pub const fn enrollment_state(&self) -> EnrollmentState {
        self.enrollment.state()
    }

    /// Drives the flow to a terminal status.
    ///
    /// Returns `Ok(Pending)` while no actor can be classified (no wallet
    /// bound yet); the flow stays idle and can be run again later. A run
    /// already concluded returns its terminal status unchanged. Waiting on
    /// relay readiness is unbounded; callers needing a deadline wrap this
    /// future and drive the flow to failure on expiry.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] failure class; the status observable reads
    /// `Failed` whenever an error is returned.
    pub async fn run(&mut self) -> Result<FlowStatus, AuthError> {
        match self.status() {
            FlowStatus::Pending => {}
            terminal => return Ok(terminal),
        }
        let Some(actor) = self.session.classify() else {
            tracing::debug!("no wallet bound; flow stays pending");
            return Ok(FlowStatus::Pending);
        };
        tracing::info!(run_id = %self.run_id, ?actor, "authentication flow started");
        match self.advance(actor).await {
            Ok(()) => {
                self.conclude(FlowStatus::Complete);
                Ok(FlowStatus::Complete)
            }
            Err(e) => {
                tracing::warn!(run_id = %self.run_id, error = %e, "authentication flow failed");
                self.conclude(FlowStatus::Failed);
                Err(e)
            }
        }
    }

    /// Restarts a failed flow from `Pending`.
    ///
    /// Durable markers are kept, so a retried run can short-circuit on an
    /// already trusted keycard. The single-shot latches and the stage state
    /// machines are reset: redemption, enrollment and login may each be
    /// attempted once more under a fresh run id.
    ///
    /// # Errors
    ///
    /// [`AuthError::RetryUnavailable`] unless the flow is `Failed`.
    pub fn retry(&mut self) -> Result<(), AuthError> {
        let status = self.status();
        if status != FlowStatus::Failed {
            return Err(AuthError::RetryUnavailable { status });
        }
        self.redeem_attempted = false;
        self.access = None;
        self.enrollment.reset();
        self.login.reset();
        self.run_id = Uuid::new_v4();
        self.status_tx.send_replace(FlowStatus::Pending);
        tracing::info!(run_id = %self.run_id, "flow reset for retry");
        Ok(())
    }

    async fn advance(&mut self, actor: ActorClassification) -> Result<(), AuthError> {
        if actor == ActorClassification::NewActor {
            self.ensure_access().await?;
        }
        // both actor kinds converge here
        self.enrollment
            .evaluate(&self.checkpoints, self.session.signals())?;
        self.login.prepare(self.session.signals());
        if self.enrollment.state() == EnrollmentState::EnrollmentRequired {
            self.session.signals().emit(Signal::KeycardEnroll);
        }
        let state = self
            .enrollment
            .drive(self.session.relay(), &self.checkpoints)
            .await?;
        if state != EnrollmentState::Trusted {
            return Err(AuthError::EnrollmentFailed);
        }
        self.session.signals().emit(Signal::Login);
        self.login
            .drive(self.session.relay(), &self.checkpoints)
            .await
    }

    /// Verifies store access for a new actor, at most once per flow run.
    async fn ensure_access(&mut self) -> Result<(), AuthError> {
        let store_id = self.effective_store_id()?;
        if !self.redeem_attempted {
            // latch set before the side-effecting call, never after
            self.redeem_attempted = true;
            let address = self
                .session
                .wallet()
                .map(|b| b.address())
                .ok_or_else(|| AuthError::invalid_input("wallet", "not bound"))?;
            let secret = self
                .session
                .invite_secret()
                .ok_or_else(|| AuthError::invalid_input("invite_secret", "missing"))?;
            let verifier =
                AccessVerifier::new(self.session.chain(), store_id, self.config.min_access_level);
            let grant = verifier.redeem_and_check_access(secret, address).await?;
            self.access = Some(grant);
        }
        match self.access {
            Some(AccessGrant { granted: true }) => Ok(()),
            _ => Err(AuthError::AccessDenied {
                store_id,
                required: self.config.min_access_level,
            }),
        }
    }

    /// Store id to verify against: a checkpoint override wins over config.
    fn effective_store_id(&self) -> Result<B256, AuthError> {
        Ok(self
            .checkpoints
            .store_id_override()?
            .unwrap_or(self.config.store_id))
    }

    /// Marks the run terminal and clears the single-attempt pending marker.
    fn conclude(&mut self, status: FlowStatus) {
        if self.status() == FlowStatus::Pending {
            self.status_tx.send_replace(status);
            tracing::info!(run_id = %self.run_id, %status, "flow concluded");
        }
        // the pending marker never survives a concluded flow
        if let Err(e) = self.checkpoints.clear_pending() {
            tracing::warn!(error = %e, "failed to clear pending keycard marker");
        }
    }
}
