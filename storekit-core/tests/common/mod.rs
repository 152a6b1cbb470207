//! Shared mock collaborators for the flow integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use secrecy::SecretString;

use storekit_core::checkpoint::{KeycardCheckpoints, MemoryCheckpointStore};
use storekit_core::{
    AuthError, AuthFlow, ChainClient, ReceiptStatus, RelayClient, RelaySignals, SessionContext,
    StoreConfig, TransactionRef, WalletBinding, WalletConnector,
};

/// Wallet address every test binds.
pub const WALLET: Address = Address::repeat_byte(0x11);

/// Store id every test configures.
pub const STORE_ID: B256 = B256::repeat_byte(0x01);

/// Chain client scripted per test.
pub struct MockChain {
    receipt: ReceiptStatus,
    has_access: bool,
    redeem_calls: AtomicUsize,
    access_checks: AtomicUsize,
    last_store_id: Mutex<Option<B256>>,
}

impl MockChain {
    fn new(receipt: ReceiptStatus, has_access: bool) -> Arc<Self> {
        Arc::new(Self {
            receipt,
            has_access,
            redeem_calls: AtomicUsize::new(0),
            access_checks: AtomicUsize::new(0),
            last_store_id: Mutex::new(None),
        })
    }

    /// Redemption finalizes and the registry grants access.
    pub fn granting() -> Arc<Self> {
        Self::new(ReceiptStatus::Success, true)
    }

    /// The redemption transaction reverts.
    pub fn reverting() -> Arc<Self> {
        Self::new(ReceiptStatus::Reverted, true)
    }

    /// Redemption finalizes but the access level is below threshold.
    pub fn denying() -> Arc<Self> {
        Self::new(ReceiptStatus::Success, false)
    }

    pub fn redeem_calls(&self) -> usize {
        self.redeem_calls.load(Ordering::SeqCst)
    }

    pub fn access_checks(&self) -> usize {
        self.access_checks.load(Ordering::SeqCst)
    }

    pub fn last_store_id(&self) -> Option<B256> {
        *self.last_store_id.lock().unwrap()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn redeem_invite_secret(
        &self,
        _secret: &SecretString,
        _address: Address,
    ) -> Result<TransactionRef, AuthError> {
        self.redeem_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionRef(B256::repeat_byte(0xee)))
    }

    async fn wait_for_receipt(&self, _tx: TransactionRef) -> Result<ReceiptStatus, AuthError> {
        Ok(self.receipt)
    }

    async fn has_at_least_access(
        &self,
        store_id: B256,
        _address: Address,
        _min_level: u64,
    ) -> Result<bool, AuthError> {
        self.access_checks.fetch_add(1, Ordering::SeqCst);
        *self.last_store_id.lock().unwrap() = Some(store_id);
        Ok(self.has_access)
    }
}

/// How a scripted login attempt resolves.
#[derive(Debug, Clone, Copy)]
pub enum LoginOutcome {
    Accept,
    Reject,
    TransportError,
}

/// Relay client scripted per test; outcomes are adjustable between runs.
pub struct MockRelay {
    enroll_ok: Mutex<bool>,
    login_outcome: Mutex<LoginOutcome>,
    enroll_calls: AtomicUsize,
    login_calls: AtomicUsize,
}

impl MockRelay {
    /// Accepts enrollment and login.
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            enroll_ok: Mutex::new(true),
            login_outcome: Mutex::new(LoginOutcome::Accept),
            enroll_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_enroll_ok(&self, ok: bool) {
        *self.enroll_ok.lock().unwrap() = ok;
    }

    pub fn set_login_outcome(&self, outcome: LoginOutcome) {
        *self.login_outcome.lock().unwrap() = outcome;
    }

    pub fn enroll_calls(&self) -> usize {
        self.enroll_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayClient for MockRelay {
    async fn enroll_keycard(&self) -> Result<bool, AuthError> {
        self.enroll_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.enroll_ok.lock().unwrap())
    }

    async fn login(&self) -> Result<bool, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        match *self.login_outcome.lock().unwrap() {
            LoginOutcome::Accept => Ok(true),
            LoginOutcome::Reject => Ok(false),
            LoginOutcome::TransportError => Err(AuthError::relay("connection reset")),
        }
    }
}

/// Connector whose single attempt always fails.
pub struct FailingConnector;

#[async_trait]
impl WalletConnector for FailingConnector {
    async fn connect(&self, provider_id: &str) -> Result<WalletBinding, AuthError> {
        Err(AuthError::ConnectionFailed {
            provider: provider_id.to_string(),
        })
    }
}

/// Builds a flow with the wallet already bound and an optional invite secret.
pub fn flow_with(
    chain: Arc<MockChain>,
    relay: Arc<MockRelay>,
    store: Arc<MemoryCheckpointStore>,
    invite_secret: Option<&str>,
) -> AuthFlow {
    let mut session = SessionContext::new(chain, relay, RelaySignals::new());
    session
        .bind_wallet(WalletBinding::connected(WALLET))
        .unwrap();
    if let Some(secret) = invite_secret {
        session.set_invite_secret(SecretString::from(secret.to_string()));
    }
    AuthFlow::new(session, StoreConfig::new(STORE_ID), store)
}

/// Typed marker view over a test's checkpoint store.
pub fn checkpoints(store: &Arc<MemoryCheckpointStore>) -> KeycardCheckpoints {
    let store: Arc<dyn storekit_core::checkpoint::CheckpointStore> = store.clone();
    KeycardCheckpoints::new(store)
}
