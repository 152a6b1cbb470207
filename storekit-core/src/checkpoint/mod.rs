//! Durable checkpoint storage for enrollment and session markers.
//!
//! The flow persists small string markers that must survive process
//! restarts: the enrolled keycard credential, the keycard pending
//! enrollment, and an optional store-id override. The storage medium is
//! abstracted behind [`CheckpointStore`] so the orchestration logic is
//! independent of where the markers live:
//!
//! - [`MemoryCheckpointStore`] — `HashMap`-backed, for tests and ephemeral
//!   sessions
//! - [`FileCheckpointStore`] — JSON snapshot on disk with atomic
//!   replace-on-write, for on-device persistence

mod file;
mod memory;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

use std::fmt;
use std::sync::Arc;

use alloy_primitives::B256;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::AuthError;

/// Checkpoint key holding the enrolled keycard credential identifier.
pub const ENROLLED_KEYCARD_KEY: &str = "keycard";

/// Checkpoint key holding the keycard pending enrollment.
pub const PENDING_KEYCARD_KEY: &str = "keycard_to_enroll";

/// Checkpoint key overriding the configured store identifier.
pub const STORE_ID_KEY: &str = "store_id";

/// Durable key/value store surviving process restarts.
///
/// Writes are last-writer-wins with no transactional coupling to in-flight
/// network operations; the flow accepts eventual, not atomic, consistency
/// between persisted markers and remote state.
pub trait CheckpointStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// Stores `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;

    /// Removes the value stored under `key`.
    ///
    /// Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), AuthError>;
}

/// Opaque identifier of a keycard credential.
///
/// The flow never interprets the contents; it only persists, promotes and
/// clears the marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeycardId(String);

impl KeycardId {
    /// Wraps an identifier issued elsewhere (e.g. a keypair's public key).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidInput`] if `id` is empty.
    pub fn new<S: Into<String>>(id: S) -> Result<Self, AuthError> {
        let id = id.into();
        if id.is_empty() {
            return Err(AuthError::invalid_input("keycard_id", "must not be empty"));
        }
        Ok(Self(id))
    }

    /// Mints a fresh random keycard identifier.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeycardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed view over the keycard markers in a checkpoint store.
#[derive(Clone)]
pub struct KeycardCheckpoints {
    store: Arc<dyn CheckpointStore>,
}

impl KeycardCheckpoints {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    /// The enrolled keycard marker, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn enrolled(&self) -> Result<Option<KeycardId>, AuthError> {
        Ok(self
            .store
            .get(ENROLLED_KEYCARD_KEY)?
            .filter(|v| !v.is_empty())
            .map(KeycardId))
    }

    /// Persists `id` as the enrolled keycard marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    pub fn set_enrolled(&self, id: &KeycardId) -> Result<(), AuthError> {
        self.store.set(ENROLLED_KEYCARD_KEY, id.as_str())
    }

    /// Removes the enrolled keycard marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    pub fn clear_enrolled(&self) -> Result<(), AuthError> {
        self.store.remove(ENROLLED_KEYCARD_KEY)
    }

    /// The keycard pending enrollment, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn pending(&self) -> Result<Option<KeycardId>, AuthError> {
        Ok(self
            .store
            .get(PENDING_KEYCARD_KEY)?
            .filter(|v| !v.is_empty())
            .map(KeycardId))
    }

    /// Persists `id` as the keycard pending enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    pub fn set_pending(&self, id: &KeycardId) -> Result<(), AuthError> {
        self.store.set(PENDING_KEYCARD_KEY, id.as_str())
    }

    /// Removes the pending keycard marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    pub fn clear_pending(&self) -> Result<(), AuthError> {
        self.store.remove(PENDING_KEYCARD_KEY)
    }

    /// Promotes the pending marker to the enrolled marker and removes it.
    ///
    /// Returns the promoted identifier, or `None` if nothing was pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn promote_pending(&self) -> Result<Option<KeycardId>, AuthError> {
        match self.pending()? {
            Some(id) => {
                self.set_enrolled(&id)?;
                self.clear_pending()?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Store-id override persisted by the host session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the persisted value
    /// is not a valid 32-byte hex identifier.
    pub fn store_id_override(&self) -> Result<Option<B256>, AuthError> {
        match self.store.get(STORE_ID_KEY)? {
            Some(raw) => raw
                .parse::<B256>()
                .map(Some)
                .map_err(|e| AuthError::checkpoint(format!("invalid store id override: {e}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keycard_id_rejects_empty() {
        assert!(matches!(
            KeycardId::new(""),
            Err(AuthError::InvalidInput { .. })
        ));
        assert_eq!(KeycardId::new("0xabc").unwrap().as_str(), "0xabc");
    }

    #[test]
    fn test_keycard_id_random_is_hex() {
        let id = KeycardId::random();
        assert!(id.as_str().starts_with("0x"));
        assert_eq!(id.as_str().len(), 66);
        assert_ne!(id, KeycardId::random());
    }

    #[test]
    fn test_promote_pending_moves_marker() {
        let checkpoints = KeycardCheckpoints::new(Arc::new(MemoryCheckpointStore::new()));
        assert!(checkpoints.promote_pending().unwrap().is_none());

        let id = KeycardId::random();
        checkpoints.set_pending(&id).unwrap();
        let promoted = checkpoints.promote_pending().unwrap().unwrap();
        assert_eq!(promoted, id);
        assert_eq!(checkpoints.enrolled().unwrap(), Some(id));
        assert!(checkpoints.pending().unwrap().is_none());
    }

    #[test]
    fn test_store_id_override_parses_hex() {
        let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
        let checkpoints = KeycardCheckpoints::new(Arc::clone(&store));
        assert!(checkpoints.store_id_override().unwrap().is_none());

        let id = B256::repeat_byte(0x5a);
        store.set(STORE_ID_KEY, &id.to_string()).unwrap();
        assert_eq!(checkpoints.store_id_override().unwrap(), Some(id));

        store.set(STORE_ID_KEY, "not-hex").unwrap();
        assert!(matches!(
            checkpoints.store_id_override(),
            Err(AuthError::Checkpoint(_))
        ));
    }
}
