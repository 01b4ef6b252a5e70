use std::sync::{Arc, Mutex};

use crate::error::StorageError;

/// Durable home of the serialized app state.
///
/// Implementations store one opaque JSON document; versioning and
/// decoding happen in [`super::PersistedState`].
pub trait StateStore {
    /// Returns `None` when nothing has been saved yet.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn load_raw(&self) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn save_raw(&self, document: &str) -> Result<(), StorageError>;
}

/// In-process store. Clones share the same slot, so a test can keep one
/// clone to inspect what the app wrote through the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `document`.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(document.into()))),
        }
    }
}

impl StateStore for MemoryStore {
    fn load_raw(&self) -> Result<Option<String>, StorageError> {
        let slot = self.slot.lock().map_err(|_| StorageError::Locked)?;
        Ok(slot.clone())
    }

    fn save_raw(&self, document: &str) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().map_err(|_| StorageError::Locked)?;
        *slot = Some(document.to_string());
        Ok(())
    }
}
