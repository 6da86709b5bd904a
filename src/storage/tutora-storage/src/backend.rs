//! Storage backend trait definition.

use crate::error::StorageError;

/// Session-scoped string storage.
///
/// Mirrors the browser `sessionStorage` surface. All operations are
/// synchronous so identity can be hydrated in a single step.
pub trait SessionStorage: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Set a value for a key, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Check if a key exists.
    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}
