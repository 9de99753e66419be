//! String storage contract
//!
//! What higher layers (such as [`crate::mailbox`]) depend on, so they can be
//! driven by the [`crate::Engine`] or by any other string store.

use async_trait::async_trait;

use crate::error::Result;

/// Arbitrary-length string storage under string keys
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value under `key`
    ///
    /// Returns `Ok(None)` when the key is absent; errors are reserved for
    /// failed operations.
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Make `key` absent. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Whether `key` currently holds a non-empty value
    async fn key_exists(&self, key: &str) -> Result<bool>;
}
