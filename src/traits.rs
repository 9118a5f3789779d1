//! Traits and interfaces for the external collaborators of the stores

use anyhow::Result;
use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::ContentBundle;

/// Secure key-value storage holding JSON-encoded snapshots
#[async_trait]
pub trait SecureStorage: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// # Returns
    /// * `StorageResult<Option<String>>` - The value, `None` when absent
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Release the resources held by the backend
    async fn close(&self) {}
}

/// Provider of editorial and live-match content
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Display name used in logs
    fn name(&self) -> &str;

    /// Fetch a complete content bundle
    ///
    /// # Returns
    /// * `Result<ContentBundle>` - Articles and live data, or the fetch error
    async fn fetch_content(&self) -> Result<ContentBundle>;
}
