//! Onboarding and sign-in flags kept alongside the preferences blob

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::StorageKeys;
use crate::database::bounded;
use crate::traits::SecureStorage;

const TRUE: &str = "true";

/// Boolean flags persisted in secure storage.
///
/// The auth provider owns tokens; this only remembers whether a session
/// exists so the app can pick its first screen.
#[derive(Clone)]
pub struct SessionFlags {
    storage: Arc<dyn SecureStorage>,
    keys: StorageKeys,
    timeout: Duration,
}

impl SessionFlags {
    pub fn new(storage: Arc<dyn SecureStorage>, keys: StorageKeys, timeout: Duration) -> Self {
        Self {
            storage,
            keys,
            timeout,
        }
    }

    pub async fn has_completed_onboarding(&self) -> bool {
        self.read_flag(&self.keys.onboarding_complete).await
    }

    pub async fn mark_onboarding_complete(&self) -> bool {
        self.write_flag(&self.keys.onboarding_complete, true).await
    }

    pub async fn reset_onboarding(&self) -> bool {
        self.write_flag(&self.keys.onboarding_complete, false).await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.read_flag(&self.keys.auth_state).await
    }

    pub async fn set_authenticated(&self, authenticated: bool) -> bool {
        self.write_flag(&self.keys.auth_state, authenticated).await
    }

    async fn read_flag(&self, key: &str) -> bool {
        match bounded(key, self.timeout, self.storage.get(key)).await {
            Ok(value) => value.as_deref() == Some(TRUE),
            Err(err) => {
                error!("Error reading {}: {}", key, err);
                false
            }
        }
    }

    async fn write_flag(&self, key: &str, value: bool) -> bool {
        let result = if value {
            bounded(key, self.timeout, self.storage.set(key, TRUE)).await
        } else {
            bounded(key, self.timeout, self.storage.delete(key)).await
        };

        match result {
            Ok(()) => {
                info!("{} set to {}", key, value);
                true
            }
            Err(err) => {
                error!("Error writing {}: {}", key, err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::database::MemoryStorage;
    use crate::error::StorageResult;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Storage that never answers
    struct StalledStorage;

    #[async_trait]
    impl SecureStorage for StalledStorage {
        async fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            std::future::pending().await
        }

        async fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> StorageResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_flags_default_to_false_and_persist() {
        let storage = Arc::new(MemoryStorage::new());
        let flags = SessionFlags::new(storage.clone(), StorageKeys::default(), TIMEOUT);

        assert!(!flags.has_completed_onboarding().await);
        assert!(!flags.is_authenticated().await);

        assert!(flags.mark_onboarding_complete().await);
        assert!(flags.set_authenticated(true).await);

        let reopened = SessionFlags::new(storage.clone(), StorageKeys::default(), TIMEOUT);
        assert!(reopened.has_completed_onboarding().await);
        assert!(reopened.is_authenticated().await);

        assert!(reopened.set_authenticated(false).await);
        assert!(reopened.reset_onboarding().await);
        assert!(!reopened.is_authenticated().await);
        assert!(storage.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_storage_reports_false_after_timeout() {
        let flags = SessionFlags::new(
            Arc::new(StalledStorage),
            StorageKeys::default(),
            Duration::from_millis(100),
        );
        let started = tokio::time::Instant::now();

        assert!(!flags.is_authenticated().await);
        assert!(!flags.has_completed_onboarding().await);
        assert!(!flags.mark_onboarding_complete().await);
        assert!(!flags.set_authenticated(false).await);

        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
