//! User personalization settings persisted to secure storage
//!
//! Every mutator follows the same sequence under the store's mutation lock:
//! build the next snapshot from the committed one, write the whole snapshot
//! to storage, and only then publish it to observers. A failed write leaves
//! memory untouched and is reported as `false`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

use crate::database::bounded;
use crate::error::StorageResult;
use crate::models::{
    Club, ContentInteractionsPatch, NotificationSettingsPatch, PersonalizedFilters, Preferences,
    PreferencesPatch, UserPreferencesState,
};
use crate::traits::SecureStorage;

struct PreferencesInner {
    storage: Arc<dyn SecureStorage>,
    key: String,
    timeout: Duration,
    state: watch::Sender<UserPreferencesState>,
    /// Serializes read-modify-persist-commit sequences
    mutation: Mutex<()>,
}

pub struct PreferencesStore {
    inner: Arc<PreferencesInner>,
}

impl PreferencesStore {
    pub fn new(storage: Arc<dyn SecureStorage>, key: impl Into<String>, timeout: Duration) -> Self {
        let (state, _) = watch::channel(UserPreferencesState::default());
        Self {
            inner: Arc::new(PreferencesInner {
                storage,
                key: key.into(),
                timeout,
                state,
                mutation: Mutex::new(()),
            }),
        }
    }

    pub fn snapshot(&self) -> UserPreferencesState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserPreferencesState> {
        self.inner.state.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().is_ready
    }

    /// Load persisted preferences.
    ///
    /// Always finishes with `is_ready == true`. Returns whether a stored
    /// snapshot was restored; missing or unreadable data keeps the defaults.
    pub async fn initialize(&self) -> bool {
        let _guard = self.inner.mutation.lock().await;

        if self.inner.state.borrow().is_ready {
            warn!("Preferences store already initialized, ignoring repeated initialize");
            return false;
        }

        self.inner.state.send_modify(|state| state.is_loading = true);

        let inner = &self.inner;
        let restored = match bounded(&inner.key, inner.timeout, inner.storage.get(&inner.key)).await {
            Ok(Some(raw)) => match serde_json::from_str::<Preferences>(&raw) {
                Ok(preferences) => Some(preferences),
                Err(err) => {
                    warn!("Stored preferences are unreadable, using defaults: {}", err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                error!("Error loading user preferences: {}", err);
                None
            }
        };

        let found = restored.is_some();
        self.inner.state.send_modify(|state| {
            if let Some(preferences) = restored {
                state.preferences = preferences;
            }
            state.is_ready = true;
            state.is_loading = false;
        });

        info!(
            "Preferences store ready ({})",
            if found { "restored" } else { "defaults" }
        );
        found
    }

    /// Set or clear the followed club
    pub async fn set_favorite_club(&self, club: Option<Club>) -> bool {
        self.mutate("set favorite club", |preferences| {
            preferences.favorite_club = club;
        })
        .await
    }

    /// Record reading activity; always refreshes `last_active_date`
    pub async fn update_content_interactions(&self, patch: ContentInteractionsPatch) -> bool {
        self.mutate("update content interactions", |preferences| {
            preferences.content_interactions.apply(patch, Utc::now());
        })
        .await
    }

    /// Count one more article read in `category`
    pub async fn record_article_read(&self, category: impl Into<String>) -> bool {
        let category = category.into();
        self.mutate("record article read", |preferences| {
            let interactions = &mut preferences.content_interactions;
            let patch = ContentInteractionsPatch {
                articles_read: Some(interactions.articles_read.saturating_add(1)),
                category: Some(category),
            };
            interactions.apply(patch, Utc::now());
        })
        .await
    }

    pub async fn update_notification_settings(&self, patch: NotificationSettingsPatch) -> bool {
        self.mutate("update notification settings", |preferences| {
            preferences.notification_settings.apply(patch);
        })
        .await
    }

    /// Replace preferred categories, competitions or language
    pub async fn update_preferences(&self, patch: PreferencesPatch) -> bool {
        self.mutate("update preferences", |preferences| {
            preferences.apply(patch);
        })
        .await
    }

    /// Filters for content queries, leaving out criteria the user hasn't set
    pub fn get_personalized_filters(&self) -> PersonalizedFilters {
        let state = self.inner.state.borrow();
        let preferences = &state.preferences;

        PersonalizedFilters {
            clubs: preferences
                .favorite_club
                .as_ref()
                .map(|club| vec![club.id.clone()]),
            categories: (!preferences.preferred_categories.is_empty())
                .then(|| preferences.preferred_categories.iter().cloned().collect()),
            competitions: (!preferences.preferred_competitions.is_empty())
                .then(|| preferences.preferred_competitions.iter().cloned().collect()),
        }
    }

    /// Delete the stored snapshot and fall back to defaults.
    ///
    /// `is_ready` and `is_loading` are left as they are.
    pub async fn clear_preferences(&self) -> bool {
        let _guard = self.inner.mutation.lock().await;

        let inner = &self.inner;
        if let Err(err) = bounded(&inner.key, inner.timeout, inner.storage.delete(&inner.key)).await {
            error!("Error clearing preferences: {}", err);
            return false;
        }

        self.inner.state.send_modify(|state| {
            state.preferences = Preferences::default();
        });
        info!("User preferences cleared");
        true
    }

    async fn mutate(&self, action: &str, change: impl FnOnce(&mut Preferences)) -> bool {
        let _guard = self.inner.mutation.lock().await;

        let mut next = self.inner.state.borrow().preferences.clone();
        change(&mut next);

        if let Err(err) = self.persist(&next).await {
            error!("Failed to {}: {}", action, err);
            return false;
        }

        self.inner.state.send_if_modified(|state| {
            if state.preferences == next {
                return false;
            }
            state.preferences = next;
            true
        });
        true
    }

    async fn persist(&self, preferences: &Preferences) -> StorageResult<()> {
        let blob = serde_json::to_string(preferences)?;
        bounded(
            &self.inner.key,
            self.inner.timeout,
            self.inner.storage.set(&self.inner.key, &blob),
        )
        .await
    }
}

impl Clone for PreferencesStore {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::database::MemoryStorage;
    use crate::error::StorageError;

    const KEY: &str = "pitchlink_user_preferences";

    fn store_over(storage: Arc<dyn SecureStorage>) -> PreferencesStore {
        PreferencesStore::new(storage, KEY, Duration::from_secs(5))
    }

    /// Memory storage whose writes can be switched off
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl SecureStorage for FlakyStorage {
        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Database("disk full".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Database("disk full".to_string()));
            }
            self.inner.delete(key).await
        }
    }

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
    async fn test_favorite_club_survives_restart() {
        let storage: Arc<dyn SecureStorage> = Arc::new(MemoryStorage::new());
        let store = store_over(storage.clone());
        store.initialize().await;
        let club = Club::new("ars", "Arsenal");

        assert!(store.set_favorite_club(Some(club.clone())).await);

        let restarted = store_over(storage);
        assert!(restarted.initialize().await);
        let state = restarted.snapshot();
        assert_eq!(state.favorite_club(), Some(&club));
        assert!(state.has_selected_club());
        assert!(state.is_ready);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_clear_then_restart_yields_defaults() {
        let storage: Arc<dyn SecureStorage> = Arc::new(MemoryStorage::new());
        let store = store_over(storage.clone());
        store.initialize().await;
        store.set_favorite_club(Some(Club::new("fcb", "Barcelona"))).await;
        store
            .update_preferences(PreferencesPatch {
                preferred_categories: Some(BTreeSet::from(["News".to_string()])),
                ..Default::default()
            })
            .await;

        assert!(store.clear_preferences().await);
        assert!(store.is_ready());
        assert_eq!(store.snapshot().preferences, Preferences::default());

        let restarted = store_over(storage);
        assert!(!restarted.initialize().await);
        let state = restarted.snapshot();
        assert_eq!(state.favorite_club(), None);
        assert!(!state.has_selected_club());
        assert!(state.preferences.preferred_categories.is_empty());
        assert!(state.preferences.preferred_competitions.is_empty());
    }

    #[tokio::test]
    async fn test_recent_categories_capped_at_ten() {
        let store = store_over(Arc::new(MemoryStorage::new()));
        store.initialize().await;

        for i in 0..11 {
            assert!(
                store
                    .update_content_interactions(ContentInteractionsPatch::category(format!("cat-{i}")))
                    .await
            );
        }

        let interactions = store.snapshot().preferences.content_interactions;
        assert_eq!(interactions.recent_categories.len(), 10);
        assert_eq!(interactions.recent_categories[0], "cat-10");
        assert_eq!(interactions.recent_categories[9], "cat-1");
        assert!(!interactions.recent_categories.contains(&"cat-0".to_string()));
        assert!(interactions.last_active_date.is_some());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_untouched() {
        let storage = Arc::new(FlakyStorage::default());
        let store = store_over(storage.clone());
        store.initialize().await;
        storage.fail_writes.store(true, Ordering::SeqCst);

        assert!(!store.set_favorite_club(Some(Club::new("ars", "Arsenal"))).await);
        assert!(
            !store
                .update_notification_settings(NotificationSettingsPatch {
                    live_match_alerts: Some(false),
                    ..Default::default()
                })
                .await
        );
        assert!(!store.clear_preferences().await);

        let state = store.snapshot();
        assert!(!state.has_selected_club());
        assert!(state.preferences.notification_settings.live_match_alerts);
    }

    #[tokio::test]
    async fn test_unreadable_blob_falls_back_to_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(KEY, "{not json").await.unwrap();
        let store = store_over(storage);

        assert!(!store.initialize().await);
        let state = store.snapshot();
        assert!(state.is_ready);
        assert_eq!(state.preferences, Preferences::default());
    }

    #[tokio::test]
    async fn test_concurrent_mutations_keep_every_field() {
        let storage: Arc<dyn SecureStorage> = Arc::new(MemoryStorage::new());
        let store = store_over(storage.clone());
        store.initialize().await;

        let (club, interactions, settings) = tokio::join!(
            store.set_favorite_club(Some(Club::new("ars", "Arsenal"))),
            store.record_article_read("News"),
            store.update_notification_settings(NotificationSettingsPatch {
                news_updates: Some(false),
                ..Default::default()
            }),
        );
        assert!(club && interactions && settings);

        let restarted = store_over(storage);
        restarted.initialize().await;
        let preferences = restarted.snapshot().preferences;
        assert_eq!(preferences.favorite_club.map(|c| c.id), Some("ars".to_string()));
        assert_eq!(preferences.content_interactions.articles_read, 1);
        assert_eq!(preferences.content_interactions.recent_categories, vec!["News"]);
        assert!(!preferences.notification_settings.news_updates);
    }

    #[tokio::test]
    async fn test_filters_omit_unset_criteria() {
        let store = store_over(Arc::new(MemoryStorage::new()));
        store.initialize().await;

        let empty = store.get_personalized_filters();
        assert_eq!(empty, PersonalizedFilters::default());
        assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");

        store.set_favorite_club(Some(Club::new("int", "Inter"))).await;
        store
            .update_preferences(PreferencesPatch {
                preferred_competitions: Some(BTreeSet::from(["Serie A".to_string()])),
                ..Default::default()
            })
            .await;

        let filters = store.get_personalized_filters();
        assert_eq!(filters.clubs, Some(vec!["int".to_string()]));
        assert_eq!(filters.categories, None);
        assert_eq!(filters.competitions, Some(vec!["Serie A".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_storage_times_out() {
        let store = PreferencesStore::new(Arc::new(StalledStorage), KEY, Duration::from_millis(100));

        assert!(!store.initialize().await);
        assert!(store.is_ready());
        assert!(!store.set_favorite_club(Some(Club::new("ars", "Arsenal"))).await);
        assert!(!store.snapshot().has_selected_club());
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let storage: Arc<dyn SecureStorage> = Arc::new(MemoryStorage::new());
        let store = store_over(storage.clone());
        store.initialize().await;
        store.set_favorite_club(Some(Club::new("ars", "Arsenal"))).await;

        storage.delete(KEY).await.unwrap();
        assert!(!store.initialize().await);
        assert!(store.snapshot().has_selected_club());
    }

    /// Memory storage that keeps every blob in the order it was written
    #[derive(Default)]
    struct RecordingStorage {
        inner: MemoryStorage,
        writes: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SecureStorage for RecordingStorage {
        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if let Ok(mut writes) = self.writes.lock() {
                writes.push(value.to_string());
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_active_date_follows_commit_order() {
        let storage = Arc::new(RecordingStorage::default());
        let store = store_over(storage.clone());
        store.initialize().await;

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.record_article_read(format!("cat-{}", i % 4)).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        let stamps: Vec<_> = storage
            .writes
            .lock()
            .unwrap()
            .iter()
            .map(|blob| {
                serde_json::from_str::<Preferences>(blob)
                    .unwrap()
                    .content_interactions
                    .last_active_date
                    .unwrap()
            })
            .collect();
        assert_eq!(stamps.len(), 32);
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(store.snapshot().preferences.content_interactions.articles_read, 32);
    }

    #[tokio::test]
    async fn test_subscribers_woken_only_by_committed_changes() {
        let storage = Arc::new(FlakyStorage::default());
        let store = store_over(storage.clone());
        store.initialize().await;
        let mut rx = store.subscribe();

        storage.fail_writes.store(true, Ordering::SeqCst);
        assert!(!store.set_favorite_club(Some(Club::new("ars", "Arsenal"))).await);
        assert!(!store.clear_preferences().await);
        assert!(!rx.has_changed().unwrap());

        storage.fail_writes.store(false, Ordering::SeqCst);
        assert!(store.set_favorite_club(Some(Club::new("ars", "Arsenal"))).await);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().has_selected_club());

        // Same value again: persisted, but nothing visible changed
        assert!(store.set_favorite_club(Some(Club::new("ars", "Arsenal"))).await);
        assert!(!rx.has_changed().unwrap());
    }
}
