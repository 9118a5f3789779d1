use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::config::AppConfig;
use crate::database::Database;
use crate::error::RequestError;
use crate::models::ErrorType;
use crate::sources::MockContentSource;
use crate::stores::{ContentStore, ErrorStore, LoadOutcome, PreferencesStore, SessionFlags};
use crate::traits::{ContentSource, SecureStorage};

/// Loading key used while content is being refreshed
pub const CONTENT_LOADING_KEY: &str = "content";

/// The app's stores, created once at start-up and handed to every screen
#[derive(Clone)]
pub struct PitchLink {
    storage: Arc<dyn SecureStorage>,
    content: ContentStore,
    preferences: PreferencesStore,
    errors: ErrorStore,
    session: SessionFlags,
}

impl PitchLink {
    /// Open the SQLite secure store and wire the mock content source
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let database = Database::new(&config.database_url)
            .await
            .with_context(|| format!("opening secure store at {}", config.database_url))?;
        let source = MockContentSource::new(config.mock_latency);

        Ok(Self::with_parts(config, Arc::new(database), Arc::new(source)))
    }

    pub fn with_parts(
        config: &AppConfig,
        storage: Arc<dyn SecureStorage>,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        let preferences = PreferencesStore::new(
            storage.clone(),
            config.keys.preferences.clone(),
            config.storage_timeout,
        );
        let session = SessionFlags::new(
            storage.clone(),
            config.keys.clone(),
            config.storage_timeout,
        );

        Self {
            storage,
            content: ContentStore::new(source),
            preferences,
            errors: ErrorStore::new(config.error_dismiss_delay),
            session,
        }
    }

    /// Restore preferences, then fetch the first batch of content
    pub async fn initialize(&self) -> Result<()> {
        self.preferences.initialize().await;
        self.refresh_content().await
    }

    /// Reload content, reporting a failure through the error store.
    ///
    /// The `"content"` loading key mirrors `ContentState::is_loading`, so a
    /// superseded refresh leaves it set while the newer one is running.
    pub async fn refresh_content(&self) -> Result<()> {
        self.errors.set_loading(CONTENT_LOADING_KEY, true);

        let outcome = self.content.load_content().await;
        let applied = outcome == LoadOutcome::Applied;

        let result = self
            .errors
            .with_error_handling(
                async move {
                    match outcome {
                        LoadOutcome::Failed(message) => {
                            Err(anyhow!(RequestError::Network(message)))
                        }
                        LoadOutcome::Applied | LoadOutcome::Superseded => Ok(()),
                    }
                },
                ErrorType::Network,
            )
            .await;

        self.errors.set_loading_from(CONTENT_LOADING_KEY, || {
            self.content.snapshot().is_loading
        });

        if applied {
            let state = self.content.snapshot();
            info!(
                "Content refreshed: {} articles, {} live matches",
                state.articles.len(),
                state.live_matches.len()
            );
        }
        result
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    pub fn errors(&self) -> &ErrorStore {
        &self.errors
    }

    pub fn session(&self) -> &SessionFlags {
        &self.session
    }

    /// Release storage; the stores must not be used afterwards
    pub async fn dispose(&self) {
        info!("Shutting down PitchLink stores");
        self.errors.clear_loading();
        self.storage.close().await;
    }
}
