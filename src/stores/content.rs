//! Editorial and live-match content with free, premium and personalized views

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::{Article, ContentState, FreeContent, PersonalizedContent};
use crate::traits::ContentSource;

/// What happened to a `load_content` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetched content replaced the previous content
    Applied,
    /// The fetch failed; `ContentState::error` holds the message
    Failed(String),
    /// A newer load was started before this one finished; its result was dropped
    Superseded,
}

struct ContentInner {
    source: Arc<dyn ContentSource>,
    state: watch::Sender<ContentState>,
    /// Generation of the most recently issued load
    generation: AtomicU64,
}

/// Store for fetched content.
///
/// Loads are tagged with a generation number; only the newest issued load
/// may write its result, so a slow stale load never overwrites fresher data.
#[derive(Clone)]
pub struct ContentStore {
    inner: Arc<ContentInner>,
}

impl ContentStore {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        let (state, _) = watch::channel(ContentState::default());
        Self {
            inner: Arc::new(ContentInner {
                source,
                state,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> ContentState {
        self.inner.state.borrow().clone()
    }

    /// Receive a notification after every visible state change
    pub fn subscribe(&self) -> watch::Receiver<ContentState> {
        self.inner.state.subscribe()
    }

    pub async fn load_content(&self) -> LoadOutcome {
        // Bump and flag write share the channel lock with the commit below
        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.is_loading = true;
            state.error = None;
        });

        let result = self.inner.source.fetch_content().await;

        let mut outcome = LoadOutcome::Superseded;
        self.inner.state.send_if_modified(|state| {
            if self.inner.generation.load(Ordering::SeqCst) != generation {
                return false;
            }

            match &result {
                Ok(bundle) => {
                    state.articles = bundle.articles.clone();
                    state.live_matches = bundle.live_matches.clone();
                    state.live_scores = bundle.live_scores.clone();
                    state.last_updated = Some(Utc::now());
                    state.error = None;
                    outcome = LoadOutcome::Applied;
                }
                Err(err) => {
                    let message = format!("Failed to load content: {err}");
                    state.error = Some(message.clone());
                    outcome = LoadOutcome::Failed(message);
                }
            }
            state.is_loading = false;
            true
        });

        match &outcome {
            LoadOutcome::Applied => info!(
                "Loaded {} articles from {} source",
                self.inner.state.borrow().articles.len(),
                self.inner.source.name()
            ),
            LoadOutcome::Failed(message) => warn!("{}", message),
            LoadOutcome::Superseded => {
                debug!("Discarding content load #{} superseded by a newer load", generation);
            }
        }

        outcome
    }

    /// Articles that are not premium, plus the live score ticker
    pub fn get_free_content(&self) -> FreeContent {
        let state = self.inner.state.borrow();
        FreeContent {
            articles: state
                .articles
                .iter()
                .filter(|article| !article.is_premium)
                .cloned()
                .collect(),
            live_scores: state.live_scores.clone(),
        }
    }

    pub fn get_premium_content(&self) -> Vec<Article> {
        self.inner
            .state
            .borrow()
            .articles
            .iter()
            .filter(|article| article.is_premium)
            .cloned()
            .collect()
    }

    /// Everything currently loaded.
    ///
    /// Preference-based filtering is not applied here yet.
    pub fn get_personalized_content(&self) -> PersonalizedContent {
        let state = self.inner.state.borrow();
        PersonalizedContent {
            articles: state.articles.clone(),
            live_matches: state.live_matches.clone(),
            live_scores: state.live_scores.clone(),
        }
    }

    /// Reset content fields. An in-flight load is not cancelled and may
    /// repopulate the store when it completes.
    pub fn clear_content(&self) {
        self.inner.state.send_modify(|state| {
            state.articles.clear();
            state.live_matches.clear();
            state.live_scores.clear();
            state.error = None;
            state.last_updated = None;
        });
    }
}
