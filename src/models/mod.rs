//! Data models for editorial content, live matches and user preferences

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod errors;

pub use errors::{ErrorDetails, ErrorRecord, ErrorSeverity, ErrorType};

/// Maximum length of `ContentInteractions::recent_categories`
pub const MAX_RECENT_CATEGORIES: usize = 10;

/// An editorial article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub image_url: String,
    pub published_at: DateTime<Utc>,
    pub category: String,
    pub read_time_label: String,
    pub is_premium: bool,
    pub content: String,
}

/// A match as shown in the live centre and the score ticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMatch {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    /// `None` until kick-off
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub status: String,
    pub competition: String,
    pub is_live: bool,
}

/// Score ticker entries share the live match shape
pub type LiveScore = LiveMatch;

/// Everything a single content fetch returns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBundle {
    pub articles: Vec<Article>,
    pub live_matches: Vec<LiveMatch>,
    pub live_scores: Vec<LiveScore>,
}

/// Observable state of the content store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentState {
    pub articles: Vec<Article>,
    pub live_matches: Vec<LiveMatch>,
    pub live_scores: Vec<LiveScore>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Content visible without a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct FreeContent {
    pub articles: Vec<Article>,
    pub live_scores: Vec<LiveScore>,
}

/// Content offered on the personalized feed
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizedContent {
    pub articles: Vec<Article>,
    pub live_matches: Vec<LiveMatch>,
    pub live_scores: Vec<LiveScore>,
}

/// A football club a user can follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Club {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            short_name: None,
            logo_url: None,
        }
    }
}

/// Push notification switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub live_match_alerts: bool,
    pub news_updates: bool,
    pub club_news_updates: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            live_match_alerts: true,
            news_updates: true,
            club_news_updates: true,
        }
    }
}

/// Partial update for `NotificationSettings`; `None` keeps the current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationSettingsPatch {
    pub live_match_alerts: Option<bool>,
    pub news_updates: Option<bool>,
    pub club_news_updates: Option<bool>,
}

impl NotificationSettings {
    pub fn apply(&mut self, patch: NotificationSettingsPatch) {
        if let Some(value) = patch.live_match_alerts {
            self.live_match_alerts = value;
        }
        if let Some(value) = patch.news_updates {
            self.news_updates = value;
        }
        if let Some(value) = patch.club_news_updates {
            self.club_news_updates = value;
        }
    }
}

/// Reading activity used for personalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentInteractions {
    pub articles_read: u32,
    pub last_active_date: Option<DateTime<Utc>>,
    /// Newest first, unique, at most `MAX_RECENT_CATEGORIES` entries
    pub recent_categories: Vec<String>,
}

/// Partial update for `ContentInteractions`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentInteractionsPatch {
    pub articles_read: Option<u32>,
    /// Category of the content just viewed
    pub category: Option<String>,
}

impl ContentInteractionsPatch {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            articles_read: None,
            category: Some(category.into()),
        }
    }
}

impl ContentInteractions {
    /// Merge `patch` and stamp the activity time.
    ///
    /// A category is only inserted when it is not in the list at all; a
    /// category seen before keeps its existing position.
    pub fn apply(&mut self, patch: ContentInteractionsPatch, now: DateTime<Utc>) {
        if let Some(articles_read) = patch.articles_read {
            self.articles_read = articles_read;
        }
        self.last_active_date = Some(now);

        if let Some(category) = patch.category
            && !self.recent_categories.contains(&category)
        {
            self.recent_categories.insert(0, category);
            self.recent_categories.truncate(MAX_RECENT_CATEGORIES);
        }
    }
}

/// The durable part of the user's preferences, persisted as one JSON blob.
///
/// Missing fields in a stored blob fall back to their defaults, so older
/// snapshots merge over `Preferences::default()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub favorite_club: Option<Club>,
    pub preferred_categories: BTreeSet<String>,
    pub preferred_competitions: BTreeSet<String>,
    pub content_language: String,
    pub notification_settings: NotificationSettings,
    pub content_interactions: ContentInteractions,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            favorite_club: None,
            preferred_categories: BTreeSet::new(),
            preferred_competitions: BTreeSet::new(),
            content_language: "en".to_string(),
            notification_settings: NotificationSettings::default(),
            content_interactions: ContentInteractions::default(),
        }
    }
}

impl Preferences {
    /// Derived from `favorite_club`, so it can never disagree with it
    pub fn has_selected_club(&self) -> bool {
        self.favorite_club.is_some()
    }
}

/// Partial update for the list and language preferences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub preferred_categories: Option<BTreeSet<String>>,
    pub preferred_competitions: Option<BTreeSet<String>>,
    pub content_language: Option<String>,
}

impl Preferences {
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(categories) = patch.preferred_categories {
            self.preferred_categories = categories;
        }
        if let Some(competitions) = patch.preferred_competitions {
            self.preferred_competitions = competitions;
        }
        if let Some(language) = patch.content_language {
            self.content_language = language;
        }
    }
}

/// Observable state of the preferences store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPreferencesState {
    /// Set once the first load attempt has finished, never reset
    pub is_ready: bool,
    pub is_loading: bool,
    pub preferences: Preferences,
}

impl UserPreferencesState {
    pub fn favorite_club(&self) -> Option<&Club> {
        self.preferences.favorite_club.as_ref()
    }

    pub fn has_selected_club(&self) -> bool {
        self.preferences.has_selected_club()
    }
}

/// Filters handed to content queries. Empty criteria are omitted entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonalizedFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clubs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitions: Option<Vec<String>>,
}
