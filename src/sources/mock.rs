//! Built-in content used until the editorial API is wired up

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tracing::info;

use crate::models::{Article, ContentBundle, LiveMatch};
use crate::traits::ContentSource;

/// Content source serving a fixed editorial and match catalogue
pub struct MockContentSource {
    latency: Duration,
    bundle: ContentBundle,
}

impl MockContentSource {
    /// Create a mock source with the default catalogue
    pub fn new(latency: Duration) -> Self {
        Self::with_bundle(latency, default_bundle())
    }

    pub fn with_bundle(latency: Duration, bundle: ContentBundle) -> Self {
        Self { latency, bundle }
    }
}

#[async_trait]
impl ContentSource for MockContentSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_content(&self) -> Result<ContentBundle> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        info!(
            "Serving {} articles and {} live matches from mock catalogue",
            self.bundle.articles.len(),
            self.bundle.live_matches.len()
        );
        Ok(self.bundle.clone())
    }
}

fn article(id: &str, title: &str, category: &str, minutes: u32, is_premium: bool, day: u32) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
        summary: format!("{title}: the key talking points."),
        image_url: format!("https://images.pitchlink.app/articles/{id}.jpg"),
        published_at: Utc
            .with_ymd_and_hms(2025, 3, day, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
        category: category.to_string(),
        read_time_label: format!("{minutes} min read"),
        is_premium,
        content: format!("{title}. Full coverage from the PitchLink newsroom."),
    }
}

fn fixture(
    id: &str,
    home: &str,
    away: &str,
    score: Option<(u32, u32)>,
    status: &str,
    competition: &str,
) -> LiveMatch {
    LiveMatch {
        id: id.to_string(),
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_score: score.map(|(home, _)| home),
        away_score: score.map(|(_, away)| away),
        status: status.to_string(),
        competition: competition.to_string(),
        is_live: score.is_some() && status != "FT",
    }
}

/// The catalogue shipped with the app
pub fn default_bundle() -> ContentBundle {
    let articles = vec![
        article("a1", "Title race goes to the wire", "News", 4, false, 10),
        article("a2", "Inside the tactics of a perfect press", "Analysis", 9, true, 11),
        article("a3", "Five youngsters to watch this spring", "Features", 6, false, 12),
        article("a4", "Exclusive: the transfer that never was", "Transfers", 7, true, 13),
        article("a5", "Grassroots pitches get a winter upgrade", "Community", 3, false, 14),
    ];

    let live_matches = vec![
        fixture("m1", "Arsenal", "Chelsea", Some((1, 1)), "67'", "Premier League"),
        fixture("m2", "Barcelona", "Sevilla", Some((2, 0)), "HT", "La Liga"),
        fixture("m3", "Inter", "Napoli", None, "20:45", "Serie A"),
    ];

    let live_scores = vec![
        fixture("m1", "Arsenal", "Chelsea", Some((1, 1)), "67'", "Premier League"),
        fixture("m2", "Barcelona", "Sevilla", Some((2, 0)), "HT", "La Liga"),
        fixture("m4", "Bayern", "Dortmund", Some((3, 2)), "FT", "Bundesliga"),
    ];

    ContentBundle {
        articles,
        live_matches,
        live_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstarted_match_has_no_score() {
        let bundle = default_bundle();
        let upcoming = bundle.live_matches.iter().find(|m| m.id == "m3").unwrap();

        assert_eq!(upcoming.home_score, None);
        assert_eq!(upcoming.away_score, None);
        assert!(!upcoming.is_live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_waits_for_latency() {
        let source = MockContentSource::new(Duration::from_millis(500));
        let started = tokio::time::Instant::now();

        let bundle = source.fetch_content().await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(bundle.articles.len(), 5);
        assert!(bundle.articles.iter().any(|a| a.is_premium));
    }
}
