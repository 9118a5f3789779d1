use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use pitchlink::{AppConfig, PitchLink};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    info!("Starting PitchLink state core");

    let app = PitchLink::new(&config).await?;

    // Initial load; a failure is already recorded in the error store
    if let Err(e) = app.initialize().await {
        error!("Error during initial content load: {}", e);
    }

    let preferences = app.preferences().snapshot();
    info!(
        "Preferences ready (club selected: {}, language: {})",
        preferences.has_selected_club(),
        preferences.preferences.content_language
    );
    info!(
        "Onboarding complete: {}, signed in: {}",
        app.session().has_completed_onboarding().await,
        app.session().is_authenticated().await
    );

    let free = app.content().get_free_content();
    info!(
        "{} free articles, {} premium articles, {} live scores",
        free.articles.len(),
        app.content().get_premium_content().len(),
        free.live_scores.len()
    );

    let mut sched = JobScheduler::new().await?;

    let job_app = app.clone();
    sched
        .add(Job::new_async(config.refresh_schedule.as_str(), move |_uuid, _l| {
            let app = job_app.clone();
            Box::pin(async move {
                if let Err(e) = app.refresh_content().await {
                    error!("Error refreshing content: {}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started - refreshing content on '{}'", config.refresh_schedule);
    sched.start().await?;

    tokio::signal::ctrl_c().await?;

    sched.shutdown().await?;
    app.dispose().await;

    Ok(())
}
