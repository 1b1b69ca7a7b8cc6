use std::sync::Arc;

use exam_portal_client::{
    app_state::AppState,
    config::Config,
    services::notifier::{LogNotifier, Notifier},
};
use secrecy::ExposeSecret;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let token = config.auth_token.clone();
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let state = AppState::new(config, notifier)?;

    log::info!("Using portal API at {}", state.config.api_base_url);
    state.start().await?;

    if let Some(token) = token {
        let session = state
            .session
            .login_with_token(token.expose_secret(), true)
            .await?;
        log::info!(
            "Signed in as {} ({} purchased exams, subscribed: {})",
            session.user.as_ref().map(|u| u.name.as_str()).unwrap_or("?"),
            session.paid_exam_ids.len(),
            session.is_subscribed
        );
        if let Some(task) = state.session.take_sync_task().await {
            task.await?;
        }
    }

    let catalog = state.catalog.snapshot().await;
    match &catalog.active_org {
        Some(org) => log::info!(
            "Active organization: {} ({} exams, {} priced SKUs)",
            org.name,
            org.exams.len(),
            catalog.exam_prices.len()
        ),
        None => log::warn!("No organization available"),
    }
    state.catalog.scan_in_progress_exam().await;
    if let Some(exam) = state.catalog.in_progress_exam().await {
        log::info!("Exam in progress: {} ({})", exam.exam_name, exam.exam_id);
    }

    Ok(())
}
