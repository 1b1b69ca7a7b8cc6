use std::sync::Arc;

use crate::{
    auth::SessionManager,
    config::Config,
    errors::AppResult,
    repositories::{FileStore, LocalStore},
    services::{
        api_client::{ConfigApi, ResultsApi, WordPressClient},
        config_service::ConfigurationManager,
        notifier::Notifier,
    },
};

/// Wires the session and configuration managers together. The session
/// manager is handed to the configuration manager explicitly; nothing is
/// global.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
    pub catalog: Arc<ConfigurationManager>,
    pub store: Arc<dyn LocalStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> AppResult<Self> {
        config.validate()?;
        let store: Arc<dyn LocalStore> = Arc::new(FileStore::open(&config.store_path)?);
        let client = Arc::new(WordPressClient::new(&config)?);
        Ok(Self::with_parts(config, store, client.clone(), client, notifier))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn LocalStore>,
        config_api: Arc<dyn ConfigApi>,
        results_api: Arc<dyn ResultsApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(
            store.clone(),
            results_api,
            notifier.clone(),
            config.scope_logout_cleanup,
        ));
        let catalog = Arc::new(ConfigurationManager::new(
            config_api,
            session.clone(),
            store.clone(),
            notifier,
        ));

        Self {
            session,
            catalog,
            store,
            config: Arc::new(config),
        }
    }

    /// Restores the persisted session, starts following session changes and
    /// loads the catalog. Configuration failures are reported, not returned.
    pub async fn start(&self) -> AppResult<()> {
        self.session.restore().await?;
        Arc::clone(&self.catalog).watch_session();
        if let Err(err) = self.catalog.initialize().await {
            log::warn!("Starting with incomplete configuration: {}", err);
        }
        Ok(())
    }
}
