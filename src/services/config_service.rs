use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::{sync::RwLock, task::JoinHandle};

use crate::{
    auth::SessionManager,
    errors::{AppError, AppResult},
    models::domain::{Exam, ExamPrices, InProgressExam, Organization},
    repositories::{ConfigCacheRepository, LocalStore, ProgressRepository},
    services::{
        api_client::ConfigApi,
        catalog::process_organizations,
        notifier::{Notifier, Toast},
    },
};

/// Tenant and catalog configuration as the UI sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogState {
    pub organizations: Vec<Organization>,
    pub active_org: Option<Organization>,
    pub exam_prices: ExamPrices,
    pub version: Option<String>,
    pub is_initializing: bool,
    pub in_progress_exam: Option<InProgressExam>,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            organizations: Vec::new(),
            active_org: None,
            exam_prices: ExamPrices::new(),
            version: None,
            is_initializing: true,
            in_progress_exam: None,
        }
    }
}

/// Picks the organization to activate: the previous choice when it survived
/// the refresh, otherwise the first one.
fn resolve_active_org(
    organizations: &[Organization],
    preferred_id: Option<&str>,
) -> Option<Organization> {
    preferred_id
        .and_then(|id| organizations.iter().find(|org| org.id == id))
        .or_else(|| organizations.first())
        .cloned()
}

pub struct ConfigurationManager {
    api: Arc<dyn ConfigApi>,
    session: Arc<SessionManager>,
    cache: ConfigCacheRepository,
    progress: ProgressRepository,
    notifier: Arc<dyn Notifier>,
    state: RwLock<CatalogState>,
}

impl ConfigurationManager {
    pub fn new(
        api: Arc<dyn ConfigApi>,
        session: Arc<SessionManager>,
        store: Arc<dyn LocalStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            cache: ConfigCacheRepository::new(store.clone()),
            progress: ProgressRepository::new(store),
            notifier,
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// Publishes the cached catalog straight away, then revalidates it
    /// against the server.
    pub async fn initialize(&self) -> AppResult<()> {
        match self.load_cached().await {
            Ok(true) => debug!("Serving cached configuration while revalidating"),
            Ok(false) => {}
            Err(err) => warn!("Could not read configuration cache: {}", err),
        }
        self.refresh().await
    }

    async fn load_cached(&self) -> AppResult<bool> {
        let Some(cached) = self.cache.load()? else {
            return Ok(false);
        };
        let stored_id = self.cache.active_org_id()?;

        {
            let mut state = self.state.write().await;
            state.active_org = resolve_active_org(&cached.organizations, stored_id.as_deref());
            state.organizations = cached.organizations;
            state.exam_prices = cached.exam_prices;
            state.version = cached.version;
            state.is_initializing = false;
        }
        self.scan_in_progress_exam().await;
        Ok(true)
    }

    /// Fetches and merges the configuration. Failures are reported through a
    /// toast and leave the previously published catalog in place; the
    /// initializing flag is cleared either way.
    pub async fn refresh(&self) -> AppResult<()> {
        let result = self.fetch_and_process().await;

        let has_catalog = {
            let mut state = self.state.write().await;
            state.is_initializing = false;
            !state.organizations.is_empty()
        };

        if let Err(err) = &result {
            error!("Failed to load app configuration: {}", err);
            let toast = if has_catalog {
                Toast::warning("Could not refresh the exam catalog; showing saved data.")
            } else {
                Toast::error(format!("Could not load exam configuration: {}", err))
            };
            self.notifier.notify(toast);
        }

        self.scan_in_progress_exam().await;
        result
    }

    async fn fetch_and_process(&self) -> AppResult<()> {
        let response = self.api.fetch_app_config().await?.ok_or_else(|| {
            AppError::InvalidConfiguration("empty response from app-config".to_string())
        })?;
        let organizations = response.organizations.ok_or_else(|| {
            AppError::InvalidConfiguration("response has no organizations".to_string())
        })?;

        let processed = process_organizations(&organizations, &response.exam_prices);
        let stored_id = self.cache.active_org_id()?;

        let (active_id, snapshot) = {
            let mut state = self.state.write().await;
            let preferred = state
                .active_org
                .as_ref()
                .map(|org| org.id.clone())
                .or(stored_id);
            state.active_org = resolve_active_org(&processed, preferred.as_deref());
            state.organizations = processed;
            state.exam_prices = response.exam_prices;
            state.version = response.version;
            (
                state.active_org.as_ref().map(|org| org.id.clone()),
                state.clone(),
            )
        };

        info!(
            "Loaded {} organizations (active: {})",
            snapshot.organizations.len(),
            active_id.as_deref().unwrap_or("none")
        );
        if let Some(id) = active_id {
            self.cache.save_active_org_id(&id)?;
        }
        self.cache.save(
            snapshot.version,
            &snapshot.organizations,
            &snapshot.exam_prices,
        )?;
        Ok(())
    }

    /// Switches tenant; returns false when no organization has `org_id`.
    pub async fn set_active_org_by_id(&self, org_id: &str) -> AppResult<bool> {
        {
            let mut state = self.state.write().await;
            let Some(org) = state.organizations.iter().find(|o| o.id == org_id).cloned() else {
                debug!("Ignoring switch to unknown organization {}", org_id);
                return Ok(false);
            };
            state.active_org = Some(org);
        }
        self.cache.save_active_org_id(org_id)?;
        self.scan_in_progress_exam().await;
        Ok(true)
    }

    /// Replaces an organization edited client-side and makes it active. Only
    /// the local copy changes.
    pub async fn update_active_org(&self, updated: Organization) -> AppResult<()> {
        let snapshot = {
            let mut state = self.state.write().await;
            let Some(slot) = state.organizations.iter_mut().find(|o| o.id == updated.id) else {
                return Err(AppError::NotFound(format!(
                    "Organization '{}' not found",
                    updated.id
                )));
            };
            *slot = updated.clone();
            state.active_org = Some(updated);
            state.clone()
        };

        if let Some(org) = &snapshot.active_org {
            self.cache.save_active_org_id(&org.id)?;
        }
        self.cache.save(
            snapshot.version,
            &snapshot.organizations,
            &snapshot.exam_prices,
        )?;
        self.scan_in_progress_exam().await;
        Ok(())
    }

    /// Recomputes the in-progress exam hint for the effective user and the
    /// active organization.
    pub async fn scan_in_progress_exam(&self) {
        // Scans run one at a time so a slow one cannot overwrite a newer result.
        let mut state = self.state.write().await;
        let user = self.session.current_user().await;

        let found = match (user, state.active_org.as_ref()) {
            (Some(user), Some(org)) => self
                .progress
                .find_in_progress(&user.id, org)
                .unwrap_or_else(|err| {
                    warn!("In-progress exam scan failed: {}", err);
                    None
                }),
            _ => None,
        };

        if state.in_progress_exam != found {
            debug!("In-progress exam is now {:?}", found);
            state.in_progress_exam = found;
        }
    }

    /// Rescans for an in-progress exam whenever the effective user changes.
    pub fn watch_session(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.session.subscribe();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                self.scan_in_progress_exam().await;
            }
        })
    }

    pub async fn snapshot(&self) -> CatalogState {
        self.state.read().await.clone()
    }

    pub async fn organizations(&self) -> Vec<Organization> {
        self.state.read().await.organizations.clone()
    }

    pub async fn active_org(&self) -> Option<Organization> {
        self.state.read().await.active_org.clone()
    }

    pub async fn exam_prices(&self) -> ExamPrices {
        self.state.read().await.exam_prices.clone()
    }

    pub async fn is_initializing(&self) -> bool {
        self.state.read().await.is_initializing
    }

    pub async fn in_progress_exam(&self) -> Option<InProgressExam> {
        self.state.read().await.in_progress_exam.clone()
    }

    /// Looks an exam up in the active organization.
    pub async fn find_exam(&self, exam_id: &str) -> Option<Exam> {
        self.state
            .read()
            .await
            .active_org
            .as_ref()
            .and_then(|org| org.find_exam(exam_id))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{domain::PriceRecord, dto::AppConfigResponse},
        repositories::MemoryStore,
        services::{
            api_client::{MockConfigApi, MockResultsApi},
            notifier::{ChannelNotifier, ToastLevel},
        },
        test_utils::fixtures::{exam, organization, token_from_json},
    };
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn response() -> AppConfigResponse {
        let mut org_a = organization("org-a");
        org_a.exams[0].product_sku = Some("SKU1".into());
        AppConfigResponse {
            version: Some("5".into()),
            organizations: Some(vec![org_a, organization("org-b")]),
            exam_prices: ExamPrices::from([(
                "SKU1".to_string(),
                PriceRecord {
                    price: Some(25.0),
                    ..PriceRecord::default()
                },
            )]),
        }
    }

    struct Harness {
        manager: Arc<ConfigurationManager>,
        session: Arc<SessionManager>,
        store: Arc<MemoryStore>,
        toasts: UnboundedReceiver<Toast>,
    }

    fn harness_with_store(api: MockConfigApi, store: Arc<MemoryStore>) -> Harness {
        let (notifier, toasts) = ChannelNotifier::channel();
        let notifier: Arc<dyn Notifier> = Arc::new(notifier);
        let mut results = MockResultsApi::new();
        results.expect_sync_results().returning(|_, _, _| Ok(vec![]));

        let session = Arc::new(SessionManager::new(
            store.clone(),
            Arc::new(results),
            notifier.clone(),
            false,
        ));
        let manager = Arc::new(ConfigurationManager::new(
            Arc::new(api),
            session.clone(),
            store.clone(),
            notifier,
        ));
        Harness {
            manager,
            session,
            store,
            toasts,
        }
    }

    fn harness(api: MockConfigApi) -> Harness {
        harness_with_store(api, Arc::new(MemoryStore::new()))
    }

    fn serving(response: AppConfigResponse) -> MockConfigApi {
        let mut api = MockConfigApi::new();
        api.expect_fetch_app_config()
            .returning(move || Ok(Some(response.clone())));
        api
    }

    #[tokio::test]
    async fn test_initialize_merges_and_defaults_to_first_org() {
        let h = harness(serving(response()));
        assert!(h.manager.is_initializing().await);

        h.manager.initialize().await.unwrap();

        assert!(!h.manager.is_initializing().await);
        let active = h.manager.active_org().await.unwrap();
        assert_eq!(active.id, "org-a");
        assert_eq!(active.exams[0].price, Some(25.0));
        assert_eq!(h.manager.exam_prices().await["SKU1"].price, Some(25.0));
        assert_eq!(h.store.get("activeOrg").unwrap().as_deref(), Some("org-a"));
        assert!(h.store.get("appConfigCache").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_twice_is_stable() {
        let h = harness(serving(response()));
        h.manager.initialize().await.unwrap();
        let first = h.manager.snapshot().await;

        h.manager.refresh().await.unwrap();
        assert_eq!(h.manager.snapshot().await, first);
    }

    #[tokio::test]
    async fn test_selected_org_survives_refresh() {
        let h = harness(serving(response()));
        h.manager.initialize().await.unwrap();

        assert!(h.manager.set_active_org_by_id("org-b").await.unwrap());
        assert!(!h.manager.set_active_org_by_id("org-zzz").await.unwrap());
        h.manager.refresh().await.unwrap();

        assert_eq!(h.manager.active_org().await.unwrap().id, "org-b");
        assert_eq!(h.store.get("activeOrg").unwrap().as_deref(), Some("org-b"));
    }

    #[tokio::test]
    async fn test_persisted_selection_is_honoured_on_next_run() {
        let store = Arc::new(MemoryStore::with_entries([("activeOrg", "org-b")]));
        let h = harness_with_store(serving(response()), store);

        h.manager.initialize().await.unwrap();
        assert_eq!(h.manager.active_org().await.unwrap().id, "org-b");
    }

    #[tokio::test]
    async fn test_missing_organizations_fails_loudly() {
        let mut bad = response();
        bad.organizations = None;
        let mut h = harness(serving(bad));

        let err = h.manager.initialize().await.unwrap_err();
        assert!(matches!(err, AppError::InvalidConfiguration(_)));
        assert!(!h.manager.is_initializing().await);
        assert!(h.manager.organizations().await.is_empty());
        assert!(h.manager.active_org().await.is_none());
        assert_eq!(h.toasts.try_recv().unwrap().level, ToastLevel::Error);
    }

    #[tokio::test]
    async fn test_empty_response_fails_loudly() {
        let mut api = MockConfigApi::new();
        api.expect_fetch_app_config().returning(|| Ok(None));
        let mut h = harness(api);

        assert!(h.manager.initialize().await.is_err());
        assert!(!h.manager.is_initializing().await);
        assert!(h.toasts.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_cached_catalog_is_served_when_fetch_fails() {
        let store = Arc::new(MemoryStore::new());
        {
            let h = harness_with_store(serving(response()), store.clone());
            h.manager.initialize().await.unwrap();
        }

        let mut api = MockConfigApi::new();
        api.expect_fetch_app_config()
            .returning(|| Err(AppError::Network("offline".into())));
        let mut h = harness_with_store(api, store);

        assert!(h.manager.initialize().await.is_err());
        assert_eq!(h.manager.organizations().await.len(), 2);
        assert_eq!(h.manager.active_org().await.unwrap().id, "org-a");
        assert_eq!(h.toasts.try_recv().unwrap().level, ToastLevel::Warning);
    }

    #[tokio::test]
    async fn test_update_active_org_replaces_entry() {
        let h = harness(serving(response()));
        h.manager.initialize().await.unwrap();

        let mut edited = h.manager.organizations().await[1].clone();
        edited.name = "Renamed".into();
        edited.exams.push(exam("exam-3", None));
        h.manager.update_active_org(edited.clone()).await.unwrap();

        assert_eq!(h.manager.active_org().await, Some(edited.clone()));
        assert_eq!(h.manager.organizations().await[1], edited);
        assert_eq!(h.store.get("activeOrg").unwrap().as_deref(), Some("org-b"));
        assert!(h.manager.find_exam("exam-3").await.is_some());

        let unknown = organization("org-new");
        assert!(matches!(
            h.manager.update_active_org(unknown).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_in_progress_exam_follows_user_and_org() {
        let h = harness(serving(response()));
        h.store.set("exam_progress_exam-2_7", "{}").unwrap();
        h.manager.initialize().await.unwrap();
        assert_eq!(h.manager.in_progress_exam().await, None);

        let token = token_from_json(&json!({"user": {"id": "7", "name": "Jo"}}));
        h.session.login_with_token(&token, false).await.unwrap();
        h.manager.scan_in_progress_exam().await;
        assert_eq!(
            h.manager.in_progress_exam().await,
            Some(InProgressExam {
                exam_id: "exam-2".into(),
                exam_name: "Exam exam-2".into(),
            })
        );

        let mut without_exam = h.manager.organizations().await[1].clone();
        without_exam.exams.retain(|e| e.id != "exam-2");
        h.manager.update_active_org(without_exam).await.unwrap();
        assert_eq!(h.manager.in_progress_exam().await, None);
    }

    #[tokio::test]
    async fn test_watch_session_rescans_on_logout() {
        let h = harness(serving(response()));
        h.store.set("exam_progress_exam-1_7", "{}").unwrap();
        h.manager.initialize().await.unwrap();
        let watcher = Arc::clone(&h.manager).watch_session();

        let token = token_from_json(&json!({"user": {"id": "7", "name": "Jo"}}));
        h.session.login_with_token(&token, false).await.unwrap();
        h.manager.scan_in_progress_exam().await;
        assert!(h.manager.in_progress_exam().await.is_some());

        h.session.logout().await.unwrap();
        for _ in 0..50 {
            if h.manager.in_progress_exam().await.is_none() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(h.manager.in_progress_exam().await, None);
        watcher.abort();
    }
}
