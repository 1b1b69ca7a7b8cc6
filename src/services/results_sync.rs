use std::{collections::HashSet, sync::Arc};

use log::{debug, info, warn};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{ExamResult, User},
    repositories::local_store::{keys, LocalStore},
    services::{api_client::ResultsApi, notifier::Toast},
};

pub const SESSION_INVALID_MESSAGE: &str =
    "Your session is no longer valid. Please log in again to continue.";

/// Uploads the results cached on this device and stores the reconciled list
/// the server sends back.
#[derive(Clone)]
pub struct ResultsSync {
    api: Arc<dyn ResultsApi>,
    store: Arc<dyn LocalStore>,
}

impl ResultsSync {
    pub fn new(api: Arc<dyn ResultsApi>, store: Arc<dyn LocalStore>) -> Self {
        Self { api, store }
    }

    /// Results cached under `exam_results_<userId>`; empty when none are.
    pub fn load_cached(&self, user: &User) -> AppResult<Vec<ExamResult>> {
        match self.store.get(&keys::exam_results(&user.id))? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Sends the locally cached results and returns the server's reconciled
    /// list. Nothing is written locally.
    pub async fn reconcile(&self, user: &User, token: &str) -> AppResult<Vec<ExamResult>> {
        let local = self.load_cached(user)?;
        debug!(
            "Uploading {} cached results for user {}",
            local.len(),
            user.id
        );
        self.api.sync_results(user, token, &local).await
    }

    /// Writes `reconciled` back, keeping any cached result the server did not
    /// return, including ones saved while the request was in flight.
    pub fn cache(&self, user: &User, reconciled: Vec<ExamResult>) -> AppResult<()> {
        let merged = merge_results(reconciled, self.load_cached(user)?);
        self.store.set(
            &keys::exam_results(&user.id),
            &serde_json::to_string(&merged)?,
        )?;
        info!(
            "Cached {} reconciled results for user {}",
            merged.len(),
            user.id
        );
        Ok(())
    }
}

/// Server entries first, then local entries whose `test_id` the server does
/// not know yet.
fn merge_results(reconciled: Vec<ExamResult>, local: Vec<ExamResult>) -> Vec<ExamResult> {
    let known: HashSet<String> = reconciled.iter().map(|r| r.test_id.clone()).collect();
    let local_only: Vec<ExamResult> = local
        .into_iter()
        .filter(|r| !known.contains(&r.test_id))
        .collect();
    if !local_only.is_empty() {
        warn!(
            "Keeping {} cached results missing from the server copy",
            local_only.len()
        );
    }

    let mut merged = reconciled;
    merged.extend(local_only);
    merged
}

/// The toast, if any, a failed sync should raise.
///
/// Credential failures always surface, since the session is unusable. Other
/// failures only surface when the user asked for the sync explicitly.
pub fn failure_toast(err: &AppError, is_sync_only: bool) -> Option<Toast> {
    if err.is_credential_failure() {
        return Some(Toast::session_expired(SESSION_INVALID_MESSAGE));
    }
    if is_sync_only {
        return Some(Toast::error(format!("Could not sync your purchases: {}", err)));
    }
    warn!("Background results sync failed: {}", err);
    None
}
