use std::sync::Arc;

use chrono::Utc;
use log::warn;

use crate::{
    errors::AppResult,
    models::{
        domain::{ExamPrices, Organization},
        dto::CachedAppConfig,
    },
    repositories::local_store::{keys, LocalStore},
};

/// Persists the merged catalog and the selected tenant between runs.
#[derive(Clone)]
pub struct ConfigCacheRepository {
    store: Arc<dyn LocalStore>,
}

impl ConfigCacheRepository {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Cached configuration, or `None` when absent. An unreadable entry is
    /// dropped rather than failing startup.
    pub fn load(&self) -> AppResult<Option<CachedAppConfig>> {
        let Some(raw) = self.store.get(keys::APP_CONFIG_CACHE)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(cached) => Ok(Some(cached)),
            Err(err) => {
                warn!("Discarding unreadable configuration cache: {}", err);
                self.store.remove(keys::APP_CONFIG_CACHE)?;
                Ok(None)
            }
        }
    }

    pub fn save(
        &self,
        version: Option<String>,
        organizations: &[Organization],
        exam_prices: &ExamPrices,
    ) -> AppResult<()> {
        let cached = CachedAppConfig {
            version,
            organizations: organizations.to_vec(),
            exam_prices: exam_prices.clone(),
            cached_at: Utc::now(),
        };
        self.store
            .set(keys::APP_CONFIG_CACHE, &serde_json::to_string(&cached)?)
    }

    pub fn active_org_id(&self) -> AppResult<Option<String>> {
        self.store.get(keys::ACTIVE_ORG)
    }

    pub fn save_active_org_id(&self, org_id: &str) -> AppResult<()> {
        self.store.set(keys::ACTIVE_ORG, org_id)
    }
}
