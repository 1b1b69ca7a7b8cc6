use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::errors::{AppError, AppResult};

/// Durable key names shared with the exam-taking pages; renaming any of them
/// orphans data written by existing clients.
pub mod keys {
    pub const EXAM_USER: &str = "examUser";
    pub const AUTH_TOKEN: &str = "authToken";
    pub const PAID_EXAM_IDS: &str = "paidExamIds";
    pub const IS_SUBSCRIBED: &str = "isSubscribed";
    pub const SUBSCRIPTION_INFO: &str = "subscriptionInfo";
    pub const IS_BETA_TESTER: &str = "isBetaTester";
    pub const ACTIVE_ORG: &str = "activeOrg";
    pub const APP_CONFIG_CACHE: &str = "appConfigCache";

    pub const EXAM_PROGRESS_PREFIX: &str = "exam_progress_";
    pub const EXAM_TIMER_PREFIX: &str = "exam_timer_";
    pub const EXAM_RESULTS_PREFIX: &str = "exam_results_";

    pub const SESSION_KEYS: [&str; 6] = [
        EXAM_USER,
        AUTH_TOKEN,
        PAID_EXAM_IDS,
        IS_SUBSCRIBED,
        SUBSCRIPTION_INFO,
        IS_BETA_TESTER,
    ];

    pub fn exam_results(user_id: &str) -> String {
        format!("{}{}", EXAM_RESULTS_PREFIX, user_id)
    }
}

/// String key/value storage that outlives the process, in the manner of a
/// browser's local storage.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
    fn keys(&self) -> AppResult<Vec<String>>;

    fn set_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> AppResult<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }

    /// Removes every key for which `predicate` holds; returns how many went.
    fn remove_where(&self, predicate: &dyn Fn(&str) -> bool) -> AppResult<usize> {
        let doomed: Vec<String> = self.keys()?.into_iter().filter(|k| predicate(k)).collect();
        for key in &doomed {
            self.remove(key)?;
        }
        Ok(doomed.len())
    }
}

pub(crate) fn lock_poisoned<T>(_: PoisonError<T>) -> AppError {
    AppError::Storage("store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().map_err(lock_poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self.entries.write().map_err(lock_poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut entries = self.entries.write().map_err(lock_poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> AppResult<Vec<String>> {
        let entries = self.entries.read().map_err(lock_poisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}
