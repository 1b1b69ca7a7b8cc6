use std::sync::Arc;

use log::debug;
use secrecy::SecretString;

use crate::{
    auth::session::Session,
    errors::{AppError, AppResult},
    models::domain::{SubscriptionInfo, User},
    repositories::local_store::{keys, LocalStore},
};

/// Reads and writes the session under the durable keys other pages rely on.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn LocalStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Writes every session facet; an empty session clears them instead.
    pub fn save(&self, session: &Session) -> AppResult<()> {
        let (Some(user), Some(token)) = (session.user.as_ref(), session.token()) else {
            return self.clear();
        };

        let mut entries = vec![
            (keys::EXAM_USER, serde_json::to_string(user)?),
            (keys::AUTH_TOKEN, token.to_string()),
            (
                keys::PAID_EXAM_IDS,
                serde_json::to_string(&session.paid_exam_ids)?,
            ),
            (keys::IS_SUBSCRIBED, session.is_subscribed.to_string()),
            (keys::IS_BETA_TESTER, session.is_beta_tester.to_string()),
        ];
        match &session.subscription_info {
            Some(info) => entries.push((keys::SUBSCRIPTION_INFO, serde_json::to_string(info)?)),
            None => self.store.remove(keys::SUBSCRIPTION_INFO)?,
        }

        self.store.set_many(&entries)
    }

    /// Rebuilds a session from storage. `Ok(None)` when no session key is
    /// present at all; an error when the identity keys are incomplete or
    /// cannot be parsed.
    pub fn load(&self) -> AppResult<Option<Session>> {
        let token = self.store.get(keys::AUTH_TOKEN)?;
        let user_json = self.store.get(keys::EXAM_USER)?;
        let (token, user_json) = match (token, user_json) {
            (Some(token), Some(user_json)) => (token, user_json),
            (None, None) if !self.has_session_keys()? => return Ok(None),
            _ => {
                return Err(AppError::Storage(
                    "persisted session is incomplete".to_string(),
                ))
            }
        };

        let user: User = serde_json::from_str(&user_json)?;
        let paid_exam_ids: Vec<String> = match self.store.get(keys::PAID_EXAM_IDS)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        let subscription_info: Option<SubscriptionInfo> =
            match self.store.get(keys::SUBSCRIPTION_INFO)? {
                Some(raw) => serde_json::from_str(&raw)?,
                None => None,
            };

        Ok(Some(Session {
            user: Some(user),
            token: Some(SecretString::from(token)),
            paid_exam_ids,
            is_subscribed: self.read_flag(keys::IS_SUBSCRIBED)?,
            subscription_info,
            is_beta_tester: self.read_flag(keys::IS_BETA_TESTER)?,
        }))
    }

    pub fn clear(&self) -> AppResult<()> {
        self.store.remove_many(&keys::SESSION_KEYS)
    }

    /// Drops cached exam timers and results on logout.
    ///
    /// Unscoped, every `exam_timer_`/`exam_results_` key goes regardless of
    /// which user wrote it. Scoped to a user id, only keys ending in that id
    /// are removed.
    pub fn clear_exam_caches(&self, scope_to_user: Option<&str>) -> AppResult<usize> {
        let user_suffix = scope_to_user.map(|id| format!("_{}", id));
        let removed = self.store.remove_where(&|key: &str| {
            let Some(rest) = key
                .strip_prefix(keys::EXAM_TIMER_PREFIX)
                .or_else(|| key.strip_prefix(keys::EXAM_RESULTS_PREFIX))
            else {
                return false;
            };
            match (&user_suffix, scope_to_user) {
                (Some(suffix), Some(id)) => rest == id || key.ends_with(suffix.as_str()),
                _ => true,
            }
        })?;
        debug!("Removed {} cached exam timer/result keys", removed);
        Ok(removed)
    }

    fn has_session_keys(&self) -> AppResult<bool> {
        for key in keys::SESSION_KEYS {
            if self.store.get(key)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read_flag(&self, key: &str) -> AppResult<bool> {
        Ok(self
            .store
            .get(key)?
            .is_some_and(|raw| raw.trim() == "true"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::local_store::MemoryStore;

    fn populated_session() -> Session {
        Session {
            user: Some(User::test_user("7")),
            token: Some(SecretString::from("h.p.s".to_string())),
            paid_exam_ids: vec!["SKU1".into(), "SKU2".into()],
            is_subscribed: true,
            subscription_info: Some(SubscriptionInfo {
                status: Some("active".into()),
                ..SubscriptionInfo::default()
            }),
            is_beta_tester: false,
        }
    }

    fn repository() -> (Arc<MemoryStore>, SessionRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = SessionRepository::new(store.clone());
        (store, repo)
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let (store, repo) = repository();
        let session = populated_session();

        repo.save(&session).unwrap();
        assert_eq!(store.get("authToken").unwrap().as_deref(), Some("h.p.s"));
        assert_eq!(store.get("isSubscribed").unwrap().as_deref(), Some("true"));
        assert_eq!(
            store.get("paidExamIds").unwrap().as_deref(),
            Some(r#"["SKU1","SKU2"]"#)
        );

        assert_eq!(repo.load().unwrap(), Some(session));
    }

    #[test]
    fn test_saving_empty_session_clears_keys() {
        let (store, repo) = repository();
        repo.save(&populated_session()).unwrap();

        repo.save(&Session::default()).unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert_eq!(repo.load().unwrap(), None);
    }

    #[test]
    fn test_load_of_empty_store_is_none() {
        let (store, repo) = repository();
        store.set("activeOrg", "org-1").unwrap();
        assert_eq!(repo.load().unwrap(), None);
    }

    #[test]
    fn test_load_with_partial_identity_is_error() {
        let (store, repo) = repository();
        store.set("examUser", r#"{"id":"7"}"#).unwrap();
        assert!(matches!(repo.load(), Err(AppError::Storage(_))));

        let (store, repo) = repository();
        store.set("authToken", "h.p.s").unwrap();
        store.set("paidExamIds", r#"["SKU1"]"#).unwrap();
        assert!(repo.load().is_err());

        let (store, repo) = repository();
        store.set("isSubscribed", "true").unwrap();
        assert!(repo.load().is_err());
    }

    #[test]
    fn test_load_with_corrupt_user_is_error() {
        let (store, repo) = repository();
        store.set("examUser", "{oops").unwrap();
        store.set("authToken", "h.p.s").unwrap();
        assert!(repo.load().is_err());
    }

    #[test]
    fn test_unscoped_cleanup_removes_every_user() {
        let (store, repo) = repository();
        for key in ["exam_timer_e1_7", "exam_results_7", "exam_results_8", "exam_progress_e1_7"] {
            store.set(key, "x").unwrap();
        }

        assert_eq!(repo.clear_exam_caches(None).unwrap(), 3);
        assert_eq!(store.keys().unwrap(), vec!["exam_progress_e1_7"]);
    }

    #[test]
    fn test_scoped_cleanup_keeps_other_users() {
        let (store, repo) = repository();
        for key in ["exam_timer_e1_7", "exam_results_7", "exam_results_8", "exam_timer_e1_17"] {
            store.set(key, "x").unwrap();
        }

        assert_eq!(repo.clear_exam_caches(Some("7")).unwrap(), 2);
        let mut remaining = store.keys().unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["exam_results_8", "exam_timer_e1_17"]);
    }
}
