use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    errors::AppResult,
    models::domain::{InProgressExam, Organization},
    repositories::local_store::{keys, LocalStore},
};

// The user id is the last underscore-separated segment; exam ids may contain
// underscores themselves.
static PROGRESS_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^exam_progress_(?P<exam>.+)_(?P<user>[^_]+)$").expect("valid progress key regex")
});

/// A parsed `exam_progress_<examId>_<userId>` key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressKey {
    pub exam_id: String,
    pub user_id: String,
}

impl ProgressKey {
    pub fn new(exam_id: &str, user_id: &str) -> Self {
        Self {
            exam_id: exam_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        let captures = PROGRESS_KEY.captures(key)?;
        Some(Self::new(&captures["exam"], &captures["user"]))
    }

    pub fn storage_key(&self) -> String {
        format!(
            "{}{}_{}",
            keys::EXAM_PROGRESS_PREFIX,
            self.exam_id,
            self.user_id
        )
    }
}

#[derive(Clone)]
pub struct ProgressRepository {
    store: Arc<dyn LocalStore>,
}

impl ProgressRepository {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn save_progress(&self, exam_id: &str, user_id: &str, state: &str) -> AppResult<()> {
        self.store
            .set(&ProgressKey::new(exam_id, user_id).storage_key(), state)
    }

    pub fn clear_progress(&self, exam_id: &str, user_id: &str) -> AppResult<()> {
        self.store
            .remove(&ProgressKey::new(exam_id, user_id).storage_key())
    }

    /// Progress keys belonging to `user_id`, in ascending key order.
    pub fn progress_keys_for(&self, user_id: &str) -> AppResult<Vec<ProgressKey>> {
        let mut raw = self.store.keys()?;
        raw.sort();
        Ok(raw
            .iter()
            .filter_map(|key| ProgressKey::parse(key))
            .filter(|key| key.user_id == user_id)
            .collect())
    }

    /// First of the user's progress keys, in ascending key order, naming an
    /// exam that exists in `org`.
    pub fn find_in_progress(
        &self,
        user_id: &str,
        org: &Organization,
    ) -> AppResult<Option<InProgressExam>> {
        Ok(self
            .progress_keys_for(user_id)?
            .into_iter()
            .find_map(|key| {
                org.find_exam(&key.exam_id).map(|exam| InProgressExam {
                    exam_id: exam.id.clone(),
                    exam_name: exam.name.clone(),
                })
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{repositories::local_store::MemoryStore, test_utils::fixtures::organization};

    #[test]
    fn test_parse_progress_keys() {
        assert_eq!(
            ProgressKey::parse("exam_progress_exam-1_7"),
            Some(ProgressKey::new("exam-1", "7"))
        );
        assert_eq!(
            ProgressKey::parse("exam_progress_cpc_practice_42"),
            Some(ProgressKey::new("cpc_practice", "42"))
        );
        assert_eq!(ProgressKey::parse("exam_progress_7"), None);
        assert_eq!(ProgressKey::parse("exam_timer_exam-1_7"), None);
    }

    #[test]
    fn test_storage_key_round_trip() {
        let key = ProgressKey::new("exam-1", "7");
        assert_eq!(key.storage_key(), "exam_progress_exam-1_7");
        assert_eq!(ProgressKey::parse(&key.storage_key()), Some(key));
    }

    #[test]
    fn test_find_in_progress_ignores_other_users_and_unknown_exams() {
        let store = Arc::new(MemoryStore::with_entries([
            ("exam_progress_exam-2_8", "{}"),
            ("exam_progress_retired-exam_7", "{}"),
            ("exam_progress_exam-2_7", "{}"),
        ]));
        let repo = ProgressRepository::new(store);
        let org = organization("org-1");

        let found = repo.find_in_progress("7", &org).unwrap();
        assert_eq!(
            found,
            Some(InProgressExam {
                exam_id: "exam-2".into(),
                exam_name: "Exam exam-2".into(),
            })
        );
        assert_eq!(repo.find_in_progress("9", &org).unwrap(), None);
    }

    #[test]
    fn test_find_in_progress_is_deterministic() {
        let store = Arc::new(MemoryStore::new());
        let repo = ProgressRepository::new(store);
        repo.save_progress("exam-2", "7", "{}").unwrap();
        repo.save_progress("exam-1", "7", "{}").unwrap();

        let org = organization("org-1");
        let found = repo.find_in_progress("7", &org).unwrap().unwrap();
        assert_eq!(found.exam_id, "exam-1");

        repo.clear_progress("exam-1", "7").unwrap();
        let found = repo.find_in_progress("7", &org).unwrap().unwrap();
        assert_eq!(found.exam_id, "exam-2");
    }
}
