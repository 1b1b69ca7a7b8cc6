use std::{env, path::PathBuf, time::Duration};

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub store_path: PathBuf,
    pub http_timeout_secs: u64,
    /// Restrict logout cleanup of `exam_timer_`/`exam_results_` keys to the
    /// outgoing user's id.
    pub scope_logout_cleanup: bool,
    pub auth_token: Option<SecretString>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("PORTAL_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/wp-json/mco/v1".to_string()),
            store_path: env::var("PORTAL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".portal-store.json")),
            http_timeout_secs: env::var("PORTAL_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            scope_logout_cleanup: env::var("PORTAL_SCOPE_LOGOUT_CLEANUP")
                .ok()
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
            auth_token: env::var("PORTAL_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn validate(&self) -> AppResult<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(AppError::Config("PORTAL_API_BASE_URL is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "PORTAL_API_BASE_URL must be an http(s) URL, got '{}'",
                url
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(AppError::Config(
                "PORTAL_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/wp-json/mco/v1".to_string(),
            store_path: PathBuf::from("portal-test-store.json"),
            http_timeout_secs: 5,
            scope_logout_cleanup: false,
            auth_token: None,
        }
    }
}
