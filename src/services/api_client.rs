use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response, StatusCode};

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::{ExamResult, User},
        dto::{AppConfigResponse, SyncResultsRequest, WordPressErrorBody},
    },
};

/// Public tenant/catalog configuration endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigApi: Send + Sync {
    /// `Ok(None)` when the endpoint answered without a document.
    async fn fetch_app_config(&self) -> AppResult<Option<AppConfigResponse>>;
}

/// Reconciles locally cached results with the server for one user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultsApi: Send + Sync {
    /// Uploads `local` and returns the server's reconciled list.
    async fn sync_results(
        &self,
        user: &User,
        token: &str,
        local: &[ExamResult],
    ) -> AppResult<Vec<ExamResult>>;
}

/// REST client for the WordPress plugin backing the portal.
#[derive(Clone)]
pub struct WordPressClient {
    http: Client,
    base_url: String,
}

impl WordPressClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder().timeout(config.http_timeout()).build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn error_from_response(response: Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        api_error(status, &body)
    }
}

/// Maps a failed response onto `AppError::Api`, keeping the WordPress error
/// code when the body carries one.
pub fn api_error(status: StatusCode, body: &str) -> AppError {
    let parsed: WordPressErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    AppError::Api {
        status: parsed
            .data
            .and_then(|d| d.status)
            .unwrap_or_else(|| status.as_u16()),
        code: parsed.code,
        message,
    }
}

#[async_trait]
impl ConfigApi for WordPressClient {
    async fn fetch_app_config(&self) -> AppResult<Option<AppConfigResponse>> {
        let url = self.endpoint("app-config");
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body = response.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl ResultsApi for WordPressClient {
    async fn sync_results(
        &self,
        user: &User,
        token: &str,
        local: &[ExamResult],
    ) -> AppResult<Vec<ExamResult>> {
        let url = self.endpoint("user-results");
        debug!(
            "POST {} for user {} ({} local results)",
            url,
            user.id,
            local.len()
        );

        let body = SyncResultsRequest {
            user_id: &user.id,
            results: local,
        };
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let results: Vec<ExamResult> = response.json().await?;
        info!("Synced {} results for user {}", results.len(), user.id);
        Ok(results)
    }
}
