use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{
    de::optional_string_or_number,
    domain::{ExamPrices, Organization},
};

/// Body of `GET /app-config`.
///
/// `organizations` stays optional so that a response lacking it can be told
/// apart from a tenant list that is merely empty.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfigResponse {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub version: Option<String>,
    #[serde(default)]
    pub organizations: Option<Vec<Organization>>,
    #[serde(default, deserialize_with = "prices_or_empty")]
    pub exam_prices: ExamPrices,
}

/// Merged configuration persisted under `appConfigCache` for instant loads.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAppConfig {
    #[serde(default)]
    pub version: Option<String>,
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub exam_prices: ExamPrices,
    pub cached_at: DateTime<Utc>,
}

/// Error envelope returned by the WordPress REST API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WordPressErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<WordPressErrorData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WordPressErrorData {
    #[serde(default)]
    pub status: Option<u16>,
}

fn prices_or_empty<'de, D>(deserializer: D) -> Result<ExamPrices, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => {
            serde_json::from_value(value).map_err(serde::de::Error::custom)
        }
        _ => Ok(ExamPrices::new()),
    }
}
