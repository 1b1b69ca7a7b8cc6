use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::de::{optional_price, string_or_number};

/// A graded attempt as reconciled by the results API.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    #[serde(deserialize_with = "string_or_number")]
    pub test_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub exam_id: String,
    #[serde(default, deserialize_with = "optional_price")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
