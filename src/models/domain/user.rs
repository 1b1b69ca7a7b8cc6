use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::de::{flexible_bool, string_or_number};

/// Identity claims of the signed-in user, as stored under `examUser`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_admin: bool,
}

impl User {
    pub fn new(id: &str, name: &str, email: &str, is_admin: bool) -> Self {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            is_admin,
        }
    }
}

/// Details of an active recurring entitlement. The backend owns this shape, so
/// anything beyond the well-known fields is carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
impl User {
    pub fn test_user(id: &str) -> Self {
        User::new(id, "Test User", &format!("user{}@example.com", id), false)
    }

    pub fn test_admin(id: &str) -> Self {
        User::new(id, "Test Admin", &format!("admin{}@example.com", id), true)
    }
}
