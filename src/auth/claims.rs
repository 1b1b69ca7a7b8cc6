use std::fmt;

use chrono::{DateTime, Utc};
use serde::{
    de::{MapAccess, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_json::Value;

use crate::models::{
    de::{flexible_bool, object_or_none},
    domain::{SubscriptionInfo, User},
};

/// Decoded payload of a portal session token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub user: User,
    #[serde(default)]
    pub paid_exam_ids: PaidExamIds,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_subscribed: bool,
    #[serde(default, deserialize_with = "object_or_none")]
    pub subscription_info: Option<SubscriptionInfo>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_beta_tester: bool,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenPayload {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

/// Purchased product SKUs, normalized from either an array or an object.
///
/// Object shapes are ordered the way a JavaScript host enumerates them:
/// integer-like keys ascending, then the remaining keys in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PaidExamIds(pub Vec<String>);

impl PaidExamIds {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

fn sku_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

struct PaidExamIdsVisitor;

impl<'de> Visitor<'de> for PaidExamIdsVisitor {
    type Value = PaidExamIds;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array or map of product SKUs")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(PaidExamIds::default())
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(PaidExamIds::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut skus = Vec::new();
        while let Some(value) = seq.next_element::<Value>()? {
            skus.extend(sku_from_value(value));
        }
        Ok(PaidExamIds(skus))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut indexed: Vec<(u64, String)> = Vec::new();
        let mut named: Vec<String> = Vec::new();

        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            let Some(sku) = sku_from_value(value) else {
                continue;
            };
            match key.parse::<u64>() {
                Ok(index) if index.to_string() == key => indexed.push((index, sku)),
                _ => named.push(sku),
            }
        }

        indexed.sort_by_key(|(index, _)| *index);
        let mut skus: Vec<String> = indexed.into_iter().map(|(_, sku)| sku).collect();
        skus.extend(named);
        Ok(PaidExamIds(skus))
    }
}

impl<'de> Deserialize<'de> for PaidExamIds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PaidExamIdsVisitor)
    }
}
