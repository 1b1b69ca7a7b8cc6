use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::de::optional_price;

/// Live WooCommerce price data for one product SKU.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    #[serde(default, deserialize_with = "optional_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "optional_price")]
    pub regular_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type ExamPrices = HashMap<String, PriceRecord>;
