use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::de::{list_or_empty, optional_price, optional_string_or_number, string_or_number};

/// One tenant of the portal with its own catalog.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub exams: Vec<Exam>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub suggested_books: Vec<SuggestedBook>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub exam_product_categories: Vec<ExamProductCategory>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Organization {
    pub fn find_exam(&self, exam_id: &str) -> Option<&Exam> {
        self.exams.iter().find(|exam| exam.id == exam_id)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub product_sku: Option<String>,
    #[serde(default, deserialize_with = "optional_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "optional_price")]
    pub regular_price: Option<f64>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub question_source_url: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub recommended_book_id: Option<String>,
    #[serde(default)]
    pub recommended_book: Option<SuggestedBook>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedBook {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A product category pairing a practice exam with a certification exam.
/// Its question source URL overrides the one stored on either exam.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamProductCategory {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub practice_exam_id: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub certification_exam_id: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub question_source_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
