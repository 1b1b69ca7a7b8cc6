#[cfg(test)]
pub mod fixtures {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{Map, Value};

    use crate::models::domain::{Exam, Organization};

    pub const TEST_SIGNING_SECRET: &str = "test_jwt_secret_key";

    pub fn encode_segment(raw: &str) -> String {
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Unsigned-looking token whose payload segment is `payload`.
    pub fn token_from_json(payload: &Value) -> String {
        format!(
            "{}.{}.{}",
            encode_segment(r#"{"alg":"HS256","typ":"JWT"}"#),
            encode_segment(&payload.to_string()),
            encode_segment("signature")
        )
    }

    /// HS256 token as the WordPress JWT plugin would issue it.
    pub fn signed_token(payload: &Value) -> String {
        encode(
            &Header::default(),
            payload,
            &EncodingKey::from_secret(TEST_SIGNING_SECRET.as_bytes()),
        )
        .expect("signing a JSON payload should succeed")
    }

    pub fn exam(id: &str, product_sku: Option<&str>) -> Exam {
        Exam {
            id: id.to_string(),
            name: format!("Exam {}", id),
            product_sku: product_sku.map(str::to_string),
            price: None,
            regular_price: None,
            question_source_url: None,
            recommended_book_id: None,
            recommended_book: None,
            extra: Map::new(),
        }
    }

    /// Organization with two exams, `exam-1` and `exam-2`.
    pub fn organization(id: &str) -> Organization {
        Organization {
            id: id.to_string(),
            name: format!("Org {}", id),
            exams: vec![exam("exam-1", None), exam("exam-2", None)],
            suggested_books: Vec::new(),
            exam_product_categories: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use serde_json::json;

    #[test]
    fn test_token_from_json_has_three_segments() {
        let token = token_from_json(&json!({"user": {"id": "1"}}));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_organization_fixture() {
        let org = organization("org-1");
        assert_eq!(org.exams.len(), 2);
        assert_eq!(org.exams[1].name, "Exam exam-2");
    }
}
