use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde_json::Value;

use crate::{
    auth::{claims::TokenPayload, utils::decode_html_entities},
    errors::TokenError,
};

/// URL-safe alphabet that accepts payload segments with or without padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes the payload segment of a `header.payload.signature` token.
///
/// The signature is not checked here: the issuing server vouches for it and
/// re-verifies the token on every authenticated call.
pub fn decode_token_payload(token: &str) -> Result<TokenPayload, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::InvalidFormat {
            segments: segments.len(),
        });
    }

    let bytes = PAYLOAD_ENGINE
        .decode(segments[1].trim())
        .map_err(|e| TokenError::InvalidBase64(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| TokenError::InvalidEncoding)?;

    let value: Value =
        serde_json::from_str(&text).map_err(|e| TokenError::InvalidJson(e.to_string()))?;
    if !value.get("user").is_some_and(Value::is_object) {
        return Err(TokenError::MissingUser);
    }

    let mut payload: TokenPayload =
        serde_json::from_value(value).map_err(|e| TokenError::InvalidJson(e.to_string()))?;
    payload.user.name = decode_html_entities(&payload.user.name);
    Ok(payload)
}
