//! Embedded token payload decoding
//!
//! Tokens are three `.`-separated segments (`header.payload.signature`). Only
//! the payload is decoded; the signature is never verified, the name is a
//! display hint and nothing more.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

/// URL-safe alphabet, accepting payloads with or without `=` padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("expected 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("payload is not valid base64url: {0}")]
    Base64(String),

    #[error("payload is not a JSON object: {0}")]
    Json(String),

    #[error("payload has no usable '{0}' field")]
    MissingField(String),
}

/// Extracts one field from a token's payload segment
#[derive(Debug, Clone)]
pub struct TokenPayloadDecoder {
    field: String,
}

impl Default for TokenPayloadDecoder {
    fn default() -> Self {
        Self::new("name")
    }
}

impl TokenPayloadDecoder {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Decode the payload and return the configured field as text
    ///
    /// Strings are returned verbatim, numbers and booleans as their JSON
    /// text. `null`, arrays and objects count as missing.
    pub fn decode(&self, token: &str) -> Result<String, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::SegmentCount(segments.len()));
        }

        let bytes = URL_SAFE_LENIENT
            .decode(segments[1])
            .map_err(|e| TokenError::Base64(e.to_string()))?;

        let payload: Value =
            serde_json::from_slice(&bytes).map_err(|e| TokenError::Json(e.to_string()))?;
        let object = payload
            .as_object()
            .ok_or_else(|| TokenError::Json("top-level value is not an object".to_string()))?;

        match object.get(&self.field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            _ => Err(TokenError::MissingField(self.field.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "eyJhbGciOiJIUzI1NiJ9";

    fn token(payload: &str) -> String {
        format!("{}.{}.sig", HEADER, payload)
    }

    #[test]
    fn test_decode_name() {
        let decoder = TokenPayloadDecoder::default();
        // {"name":"Alice"}
        assert_eq!(
            decoder.decode(&token("eyJuYW1lIjoiQWxpY2UifQ")).unwrap(),
            "Alice"
        );
    }

    #[test]
    fn test_decode_accepts_padding() {
        let decoder = TokenPayloadDecoder::default();
        assert_eq!(
            decoder.decode(&token("eyJuYW1lIjoiQWxpY2UifQ==")).unwrap(),
            "Alice"
        );
    }

    #[test]
    fn test_decode_url_safe_characters() {
        // {"name":"Zoë?>"} encodes with both '-' and '_'
        let decoder = TokenPayloadDecoder::default();
        assert_eq!(
            decoder.decode(&token("eyJuYW1lIjoiWm_Dqz8-In0")).unwrap(),
            "Zoë?>"
        );
    }

    #[test]
    fn test_numeric_field_uses_json_text() {
        // {"name":42}
        let decoder = TokenPayloadDecoder::default();
        assert_eq!(decoder.decode(&token("eyJuYW1lIjo0Mn0")).unwrap(), "42");
    }

    #[test]
    fn test_missing_field() {
        // {"sub":"1"}
        let decoder = TokenPayloadDecoder::default();
        assert_eq!(
            decoder.decode(&token("eyJzdWIiOiIxIn0")),
            Err(TokenError::MissingField("name".to_string()))
        );

        let sub = TokenPayloadDecoder::new("sub");
        assert_eq!(sub.decode(&token("eyJzdWIiOiIxIn0")).unwrap(), "1");
    }

    #[test]
    fn test_segment_count() {
        let decoder = TokenPayloadDecoder::default();
        assert_eq!(decoder.decode("only.two"), Err(TokenError::SegmentCount(2)));
        assert_eq!(decoder.decode("a.b.c.d"), Err(TokenError::SegmentCount(4)));
        assert_eq!(decoder.decode("plain"), Err(TokenError::SegmentCount(1)));
    }

    #[test]
    fn test_invalid_base64_and_json() {
        let decoder = TokenPayloadDecoder::default();
        assert!(matches!(
            decoder.decode(&token("!!!")),
            Err(TokenError::Base64(_))
        ));
        // "abc" decodes to bytes that are not JSON
        assert!(matches!(decoder.decode(&token("YWJj")), Err(TokenError::Json(_))));
        // [1]
        assert!(matches!(decoder.decode(&token("WzFd")), Err(TokenError::Json(_))));
    }
}
