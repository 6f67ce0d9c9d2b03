//! API key check for the trigger endpoint.
//!
//! The key may arrive in the JSON body (`apiKey`), an `X-API-Key` header or
//! an `Authorization: Bearer <key>` header, in that order of precedence. A
//! blank body key counts as absent. Presented keys are compared byte for byte,
//! surrounding whitespace included.
//! Both sides are SHA-256 hashed and the digests compared in constant time,
//! so neither the key length nor a matching prefix leaks through timing.

use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::http::error::AppError;

/// SHA-256 digest of the configured key. The plaintext is not retained.
#[derive(Clone)]
pub struct ApiKeyDigest([u8; 32]);

impl ApiKeyDigest {
    pub fn from_secret(key: &SecretString) -> Self {
        Self(digest(key.expose_secret()))
    }

    /// Constant-time comparison against a presented key.
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(&self.0, &digest(candidate))
    }
}

impl std::fmt::Debug for ApiKeyDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKeyDigest(..)")
    }
}

/// Reject the request unless `expected` is unset or a presented key matches.
pub fn authorize(
    expected: Option<&ApiKeyDigest>,
    headers: &HeaderMap,
    body_key: Option<&str>,
) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let presented = body_key
        .filter(|key| !key.trim().is_empty())
        .map(str::to_string)
        .or_else(|| header_key(headers));

    match presented {
        Some(key) if expected.matches(&key) => Ok(()),
        Some(_) => Err(AppError::Unauthorized("Invalid API key".to_string())),
        None => Err(AppError::Unauthorized(
            "Missing API key. Provide 'apiKey' in the body, an 'X-API-Key' header or 'Authorization: Bearer <key>'.".to_string(),
        )),
    }
}

/// Key from `X-API-Key` or `Authorization: Bearer`. Non-ASCII values are ignored.
fn header_key(headers: &HeaderMap) -> Option<String> {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key.to_string());
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn expected(key: &str) -> ApiKeyDigest {
        ApiKeyDigest::from_secret(&SecretString::from(key.to_string()))
    }

    #[test]
    fn no_configured_key_allows_everything() {
        assert!(authorize(None, &HeaderMap::new(), None).is_ok());
        assert!(authorize(None, &HeaderMap::new(), Some("anything")).is_ok());
    }

    #[test]
    fn body_key_must_match() {
        let key = expected("door-secret");
        assert!(authorize(Some(&key), &HeaderMap::new(), Some("door-secret")).is_ok());
        assert!(authorize(Some(&key), &HeaderMap::new(), Some("door-secreT")).is_err());
        assert!(authorize(Some(&key), &HeaderMap::new(), Some("")).is_err());
    }

    #[test]
    fn missing_key_is_unauthorized() {
        let key = expected("door-secret");
        let err = authorize(Some(&key), &HeaderMap::new(), None).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg.starts_with("Missing")));
    }

    #[test]
    fn x_api_key_header_is_accepted() {
        let key = expected("door-secret");
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("door-secret"));
        assert!(authorize(Some(&key), &headers, None).is_ok());
    }

    #[test]
    fn bearer_header_is_accepted() {
        let key = expected("door-secret");
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer door-secret"));
        assert!(authorize(Some(&key), &headers, None).is_ok());
    }

    #[test]
    fn body_key_takes_precedence_over_headers() {
        let key = expected("door-secret");
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("door-secret"));
        assert!(authorize(Some(&key), &headers, Some("wrong")).is_err());
    }

    #[test]
    fn blank_body_key_falls_back_to_header() {
        let key = expected("door-secret");
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("door-secret"));
        assert!(authorize(Some(&key), &headers, Some("")).is_ok());
    }

    #[test]
    fn padded_key_does_not_match() {
        let key = expected("door-secret");
        assert!(authorize(Some(&key), &HeaderMap::new(), Some("  door-secret  ")).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static(" door-secret"));
        assert!(authorize(Some(&key), &headers, None).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer door-secret "));
        assert!(authorize(Some(&key), &headers, None).is_err());
    }

    #[test]
    fn configured_key_with_whitespace_matches_exactly() {
        let key = expected("door-secret\n");
        assert!(authorize(Some(&key), &HeaderMap::new(), Some("door-secret\n")).is_ok());
        assert!(authorize(Some(&key), &HeaderMap::new(), Some("door-secret")).is_err());
    }

    #[test]
    fn digest_debug_hides_value() {
        assert_eq!(format!("{:?}", expected("door-secret")), "ApiKeyDigest(..)");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
