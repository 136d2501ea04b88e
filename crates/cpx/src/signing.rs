//! 🔒 Signing — proving to strangers that we are who we say we are.
//!
//! Four schemes, because every vendor read a different blog post:
//! - `Authorization: Basic base64(user:pass)` for practically everyone.
//! - `signature`: lowercase hex HMAC-SHA256 of the request body.
//! - `CDCSignature`: base64 HMAC-SHA1 over a normalized request base string.
//! - `JWT-Token`: an HS256 token with issuer, subject, issued-at and expiry.
//!
//! ⚠️ Secrets pass through here as `&str`. They are never logged. Not even at trace.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::{IntegrationError, Result};

pub const JWT_TOKEN_HEADER: &str = "JWT-Token";
pub const CDC_SIGNATURE_HEADER: &str = "CDCSignature";
pub const SIGNATURE_HEADER: &str = "signature";
pub const PIM_TOKEN_HEADER: &str = "X-PIM-TOKEN";

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// 🔑 `Basic base64(user:pass)`, standard alphabet, padded.
pub fn basic_auth_value(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

/// ✍️ Lowercase hex HMAC-SHA256 of `payload` keyed with `secret`.
pub fn hmac_sha256_hex(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| IntegrationError::Validation(format!("HMAC key rejected: {err}")))?;
    mac.update(payload.as_bytes());
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// ✍️ CDC-style request signature.
///
/// Base string is `METHOD&enc(url)&enc(k1=v1&k2=v2...)` with parameters sorted by
/// key and every component percent-encoded per RFC 3986. The secret arrives
/// base64-encoded; the result is base64 too.
pub fn cdc_signature(
    secret_b64: &str,
    http_method: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<String> {
    let key = STANDARD
        .decode(secret_b64.trim())
        .map_err(|err| IntegrationError::Validation(format!("CDC secret is not base64: {err}")))?;

    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort();
    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let base_string = format!(
        "{}&{}&{}",
        http_method.to_ascii_uppercase(),
        percent_encode(&url.to_ascii_lowercase()),
        percent_encode(&query)
    );

    let mut mac = HmacSha1::new_from_slice(&key)
        .map_err(|err| IntegrationError::Validation(format!("HMAC key rejected: {err}")))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// 🎫 Claims carried by the `JWT-Token` header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// 🎫 HS256 token, valid from `now` for `ttl`.
pub fn jwt_token(
    secret: &str,
    issuer: &str,
    subject: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String> {
    let claims = TokenClaims {
        iss: issuer.to_string(),
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| IntegrationError::Validation(format!("JWT encoding failed: {err}")))
}

// 🔗 form-urlencoding, then patched into RFC 3986 shape: space is %20, `*` is
// encoded, `~` is not.
fn percent_encode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_hmac_sha256_matches_the_textbook() {
        let the_signature =
            hmac_sha256_hex("key", "The quick brown fox jumps over the lazy dog").expect("any key works");
        assert_eq!(
            the_signature,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn the_one_where_cdc_signatures_ignore_parameter_order() {
        let the_secret = STANDARD.encode("super-secret");
        let one = cdc_signature(
            &the_secret,
            "post",
            "https://accounts.example.com/accounts.setAccountInfo",
            &[("UID", "abc"), ("apiKey", "k 1")],
        )
        .expect("valid secret");
        let two = cdc_signature(
            &the_secret,
            "POST",
            "https://accounts.example.com/accounts.setAccountInfo",
            &[("apiKey", "k 1"), ("UID", "abc")],
        )
        .expect("valid secret");

        assert_eq!(one, two);
        assert_eq!(STANDARD.decode(&one).expect("base64 out").len(), 20, "SHA-1 is 20 bytes");
    }

    #[test]
    fn the_one_where_a_non_base64_secret_is_a_validation_error() {
        let result = cdc_signature("not base64!!", "GET", "https://x", &[]);
        assert!(matches!(result, Err(IntegrationError::Validation(_))));
    }

    #[test]
    fn the_one_where_the_jwt_round_trips_its_claims() {
        let now = Utc::now();
        let the_token = jwt_token("s3cr3t", "cpx", "golden-tax", Duration::minutes(5), now)
            .expect("HS256 encodes");

        let decoded = jsonwebtoken::decode::<TokenClaims>(
            &the_token,
            &jsonwebtoken::DecodingKey::from_secret(b"s3cr3t"),
            &jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256),
        )
        .expect("token verifies with the same secret");

        assert_eq!(decoded.claims.iss, "cpx");
        assert_eq!(decoded.claims.sub, "golden-tax");
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 300);
    }

    #[test]
    fn the_one_where_percent_encoding_speaks_rfc_3986() {
        assert_eq!(percent_encode("a b*c~d&e=f"), "a%20b%2Ac~d%26e%3Df");
    }
}
