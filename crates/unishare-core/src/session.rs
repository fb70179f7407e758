// Simulated session tokens.
//
// Tokens look like a JWT (`header.payload.signature`, unpadded base64) but
// carry a fixed mock signature. They are for display only and are never
// verified.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::User;

pub const TOKEN_ISSUER: &str = "unishare.bvuniversity.edu.in";
pub const CAMPUS_EMAIL_DOMAIN: &str = "@bvuniversity.edu.in";
const MOCK_SIGNATURE: &str = "mock_signature_for_bvdu_session";

/// Claims carried in the token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub dept: Option<String>,
    pub iss: String,
    pub iat: i64,
}

/// Result of splitting and decoding a token. `is_valid` only says the
/// token was well-formed; the signature is not checked.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: Value,
    pub payload: Value,
    pub signature: String,
    pub is_valid: bool,
}

impl DecodedToken {
    fn invalid() -> Self {
        Self {
            header: json!({}),
            payload: json!({}),
            signature: String::new(),
            is_valid: false,
        }
    }

    /// Typed view of the payload, if it has the expected shape.
    pub fn claims(&self) -> Option<SessionClaims> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

fn encode_part(bytes: &[u8]) -> String {
    BASE64_STANDARD_NO_PAD.encode(bytes)
}

fn decode_part(part: &str) -> Option<Value> {
    let bytes = BASE64_STANDARD_NO_PAD
        .decode(part.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Build a session token for `user`.
pub fn issue(user: &User, issued_at: DateTime<Utc>) -> String {
    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let claims = SessionClaims {
        sub: user.uid.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        dept: user.department.clone(),
        iss: TOKEN_ISSUER.to_string(),
        iat: issued_at.timestamp(),
    };
    // Serializing a Value and a plain struct cannot fail.
    let header = serde_json::to_vec(&header).unwrap_or_default();
    let payload = serde_json::to_vec(&claims).unwrap_or_default();

    format!(
        "{}.{}.{}",
        encode_part(&header),
        encode_part(&payload),
        encode_part(MOCK_SIGNATURE.as_bytes())
    )
}

/// Decode a token without verifying it. Anything malformed yields an
/// invalid token with empty parts.
pub fn decode(token: &str) -> DecodedToken {
    let parts: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = parts.as_slice() else {
        return DecodedToken::invalid();
    };
    match (decode_part(header), decode_part(payload)) {
        (Some(header), Some(payload)) => DecodedToken {
            header,
            payload,
            signature: signature.to_string(),
            is_valid: true,
        },
        _ => DecodedToken::invalid(),
    }
}

/// Stable uid derived from an email address.
pub fn uid_for_email(email: &str) -> String {
    encode_part(email.trim().to_lowercase().as_bytes())
}

pub fn is_campus_email(email: &str) -> bool {
    email.trim().to_lowercase().ends_with(CAMPUS_EMAIL_DOMAIN)
}
