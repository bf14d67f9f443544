use crate::error::{CfError, Result};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// TokenSet is the OAuth2 token response from the token endpoint.
/// It is replaced as a whole on every (re)authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Signed access token sent as the bearer credential
    pub access_token: String,

    /// Refresh token for renewing expired access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (usually "bearer")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Check if the token response carried a refresh token
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Check whether the access token has expired at `now` (Unix seconds)
    pub fn is_expired(&self, now: i64) -> Result<bool> {
        is_token_expired(&self.access_token, now)
    }

    /// Expiry instant taken from the access token's `exp` claim
    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        let exp = expiry(&self.access_token)?;
        Utc.timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| CfError::request(format!("JWT expiration out of range: {}", exp)))
    }
}

/// Check whether a JWT access token has expired at `now` (Unix seconds).
///
/// Only the claims segment is decoded; the signature is not verified, so
/// the result is a local hint about when to refresh and nothing more. A
/// token whose `exp` equals `now` counts as expired.
pub fn is_token_expired(access_token: &str, now: i64) -> Result<bool> {
    Ok(expiry(access_token)? <= now)
}

fn expiry(access_token: &str) -> Result<i64> {
    let claims = decode_claims(access_token)?;
    let exp = claims
        .get("exp")
        .ok_or_else(|| CfError::request(format!("JWT expiration not found: {}", claims)))?;

    exp.as_i64()
        .or_else(|| exp.as_f64().map(|f| f as i64))
        .or_else(|| exp.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| CfError::request(format!("JWT expiration is not a timestamp: {}", exp)))
}

fn decode_claims(access_token: &str) -> Result<Value> {
    let parts: Vec<&str> = access_token.split('.').collect();
    if parts.len() != 3 {
        return Err(CfError::request(format!("JWT is invalid: {}", access_token)));
    }

    // JWT segments drop their padding
    let mut segment = parts[1].trim_end_matches('=').to_string();
    while segment.len() % 4 != 0 {
        segment.push('=');
    }

    let decoded = URL_SAFE
        .decode(&segment)
        .or_else(|_| STANDARD.decode(&segment))
        .map_err(|e| CfError::request(format!("JWT is invalid: {}", e)))?;

    let claims: Value = serde_json::from_slice(&decoded)
        .map_err(|e| CfError::request(format!("JWT is invalid: {}", e)))?;
    if !claims.is_object() {
        return Err(CfError::request(format!("JWT claims are not an object: {}", claims)));
    }
    Ok(claims)
}
