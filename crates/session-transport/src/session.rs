//! Session and identity types.

use crate::{TransportError, TransportResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A time-bounded proof of authentication issued by the identity provider.
///
/// Owned by the transport; consumers hold read-only clones and replace a
/// session wholesale on refresh or sign-in, never mutate one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to obtain a replacement session.
    pub refresh_token: String,
    /// Stable id of the authenticated principal.
    pub user_id: String,
    /// Email of the principal, when the provider shares it.
    #[serde(default)]
    pub email: Option<String>,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has lapsed at the given instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// The authenticated principal this session proves.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.user_id.clone(),
            email: self.email.clone(),
        }
    }
}

/// The authenticated principal derived from a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id.
    pub id: String,
    /// Email, when available.
    #[serde(default)]
    pub email: Option<String>,
}

/// Claims we care about inside a provider access token.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Decode the claims segment of a JWT access token.
///
/// Used to recover user id, email, and expiry when a token response omits
/// the user object. The signature is not verified here; the provider is the
/// authority, this is only metadata extraction.
pub(crate) fn decode_token_claims(access_token: &str) -> TransportResult<TokenClaims> {
    let payload = access_token
        .split('.')
        .nth(1)
        .ok_or_else(|| TransportError::InvalidCredentials("Malformed access token".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TransportError::InvalidCredentials(format!("Bad token encoding: {}", e)))?;

    let claims: TokenClaims = serde_json::from_slice(&bytes)?;
    Ok(claims)
}

/// Convert a JWT `exp` claim (unix seconds) into a timestamp.
pub(crate) fn expiry_from_claim(exp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(exp, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn fake_jwt(sub: &str, email: Option<&str>, exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = match email {
            Some(email) => format!(r#"{{"sub":"{}","email":"{}","exp":{}}}"#, sub, email, exp),
            None => format!(r#"{{"sub":"{}","exp":{}}}"#, sub, exp),
        };
        let payload = URL_SAFE_NO_PAD.encode(claims);
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            user_id: "user-1".to_string(),
            email: None,
            expires_at: now + Duration::hours(1),
        };

        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(2)));
        assert!(session.is_expired(session.expires_at));
    }

    #[test]
    fn test_identity_derived_from_session() {
        let session = Session {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            user_id: "user-1".to_string(),
            email: Some("a@b.c".to_string()),
            expires_at: Utc::now(),
        };

        let identity = session.identity();
        assert_eq!(identity.id, "user-1");
        assert_eq!(identity.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_decode_token_claims() {
        let token = fake_jwt("user-42", Some("x@y.z"), 1_800_000_000);
        let claims = decode_token_claims(&token).unwrap();

        assert_eq!(claims.sub, "user-42");
        assert_eq!(claims.email.as_deref(), Some("x@y.z"));
        assert_eq!(claims.exp, Some(1_800_000_000));
    }

    #[test]
    fn test_decode_token_claims_no_email() {
        let token = fake_jwt("user-42", None, 1_800_000_000);
        let claims = decode_token_claims(&token).unwrap();
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_decode_malformed_token() {
        assert!(decode_token_claims("nodots").is_err());
        assert!(decode_token_claims("a.!!!notbase64!!!.c").is_err());
    }
}
