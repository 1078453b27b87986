//! HTTP implementation of the session transport.
//!
//! Speaks a GoTrue-style auth API: `/auth/v1/signup`, `/auth/v1/token`
//! (password and refresh_token grants), `/auth/v1/logout`, `/auth/v1/recover`.
//! The current session is cached in-process and every successful mutation is
//! fanned out to subscribers as a [`SessionChange`].

use crate::session::{decode_token_claims, expiry_from_claim};
use crate::{
    Session, SessionChange, SessionChangeCallback, SessionChangeTag, SessionTransport,
    SubscriberRegistry, Subscription, TransportError, TransportResult,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Password-grant / signup request body.
#[derive(Debug, Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

/// Refresh-grant request body.
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Password-recovery request body.
#[derive(Debug, Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
    redirect_to: &'a str,
}

/// Token endpoint response. `access_token` is absent on signup when the
/// provider requires email confirmation first.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// HTTP session transport.
pub struct HttpSessionTransport {
    http_client: Client,
    api_url: String,
    publishable_key: String,
    session: Mutex<Option<Session>>,
    subscribers: SubscriberRegistry,
}

impl HttpSessionTransport {
    /// Create a new transport for the given provider URL and publishable key.
    pub fn new(api_url: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_url: api_url.into(),
            publishable_key: publishable_key.into(),
            session: Mutex::new(None),
            subscribers: SubscriberRegistry::new(),
        }
    }

    /// Create a transport for the configured provider.
    pub fn from_config(config: &fable_config::Config) -> Self {
        Self::new(config.api_url.clone(), config.publishable_key.clone())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, path)
    }

    /// Install a session and notify subscribers with the given tag.
    fn install_session(&self, session: Session, tag: SessionChangeTag) {
        {
            let mut current = self.session.lock().unwrap();
            *current = Some(session.clone());
        }
        debug!(user_id = %session.user_id, tag = ?tag, "Session installed");
        self.subscribers.notify(&SessionChange {
            tag,
            session: Some(session),
        });
    }

    /// Drop the current session and notify subscribers.
    fn clear_session(&self, tag: SessionChangeTag) {
        {
            let mut current = self.session.lock().unwrap();
            *current = None;
        }
        self.subscribers.notify(&SessionChange { tag, session: None });
    }

    /// Build a [`Session`] from a token response, falling back to the JWT
    /// claims for fields the body omits.
    fn session_from_response(&self, data: TokenResponse) -> TransportResult<Session> {
        let access_token = data.access_token.ok_or_else(|| {
            TransportError::InvalidCredentials("Token response without access token".to_string())
        })?;
        let refresh_token = data.refresh_token.unwrap_or_default();

        let claims = decode_token_claims(&access_token)?;

        let (user_id, email) = match data.user {
            Some(user) => (user.id, user.email),
            None => (claims.sub.clone(), claims.email.clone()),
        };

        let expires_at = match data.expires_in {
            Some(seconds) => Utc::now() + Duration::seconds(seconds),
            None => claims
                .exp
                .map(expiry_from_claim)
                .unwrap_or_else(|| Utc::now() + Duration::hours(1)),
        };

        Ok(Session {
            access_token,
            refresh_token,
            user_id,
            email,
            expires_at,
        })
    }

    async fn read_error(response: reqwest::Response) -> TransportError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Provider request failed");

        if status.as_u16() == 400 || status.as_u16() == 401 {
            TransportError::InvalidCredentials(format!("HTTP {}: {}", status, body))
        } else {
            TransportError::Api {
                status: status.as_u16(),
                message: body,
            }
        }
    }
}

#[async_trait]
impl SessionTransport for HttpSessionTransport {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> TransportResult<()> {
        let url = self.auth_url("signup");
        debug!(url = %url, email = %email, "Signing up");

        let data = display_name.map(|name| serde_json::json!({ "display_name": name }));

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&PasswordRequest {
                email,
                password,
                data,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: TokenResponse = response.json().await?;

        // Auto-confirm providers return a full session on signup.
        if body.access_token.is_some() {
            let session = self.session_from_response(body)?;
            info!(user_id = %session.user_id, "Sign-up complete, session issued");
            self.install_session(session, SessionChangeTag::SignedIn);
        } else {
            info!(email = %email, "Sign-up accepted, confirmation pending");
        }

        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> TransportResult<()> {
        let url = self.auth_url("token?grant_type=password");
        debug!(url = %url, email = %email, "Signing in with password");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&PasswordRequest {
                email,
                password,
                data: None,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: TokenResponse = response.json().await?;
        let session = self.session_from_response(body)?;
        info!(user_id = %session.user_id, "Sign-in successful");
        self.install_session(session, SessionChangeTag::SignedIn);

        Ok(())
    }

    async fn sign_out(&self) -> TransportResult<()> {
        let access_token = {
            let session = self.session.lock().unwrap();
            session.as_ref().map(|s| s.access_token.clone())
        };

        if let Some(token) = access_token {
            let url = self.auth_url("logout");
            let response = self
                .http_client
                .post(&url)
                .header("apikey", &self.publishable_key)
                .header("Authorization", format!("Bearer {}", token))
                .send()
                .await;

            // Server-side revocation failure still clears the local session;
            // the user asked to leave.
            match response {
                Ok(r) if !r.status().is_success() => {
                    warn!(status = %r.status(), "Logout revocation failed, clearing locally");
                }
                Err(e) => {
                    warn!("Logout request failed, clearing locally: {}", e);
                }
                _ => {}
            }
        }

        info!("Signed out");
        self.clear_session(SessionChangeTag::SignedOut);
        Ok(())
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> TransportResult<()> {
        let url = self.auth_url("recover");
        debug!(url = %url, email = %email, "Requesting password reset");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&RecoverRequest {
                email,
                redirect_to: redirect_url,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        info!(email = %email, "Password reset requested");
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }

    async fn refresh_session(&self) -> TransportResult<Session> {
        let refresh_token = {
            let session = self.session.lock().unwrap();
            session
                .as_ref()
                .map(|s| s.refresh_token.clone())
                .ok_or(TransportError::NotSignedIn)?
        };

        let url = self.auth_url("token?grant_type=refresh_token");
        debug!(url = %url, "Refreshing session");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: TokenResponse = response.json().await?;
        let session = self.session_from_response(body)?;
        info!(user_id = %session.user_id, "Session refreshed");
        self.install_session(session.clone(), SessionChangeTag::TokenRefreshed);

        Ok(session)
    }

    fn subscribe(&self, callback: SessionChangeCallback) -> Subscription {
        self.subscribers.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn fake_jwt(sub: &str, exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload =
            URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}","exp":{}}}"#, sub, exp));
        format!("{}.{}.sig", header, payload)
    }

    fn transport() -> HttpSessionTransport {
        HttpSessionTransport::new("https://test.fable.app", "test-key")
    }

    #[test]
    fn test_from_config_uses_configured_provider() {
        let config = fable_config::Config::default();
        let t = HttpSessionTransport::from_config(&config);

        assert_eq!(
            t.auth_url("signup"),
            format!("{}/auth/v1/signup", config.api_url)
        );
        assert_eq!(t.publishable_key, config.publishable_key);
    }

    #[test]
    fn test_session_from_response_with_user() {
        let t = transport();
        let body = TokenResponse {
            access_token: Some(fake_jwt("claims-user", 1_800_000_000)),
            refresh_token: Some("rt".to_string()),
            expires_in: Some(3600),
            user: Some(TokenUser {
                id: "body-user".to_string(),
                email: Some("a@b.c".to_string()),
            }),
        };

        let session = t.session_from_response(body).unwrap();
        // The body's user object wins over the JWT claims.
        assert_eq!(session.user_id, "body-user");
        assert_eq!(session.email.as_deref(), Some("a@b.c"));
        assert!(session.expires_at > Utc::now());
    }

    #[test]
    fn test_session_from_response_falls_back_to_claims() {
        let t = transport();
        let body = TokenResponse {
            access_token: Some(fake_jwt("claims-user", 1_800_000_000)),
            refresh_token: None,
            expires_in: None,
            user: None,
        };

        let session = t.session_from_response(body).unwrap();
        assert_eq!(session.user_id, "claims-user");
        assert_eq!(session.expires_at, expiry_from_claim(1_800_000_000));
    }

    #[test]
    fn test_session_from_response_without_token_errors() {
        let t = transport();
        let body = TokenResponse {
            access_token: None,
            refresh_token: None,
            expires_in: None,
            user: None,
        };

        assert!(t.session_from_response(body).is_err());
    }

    #[test]
    fn test_install_and_clear_notify_subscribers() {
        let t = transport();
        let seen: std::sync::Arc<std::sync::Mutex<Vec<SessionChangeTag>>> = Default::default();

        let seen_clone = seen.clone();
        let sub = t.subscribe(Box::new(move |change| {
            seen_clone.lock().unwrap().push(change.tag);
        }));

        let session = Session {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            user_id: "u1".to_string(),
            email: None,
            expires_at: Utc::now() + Duration::hours(1),
        };

        t.install_session(session.clone(), SessionChangeTag::SignedIn);
        assert_eq!(t.current_session(), Some(session));

        t.clear_session(SessionChangeTag::SignedOut);
        assert_eq!(t.current_session(), None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![SessionChangeTag::SignedIn, SessionChangeTag::SignedOut]
        );
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_refresh_without_session_is_not_signed_in() {
        let t = transport();
        match t.refresh_session().await {
            Err(TransportError::NotSignedIn) => {}
            other => panic!("Expected NotSignedIn, got {:?}", other.map(|_| ())),
        }
    }
}
