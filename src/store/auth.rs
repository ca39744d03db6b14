//! OAuth2 access tokens for a Google service account (JWT bearer grant).

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{StoreError, StoreResult};

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Serialize, Debug)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone, Debug)]
struct AccessToken {
    value: String,
    expires_at: i64,
}

impl AccessToken {
    fn is_fresh(&self, now: i64) -> bool {
        now + REFRESH_MARGIN_SECS < self.expires_at
    }
}

pub(crate) struct ServiceAccount {
    client_email: String,
    key: EncodingKey,
    cached: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    pub(crate) fn new(client_email: &str, private_key_pem: &str) -> StoreResult<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
        Ok(Self {
            client_email: client_email.to_string(),
            key,
            cached: Mutex::new(None),
        })
    }

    /// A bearer token, reusing the cached one until shortly before it expires.
    pub(crate) async fn token(&self, http: &Client) -> StoreResult<String> {
        let now = Utc::now().timestamp();
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.fetch(http, now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn assertion(&self, now: i64) -> StoreResult<String> {
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: TOKEN_URI,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.key)?)
    }

    async fn fetch(&self, http: &Client, now: i64) -> StoreResult<AccessToken> {
        debug!(client_email = %self.client_email, "Requesting access token");

        let assertion = self.assertion(now)?;
        let response = http
            .post(TOKEN_URI)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_refreshed_before_expiry() {
        let token = AccessToken {
            value: "abc".into(),
            expires_at: 1_000,
        };
        assert!(token.is_fresh(900));
        assert!(!token.is_fresh(940));
        assert!(!token.is_fresh(1_000));
    }

    #[test]
    fn rejects_a_key_that_is_not_pem() {
        let err = ServiceAccount::new("blog@example.iam.gserviceaccount.com", "not a key")
            .unwrap_err();
        assert!(matches!(err, StoreError::Jwt(_)));
    }

    #[test]
    fn parses_token_endpoint_response() {
        let body = r#"{"access_token":"ya29.x","expires_in":3599,"token_type":"Bearer"}"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(token.access_token, "ya29.x");
        assert_eq!(token.expires_in, 3599);
    }
}
