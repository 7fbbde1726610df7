//! IAM bearer token exchange
//!
//! API keys are not sent to the storage service directly. They are exchanged
//! at the IAM token service for a short-lived bearer token, which is cached
//! and refreshed shortly before it expires.

use crate::cos::error::{CosError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default IAM token service
pub const DEFAULT_IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

const API_KEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens closer than this to expiry are refreshed
const REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token service reports none
const DEFAULT_LIFETIME_SECS: i64 = 3600;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Absolute expiry, seconds since the epoch
    #[serde(default)]
    expiration: Option<i64>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - ChronoDuration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Exchanges an API key for bearer tokens and caches the result
pub struct IamTokenProvider {
    api_key: String,
    token_url: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl IamTokenProvider {
    /// Create a provider. No request is made until [`token`](Self::token) is called.
    pub fn new(api_key: &str, token_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CosError::ClientConstruction(format!("IAM HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.to_string(),
            token_url: token_url.to_string(),
            http,
            cached: Mutex::new(None),
        })
    }

    /// Current bearer token, requesting a new one if the cached token is stale
    pub async fn token(&self) -> Result<String> {
        // Held across the request so concurrent callers share one refresh
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.access_token.clone());
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn request_token(&self) -> Result<CachedToken> {
        tracing::debug!("Requesting IAM token from {}", self.token_url);

        let response = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[("grant_type", API_KEY_GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| CosError::Token(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CosError::Token(format!("status {}: {}", status, body)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CosError::Token(format!("invalid token response: {}", e)))?;

        let now = Utc::now();
        let expires_at = body
            .expiration
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| {
                now + ChronoDuration::seconds(body.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS))
            });

        tracing::debug!("IAM token obtained, expires at {}", expires_at);

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at,
        })
    }
}

impl fmt::Debug for IamTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamTokenProvider")
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}
