use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::hash::{hash_password, mask_hash};
use super::types::{Credentials, LoginRequest, SessionToken};
use crate::error::{
    truncate, AuthError, OpenListError, Result, ERROR_SNIPPET_LEN, MISSING_TOKEN_SNIPPET_LEN,
};

/// Login endpoint relative to the host
pub const LOGIN_PATH: &str = "/api/auth/login/hash";

/// Nominal token lifetime; the server does not report an expiry
pub const TOKEN_LIFETIME_HOURS: i64 = 48;

/// Fraction of the lifetime after which a token is refreshed
pub const REFRESH_RATIO: f64 = 0.75;

/// Characters of a login response written to debug logs
const LOG_BODY_LEN: usize = 500;

/// Authentication manager
/// Holds the session token and re-logs in when it goes stale
pub struct AuthManager {
    /// Server address and login credentials
    credentials: Credentials,

    /// Current token, absent before first login and after invalidation
    token: RwLock<Option<SessionToken>>,

    /// Serialises stale-check and login so concurrent callers log in once
    login_lock: Mutex<()>,

    /// HTTP client for login requests
    client: Client,

    /// Age after which the token counts as stale
    refresh_after: Duration,
}

impl AuthManager {
    /// Create a new AuthManager sharing an existing HTTP client
    pub fn new(credentials: Credentials, client: Client) -> Self {
        let refresh_after_secs = (TOKEN_LIFETIME_HOURS * 3600) as f64 * REFRESH_RATIO;

        Self {
            credentials,
            token: RwLock::new(None),
            login_lock: Mutex::new(()),
            client,
            refresh_after: Duration::seconds(refresh_after_secs as i64),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Install a token directly, bypassing login
    /// Available in test builds and integration tests
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn set_token_for_testing(&self, value: &str, acquired_at: DateTime<Utc>) {
        *self.token.write().await = Some(SessionToken {
            value: value.to_string(),
            acquired_at,
        });
    }

    /// Current token value, if any
    pub async fn current_token(&self) -> Option<String> {
        self.token.read().await.as_ref().map(|t| t.value.clone())
    }

    /// Log in unconditionally and store the new token
    pub async fn login(&self) -> Result<()> {
        let _guard = self.login_lock.lock().await;
        self.login_locked().await
    }

    /// Check staleness against the current time
    pub async fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now()).await
    }

    /// True if no token is held or it is older than the refresh threshold at `now`
    pub async fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        let token = self.token.read().await;

        match *token {
            None => {
                tracing::debug!("No token held, login required");
                true
            }
            Some(ref t) => {
                let elapsed = now - t.acquired_at;
                let stale = elapsed > self.refresh_after;
                tracing::debug!(
                    elapsed_secs = elapsed.num_seconds(),
                    threshold_secs = self.refresh_after.num_seconds(),
                    stale,
                    "Token age check"
                );
                stale
            }
        }
    }

    /// Log in if the held token is stale
    pub async fn ensure_fresh(&self) -> Result<()> {
        let _guard = self.login_lock.lock().await;
        if self.is_stale().await {
            tracing::debug!("Token stale or missing, logging in");
            self.login_locked().await?;
        }
        Ok(())
    }

    /// Get a fresh token for an outbound request, logging in first if needed
    pub async fn access_token(&self) -> Result<String> {
        let _guard = self.login_lock.lock().await;
        if self.is_stale().await {
            tracing::debug!("Token stale or missing, logging in");
            self.login_locked().await?;
        }
        self.token_value().await
    }

    /// Drop the held token
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    /// Discard the token and log in again regardless of its age
    /// Used after the server rejected a request as unauthorized
    pub async fn relogin(&self) -> Result<String> {
        let _guard = self.login_lock.lock().await;
        self.invalidate().await;
        self.login_locked().await?;
        self.token_value().await
    }

    async fn token_value(&self) -> Result<String> {
        self.current_token().await.ok_or_else(|| {
            OpenListError::from(AuthError::MissingToken {
                body: String::new(),
            })
        })
    }

    /// Login exchange; caller must hold `login_lock`
    async fn login_locked(&self) -> Result<()> {
        let url = format!("{}{}", self.credentials.host, LOGIN_PATH);
        let password_hash = hash_password(&self.credentials.password);

        tracing::debug!(
            url = %url,
            username = %self.credentials.username,
            password = %mask_hash(&password_hash),
            "Sending login request"
        );

        let body = LoginRequest {
            username: &self.credentials.username,
            password: &password_hash,
            otp_code: "",
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, error = %e, "Login request failed");
                OpenListError::Transport(e)
            })?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        tracing::debug!(
            status,
            body = %truncate(&text, LOG_BODY_LEN),
            "Received login response"
        );

        if status != 200 {
            tracing::error!(status, "Login rejected");
            return Err(AuthError::Status {
                status,
                body: truncate(&text, ERROR_SNIPPET_LEN),
            }
            .into());
        }

        let json: Value = serde_json::from_str(&text).map_err(|_| AuthError::NotJson {
            body: truncate(&text, ERROR_SNIPPET_LEN),
        })?;

        let token = json
            .pointer("/data/token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MissingToken {
                body: truncate(&json.to_string(), MISSING_TOKEN_SNIPPET_LEN),
            })?;

        *self.token.write().await = Some(SessionToken {
            value: token.to_string(),
            acquired_at: Utc::now(),
        });

        tracing::info!(
            "Login successful (token valid for {}h, refresh after {}h)",
            TOKEN_LIFETIME_HOURS,
            self.refresh_after.num_hours()
        );

        Ok(())
    }
}
