// Authentication types

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Tokens minted by one OAuth grant
#[derive(Debug, Clone)]
pub struct TokenData {
    /// The `id_token`, exchanged for a data token
    pub login_token: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// OAuth token endpoint response
#[derive(Deserialize)]
pub struct OAuthTokenResponse {
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_in: i64,
}

/// Token state held by the manager, all fields start empty
#[derive(Debug, Default)]
pub(crate) struct TokenState {
    pub login_token: Option<String>,
    pub refresh_token: Option<String>,
    pub data_token: Option<String>,
    pub login_expires_at: Option<DateTime<Utc>>,
    pub data_expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Cached login token, when one exists and has not expired
    pub fn valid_login_token(&self, now: DateTime<Utc>) -> Option<&str> {
        valid(self.login_token.as_deref(), self.login_expires_at, now)
    }

    /// Cached data token, when one exists and has not expired
    pub fn valid_data_token(&self, now: DateTime<Utc>) -> Option<&str> {
        valid(self.data_token.as_deref(), self.data_expires_at, now)
    }

    /// Overwrite login-side fields with a fresh grant
    pub fn store_grant(&mut self, data: TokenData) {
        self.login_token = Some(data.login_token);
        self.login_expires_at = Some(data.expires_at);
        // A refresh grant may omit the refresh token; keep the one we hold
        if let Some(refresh_token) = data.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
    }

    /// Overwrite the data token, co-expiring with the login token it came from
    pub fn store_data_token(&mut self, token: String) {
        self.data_token = Some(token);
        self.data_expires_at = self.login_expires_at;
    }
}

fn valid(token: Option<&str>, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<&str> {
    match (token, expires_at) {
        (Some(token), Some(exp)) if now < exp => Some(token),
        _ => None,
    }
}
