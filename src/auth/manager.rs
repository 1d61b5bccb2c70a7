use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::Mutex;

use super::credentials::Credentials;
use super::exchange;
use super::types::TokenState;
use crate::config::ClientConfig;
use crate::error::Result;

/// Token manager
/// Owns the login, refresh and data tokens and renews them on demand.
/// Every check-then-renew sequence runs under one async mutex, so concurrent
/// callers trigger a single renewal and then observe its result.
pub struct TokenManager {
    credentials: Credentials,

    /// OAuth token endpoint
    oauth_url: String,

    /// api/authorize endpoint
    authorize_url: String,

    /// HTTP client shared with the data proxy
    client: Client,

    state: Mutex<TokenState>,
}

impl TokenManager {
    pub fn new(credentials: Credentials, config: &ClientConfig, client: Client) -> Self {
        Self {
            credentials,
            oauth_url: config.oauth_url.clone(),
            authorize_url: config.api_url("api/authorize"),
            client,
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Return the cached login token, or run the password grant
    pub async fn login(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        self.login_locked(&mut state).await
    }

    /// Cold path: login, then exchange the login token for a data token
    pub async fn authorize(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        self.authorize_locked(&mut state).await
    }

    /// Return a valid data token, renewing it when it has expired.
    /// Renewal prefers the refresh grant and falls back to `authorize`
    /// only while no refresh token is held.
    pub async fn ensure_valid(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.valid_data_token(Utc::now()) {
            return Ok(token.to_string());
        }

        let Some(refresh_token) = state.refresh_token.clone() else {
            tracing::debug!("No refresh token held, running full authorization");
            return self.authorize_locked(&mut state).await;
        };

        tracing::debug!("Data token expired, renewing via refresh token");
        let grant = exchange::refresh_grant(
            &self.client,
            &self.oauth_url,
            &self.credentials,
            &refresh_token,
        )
        .await?;
        state.store_grant(grant);

        self.exchange_locked(&mut state).await
    }

    /// Whether a refresh token has been obtained
    pub async fn has_refresh_token(&self) -> bool {
        self.state.lock().await.refresh_token.is_some()
    }

    pub async fn login_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.login_expires_at
    }

    pub async fn data_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.data_expires_at
    }

    async fn login_locked(&self, state: &mut TokenState) -> Result<String> {
        if let Some(token) = state.valid_login_token(Utc::now()) {
            tracing::debug!("Using cached login token");
            return Ok(token.to_string());
        }

        let grant =
            exchange::password_grant(&self.client, &self.oauth_url, &self.credentials).await?;
        let token = grant.login_token.clone();
        state.store_grant(grant);
        Ok(token)
    }

    async fn authorize_locked(&self, state: &mut TokenState) -> Result<String> {
        self.login_locked(state).await?;
        self.exchange_locked(state).await
    }

    /// Exchange the held login token and store the resulting data token
    async fn exchange_locked(&self, state: &mut TokenState) -> Result<String> {
        let login_token = state
            .login_token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No login token to exchange"))?;

        let data_token =
            exchange::authorize_data_token(&self.client, &self.authorize_url, &login_token)
                .await?;
        state.store_data_token(data_token.clone());
        Ok(data_token)
    }
}
