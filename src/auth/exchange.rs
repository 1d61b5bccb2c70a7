// OAuth grants and the api/authorize exchange

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::Value;

use super::credentials::Credentials;
use super::types::{OAuthTokenResponse, TokenData};
use crate::error::{ClientError, Result};
use crate::models::envelope::{parse_error_body, Envelope};

/// Password grant: username and password for a new token set
pub async fn password_grant(
    client: &Client,
    oauth_url: &str,
    creds: &Credentials,
) -> Result<TokenData> {
    tracing::info!(username = creds.username(), "Requesting token via password grant");

    let form = [
        ("client_id", creds.client_id()),
        ("client_secret", creds.client_secret()),
        ("username", creds.username()),
        ("password", creds.password()),
        ("grant_type", "password"),
        ("scope", "openid"),
    ];

    request_token(client, oauth_url, &form, "password").await
}

/// Refresh grant: mint a new login token without the password
pub async fn refresh_grant(
    client: &Client,
    oauth_url: &str,
    creds: &Credentials,
    refresh_token: &str,
) -> Result<TokenData> {
    tracing::info!("Requesting token via refresh grant");

    let form = [
        ("client_id", creds.client_id()),
        ("client_secret", creds.client_secret()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    request_token(client, oauth_url, &form, "refresh_token").await
}

async fn request_token(
    client: &Client,
    oauth_url: &str,
    form: &[(&str, &str)],
    grant: &str,
) -> Result<TokenData> {
    let response = client.post(oauth_url).form(form).send().await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            grant = grant,
            status = status.as_u16(),
            body = %body,
            "OAuth token request failed"
        );
        return Err(ClientError::AuthError {
            status: i64::from(status.as_u16()),
            payload: parse_error_body(&body),
        });
    }

    let data: OAuthTokenResponse = serde_json::from_str(&body)
        .map_err(|e| ClientError::Decode(format!("OAuth token response: {}", e)))?;

    let expires_at = Duration::try_seconds(data.expires_in)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| {
            ClientError::Decode(format!(
                "OAuth token response: expires_in {} is out of range",
                data.expires_in
            ))
        })?;

    tracing::info!(
        grant = grant,
        expires = %expires_at.to_rfc3339(),
        "Login token obtained"
    );

    Ok(TokenData {
        login_token: data.id_token,
        refresh_token: data.refresh_token,
        access_token: data.access_token,
        expires_at,
    })
}

/// Exchange a login token for a resource-scoped data token
pub async fn authorize_data_token(
    client: &Client,
    authorize_url: &str,
    login_token: &str,
) -> Result<String> {
    tracing::debug!(url = authorize_url, "Exchanging login token for data token");

    let response = client
        .post(authorize_url)
        .form(&[("authenticationToken", login_token)])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    let envelope = serde_json::from_str::<Envelope>(&body).ok();

    match envelope {
        Some(envelope) if status.is_success() && envelope.is_success() => match envelope.o {
            Value::String(token) => {
                tracing::info!("Data token obtained");
                Ok(token)
            }
            other => Err(ClientError::Decode(format!(
                "api/authorize returned a non-string token: {}",
                other
            ))),
        },
        Some(envelope) if status.is_success() => {
            tracing::error!(code = envelope.c, error = %envelope.e, "api/authorize rejected");
            Err(ClientError::AuthError {
                status: envelope.c,
                payload: envelope.e,
            })
        }
        _ => {
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "api/authorize request failed"
            );
            Err(ClientError::AuthError {
                status: i64::from(status.as_u16()),
                payload: parse_error_body(&body),
            })
        }
    }
}
