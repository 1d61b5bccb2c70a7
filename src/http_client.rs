use anyhow::Context;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::envelope::{parse_error_body, Envelope};

/// Build the shared HTTP client used for OAuth and resource calls
pub fn build_client(config: &ClientConfig) -> Result<Client> {
    let client = Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
        .context("Failed to create HTTP client")?;
    Ok(client)
}

/// Resource API caller
/// Attaches the data token to each call and unwraps the `{c, o, e}` envelope
pub struct DataRequestProxy {
    client: Client,
    config: ClientConfig,
}

impl DataRequestProxy {
    pub fn new(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// POST `fields` plus `authorizationToken` to `path` and decode the
    /// envelope output as `T`
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        data_token: &str,
        fields: &[(&str, String)],
    ) -> Result<T> {
        let url = self.config.api_url(path);

        let mut form: Vec<(&str, &str)> = Vec::with_capacity(fields.len() + 1);
        form.push(("authorizationToken", data_token));
        form.extend(fields.iter().map(|(k, v)| (*k, v.as_str())));

        tracing::debug!(url = %url, "Sending resource request");

        let response = self.client.post(&url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Received resource response");

        let envelope = match serde_json::from_str::<Envelope>(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(ClientError::Decode(format!("{}: {}", path, e)));
            }
            Err(_) => {
                tracing::error!(
                    status = status.as_u16(),
                    url = %url,
                    response_body = %body,
                    "Resource request failed with error response"
                );
                return Err(ClientError::RequestError {
                    code: i64::from(status.as_u16()),
                    payload: parse_error_body(&body),
                });
            }
        };

        if !envelope.is_success() {
            tracing::warn!(
                code = envelope.c,
                url = %url,
                error = %envelope.e,
                "Resource call returned error envelope"
            );
            return Err(ClientError::RequestError {
                code: envelope.c,
                payload: envelope.e,
            });
        }

        serde_json::from_value(envelope.o)
            .map_err(|e| ClientError::Decode(format!("{}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn proxy_for(server: &mockito::Server) -> DataRequestProxy {
        let config = ClientConfig::with_base(&server.url());
        DataRequestProxy::new(build_client(&config).unwrap(), config)
    }

    #[tokio::test]
    async fn test_attaches_token_and_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/femobilegateway/v1/card/")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("authorizationToken".into(), "D".into()),
                mockito::Matcher::UrlEncoded("mediumId".into(), "42".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"c":200,"o":{"mediumId":"42"},"e":null}"#)
            .create_async()
            .await;

        let proxy = proxy_for(&server).await;
        let out: Value = proxy
            .post("card/", "D", &[("mediumId", "42".to_string())])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out, json!({"mediumId": "42"}));
    }

    #[tokio::test]
    async fn test_http_error_without_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/femobilegateway/v1/cards/list")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let proxy = proxy_for(&server).await;
        let err = proxy
            .post::<Value>("cards/list", "D", &[])
            .await
            .unwrap_err();

        assert_eq!(err.remote_code(), Some(502));
        assert_eq!(err.remote_payload(), Some(&json!("Bad Gateway")));
    }

    #[tokio::test]
    async fn test_success_with_unexpected_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/femobilegateway/v1/cards/list")
            .with_status(200)
            .with_body(r#"{"c":200,"o":"not a list","e":null}"#)
            .create_async()
            .await;

        let proxy = proxy_for(&server).await;
        let err = proxy
            .post::<Vec<Value>>("cards/list", "D", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Decode(_)));
    }
}
