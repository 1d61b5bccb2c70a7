use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;

use ovchip_client::config::{Command, Config};
use ovchip_client::models::RequestContext;
use ovchip_client::OvChipkaartClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_logging(&config);

    tracing::debug!(
        oauth_url = %config.client.oauth_url,
        api_base_url = %config.client.api_base_url,
        "Configuration loaded"
    );

    let client = OvChipkaartClient::with_config(config.credentials.clone(), config.client.clone())?;

    match config.command {
        Command::Authorize => {
            let token = client.authorize().await?;
            let tokens = client.tokens();
            print_json(&serde_json::json!({
                "dataToken": token_preview(&token),
                "hasRefreshToken": tokens.has_refresh_token().await,
                "loginExpiresAt": tokens.login_expires_at().await,
                "dataExpiresAt": tokens.data_expires_at().await,
            }))?;
        }
        Command::Cards => {
            print_json(&client.get_cards().await?)?;
        }
        Command::Card { medium_id } => {
            print_json(&client.get_detailed_card_info(&medium_id).await?)?;
        }
        Command::Transactions {
            medium_id,
            start,
            end,
            offset,
        } => {
            let page = client.get_transactions(&medium_id, start, end, offset).await?;
            print_json(&page)?;
        }
        Command::Next { medium_id, context } => {
            let context: RequestContext =
                serde_json::from_str(&context).context("Invalid request context JSON")?;
            print_json(&client.get_transactions_next(&medium_id, &context).await?)?;
        }
        Command::Year {
            medium_id,
            year,
            delay_ms,
        } => {
            let result = client
                .get_transactions_year(&medium_id, year, Some(Duration::from_millis(delay_ms)))
                .await?;
            tracing::info!(
                records = result.records.len(),
                total = result.total_size,
                "Year fetched"
            );
            print_json(&result)?;
        }
    }

    Ok(())
}

/// Install the tracing subscriber; RUST_LOG wins over the configured level
fn init_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.log_json {
        builder.json().init();
    } else {
        builder.with_file(true).with_line_number(true).init();
    }
}

/// First characters of a token, safe for display
fn token_preview(token: &str) -> String {
    format!("{}...", token.chars().take(8).collect::<String>())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_preview_is_char_safe() {
        assert_eq!(token_preview("abcdefghijkl"), "abcdefgh...");
        assert_eq!(token_preview("abc"), "abc...");
        // Multi-byte character straddling byte 8
        assert_eq!(token_preview("abcdefgé-rest"), "abcdefgé...");
        assert_eq!(token_preview("ééééééééé"), "éééééééé...");
    }
}
