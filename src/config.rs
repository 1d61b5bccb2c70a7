use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dialoguer::Password;
use std::time::Duration;

use crate::auth::Credentials;

pub const DEFAULT_OAUTH_URL: &str = "https://login.ov-chipkaart.nl/oauth2/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api2.ov-chipkaart.nl/femobilegateway/v1/";
pub const DEFAULT_LOCALE: &str = "nl-NL";

/// Delay between year pages when the caller does not pick one
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1000;

/// Client configuration: endpoints, locale and transport timeouts
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// OAuth token endpoint (password and refresh grants)
    pub oauth_url: String,

    /// Base URL of the resource API, operation paths are appended to it
    pub api_base_url: String,

    /// Locale sent with card and transaction calls
    pub locale: String,

    pub connect_timeout: Duration,
    pub request_timeout: Duration,

    /// Pause between pages in `get_transactions_year`
    pub page_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
        }
    }
}

impl ClientConfig {
    /// Point both endpoints at one host, used against local mock servers
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            oauth_url: format!("{}/oauth2/token", base),
            api_base_url: format!("{}/femobilegateway/v1/", base),
            ..Self::default()
        }
    }

    /// Resolve an operation path against the API base URL
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// OV-chipkaart command line client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Account username (e-mail address)
    #[arg(short, long, env = "OV_USERNAME")]
    pub username: String,

    /// Account password, prompted for when absent
    #[arg(short, long, env = "OV_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// OAuth client id
    #[arg(long, env = "OV_CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret
    #[arg(long, env = "OV_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// OAuth token endpoint
    #[arg(long, env = "OV_OAUTH_URL", default_value = DEFAULT_OAUTH_URL)]
    pub oauth_url: String,

    /// Resource API base URL
    #[arg(long, env = "OV_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Locale sent with data calls
    #[arg(long, env = "OV_LOCALE", default_value = DEFAULT_LOCALE)]
    pub locale: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the full login and authorization exchange and print token status
    Authorize,

    /// List the cards registered on the account
    Cards,

    /// Show detailed information for one card
    Card {
        #[arg(short, long)]
        medium_id: String,
    },

    /// Fetch one page of transactions
    Transactions {
        #[arg(short, long)]
        medium_id: String,

        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long, default_value = "0")]
        offset: u64,
    },

    /// Fetch the page following a printed request context
    Next {
        #[arg(short, long)]
        medium_id: String,

        /// `nextRequestContext` JSON from a previous page
        #[arg(long)]
        context: String,
    },

    /// Fetch every transaction of a calendar year
    Year {
        #[arg(short, long)]
        medium_id: String,

        #[arg(short, long)]
        year: i32,

        /// Delay between pages in milliseconds
        #[arg(long, default_value_t = DEFAULT_PAGE_DELAY_MS)]
        delay_ms: u64,
    },
}

/// Resolved binary configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub credentials: Credentials,
    pub client: ClientConfig,
    pub log_level: String,
    pub log_json: bool,
    pub command: Command,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();

        let password = match args.password {
            Some(password) => password,
            None => prompt_password(&args.username)?,
        };

        let credentials =
            Credentials::new(args.username, password, args.client_id, args.client_secret)
                .context("Invalid credentials")?;

        let client = ClientConfig {
            oauth_url: args.oauth_url,
            api_base_url: args.api_base_url,
            locale: args.locale,
            request_timeout: Duration::from_secs(args.http_timeout),
            ..ClientConfig::default()
        };

        Ok(Config {
            credentials,
            client,
            log_level: args.log_level,
            log_json: args.log_json,
            command: args.command,
        })
    }
}

/// Ask for the account password on the terminal
fn prompt_password(username: &str) -> Result<String> {
    let password: String = Password::new()
        .with_prompt(format!("Password for {}", username))
        .interact()
        .context("Failed to read password")?;

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty (use -p or set OV_PASSWORD)");
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let config = ClientConfig::default();
        assert_eq!(config.oauth_url, DEFAULT_OAUTH_URL);
        assert_eq!(config.locale, "nl-NL");
        assert_eq!(
            config.api_url("api/authorize"),
            "https://api2.ov-chipkaart.nl/femobilegateway/v1/api/authorize"
        );
    }

    #[test]
    fn test_api_url_slashes() {
        let config = ClientConfig::default();
        assert_eq!(
            config.api_url("/cards/list"),
            "https://api2.ov-chipkaart.nl/femobilegateway/v1/cards/list"
        );
        assert_eq!(
            config.api_url("card/"),
            "https://api2.ov-chipkaart.nl/femobilegateway/v1/card/"
        );
    }

    #[test]
    fn test_with_base() {
        let config = ClientConfig::with_base("http://127.0.0.1:1234/");
        assert_eq!(config.oauth_url, "http://127.0.0.1:1234/oauth2/token");
        assert_eq!(
            config.api_url("transactions"),
            "http://127.0.0.1:1234/femobilegateway/v1/transactions"
        );
    }

    #[test]
    fn test_cli_parses_year_command() {
        let args = CliArgs::try_parse_from([
            "ovchip",
            "--username",
            "user@example.com",
            "--password",
            "secret",
            "--client-id",
            "id",
            "--client-secret",
            "shh",
            "year",
            "--medium-id",
            "1234",
            "--year",
            "2024",
        ])
        .unwrap();

        assert_eq!(args.username, "user@example.com");
        match args.command {
            Command::Year {
                medium_id,
                year,
                delay_ms,
            } => {
                assert_eq!(medium_id, "1234");
                assert_eq!(year, 2024);
                assert_eq!(delay_ms, DEFAULT_PAGE_DELAY_MS);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_transaction_dates() {
        let args = CliArgs::try_parse_from([
            "ovchip",
            "-u",
            "user",
            "-p",
            "pw",
            "--client-id",
            "id",
            "--client-secret",
            "shh",
            "transactions",
            "-m",
            "42",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
        ])
        .unwrap();

        match args.command {
            Command::Transactions {
                start, end, offset, ..
            } => {
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 31));
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
