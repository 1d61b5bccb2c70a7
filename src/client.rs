// Public client: every data operation is gated on TokenManager::ensure_valid

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Credentials, TokenManager};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http_client::{build_client, DataRequestProxy};
use crate::models::transactions::{format_date, last_page_offset};
use crate::models::{Card, CardDetails, RequestContext, TransactionPage, YearTransactions, PAGE_SIZE};

/// OV-chipkaart API client
pub struct OvChipkaartClient {
    tokens: Arc<TokenManager>,
    proxy: DataRequestProxy,
    locale: String,
    page_delay: Duration,
}

impl OvChipkaartClient {
    /// Client against the production endpoints
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let client = build_client(&config)?;
        let tokens = Arc::new(TokenManager::new(credentials, &config, client.clone()));

        Ok(Self {
            tokens,
            locale: config.locale.clone(),
            page_delay: config.page_delay,
            proxy: DataRequestProxy::new(client, config),
        })
    }

    /// Token manager backing this client
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Full login and authorization exchange, returns the data token
    pub async fn authorize(&self) -> Result<String> {
        self.tokens.authorize().await
    }

    /// Cards registered on the account
    pub async fn get_cards(&self) -> Result<Vec<Card>> {
        let token = self.tokens.ensure_valid().await?;
        self.proxy
            .post("cards/list", &token, &[("locale", self.locale.clone())])
            .await
    }

    /// Detailed information for one card
    pub async fn get_detailed_card_info(&self, medium_id: &str) -> Result<CardDetails> {
        require_medium_id(medium_id)?;

        let token = self.tokens.ensure_valid().await?;
        self.proxy
            .post(
                "card/",
                &token,
                &[
                    ("mediumId", medium_id.to_string()),
                    ("locale", self.locale.clone()),
                ],
            )
            .await
    }

    /// One page of transactions starting at `offset`
    pub async fn get_transactions(
        &self,
        medium_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        offset: u64,
    ) -> Result<TransactionPage> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(ClientError::ValidationError(format!(
                    "startDate {} is after endDate {}",
                    format_date(start),
                    format_date(end)
                )));
            }
        }

        let context = RequestContext::new(start_date, end_date, offset);
        self.get_transactions_next(medium_id, &context).await
    }

    /// Page addressed by a continuation context, usually the
    /// `next_request_context` of a previous page
    pub async fn get_transactions_next(
        &self,
        medium_id: &str,
        context: &RequestContext,
    ) -> Result<TransactionPage> {
        require_medium_id(medium_id)?;

        let mut fields = vec![
            ("mediumId", medium_id.to_string()),
            ("locale", self.locale.clone()),
        ];
        fields.extend(context.form_fields());

        let token = self.tokens.ensure_valid().await?;
        let page: TransactionPage = self.proxy.post("transactions", &token, &fields).await?;

        tracing::debug!(
            offset = context.offset(),
            records = page.records.len(),
            total = page.total_size,
            "Fetched transactions page"
        );

        Ok(page)
    }

    /// Every transaction of `year`, fetched page by page with `delay`
    /// between requests. The first failure aborts the whole fetch.
    pub async fn get_transactions_year(
        &self,
        medium_id: &str,
        year: i32,
        delay: Option<Duration>,
    ) -> Result<YearTransactions> {
        require_medium_id(medium_id)?;
        let (start, end) = year_bounds(year)?;
        let delay = delay.unwrap_or(self.page_delay);

        let first = self
            .get_transactions(medium_id, Some(start), Some(end), 0)
            .await?;
        let total_size = first.total_size;
        let last = last_page_offset(total_size);
        let mut records = first.records;

        tracing::info!(year, total = total_size, "Fetching transaction year");

        let mut offset = 0;
        while offset < last {
            offset += PAGE_SIZE;
            tokio::time::sleep(delay).await;

            let page = self
                .get_transactions(medium_id, Some(start), Some(end), offset)
                .await?;
            records.extend(page.records);
        }

        Ok(YearTransactions {
            year,
            total_size,
            records,
        })
    }
}

fn require_medium_id(medium_id: &str) -> Result<()> {
    if medium_id.trim().is_empty() {
        return Err(ClientError::missing("mediumId"));
    }
    Ok(())
}

/// First and last day of a calendar year
fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    if !(1900..=9999).contains(&year) {
        return Err(ClientError::ValidationError(format!(
            "year {} is out of range",
            year
        )));
    }

    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    start
        .zip(end)
        .ok_or_else(|| ClientError::ValidationError(format!("year {} is out of range", year)))
}
