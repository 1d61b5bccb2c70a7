use chrono::{DateTime, NaiveDate, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Records per transactions page
pub const PAGE_SIZE: u64 = 20;

/// Server-supplied continuation context, opaque to callers.
/// Returned on each page and passed back to fetch the following one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    offset: u64,
}

impl RequestContext {
    pub(crate) fn new(start: Option<NaiveDate>, end: Option<NaiveDate>, offset: u64) -> Self {
        Self {
            start_date: start.map(format_date),
            end_date: end.map(format_date),
            offset,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Form fields for a `transactions` call resuming at this context
    pub(crate) fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("offset", self.offset.to_string())];
        if let Some(ref start) = self.start_date {
            fields.push(("startDate", start.clone()));
        }
        if let Some(ref end) = self.end_date {
            fields.push(("endDate", end.clone()));
        }
        fields
    }
}

/// One transaction, with its timestamp truncated to whole seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Absent on some records; one missing timestamp does not reject the page
    #[serde(default, deserialize_with = "deserialize_truncated")]
    pub transaction_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transaction_name: Option<String>,
    #[serde(default)]
    pub transaction_info: Option<String>,
    #[serde(default)]
    pub check_in_info: Option<String>,
    #[serde(default)]
    pub check_in_text: Option<String>,
    #[serde(default)]
    pub fare: Option<f64>,
    #[serde(default)]
    pub fare_text: Option<String>,
    #[serde(default)]
    pub modal_type: Option<String>,
    #[serde(default)]
    pub product_info: Option<String>,
    #[serde(default)]
    pub pto: Option<String>,
    #[serde(default)]
    pub e_purse_mut: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of the `transactions` call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub next_offset: Option<i64>,
    #[serde(default)]
    pub previous_offset: Option<i64>,
    #[serde(default)]
    pub records: Vec<TransactionRecord>,
    #[serde(default)]
    pub transactions_restricted: Option<bool>,
    /// Cursor for `get_transactions_next`
    #[serde(default)]
    pub next_request_context: Option<RequestContext>,
}

/// All pages of one calendar year, merged in offset order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearTransactions {
    pub year: i32,
    pub total_size: u64,
    pub records: Vec<TransactionRecord>,
}

/// Highest offset the year loop requests: `floor(total / PAGE_SIZE) * PAGE_SIZE`
pub fn last_page_offset(total_size: u64) -> u64 {
    total_size / PAGE_SIZE * PAGE_SIZE
}

/// Drop the sub-second component (truncation, not rounding)
pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Accepts epoch milliseconds, an RFC 3339 string or null
fn deserialize_truncated<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        Text(String),
    }

    let ts = match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(RawTimestamp::Millis(ms)) => {
            Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
                <D::Error as serde::de::Error>::custom(format!("timestamp out of range: {}", ms))
            })?
        }
        Some(RawTimestamp::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(<D::Error as serde::de::Error>::custom)?,
    };

    Ok(Some(truncate_to_seconds(ts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_last_page_offset() {
        assert_eq!(last_page_offset(0), 0);
        assert_eq!(last_page_offset(19), 0);
        assert_eq!(last_page_offset(20), 20);
        assert_eq!(last_page_offset(45), 40);
        assert_eq!(last_page_offset(60), 60);
    }

    #[test]
    fn test_millis_timestamp_is_truncated() {
        let record: TransactionRecord = serde_json::from_value(json!({
            "transactionDateTime": 1_700_000_000_999_i64,
            "transactionName": "Check-uit",
            "fare": 2.35
        }))
        .unwrap();

        let ts = record.transaction_date_time.unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.nanosecond(), 0);
        assert_eq!(record.fare, Some(2.35));
    }

    #[test]
    fn test_text_timestamp_is_truncated() {
        let record: TransactionRecord = serde_json::from_value(json!({
            "transactionDateTime": "2024-03-01T08:15:42.987+01:00"
        }))
        .unwrap();

        assert_eq!(
            record.transaction_date_time.unwrap().to_rfc3339(),
            "2024-03-01T07:15:42+00:00"
        );
    }

    #[test]
    fn test_invalid_timestamp_is_rejected() {
        let result = serde_json::from_value::<TransactionRecord>(json!({
            "transactionDateTime": "yesterday"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_timestamp_keeps_the_page() {
        let page: TransactionPage = serde_json::from_value(json!({
            "totalSize": 3,
            "records": [
                {"transactionDateTime": 1_700_000_000_500_i64, "transactionName": "Check-in"},
                {"transactionName": "Saldo opgeladen"},
                {"transactionDateTime": null, "transactionName": "Product"}
            ]
        }))
        .unwrap();

        assert_eq!(page.records.len(), 3);
        assert_eq!(
            page.records[0].transaction_date_time.map(|ts| ts.timestamp()),
            Some(1_700_000_000)
        );
        assert!(page.records[1].transaction_date_time.is_none());
        assert!(page.records[2].transaction_date_time.is_none());
    }

    #[test]
    fn test_page_with_context() {
        let page: TransactionPage = serde_json::from_value(json!({
            "totalSize": 45,
            "nextOffset": 20,
            "previousOffset": null,
            "records": [{"transactionDateTime": 1_700_000_000_000_i64, "pto": "NS"}],
            "transactionsRestricted": false,
            "nextRequestContext": {"startDate": "2024-01-01", "endDate": "2024-12-31", "offset": 20}
        }))
        .unwrap();

        assert_eq!(page.total_size, 45);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].pto.as_deref(), Some("NS"));

        let ctx = page.next_request_context.unwrap();
        assert_eq!(ctx.offset(), 20);
        assert_eq!(
            ctx.form_fields(),
            vec![
                ("offset", "20".to_string()),
                ("startDate", "2024-01-01".to_string()),
                ("endDate", "2024-12-31".to_string()),
            ]
        );
    }

    #[test]
    fn test_context_without_dates() {
        let ctx = RequestContext::new(None, None, 40);
        assert_eq!(ctx.form_fields(), vec![("offset", "40".to_string())]);
    }

    proptest! {
        #[test]
        fn truncation_clears_subseconds(ms in 0i64..4_102_444_800_000i64) {
            let ts = Utc.timestamp_millis_opt(ms).unwrap();
            let truncated = truncate_to_seconds(ts);
            prop_assert_eq!(truncated.nanosecond(), 0);
            prop_assert!(truncated <= ts);
            prop_assert_eq!(truncated.timestamp(), ms.div_euclid(1000));
        }
    }
}
