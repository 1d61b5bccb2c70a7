use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Card as returned by `cards/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub medium_id: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Epoch milliseconds or text, depending on the endpoint
    #[serde(default)]
    pub expiry_date: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default, rename = "type")]
    pub card_type: Option<String>,
    #[serde(default)]
    pub balance: Option<i64>,
    #[serde(default)]
    pub balance_date: Option<i64>,
    #[serde(default)]
    pub auto_reload_enabled: Option<bool>,
    #[serde(default)]
    pub default_card: Option<bool>,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Detailed card information from `card/`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    #[serde(default)]
    pub medium_id: Option<String>,
    /// Epoch milliseconds or text, depending on the endpoint
    #[serde(default)]
    pub expiry_date: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub balance: Option<i64>,
    #[serde(default)]
    pub balance_date: Option<i64>,
    #[serde(default)]
    pub product_info: Option<Value>,
    #[serde(default)]
    pub auto_reload_info: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
