use serde::Deserialize;
use serde_json::Value;

/// Status code of a successful resource call
pub const SUCCESS_CODE: i64 = 200;

/// Uniform resource response: `{c: status, o: output, e: error}`
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub c: i64,
    #[serde(default)]
    pub o: Value,
    #[serde(default)]
    pub e: Value,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.c == SUCCESS_CODE
    }
}

/// Remote error body as JSON when it parses, otherwise the raw text
pub fn parse_error_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
