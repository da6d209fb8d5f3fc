//! Shared clock, id and envelope helpers.

use chrono::{Local, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use ulid::Ulid;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local calendar date; every expiry rule is evaluated against this.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

pub fn new_contract_id() -> String {
    Ulid::new().to_string()
}

pub fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid date '{}' (expected YYYY-MM-DD): {}", input, e))
}

/// Standard command response envelope shape used by the CLI.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_timestamp(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}
