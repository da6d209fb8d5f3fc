//! The `Contract` entity and its status vocabulary.
//!
//! A `Contract` is a plain value: callers own every instance they hold, and
//! nothing reaches the database until it is handed to `ContractStore`.
//! Entity-level validation here is for immediate feedback; the store applies
//! its own stricter rules before persisting.

use crate::core::error::ArchiflowError;
use crate::core::time;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PAYMENT_TERMS: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractStatus {
    Draft,
    Active,
    Completed,
    Expired,
    Cancelled,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 5] = [
        ContractStatus::Draft,
        ContractStatus::Active,
        ContractStatus::Completed,
        ContractStatus::Expired,
        ContractStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "Draft",
            ContractStatus::Active => "Active",
            ContractStatus::Completed => "Completed",
            ContractStatus::Expired => "Expired",
            ContractStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict, case-sensitive parse. `Pending` is not part of the vocabulary.
impl FromStr for ContractStatus {
    type Err = ArchiflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ArchiflowError::ValidationError(format!(
                    "Unknown contract status '{}' (expected one of {})",
                    s,
                    available_statuses().join(", ")
                ))
            })
    }
}

pub fn available_statuses() -> Vec<&'static str> {
    ContractStatus::ALL.iter().map(|s| s.as_str()).collect()
}

pub fn status_to_string(status: ContractStatus) -> String {
    status.as_str().to_string()
}

/// Lenient mapping: anything outside the vocabulary becomes `Draft`.
pub fn string_to_status(s: &str) -> ContractStatus {
    s.parse().unwrap_or(ContractStatus::Draft)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contract {
    pub id: String,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub value: f64,
    /// Kept as text so values from outside the vocabulary can be rejected.
    pub status: String,
    pub description: Option<String>,
    pub payment_terms: i32,
    pub has_non_compete_clause: bool,
}

impl Default for Contract {
    fn default() -> Self {
        let today = time::today();
        Self {
            id: time::new_contract_id(),
            client_name: String::new(),
            start_date: today,
            end_date: today,
            value: 0.0,
            status: ContractStatus::Draft.to_string(),
            description: None,
            payment_terms: DEFAULT_PAYMENT_TERMS,
            has_non_compete_clause: false,
        }
    }
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_fields(
        id: impl Into<String>,
        client_name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        value: f64,
        status: impl Into<String>,
        description: Option<String>,
        payment_terms: i32,
        has_non_compete_clause: bool,
    ) -> Self {
        Self {
            id: id.into(),
            client_name: client_name.into(),
            start_date,
            end_date,
            value,
            status: status.into(),
            description,
            payment_terms,
            has_non_compete_clause,
        }
    }

    /// Copy of this contract, optionally under a freshly generated id.
    pub fn duplicate(&self, regenerate_id: bool) -> Self {
        let mut copy = self.clone();
        if regenerate_id {
            copy.id = time::new_contract_id();
        }
        copy
    }

    /// Parsed status, or `None` when the text is outside the vocabulary.
    pub fn status_kind(&self) -> Option<ContractStatus> {
        self.status.parse().ok()
    }

    pub fn has_status(&self, status: ContractStatus) -> bool {
        self.status == status.as_str()
    }

    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }

    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.client_name.trim().is_empty() {
            errors.push("Client name is required".to_string());
        }
        if self.end_date <= self.start_date {
            errors.push(format!(
                "End date {} must be after start date {}",
                self.end_date, self.start_date
            ));
        }
        if !self.value.is_finite() || self.value < 0.0 {
            errors.push(format!(
                "Contract value must be a non-negative amount, got {}",
                self.value
            ));
        }
        if self.status.trim().is_empty() {
            errors.push("Status is required".to_string());
        }
        errors
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }

    pub fn days_until_expiry_on(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }

    /// End date falls within `[today, today + threshold_days]`.
    pub fn is_expiring_soon_on(&self, threshold_days: i64, today: NaiveDate) -> bool {
        let days = self.days_until_expiry_on(today);
        (0..=threshold_days).contains(&days)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_on(time::today())
    }

    pub fn days_until_expiry(&self) -> i64 {
        self.days_until_expiry_on(time::today())
    }

    pub fn is_expiring_soon(&self, threshold_days: i64) -> bool {
        self.is_expiring_soon_on(threshold_days, time::today())
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({
            "id": self.id,
            "clientName": self.client_name,
            "startDate": self.start_date.format(time::DATE_FORMAT).to_string(),
            "endDate": self.end_date.format(time::DATE_FORMAT).to_string(),
            "value": self.value,
            "status": self.status,
            "description": self.description,
            "paymentTerms": self.payment_terms,
            "hasNonCompeteClause": self.has_non_compete_clause,
        })
    }

    /// Missing keys take the `Default` values; a missing `id` gets a fresh one.
    pub fn from_json(json: &JsonValue) -> Result<Self, ArchiflowError> {
        if !json.is_object() {
            return Err(ArchiflowError::ValidationError(
                "contract JSON must be an object".to_string(),
            ));
        }
        Ok(serde_json::from_value(json.clone())?)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    pub fn from_json_str(input: &str) -> Result<Self, ArchiflowError> {
        let json: JsonValue = serde_json::from_str(input)?;
        Self::from_json(&json)
    }
}
