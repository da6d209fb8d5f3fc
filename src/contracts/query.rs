//! Read-only search, filter and statistics queries.
//!
//! None of these open a transaction. Each has an `_on(today)` twin where the
//! result depends on the calendar, so callers and tests can pin the date.

use crate::contracts::model::{Contract, ContractStatus};
use crate::contracts::store::{ContractStore, query_contracts, select_sql};
use crate::core::error::{ArchiflowError, Result};
use crate::core::time;
use chrono::{Duration, NaiveDate};
use rusqlite::params;
use serde::Serialize;
use std::collections::BTreeMap;

const ORDER: &str = "ORDER BY start_date DESC, client_name ASC, id ASC";
const MONTHS_REPORTED: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractStatistics {
    pub total: usize,
    pub active: usize,
    /// Status `Expired`, or any contract whose end date has passed.
    pub expired: usize,
    pub total_value: f64,
    pub average_value: f64,
    pub by_status: BTreeMap<String, usize>,
    pub expiring_soon: usize,
    pub expiring_threshold_days: i64,
}

/// `%` and `_` in user input match literally. The term is folded with
/// `str::to_lowercase`, the same function `fold()` applies in SQL.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

impl ContractStore {
    pub fn get_all_contracts(&self) -> Result<Vec<Contract>> {
        let result = self
            .conn()
            .and_then(|conn| query_contracts(conn, &select_sql(ORDER), []));
        self.track(result)
    }

    pub fn contract_count(&self) -> Result<usize> {
        let result = self.conn().and_then(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM contracts", [], |row| row.get(0))?;
            Ok(count as usize)
        });
        self.track(result)
    }

    pub fn total_contract_value(&self) -> Result<f64> {
        let result = self.conn().and_then(|conn| {
            let total: f64 =
                conn.query_row("SELECT COALESCE(SUM(value), 0.0) FROM contracts", [], |row| row.get(0))?;
            Ok(total)
        });
        self.track(result)
    }

    /// Case-insensitive substring match over client name, description and status.
    pub fn search_contracts(&self, term: &str) -> Result<Vec<Contract>> {
        if term.trim().is_empty() {
            return self.get_all_contracts();
        }
        let result = self.conn().and_then(|conn| {
            let sql = select_sql(&format!(
                "WHERE fold(client_name) LIKE ?1 ESCAPE '\\'
                    OR fold(COALESCE(description, '')) LIKE ?1 ESCAPE '\\'
                    OR fold(status) LIKE ?1 ESCAPE '\\'
                 {}",
                ORDER
            ));
            query_contracts(conn, &sql, params![like_pattern(term.trim())])
        });
        self.track(result)
    }

    /// Strict status filter; values outside the vocabulary (e.g. `Pending`) are rejected.
    pub fn get_contracts_by_status(&self, status: &str) -> Result<Vec<Contract>> {
        let result = status.parse::<ContractStatus>().and_then(|status| {
            let conn = self.conn()?;
            query_contracts(
                conn,
                &select_sql(&format!("WHERE status = ?1 {}", ORDER)),
                params![status.as_str()],
            )
        });
        self.track(result)
    }

    pub fn get_contracts_by_client(&self, client_name: &str) -> Result<Vec<Contract>> {
        let result = self.conn().and_then(|conn| {
            query_contracts(
                conn,
                &select_sql(&format!("WHERE fold(client_name) LIKE ?1 ESCAPE '\\' {}", ORDER)),
                params![like_pattern(client_name.trim())],
            )
        });
        self.track(result)
    }

    /// Contracts whose `[start, end]` period overlaps `[from, to]`.
    pub fn get_contracts_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Contract>> {
        let result = if to < from {
            Err(ArchiflowError::ValidationError(format!(
                "date range end {} is before start {}",
                to, from
            )))
        } else {
            self.conn().and_then(|conn| {
                query_contracts(
                    conn,
                    &select_sql(&format!("WHERE start_date <= ?2 AND end_date >= ?1 {}", ORDER)),
                    params![from, to],
                )
            })
        };
        self.track(result)
    }

    pub fn get_contracts_by_value_range(&self, min: f64, max: f64) -> Result<Vec<Contract>> {
        let result = if !(min.is_finite() && max.is_finite()) || max < min {
            Err(ArchiflowError::ValidationError(format!(
                "invalid value range {}..{}",
                min, max
            )))
        } else {
            self.conn().and_then(|conn| {
                query_contracts(
                    conn,
                    &select_sql(&format!("WHERE value >= ?1 AND value <= ?2 {}", ORDER)),
                    params![min, max],
                )
            })
        };
        self.track(result)
    }

    pub fn get_active_contracts(&self) -> Result<Vec<Contract>> {
        self.get_contracts_by_status(ContractStatus::Active.as_str())
    }

    /// Active contracts ending within `[today, today + days_from_now]`.
    pub fn get_expiring_contracts(&self, days_from_now: i64) -> Result<Vec<Contract>> {
        self.get_expiring_contracts_on(days_from_now, time::today())
    }

    pub fn get_expiring_contracts_on(&self, days_from_now: i64, today: NaiveDate) -> Result<Vec<Contract>> {
        let result = if days_from_now < 0 {
            Err(ArchiflowError::ValidationError(format!(
                "days_from_now must not be negative, got {}",
                days_from_now
            )))
        } else {
            self.conn().and_then(|conn| {
                let horizon = today + Duration::days(days_from_now);
                query_contracts(
                    conn,
                    &select_sql(
                        "WHERE status = ?1 AND end_date >= ?2 AND end_date <= ?3
                         ORDER BY end_date ASC, client_name ASC",
                    ),
                    params![ContractStatus::Active.as_str(), today, horizon],
                )
            })
        };
        self.track(result)
    }

    pub fn get_contract_statistics(&self) -> Result<ContractStatistics> {
        self.get_contract_statistics_on(time::today())
    }

    pub fn get_contract_statistics_on(&self, today: NaiveDate) -> Result<ContractStatistics> {
        let result = self.statistics_inner(today);
        self.track(result)
    }

    fn statistics_inner(&self, today: NaiveDate) -> Result<ContractStatistics> {
        let conn = self.conn()?;
        let threshold = self.config().expiring_threshold_days;
        let horizon = today + Duration::days(threshold);

        let (total, total_value): (i64, f64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(value), 0.0) FROM contracts",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let expired: i64 = conn.query_row(
            "SELECT COUNT(*) FROM contracts WHERE status = ?1 OR end_date < ?2",
            params![ContractStatus::Expired.as_str(), today],
            |row| row.get(0),
        )?;
        let expiring_soon: i64 = conn.query_row(
            "SELECT COUNT(*) FROM contracts WHERE status = ?1 AND end_date >= ?2 AND end_date <= ?3",
            params![ContractStatus::Active.as_str(), today, horizon],
            |row| row.get(0),
        )?;
        let by_status = status_counts(conn)?;
        let active = by_status
            .get(ContractStatus::Active.as_str())
            .copied()
            .unwrap_or(0);
        let total = total as usize;

        Ok(ContractStatistics {
            total,
            active,
            expired: expired as usize,
            total_value,
            average_value: if total > 0 {
                total_value / total as f64
            } else {
                0.0
            },
            by_status,
            expiring_soon: expiring_soon as usize,
            expiring_threshold_days: threshold,
        })
    }

    /// Count per status; every vocabulary status is present, zero when unused.
    pub fn get_status_distribution(&self) -> Result<BTreeMap<String, usize>> {
        let result = self.conn().and_then(status_counts);
        self.track(result)
    }

    /// Contracts per `YYYY-MM` of start date, for the 12 most recent months that have
    /// at least one contract. Months without contracts are skipped, not reported as zero,
    /// so the window is not tied to the calendar.
    pub fn get_monthly_contract_counts(&self) -> Result<BTreeMap<String, usize>> {
        let result = self.conn().and_then(|conn| {
            let mut stmt = conn.prepare(
                "SELECT substr(start_date, 1, 7) AS month, COUNT(*) FROM contracts
                 WHERE start_date IS NOT NULL AND start_date <> ''
                 GROUP BY month ORDER BY month DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![MONTHS_REPORTED as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut months = BTreeMap::new();
            for row in rows {
                let (month, count) = row?;
                months.insert(month, count as usize);
            }
            Ok(months)
        });
        self.track(result)
    }
}

fn status_counts(conn: &rusqlite::Connection) -> Result<BTreeMap<String, usize>> {
    let mut counts: BTreeMap<String, usize> = ContractStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM contracts GROUP BY status")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (status, count) = row?;
        counts.insert(status, count as usize);
    }
    Ok(counts)
}
