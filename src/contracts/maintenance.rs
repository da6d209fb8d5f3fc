//! Maintenance operations: status synchronization, compaction, backup and restore.

use crate::contracts::events::ContractEvent;
use crate::contracts::model::ContractStatus;
use crate::contracts::store::ContractStore;
use crate::core::db;
use crate::core::error::{ArchiflowError, Result};
use crate::core::schemas;
use crate::core::time;
use chrono::NaiveDate;
use rusqlite::params;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const OPTIMIZE_STEPS: &[(&str, &str)] = &[
    ("vacuum", "VACUUM;"),
    ("reindex", "REINDEX;"),
    ("analyze", "ANALYZE;"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    /// Ids flipped from Active to Expired.
    pub expired: Vec<String>,
    /// Rows removed for missing required fields.
    pub removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizeReport {
    pub completed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl OptimizeReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// `<backup>.sha256`, written next to every backup.
pub fn checksum_path(backup: &Path) -> PathBuf {
    let mut name = backup.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

impl ContractStore {
    /// Expire overdue Active contracts and purge incomplete rows, in one transaction.
    pub fn synchronize_database(&mut self) -> Result<SyncReport> {
        self.synchronize_database_on(time::today())
    }

    pub fn synchronize_database_on(&mut self, today: NaiveDate) -> Result<SyncReport> {
        let result = self.synchronize_inner(today);
        self.track_write(result)
    }

    fn synchronize_inner(&mut self, today: NaiveDate) -> Result<SyncReport> {
        let conn = self.conn.as_mut().ok_or(ArchiflowError::NotInitialized)?;
        let tx = conn.transaction()?;

        let expired: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM contracts WHERE status = ?1 AND end_date <> '' AND end_date < ?2 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![ContractStatus::Active.as_str(), today], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };
        tx.execute(
            "UPDATE contracts SET status = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE status = ?2 AND end_date <> '' AND end_date < ?3",
            params![
                ContractStatus::Expired.as_str(),
                ContractStatus::Active.as_str(),
                today
            ],
        )?;
        let removed = tx.execute(schemas::CONTRACTS_DELETE_INCOMPLETE, [])?;
        tx.commit()?;

        if let Some(conn) = self.conn.as_ref() {
            if let Err(e) = conn.execute_batch("PRAGMA optimize;") {
                warn!(error = %e, "PRAGMA optimize after synchronization failed");
            }
        }
        self.cache.get_mut().clear();
        info!(expired = expired.len(), removed, "contract database synchronized");
        for id in &expired {
            self.emit(ContractEvent::Updated(id.clone()));
        }
        Ok(SyncReport { expired, removed })
    }

    /// Compact the file and rebuild indexes. Step failures are reported, not raised.
    pub fn optimize_database(&mut self) -> Result<OptimizeReport> {
        let result = self.optimize_inner();
        self.track_write(result)
    }

    fn optimize_inner(&mut self) -> Result<OptimizeReport> {
        let conn = self.conn()?;
        let mut report = OptimizeReport::default();
        for (name, sql) in OPTIMIZE_STEPS {
            match conn.execute_batch(sql) {
                Ok(()) => report.completed.push(name.to_string()),
                Err(e) => {
                    warn!(step = name, error = %e, "database optimization step failed");
                    report.failed.push((name.to_string(), e.to_string()));
                }
            }
        }
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "database optimization finished"
        );
        Ok(report)
    }

    /// Copy the whole database file to `destination` and write its checksum sidecar.
    pub fn backup_database(&self, destination: &Path) -> Result<BackupReport> {
        let result = self.backup_inner(destination);
        self.track(result)
    }

    fn backup_inner(&self, destination: &Path) -> Result<BackupReport> {
        let conn = self.conn()?;
        let source = self
            .database_path()
            .ok_or(ArchiflowError::NotInitialized)?
            .to_path_buf();
        if same_file(&source, destination) {
            return Err(ArchiflowError::ValidationError(format!(
                "backup destination {} is the live database",
                destination.display()
            )));
        }
        // Fold the WAL into the main file so a plain copy is complete.
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE);", [], |_| Ok(()))?;
        db::ensure_parent_dir(destination)?;
        let bytes = fs::copy(&source, destination)?;
        let sha256 = file_sha256(destination)?;
        let file_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        fs::write(checksum_path(destination), format!("{}  {}\n", sha256, file_name))?;
        info!(path = %destination.display(), bytes, "contract database backed up");
        Ok(BackupReport {
            path: destination.to_path_buf(),
            bytes,
            sha256,
        })
    }

    /// Replace the live database with `backup` and reopen the store on it.
    pub fn restore_database(&mut self, backup: &Path) -> Result<()> {
        let result = self.restore_inner(backup);
        self.track_write(result)
    }

    fn restore_inner(&mut self, backup: &Path) -> Result<()> {
        if !backup.is_file() {
            return Err(ArchiflowError::NotFound(format!("backup file {}", backup.display())));
        }
        verify_checksum(backup)?;
        if !db::is_archiflow_database(backup) {
            return Err(ArchiflowError::ValidationError(format!(
                "{} is not an ArchiFlow contract database",
                backup.display()
            )));
        }
        let target = self
            .database_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config().resolved_database_path());
        if same_file(&target, backup) {
            return Err(ArchiflowError::ValidationError(format!(
                "cannot restore {} onto itself",
                backup.display()
            )));
        }

        db::ensure_parent_dir(&target)?;
        let staging = staging_path(&target);
        if let Err(e) = fs::copy(backup, &staging) {
            discard_staging(&staging);
            return Err(e.into());
        }

        let was_open = self.conn.is_some();
        self.shutdown();
        if let Err(e) = swap_in(&staging, &target) {
            discard_staging(&staging);
            if was_open {
                if let Err(reopen) = self.initialize_inner(Some(&target)) {
                    warn!(path = %target.display(), error = %reopen, "reopening database after failed restore failed");
                }
            }
            return Err(e);
        }
        self.initialize_inner(Some(&target))?;
        self.cache.get_mut().clear();
        info!(from = %backup.display(), to = %target.display(), "contract database restored");
        Ok(())
    }
}

/// `<target>.restore-tmp`, where a backup is staged before it replaces the live file.
pub fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".restore-tmp");
    PathBuf::from(name)
}

fn discard_staging(staging: &Path) {
    if staging.is_file() {
        if let Err(e) = fs::remove_file(staging) {
            warn!(path = %staging.display(), error = %e, "could not remove staged restore file");
        }
    }
}

/// Stale WAL sidecars go first so they are never replayed onto the restored file.
fn swap_in(staging: &Path, target: &Path) -> Result<()> {
    for stale in db::sidecar_paths(target) {
        if stale.exists() {
            fs::remove_file(&stale)?;
        }
    }
    fs::rename(staging, target)?;
    Ok(())
}

fn verify_checksum(backup: &Path) -> Result<()> {
    let sidecar = checksum_path(backup);
    if !sidecar.is_file() {
        return Ok(());
    }
    let recorded = fs::read_to_string(&sidecar)?;
    let expected = recorded.split_whitespace().next().unwrap_or_default();
    let actual = file_sha256(backup)?;
    if !expected.eq_ignore_ascii_case(&actual) {
        return Err(ArchiflowError::ValidationError(format!(
            "backup checksum mismatch for {} (recorded {}, actual {})",
            backup.display(),
            expected,
            actual
        )));
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
