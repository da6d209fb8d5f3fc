use crate::core::config::ArchiflowConfig;
use crate::core::error;
use crate::core::schemas;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn db_connect(db_path: &Path, config: &ArchiflowConfig) -> Result<Connection, error::ArchiflowError> {
    let conn = Connection::open(db_path).map_err(|e| {
        error::ArchiflowError::DatabaseError(format!(
            "failed to open database at {}: {}",
            db_path.display(),
            e
        ))
    })?;
    conn.busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .map_err(error::ArchiflowError::RusqliteError)?;
    let journal_pragma = format!(
        "PRAGMA journal_mode={};",
        config.journal_mode.to_ascii_uppercase()
    );
    conn.query_row(&journal_pragma, [], |_| Ok(()))
        .map_err(error::ArchiflowError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::ArchiflowError::RusqliteError)?;
    register_fold(&conn).map_err(error::ArchiflowError::RusqliteError)?;
    Ok(conn)
}

/// SQL name of the Unicode lowercase function; `LOWER()` only folds ASCII.
pub const FOLD_FN: &str = "fold";

/// Registers `fold(text)`, the SQL twin of `str::to_lowercase`. NULL stays NULL.
pub fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

pub fn ensure_schema(conn: &Connection) -> Result<(), error::ArchiflowError> {
    for statement in schemas::CONTRACTS_SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

pub fn ensure_parent_dir(db_path: &Path) -> Result<(), error::ArchiflowError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(error::ArchiflowError::IoError)?;
    }
    Ok(())
}

/// SQLite side files that belong to `db_path` in WAL mode.
pub fn sidecar_paths(db_path: &Path) -> [PathBuf; 2] {
    let base = db_path.as_os_str().to_owned();
    let mut wal = base.clone();
    wal.push("-wal");
    let mut shm = base;
    shm.push("-shm");
    [PathBuf::from(wal), PathBuf::from(shm)]
}

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// True when `path` is a readable SQLite file that carries a `contracts` table.
///
/// The file is opened immutable so inspecting a WAL-mode copy never creates
/// `-wal`/`-shm` files next to it.
pub fn is_archiflow_database(path: &Path) -> bool {
    let mut header = [0u8; 16];
    let readable = fs::File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .is_ok();
    if !readable || &header != SQLITE_HEADER {
        return false;
    }
    let uri = format!("file:{}?immutable=1", uri_escape(&path.to_string_lossy()));
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI;
    let Ok(conn) = Connection::open_with_flags(uri, flags) else {
        return false;
    };
    conn.query_row(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [schemas::CONTRACTS_TABLE],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map(|found| found.is_some())
    .unwrap_or(false)
}

fn uri_escape(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3f"),
            '#' => out.push_str("%23"),
            _ => out.push(ch),
        }
    }
    out
}
