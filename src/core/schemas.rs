//! Database schema definitions for the ArchiFlow contract store.
//!
//! A single SQLite file holds one `contracts` table plus four lookup
//! indexes. Dates are stored as ISO-8601 `YYYY-MM-DD` text so that
//! lexicographic comparison in SQL matches calendar order.

pub const DEFAULT_DB_NAME: &str = "contracts.db";

pub const CONTRACTS_TABLE: &str = "contracts";

pub const CONTRACTS_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS contracts (
        id TEXT PRIMARY KEY,
        client_name TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        value REAL NOT NULL DEFAULT 0.0,
        status TEXT NOT NULL DEFAULT 'Draft',
        description TEXT,
        payment_terms INTEGER DEFAULT 30,
        has_non_compete_clause BOOLEAN DEFAULT FALSE,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
";
pub const CONTRACTS_INDEX_CLIENT_NAME: &str =
    "CREATE INDEX IF NOT EXISTS idx_contracts_client_name ON contracts(client_name)";
pub const CONTRACTS_INDEX_STATUS: &str =
    "CREATE INDEX IF NOT EXISTS idx_contracts_status ON contracts(status)";
pub const CONTRACTS_INDEX_START_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_contracts_start_date ON contracts(start_date)";
pub const CONTRACTS_INDEX_END_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_contracts_end_date ON contracts(end_date)";

/// Applied in order by `db::ensure_schema`.
pub const CONTRACTS_SCHEMA_STATEMENTS: &[&str] = &[
    CONTRACTS_DB_SCHEMA,
    CONTRACTS_INDEX_CLIENT_NAME,
    CONTRACTS_INDEX_STATUS,
    CONTRACTS_INDEX_START_DATE,
    CONTRACTS_INDEX_END_DATE,
];

/// Column list shared by every SELECT that hydrates a `Contract`.
pub const CONTRACT_COLUMNS: &str = "id, client_name, start_date, end_date, value, status, description, payment_terms, has_non_compete_clause";

pub const CONTRACTS_INSERT: &str = "
    INSERT INTO contracts(id, client_name, start_date, end_date, value, status, description, payment_terms, has_non_compete_clause, created_at, updated_at)
    VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
";

pub const CONTRACTS_UPDATE: &str = "
    UPDATE contracts
    SET client_name = ?2, start_date = ?3, end_date = ?4, value = ?5, status = ?6,
        description = ?7, payment_terms = ?8, has_non_compete_clause = ?9,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1
";

/// Rows missing a required field; removed by `synchronize_database`.
pub const CONTRACTS_DELETE_INCOMPLETE: &str = "
    DELETE FROM contracts
    WHERE client_name IS NULL OR TRIM(client_name) = ''
       OR start_date IS NULL OR start_date = ''
       OR end_date IS NULL OR end_date = ''
       OR status IS NULL OR status = ''
";
