//! SQLite-backed OCR state database.
//!
//! Each oracle persists its protocol state and the last config it saw so it
//! can resume after a restart. Rows are keyed by job id and plugin type, so
//! the commit and exec oracles of one job never touch each other's rows.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use ccip_id::ConfigDigest;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::ContractConfig;
use crate::plugin::PluginType;

/// Errors from OCR database operations.
#[derive(Debug, Error)]
pub enum OcrDatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid stored value: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// Protocol state persisted per config digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    pub epoch: u32,
    pub highest_sent_epoch: u32,
    pub highest_received_epoch: Vec<u32>,
}

/// Persistence contract the OCR library expects.
pub trait OcrDatabase: Send + Sync {
    fn read_state(
        &self,
        digest: &ConfigDigest,
    ) -> Result<Option<PersistentState>, OcrDatabaseError>;

    fn write_state(
        &self,
        digest: &ConfigDigest,
        state: &PersistentState,
    ) -> Result<(), OcrDatabaseError>;

    fn read_config(&self) -> Result<Option<ContractConfig>, OcrDatabaseError>;

    fn write_config(&self, config: &ContractConfig) -> Result<(), OcrDatabaseError>;
}

/// Shared SQLite file holding state for every oracle on this node.
#[derive(Clone)]
pub struct OcrStore {
    conn: Arc<Mutex<Connection>>,
}

impl OcrStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OcrDatabaseError> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, OcrDatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, OcrDatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ocr_persistent_states (
                job_id INTEGER NOT NULL,
                plugin_type INTEGER NOT NULL,
                config_digest TEXT NOT NULL,
                state TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (job_id, plugin_type, config_digest)
            );

            CREATE TABLE IF NOT EXISTS ocr_contract_configs (
                job_id INTEGER NOT NULL,
                plugin_type INTEGER NOT NULL,
                config_digest TEXT NOT NULL,
                config TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (job_id, plugin_type)
            );
            "#,
        )?;

        debug!("OCR database schema initialized");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// View of the store scoped to one job's oracle.
    pub fn scoped(&self, job_id: i32, plugin_type: PluginType) -> SqliteOcrDatabase {
        SqliteOcrDatabase {
            conn: Arc::clone(&self.conn),
            job_id,
            plugin_type,
        }
    }
}

/// [`OcrDatabase`] for one (job, plugin type).
pub struct SqliteOcrDatabase {
    conn: Arc<Mutex<Connection>>,
    job_id: i32,
    plugin_type: PluginType,
}

impl SqliteOcrDatabase {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, OcrDatabaseError> {
        self.conn.lock().map_err(|_| OcrDatabaseError::Poisoned)
    }
}

impl OcrDatabase for SqliteOcrDatabase {
    fn read_state(
        &self,
        digest: &ConfigDigest,
    ) -> Result<Option<PersistentState>, OcrDatabaseError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT state FROM ocr_persistent_states
                 WHERE job_id = ?1 AND plugin_type = ?2 AND config_digest = ?3",
                params![self.job_id, self.plugin_type.as_u8(), digest.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(Into::into)
    }

    fn write_state(
        &self,
        digest: &ConfigDigest,
        state: &PersistentState,
    ) -> Result<(), OcrDatabaseError> {
        let encoded = serde_json::to_string(state)?;
        let now = chrono::Utc::now().timestamp();
        self.conn()?.execute(
            r#"
            INSERT INTO ocr_persistent_states
                (job_id, plugin_type, config_digest, state, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(job_id, plugin_type, config_digest) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
            params![
                self.job_id,
                self.plugin_type.as_u8(),
                digest.to_string(),
                encoded,
                now
            ],
        )?;
        Ok(())
    }

    fn read_config(&self) -> Result<Option<ContractConfig>, OcrDatabaseError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT config FROM ocr_contract_configs WHERE job_id = ?1 AND plugin_type = ?2",
                params![self.job_id, self.plugin_type.as_u8()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(Into::into)
    }

    fn write_config(&self, config: &ContractConfig) -> Result<(), OcrDatabaseError> {
        let encoded = serde_json::to_string(config)?;
        let now = chrono::Utc::now().timestamp();
        self.conn()?.execute(
            r#"
            INSERT INTO ocr_contract_configs
                (job_id, plugin_type, config_digest, config, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(job_id, plugin_type) DO UPDATE SET
                config_digest = excluded.config_digest,
                config = excluded.config,
                updated_at = excluded.updated_at
            "#,
            params![
                self.job_id,
                self.plugin_type.as_u8(),
                config.config_digest.to_string(),
                encoded,
                now
            ],
        )?;
        Ok(())
    }
}
