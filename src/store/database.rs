//! Database Layer with Connection Pooling and Safe Transactions
//!
//! SQLite behind an r2d2 pool:
//! - WAL mode for concurrent readers during ingest
//! - schema applied from an embedded SQL file
//! - version-tracked migrations
//! - a closure-based transaction helper that rolls back on error

use std::path::Path;
use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::types::Result;

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version for migration tracking.
const SCHEMA_VERSION: u32 = 1;

struct Migration {
    version: u32,
    description: &'static str,
    up: &'static str,
}

/// Future schema changes append here; version 1 is the embedded schema.
const MIGRATIONS: &[Migration] = &[];

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// In-memory database for tests. The pool is capped at one connection so
    /// every caller sees the same in-memory instance.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;
        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    pub fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run `f` inside a transaction; commit on `Ok`, roll back on `Err`.
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                // Drop rolls the transaction back.
                Err(err)
            }
        }
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;

        let current: u32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current == 0 {
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
            info!("Initialized database schema at version {}", SCHEMA_VERSION);
            return Ok(());
        }

        for migration in MIGRATIONS {
            if migration.version > current {
                debug!(
                    "Applying migration {}: {}",
                    migration.version, migration.description
                );
                conn.execute_batch(migration.up)?;
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    [migration.version],
                )?;
            }
        }

        Ok(())
    }
}
