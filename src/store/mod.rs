//! Storage: content-addressed object store and the SQLite repository.

pub mod content;
pub mod database;
pub mod repository;

pub use content::{ContentStore, fingerprint_entries};
pub use database::{Database, SharedDatabase};
pub use repository::{ProjectUpdate, Repository, SqliteRepository};
