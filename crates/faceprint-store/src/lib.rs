//! faceprint-store — SQLite-backed embedding persistence.

mod sqlite;

pub use sqlite::SqliteStore;
