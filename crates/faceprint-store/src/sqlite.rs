//! SQLite implementation of the embedding store.
//!
//! One table keyed by identifier, with the embedding vector stored as a
//! little-endian f32 blob and a creation timestamp filled in by SQLite.

use faceprint_core::store::{vector_from_bytes, vector_to_bytes, EmbeddingStore, StoreError};
use faceprint_core::types::EnrolledFace;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS faces (
        id TEXT PRIMARY KEY,
        feature BLOB NOT NULL,
        create_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
";

/// SQLite-backed [`EmbeddingStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the
    /// schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::with_connection(conn)
    }

    /// Open a transient in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self { conn })
    }
}

impl EmbeddingStore for SqliteStore {
    fn upsert(&self, id: &str, vector: &[f32]) -> Result<(), StoreError> {
        if id.is_empty() {
            return Err(StoreError::EmptyId);
        }

        // ON CONFLICT DO UPDATE keeps the original row, so create_time is
        // set on first insert only (INSERT OR REPLACE would reset it).
        self.conn
            .execute(
                "INSERT INTO faces (id, feature) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET feature = excluded.feature",
                rusqlite::params![id, vector_to_bytes(vector)],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn enumerate(&self) -> Result<Vec<EnrolledFace>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, feature, create_time FROM faces")
            .map_err(backend)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(backend)?;

        let mut faces = Vec::new();
        for row in rows {
            let (id, blob, created_at) = row.map_err(backend)?;
            match vector_from_bytes(&blob) {
                Some(vector) => faces.push(EnrolledFace {
                    id,
                    vector,
                    created_at,
                }),
                None => {
                    tracing::warn!(
                        id = %id,
                        bytes = blob.len(),
                        "skipping enrolled face with malformed stored vector"
                    );
                }
            }
        }

        Ok(faces)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM faces", []).map_err(backend)?;
        Ok(())
    }
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceprint_core::types::{CosineMatcher, Matcher};

    #[test]
    fn test_upsert_then_enumerate() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert("alice", &[1.0, -2.5, 0.0]).unwrap();

        let faces = store.enumerate().unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].id, "alice");
        assert_eq!(faces[0].vector, vec![1.0, -2.5, 0.0]);
        assert!(!faces[0].created_at.is_empty());
    }

    #[test]
    fn test_upsert_replaces_existing_vector() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert("alice", &[1.0, 0.0]).unwrap();
        store.upsert("alice", &[0.0, 1.0]).unwrap();

        let faces = store.enumerate().unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].vector, vec![0.0, 1.0]);
    }

    #[test]
    fn test_upsert_preserves_create_time_on_replace() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert("alice", &[1.0]).unwrap();
        let before = store.enumerate().unwrap()[0].created_at.clone();

        store.upsert("alice", &[2.0]).unwrap();
        let after = store.enumerate().unwrap()[0].created_at.clone();
        assert_eq!(before, after);
    }

    #[test]
    fn test_upsert_rejects_empty_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.upsert("", &[1.0]),
            Err(StoreError::EmptyId)
        ));
        assert!(store.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_clear_empties_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert("alice", &[1.0]).unwrap();
        store.upsert("bob", &[2.0]).unwrap();

        store.clear().unwrap();
        assert!(store.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_enumerate_skips_malformed_blob() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert("valid", &[1.0, 2.0]).unwrap();
        // 5 bytes is not a whole number of f32s
        store
            .conn
            .execute(
                "INSERT INTO faces (id, feature) VALUES ('corrupt', ?1)",
                rusqlite::params![vec![0u8; 5]],
            )
            .unwrap();

        let faces = store.enumerate().unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].id, "valid");
    }

    #[test]
    fn test_enumerate_then_match() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert("alice", &[1.0, 0.0, 0.0]).unwrap();
        store.upsert("bob", &[0.0, 1.0, 0.0]).unwrap();

        let gallery = store.enumerate().unwrap();
        let result = CosineMatcher.compare(&[0.9, 0.1, 0.0], &gallery, 0.6);
        assert_eq!(result.id, "alice");
        assert!(result.confidence > 0.6);
    }

    #[test]
    fn test_recognize_after_clear_is_unknown() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert("alice", &[1.0, 0.0]).unwrap();
        store.clear().unwrap();

        let gallery = store.enumerate().unwrap();
        let result = CosineMatcher.compare(&[1.0, 0.0], &gallery, 0.6);
        assert!(!result.is_match());
        assert_eq!(result.confidence, 0.0);
    }
}
