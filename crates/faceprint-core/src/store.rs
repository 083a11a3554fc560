//! Embedding store boundary.
//!
//! The pipeline only ever talks to [`EmbeddingStore`]; concrete backends
//! (SQLite in `faceprint-store`) live behind this trait so alternate storage
//! can be substituted without touching the orchestration layer.

use crate::types::EnrolledFace;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("identifier must not be empty")]
    EmptyId,
    #[error("storage backend: {0}")]
    Backend(String),
}

/// Durable mapping from identifier to embedding vector.
pub trait EmbeddingStore {
    /// Insert a new record or replace the existing record for `id`.
    /// The record's creation timestamp is set on first insert only.
    fn upsert(&self, id: &str, vector: &[f32]) -> Result<(), StoreError>;

    /// Full scan of all committed records, each appearing exactly once.
    /// No ordering is guaranteed. Records with malformed stored vectors
    /// are skipped, not surfaced as errors.
    fn enumerate(&self) -> Result<Vec<EnrolledFace>, StoreError>;

    /// Remove all records.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Serialize an embedding vector as little-endian f32 bytes.
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Deserialize little-endian f32 bytes back into a vector.
///
/// Returns `None` when the byte length is not a multiple of 4; a truncated
/// blob is rejected outright rather than partially decoded.
pub fn vector_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
