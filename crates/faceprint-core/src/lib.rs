//! faceprint-core — face-candidate decoding and embedding-matching engine.
//!
//! Decodes raw detector tensor output into structured face candidates,
//! extracts fixed-length embeddings from aligned crops via ONNX Runtime,
//! and matches a probe embedding against enrolled identities by cosine
//! similarity.

pub mod alignment;
pub mod detector;
pub mod embedder;
pub mod pipeline;
pub mod store;
pub mod types;

pub use detector::FaceDetector;
pub use embedder::FaceEmbedder;
pub use pipeline::{FaceSystem, PipelineError};
pub use store::{EmbeddingStore, StoreError};
pub use types::{CosineMatcher, EnrolledFace, FaceCandidate, MatchResult, Matcher};
