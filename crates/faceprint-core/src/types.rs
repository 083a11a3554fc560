use serde::{Deserialize, Serialize};

/// Sentinel identity returned when recognition finds no acceptable match.
pub const UNKNOWN_ID: &str = "unknown";

/// A single detected face proposal, decoded from one row of raw detector output.
///
/// Coordinates are in input-image pixel space, exactly as the detector emitted
/// them. Boxes are not clamped to the image bounds here; callers that need a
/// valid crop region clamp at alignment time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceCandidate {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Raw detector confidence, nominally in [0, 1].
    pub score: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: [(f32, f32); 5],
}

impl FaceCandidate {
    /// Bounding-box area, the sort key for candidate selection.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// An enrolled identity: a stored embedding plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledFace {
    pub id: String,
    /// Embedding vector as produced by the extractor; not necessarily unit-norm.
    pub vector: Vec<f32>,
    /// Timestamp of first enrollment, as recorded by the store.
    pub created_at: String,
}

/// Result of matching a probe embedding against the enrolled gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// A stored identifier, or [`UNKNOWN_ID`] when nothing matched.
    pub id: String,
    /// Cosine similarity of the accepted match in [-1, 1]; the literal 0.0
    /// when no candidate cleared the threshold.
    pub confidence: f32,
}

impl MatchResult {
    pub fn unknown() -> Self {
        Self {
            id: UNKNOWN_ID.to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.id != UNKNOWN_ID
    }
}

/// Compute cosine similarity between two equal-length vectors.
///
/// Returns a value in [-1, 1]. Higher = more similar. A zero-norm operand
/// yields 0.0 rather than a NaN from the division.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

/// Strategy for scoring a probe embedding against the enrolled gallery.
pub trait Matcher {
    fn compare(&self, probe: &[f32], gallery: &[EnrolledFace], threshold: f32) -> MatchResult;
}

/// Cosine-similarity matcher over a full linear scan of the gallery.
///
/// A candidate replaces the running best only when its similarity is strictly
/// greater than both the threshold and the current best, so the first-seen
/// entry wins ties. Gallery vectors whose dimensionality differs from the
/// probe are skipped rather than scored against garbage.
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn compare(&self, probe: &[f32], gallery: &[EnrolledFace], threshold: f32) -> MatchResult {
        let mut best = MatchResult::unknown();

        for face in gallery {
            if face.vector.len() != probe.len() {
                tracing::warn!(
                    id = %face.id,
                    stored_dim = face.vector.len(),
                    probe_dim = probe.len(),
                    "skipping enrolled embedding with mismatched dimension"
                );
                continue;
            }

            let similarity = cosine_similarity(probe, &face.vector);
            if similarity > threshold && similarity > best.confidence {
                best.id = face.id.clone();
                best.confidence = similarity;
            }
        }

        best
    }
}
