//! Pipeline orchestration: decode → select → align → extract → store | match.

use crate::alignment::{self, AlignmentError};
use crate::detector::{largest_face, DetectorError, FaceDetector};
use crate::embedder::{EmbedderError, FaceEmbedder};
use crate::store::{EmbeddingStore, StoreError};
use crate::types::{CosineMatcher, MatchResult, Matcher};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("alignment error: {0}")]
    Alignment(#[from] AlignmentError),
    #[error("embedder error: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("no face detected in image")]
    NoFaceDetected,
}

/// The face identity system: detector, embedder, matcher, and a store handle.
///
/// Owns its store handle explicitly; there is no process-wide connection
/// state. All operations are synchronous — one image in, one result out.
pub struct FaceSystem<S> {
    detector: FaceDetector,
    embedder: FaceEmbedder,
    matcher: CosineMatcher,
    store: S,
    detect_threshold: f32,
}

impl<S: EmbeddingStore> FaceSystem<S> {
    pub fn new(
        detector: FaceDetector,
        embedder: FaceEmbedder,
        store: S,
        detect_threshold: f32,
    ) -> Self {
        Self {
            detector,
            embedder,
            matcher: CosineMatcher,
            store,
            detect_threshold,
        }
    }

    /// Enroll the largest face in the image under `id`.
    ///
    /// Fails on the first stage error with no partial write; re-enrolling an
    /// existing id replaces its stored vector.
    pub fn enroll(&mut self, image: &DynamicImage, id: &str) -> Result<(), PipelineError> {
        let embedding = self.embed_largest_face(image)?.ok_or(PipelineError::NoFaceDetected)?;
        self.store.upsert(id, &embedding)?;
        tracing::info!(id, dim = embedding.len(), "face enrolled");
        Ok(())
    }

    /// Recognize the largest face in the image against all enrolled
    /// identities.
    ///
    /// Returns the unknown result when no face decodes, without touching the
    /// store; any other stage failure is an error.
    pub fn recognize(
        &mut self,
        image: &DynamicImage,
        threshold: f32,
    ) -> Result<MatchResult, PipelineError> {
        let Some(embedding) = self.embed_largest_face(image)? else {
            tracing::debug!("no face detected, returning unknown");
            return Ok(MatchResult::unknown());
        };

        let gallery = self.store.enumerate()?;
        let result = self.matcher.compare(&embedding, &gallery, threshold);
        tracing::info!(
            id = %result.id,
            confidence = result.confidence,
            gallery_size = gallery.len(),
            "recognition complete"
        );
        Ok(result)
    }

    /// Remove all enrolled identities.
    pub fn clear(&mut self) -> Result<(), PipelineError> {
        self.store.clear()?;
        tracing::info!("embedding store cleared");
        Ok(())
    }

    /// Detect, select the largest candidate, align, and extract its
    /// embedding. `Ok(None)` means no candidate decoded above threshold.
    fn embed_largest_face(
        &mut self,
        image: &DynamicImage,
    ) -> Result<Option<Vec<f32>>, PipelineError> {
        let candidates = self.detector.detect(image, self.detect_threshold)?;
        let Some(face) = largest_face(&candidates) else {
            return Ok(None);
        };

        tracing::debug!(
            candidates = candidates.len(),
            score = face.score,
            area = face.area(),
            "selected largest face"
        );

        let aligned = alignment::align_face(image, face)?;
        let embedding = self.embedder.extract(&aligned)?;
        Ok(Some(embedding))
    }
}
