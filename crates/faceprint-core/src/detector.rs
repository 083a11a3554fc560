//! Face detector via ONNX Runtime.
//!
//! Runs the detection model at the input image's native resolution and decodes
//! its row-aligned score/bbox/landmark output tensors into face candidates.

use crate::types::FaceCandidate;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const DETECT_MEAN: f32 = 127.5;
const DETECT_STD: f32 = 128.0;

/// Named output bindings of the detection model.
const SCORES_OUTPUT: &str = "score_8";
const BBOXES_OUTPUT: &str = "bbox_8";
const LANDMARKS_OUTPUT: &str = "landmark_8";

const BBOX_FLOATS_PER_ROW: usize = 4;
const LANDMARK_FLOATS_PER_ROW: usize = 10;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Output tensor indices: (scores, bboxes, landmarks).
type OutputIndices = (usize, usize, usize);

/// ONNX-backed face detector.
pub struct FaceDetector {
    session: Session,
    /// Output indices resolved by name at load time; positional fallback.
    output_indices: OutputIndices,
}

impl FaceDetector {
    /// Load the detection ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            "loaded detection model"
        );

        if output_names.len() < 3 {
            return Err(DetectorError::InferenceFailed(format!(
                "detection model requires score/bbox/landmark outputs, got {}",
                output_names.len()
            )));
        }

        let output_indices = resolve_output_indices(&output_names);

        Ok(Self {
            session,
            output_indices,
        })
    }

    /// Detect faces in an image, returning every candidate at or above the
    /// score threshold in tensor-row order.
    pub fn detect(
        &mut self,
        image: &DynamicImage,
        threshold: f32,
    ) -> Result<Vec<FaceCandidate>, DetectorError> {
        let input = preprocess(image);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (score_idx, bbox_idx, landmark_idx) = self.output_indices;

        let (_, scores) = outputs[score_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, bboxes) = outputs[bbox_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("bboxes: {e}")))?;
        let (_, landmarks) = outputs[landmark_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("landmarks: {e}")))?;

        let candidates = decode_candidates(scores, bboxes, landmarks, threshold);
        tracing::debug!(
            rows = scores.len(),
            candidates = candidates.len(),
            threshold,
            "decoded detector output"
        );

        Ok(candidates)
    }
}

/// Resolve output tensor ordering by name, falling back to positional order
/// when the expected names are absent.
fn resolve_output_indices(names: &[String]) -> OutputIndices {
    let find = |target: &str| names.iter().position(|n| n == target);

    match (
        find(SCORES_OUTPUT),
        find(BBOXES_OUTPUT),
        find(LANDMARKS_OUTPUT),
    ) {
        (Some(s), Some(b), Some(l)) => {
            tracing::debug!(scores = s, bboxes = b, landmarks = l, "name-based output mapping");
            (s, b, l)
        }
        _ => {
            tracing::info!(
                ?names,
                "detector output names not recognized, using positional mapping [0]=scores, [1]=bboxes, [2]=landmarks"
            );
            (0, 1, 2)
        }
    }
}

/// Preprocess an image into a NCHW float tensor at its native resolution.
fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 - DETECT_MEAN) / DETECT_STD;
        }
    }

    tensor
}

/// Decode row-aligned detector tensors into face candidates.
///
/// Row *i* of each tensor describes proposal *i*: one score, four bbox floats
/// as (left, top, right, bottom), and ten landmark floats as five (x, y)
/// pairs. Rows scoring below the threshold are skipped entirely; a row whose
/// score equals the threshold is kept. Values are taken as-is — no clamping,
/// no non-maximum suppression, no reordering.
pub fn decode_candidates(
    scores: &[f32],
    bboxes: &[f32],
    landmarks: &[f32],
    threshold: f32,
) -> Vec<FaceCandidate> {
    let mut candidates = Vec::new();

    for (row, &score) in scores.iter().enumerate() {
        if score < threshold {
            continue;
        }

        let bbox_off = row * BBOX_FLOATS_PER_ROW;
        if bbox_off + BBOX_FLOATS_PER_ROW > bboxes.len() {
            continue;
        }
        let landmark_off = row * LANDMARK_FLOATS_PER_ROW;
        if landmark_off + LANDMARK_FLOATS_PER_ROW > landmarks.len() {
            continue;
        }

        let (left, top, right, bottom) = (
            bboxes[bbox_off],
            bboxes[bbox_off + 1],
            bboxes[bbox_off + 2],
            bboxes[bbox_off + 3],
        );

        let mut points = [(0.0f32, 0.0f32); 5];
        for (i, point) in points.iter_mut().enumerate() {
            *point = (
                landmarks[landmark_off + i * 2],
                landmarks[landmark_off + i * 2 + 1],
            );
        }

        candidates.push(FaceCandidate {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
            score,
            landmarks: points,
        });
    }

    candidates
}

/// Select the candidate with the largest bounding-box area.
///
/// Ties go to the first occurrence in input order. Returns `None` for an
/// empty candidate set, which callers must treat as "no usable face".
pub fn largest_face(candidates: &[FaceCandidate]) -> Option<&FaceCandidate> {
    let mut best: Option<&FaceCandidate> = None;
    for candidate in candidates {
        let better = match best {
            None => true,
            Some(current) => candidate.area() > current.area(),
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}
