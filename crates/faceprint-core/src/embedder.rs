//! Embedding extractor via ONNX Runtime.
//!
//! Normalizes an aligned 112×112 face crop and runs the embedding model to
//! produce a fixed-length 128-dimensional feature vector.

use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const EMBED_INPUT_SIZE: u32 = 112;
const EMBED_MEAN: f32 = 127.5;
const EMBED_STD: f32 = 128.0;

/// Fixed embedding dimensionality; the store's blob layout depends on it.
pub const EMBEDDING_DIM: usize = 128;

/// Named output binding carrying the embedding vector.
const EMBEDDING_OUTPUT: &str = "fc1";

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("aligned crop must be {expected}x{expected}, got {width}x{height}")]
    BadCropSize {
        expected: u32,
        width: u32,
        height: u32,
    },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ONNX-backed embedding extractor.
pub struct FaceEmbedder {
    session: Session,
    output_index: usize,
}

impl FaceEmbedder {
    /// Load the embedding ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
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
            "loaded embedding model"
        );

        let output_index = match output_names.iter().position(|n| n == EMBEDDING_OUTPUT) {
            Some(idx) => idx,
            None => {
                tracing::info!(
                    ?output_names,
                    "embedding output name not recognized, using first output"
                );
                0
            }
        };

        Ok(Self {
            session,
            output_index,
        })
    }

    /// Extract the embedding vector from an aligned face crop.
    ///
    /// The vector is returned exactly as the model produced it; it is not
    /// L2-normalized here, and the cosine matcher does not require it to be.
    pub fn extract(&mut self, aligned: &RgbImage) -> Result<Vec<f32>, EmbedderError> {
        let (width, height) = aligned.dimensions();
        if width != EMBED_INPUT_SIZE || height != EMBED_INPUT_SIZE {
            return Err(EmbedderError::BadCropSize {
                expected: EMBED_INPUT_SIZE,
                width,
                height,
            });
        }

        let input = preprocess(aligned);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[self.output_index]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(raw.to_vec())
    }
}

/// Preprocess an aligned 112×112 RGB crop into a NCHW float tensor.
fn preprocess(aligned: &RgbImage) -> Array4<f32> {
    let size = EMBED_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in aligned.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - EMBED_MEAN) / EMBED_STD;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_output_shape() {
        let aligned = RgbImage::new(EMBED_INPUT_SIZE, EMBED_INPUT_SIZE);
        let tensor = preprocess(&aligned);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let mut aligned = RgbImage::new(EMBED_INPUT_SIZE, EMBED_INPUT_SIZE);
        aligned.put_pixel(0, 0, image::Rgb([128, 0, 255]));
        let tensor = preprocess(&aligned);

        assert!((tensor[[0, 0, 0, 0]] - (128.0 - EMBED_MEAN) / EMBED_STD).abs() < 1e-6);
        assert!((tensor[[0, 1, 0, 0]] - (0.0 - EMBED_MEAN) / EMBED_STD).abs() < 1e-6);
        assert!((tensor[[0, 2, 0, 0]] - (255.0 - EMBED_MEAN) / EMBED_STD).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_channel_layout() {
        // A pure-red crop puts all signal in channel 0
        let mut aligned = RgbImage::new(EMBED_INPUT_SIZE, EMBED_INPUT_SIZE);
        for pixel in aligned.pixels_mut() {
            *pixel = image::Rgb([255, 0, 0]);
        }
        let tensor = preprocess(&aligned);

        let red = (255.0 - EMBED_MEAN) / EMBED_STD;
        let black = (0.0 - EMBED_MEAN) / EMBED_STD;
        assert!((tensor[[0, 0, 50, 50]] - red).abs() < 1e-6);
        assert!((tensor[[0, 1, 50, 50]] - black).abs() < 1e-6);
        assert!((tensor[[0, 2, 50, 50]] - black).abs() < 1e-6);
    }
}
