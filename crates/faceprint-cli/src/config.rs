use std::path::PathBuf;

/// CLI configuration, loaded from `FACEPRINT_*` environment variables.
pub struct Config {
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Detector score threshold for emitting a face candidate.
    pub detect_threshold: f32,
    /// Cosine similarity threshold for a positive recognition.
    pub match_threshold: f32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            model_dir: std::env::var("FACEPRINT_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            db_path: std::env::var("FACEPRINT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("faces.db")),
            detect_threshold: env_f32("FACEPRINT_DETECT_THRESHOLD", 0.5),
            match_threshold: env_f32("FACEPRINT_MATCH_THRESHOLD", 0.6),
        }
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("scrfd_500m.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the embedding extraction model.
    pub fn embedder_model_path(&self) -> String {
        self.model_dir
            .join("mobilefacenet.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
