//! rollcall-core — Face gallery, detection, encoding and matching.
//!
//! Uses SCRFD for face detection and ArcFace for feature vectors, both running
//! via ONNX Runtime on the CPU. Matching is nearest-neighbour on Euclidean
//! distance with a fixed tolerance.

pub mod alignment;
pub mod detector;
pub mod embedder;
pub mod encoder;
pub mod gallery;
pub mod recognizer;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use encoder::{EncodeError, FaceEncoder, OnnxFaceEncoder};
pub use gallery::{Gallery, GalleryError};
pub use recognizer::{Recognition, Recognizer, DEFAULT_TOLERANCE};
pub use types::{
    BoundingBox, Embedding, EnrolledIdentity, EuclideanMatcher, FaceEncoding, Identity, MatchResult,
    Matcher,
};

use std::path::PathBuf;

/// File name of the SCRFD detection model inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
/// File name of the ArcFace recognition model inside the model directory.
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

/// Default model directory: `$XDG_DATA_HOME/rollcall/models`, else
/// `~/.local/share/rollcall/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
        .join("models")
}
