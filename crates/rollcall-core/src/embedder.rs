//! ArcFace face embedder via ONNX Runtime.
//!
//! Aligns each detected face to 112×112 on its five landmarks (square crop
//! when landmarks are missing) and extracts a 512-dimensional feature vector
//! (w600k_r50).
//!
//! Vectors are L2-normalized and then scaled by [`embedding_scale`], so that
//! the Euclidean distance [`DEFAULT_TOLERANCE`] corresponds to a cosine
//! similarity of [`MATCH_COSINE`].

use crate::alignment;
use crate::recognizer::DEFAULT_TOLERANCE;
use crate::types::{BoundingBox, Embedding};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_INPUT_SIZE: u32 = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5;
const ARCFACE_EMBEDDING_DIM: usize = 512;
/// Extra context around the detector box, as a fraction of its longer side.
const CROP_MARGIN: f32 = 0.1;

/// Cosine similarity at which two faces count as the same person.
pub const MATCH_COSINE: f32 = 0.40;

/// Factor applied to unit vectors. Distances scale with it: unit vectors at
/// cosine `c` are `sqrt(2 - 2c)` apart, which at [`MATCH_COSINE`] becomes
/// exactly [`DEFAULT_TOLERANCE`].
pub fn embedding_scale() -> f32 {
    DEFAULT_TOLERANCE / (2.0 - 2.0 * MATCH_COSINE).sqrt()
}

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0}; download w600k_r50.onnx into the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face box lies outside the frame")]
    EmptyCrop,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based feature extractor.
pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self { session })
    }

    /// Extract the feature vector of one detected face in an RGB frame.
    pub fn extract(
        &mut self,
        frame: &RgbImage,
        face: &BoundingBox,
    ) -> Result<Embedding, EmbedderError> {
        let aligned = face.landmarks.as_ref().and_then(|lm| alignment::align_face(frame, lm));
        let crop = match aligned {
            Some(crop) => crop,
            None => face_crop(frame, face).ok_or(EmbedderError::EmptyCrop)?,
        };
        let input = preprocess(&crop);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding::new(calibrate(l2_normalize(raw))))
    }
}

/// Square crop around the face box, clipped to the frame and resized to the model input.
fn face_crop(frame: &RgbImage, face: &BoundingBox) -> Option<RgbImage> {
    let side = face.width.max(face.height) * (1.0 + CROP_MARGIN * 2.0);
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;

    let left = (cx - side / 2.0).max(0.0);
    let top = (cy - side / 2.0).max(0.0);
    let right = (cx + side / 2.0).min(frame.width() as f32);
    let bottom = (cy + side / 2.0).min(frame.height() as f32);
    if right - left < 1.0 || bottom - top < 1.0 {
        return None;
    }

    let (x, y) = (left as u32, top as u32);
    let (w, h) = ((right - left) as u32, (bottom - top) as u32);
    let cropped = imageops::crop_imm(frame, x, y, w.max(1), h.max(1)).to_image();
    Some(imageops::resize(&cropped, ARCFACE_INPUT_SIZE, ARCFACE_INPUT_SIZE, FilterType::Triangle))
}

/// Convert a 112×112 RGB crop into a normalized NCHW tensor.
fn preprocess(crop: &RgbImage) -> Array4<f32> {
    let size = ARCFACE_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in crop.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }

    tensor
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|v| v / norm).collect()
    } else {
        raw.to_vec()
    }
}

/// Scale a unit vector onto the matcher's distance scale.
fn calibrate(unit: Vec<f32>) -> Vec<f32> {
    let scale = embedding_scale();
    unit.into_iter().map(|v| v * scale).collect()
}
