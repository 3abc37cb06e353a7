//! The face encoding capability: detection followed by one feature vector per face.

use crate::detector::{DetectorError, FaceDetector};
use crate::embedder::{EmbedderError, FaceEmbedder};
use crate::types::FaceEncoding;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("embedder: {0}")]
    Embedder(#[from] EmbedderError),
}

/// Finds faces in an image and encodes each one.
///
/// Results are in detector order (highest confidence first); the gallery
/// relies on that order when it keeps only the first face of an image.
pub trait FaceEncoder {
    fn encode(&mut self, image: &RgbImage) -> Result<Vec<FaceEncoding>, EncodeError>;
}

/// SCRFD + ArcFace encoder running on ONNX Runtime.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    embedder: FaceEmbedder,
}

impl OnnxFaceEncoder {
    pub fn load(scrfd_path: &str, arcface_path: &str) -> Result<Self, EncodeError> {
        let detector = FaceDetector::load(scrfd_path)?;
        let embedder = FaceEmbedder::load(arcface_path)?;
        Ok(Self { detector, embedder })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&mut self, image: &RgbImage) -> Result<Vec<FaceEncoding>, EncodeError> {
        let faces = self.detector.detect(image)?;
        let mut encodings = Vec::with_capacity(faces.len());

        for bbox in faces {
            match self.embedder.extract(image, &bbox) {
                Ok(embedding) => encodings.push(FaceEncoding { bbox, embedding }),
                Err(EmbedderError::EmptyCrop) => {
                    tracing::debug!(?bbox, "skipping face outside frame");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(encodings)
    }
}
