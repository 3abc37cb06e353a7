//! Frame → labeled faces.
//!
//! Detection runs on a 1/4-scale copy of the frame; boxes are scaled back up
//! before they are reported.

use crate::encoder::{EncodeError, FaceEncoder};
use crate::gallery::Gallery;
use crate::types::{BoundingBox, EuclideanMatcher, Identity, Matcher};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Linear downscale factor applied before detection.
pub const DOWNSCALE: u32 = 4;

/// Default maximum distance (exclusive) for a match.
pub const DEFAULT_TOLERANCE: f32 = 0.45;

/// One face found in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Box in full-frame coordinates.
    pub bbox: BoundingBox,
    /// Matched identity, `None` for an unknown face.
    pub identity: Option<Identity>,
    /// Distance to the closest gallery entry, if the gallery was non-empty.
    pub distance: Option<f32>,
}

impl Recognition {
    pub fn is_known(&self) -> bool {
        self.identity.is_some()
    }

    /// Label for display: the identity's name or `"Unknown"`.
    pub fn label(&self) -> &str {
        self.identity.as_ref().map_or("Unknown", |id| id.display_name())
    }
}

pub struct Recognizer<M = EuclideanMatcher> {
    matcher: M,
    tolerance: f32,
}

impl Recognizer {
    pub fn new(tolerance: f32) -> Self {
        Self::with_matcher(EuclideanMatcher, tolerance)
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl<M: Matcher> Recognizer<M> {
    pub fn with_matcher(matcher: M, tolerance: f32) -> Self {
        Self { matcher, tolerance }
    }

    /// Detect every face in `frame` and match each one independently against `gallery`.
    pub fn recognize(
        &self,
        frame: &RgbImage,
        encoder: &mut dyn FaceEncoder,
        gallery: &Gallery,
    ) -> Result<Vec<Recognition>, EncodeError> {
        let small = downscale(frame);
        let encodings = encoder.encode(&small)?;

        let recognitions = encodings
            .into_iter()
            .map(|enc| {
                let result = self
                    .matcher
                    .compare(&enc.embedding, gallery.entries(), self.tolerance);
                let identity = match result.index {
                    Some(idx) if result.matched => gallery.get(idx).map(|e| e.identity.clone()),
                    _ => None,
                };
                Recognition {
                    bbox: enc.bbox.scaled(DOWNSCALE as f32),
                    identity,
                    distance: result.distance,
                }
            })
            .collect();

        Ok(recognitions)
    }
}

fn downscale(frame: &RgbImage) -> RgbImage {
    let w = (frame.width() / DOWNSCALE).max(1);
    let h = (frame.height() / DOWNSCALE).max(1);
    imageops::resize(frame, w, h, FilterType::Triangle)
}
