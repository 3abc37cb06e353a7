use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// Return a copy with every coordinate multiplied by `factor`.
    ///
    /// Used to map boxes found on a downscaled frame back to the full frame.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
            confidence: self.confidence,
            landmarks: self
                .landmarks
                .map(|lms| lms.map(|(lx, ly)| (lx * factor, ly * factor))),
        }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection-over-Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);

        let inter = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - inter;

        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// Face feature vector (512-dimensional, L2-normalized, for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance between two embeddings. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A detected face together with its feature vector.
#[derive(Debug, Clone)]
pub struct FaceEncoding {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// Who a gallery image belongs to.
///
/// Stored on disk as the file stem `"<id>_<name>"`. The split happens on the
/// last underscore, so `stem()` always reproduces the parsed string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<String>,
    pub name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }

    /// Parse a gallery file stem such as `"1001_Steve"`.
    pub fn from_stem(stem: &str) -> Self {
        match stem.rsplit_once('_') {
            Some((id, name)) => Self {
                id: Some(id.to_string()),
                name: name.to_string(),
            },
            None => Self {
                id: None,
                name: stem.to_string(),
            },
        }
    }

    /// Canonical string form; also the cooldown key.
    pub fn stem(&self) -> String {
        match &self.id {
            Some(id) => format!("{id}_{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Name shown to users and spoken in greetings.
    pub fn display_name(&self) -> &str {
        &self.name
    }
}

/// A gallery entry: an identity with the feature vector of its enrolled image.
#[derive(Debug, Clone)]
pub struct EnrolledIdentity {
    pub identity: Identity,
    pub embedding: Embedding,
}

/// Result of matching a query embedding against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Distance to the closest gallery entry, `None` for an empty gallery.
    pub distance: Option<f32>,
    /// Gallery index of the closest entry (set even when it is too far to match).
    pub index: Option<usize>,
}

/// Strategy for comparing a query embedding against a gallery of enrolled faces.
pub trait Matcher {
    fn compare(
        &self,
        query: &Embedding,
        gallery: &[EnrolledIdentity],
        tolerance: f32,
    ) -> MatchResult;
}

/// Nearest-neighbour matcher on Euclidean distance.
///
/// The single rule is: arg-min distance over the gallery, and a match only if
/// that minimum is strictly below the tolerance. Ties keep the lowest index.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(
        &self,
        query: &Embedding,
        gallery: &[EnrolledIdentity],
        tolerance: f32,
    ) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (i, entry) in gallery.iter().enumerate() {
            let dist = query.distance(&entry.embedding);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((i, dist)),
            }
        }

        match best {
            Some((idx, dist)) => MatchResult {
                matched: dist < tolerance,
                distance: Some(dist),
                index: Some(idx),
            },
            None => MatchResult {
                matched: false,
                distance: None,
                index: None,
            },
        }
    }
}
