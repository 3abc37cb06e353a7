//! Face alignment by similarity transform.
//!
//! Maps the five detected landmarks onto the InsightFace reference positions
//! of a 112×112 crop (scale, rotation and translation only).

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

/// Side of the aligned crop expected by ArcFace.
pub const ALIGNED_SIZE: u32 = 112;

/// Eye, eye, nose, mouth corner, mouth corner in a 112×112 crop.
pub const REFERENCE_LANDMARKS: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// `x' = a·x − b·y + tx`, `y' = b·x + a·y + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    /// Least-squares fit taking `src` points onto `dst`.
    ///
    /// `None` when the source points are (nearly) all the same.
    pub fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Option<Self> {
        let n = src.len() as f32;
        let mean = |pts: &[(f32, f32); 5]| {
            let (sx, sy) = pts.iter().fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
            (sx / n, sy / n)
        };
        let (msx, msy) = mean(src);
        let (mdx, mdy) = mean(dst);

        let (mut dot, mut cross, mut norm) = (0.0f32, 0.0f32, 0.0f32);
        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst) {
            let (u, v) = (sx - msx, sy - msy);
            let (p, q) = (dx - mdx, dy - mdy);
            dot += u * p + v * q;
            cross += u * q - v * p;
            norm += u * u + v * v;
        }
        if norm < 1e-6 {
            return None;
        }

        let a = dot / norm;
        let b = cross / norm;
        Some(Self {
            a,
            b,
            tx: mdx - (a * msx - b * msy),
            ty: mdy - (b * msx + a * msy),
        })
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    fn projection(&self) -> Option<Projection> {
        Projection::from_matrix([self.a, -self.b, self.tx, self.b, self.a, self.ty, 0.0, 0.0, 1.0])
    }
}

/// Warp the face with the given landmarks into a 112×112 aligned crop.
///
/// Pixels that fall outside the frame are black. `None` for degenerate landmarks.
pub fn align_face(frame: &RgbImage, landmarks: &[(f32, f32); 5]) -> Option<RgbImage> {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS)?;
    let projection = transform.projection()?;

    let mut aligned = RgbImage::new(ALIGNED_SIZE, ALIGNED_SIZE);
    warp_into(frame, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut aligned);
    Some(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: (f32, f32), b: (f32, f32)) {
        assert!((a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3, "{a:?} != {b:?}");
    }

    fn shifted(dx: f32, dy: f32, scale: f32) -> [(f32, f32); 5] {
        REFERENCE_LANDMARKS.map(|(x, y)| (x * scale + dx, y * scale + dy))
    }

    #[test]
    fn test_reference_maps_to_itself() {
        let t = Similarity::estimate(&REFERENCE_LANDMARKS, &REFERENCE_LANDMARKS).unwrap();
        assert!((t.a - 1.0).abs() < 1e-5);
        assert!(t.b.abs() < 1e-5);
        assert!(t.tx.abs() < 1e-3 && t.ty.abs() < 1e-3);
    }

    #[test]
    fn test_scaled_and_shifted_face_is_recovered() {
        let src = shifted(10.0, 20.0, 2.0);
        let t = Similarity::estimate(&src, &REFERENCE_LANDMARKS).unwrap();
        assert!((t.a - 0.5).abs() < 1e-5);
        for (s, r) in src.iter().zip(REFERENCE_LANDMARKS) {
            assert_close(t.apply(*s), r);
        }
    }

    #[test]
    fn test_rotated_face_is_recovered() {
        // Quarter turn plus a shift.
        let src = REFERENCE_LANDMARKS.map(|(x, y)| (-y + 200.0, x));
        let t = Similarity::estimate(&src, &REFERENCE_LANDMARKS).unwrap();
        for (s, r) in src.iter().zip(REFERENCE_LANDMARKS) {
            assert_close(t.apply(*s), r);
        }
    }

    #[test]
    fn test_degenerate_landmarks() {
        assert!(Similarity::estimate(&[(5.0, 5.0); 5], &REFERENCE_LANDMARKS).is_none());
        assert!(align_face(&RgbImage::new(50, 50), &[(5.0, 5.0); 5]).is_none());
    }

    #[test]
    fn test_align_face_crops_model_sized_face() {
        let color = Rgb([90, 160, 30]);
        let frame = RgbImage::from_pixel(200, 200, color);

        let aligned = align_face(&frame, &shifted(40.0, 30.0, 1.0)).unwrap();
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        assert_eq!(*aligned.get_pixel(56, 56), color);
    }

    #[test]
    fn test_align_face_pads_outside_frame_with_black() {
        let color = Rgb([90, 160, 30]);
        let frame = RgbImage::from_pixel(200, 200, color);

        // Output (0, 0) maps to source (-30, -30).
        let aligned = align_face(&frame, &shifted(-30.0, -30.0, 1.0)).unwrap();
        assert_eq!(*aligned.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*aligned.get_pixel(100, 100), color);
    }
}
