//! Seams between the capture loop and camera hardware.

use crate::camera::CameraError;
use crate::frame::Frame;

/// An open camera handle. Dropping it releases the device.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Opens camera handles by device index.
pub trait CameraProvider {
    fn open(&mut self, index: u32) -> Result<Box<dyn FrameSource + Send>, CameraError>;
}

/// Try each index in order and return the first camera that opens.
///
/// Every failure is logged; the last error is returned when none open.
pub fn open_first(
    provider: &mut dyn CameraProvider,
    indices: &[u32],
) -> Result<(u32, Box<dyn FrameSource + Send>), CameraError> {
    let mut last_err = CameraError::DeviceNotFound("no camera index configured".to_string());

    for &index in indices {
        match provider.open(index) {
            Ok(source) => return Ok((index, source)),
            Err(e) => {
                tracing::warn!(index, error = %e, "camera failed to open");
                last_err = e;
            }
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct Blank;

    impl FrameSource for Blank {
        fn read_frame(&mut self) -> Result<Frame, CameraError> {
            Ok(Frame::new(RgbImage::new(4, 4), 0))
        }
    }

    /// Opens only the indices in `working`, recording every attempt.
    struct Provider {
        working: Vec<u32>,
        attempts: Vec<u32>,
    }

    impl CameraProvider for Provider {
        fn open(&mut self, index: u32) -> Result<Box<dyn FrameSource + Send>, CameraError> {
            self.attempts.push(index);
            if self.working.contains(&index) {
                Ok(Box::new(Blank))
            } else {
                Err(CameraError::DeviceNotFound(format!("/dev/video{index}")))
            }
        }
    }

    #[test]
    fn test_open_first_prefers_earlier_index() {
        let mut p = Provider {
            working: vec![0, 1],
            attempts: vec![],
        };
        let (index, _) = open_first(&mut p, &[0, 1]).unwrap();
        assert_eq!(index, 0);
        assert_eq!(p.attempts, vec![0]);
    }

    #[test]
    fn test_open_first_falls_back() {
        let mut p = Provider {
            working: vec![1],
            attempts: vec![],
        };
        let (index, _) = open_first(&mut p, &[0, 1]).unwrap();
        assert_eq!(index, 1);
        assert_eq!(p.attempts, vec![0, 1]);
    }

    #[test]
    fn test_open_first_all_fail() {
        let mut p = Provider {
            working: vec![],
            attempts: vec![],
        };
        let err = open_first(&mut p, &[0, 1]).err().unwrap();
        assert!(err.to_string().contains("/dev/video1"));
    }

    #[test]
    fn test_open_first_no_indices() {
        let mut p = Provider {
            working: vec![0],
            attempts: vec![],
        };
        assert!(open_first(&mut p, &[]).is_err());
        assert!(p.attempts.is_empty());
    }
}
