//! rollcall-hw — Hardware abstraction for webcam capture.
//!
//! Provides V4L2-based camera access producing RGB frames, and the
//! `FrameSource`/`CameraProvider` seams the capture loop is written against.

pub mod camera;
pub mod frame;
pub mod source;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat, V4lCameraProvider};
pub use frame::Frame;
pub use source::{open_first, CameraProvider, FrameSource};
