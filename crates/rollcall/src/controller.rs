//! Application state: mode state machine, capture loop tick and registration flow.

use crate::annotate;
use crate::config::Config;
use crate::policy::{self, Cooldown};
use image::RgbImage;
use rollcall_core::gallery::{self, GalleryError};
use rollcall_core::{FaceEncoder, Gallery, Recognition, Recognizer};
use rollcall_hw::{open_first, CameraProvider, Frame, FrameSource};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

pub const REGISTRATION_ANNOUNCEMENT: &str = "Registration successful.";

/// User-facing surface: log panel, message boxes and the video view.
pub trait Ui {
    fn log(&mut self, text: &str);
    fn info(&mut self, text: &str);
    fn warn(&mut self, text: &str);
    fn error(&mut self, text: &str);
    /// Show an annotated frame along with the faces found in it.
    fn render(&mut self, frame: &RgbImage, recognitions: &[Recognition]);
    /// Blank the video view.
    fn clear(&mut self);
    /// The frame currently on display, if the adapter keeps one.
    fn last_frame(&self) -> Option<&RgbImage> {
        None
    }
}

/// Best-effort speech sink. Must not block.
pub trait Announce {
    fn announce(&self, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Recognizing,
    Registering { user_id: String, name: String },
}

#[derive(Error, Debug)]
enum CaptureError {
    #[error(transparent)]
    Directory(#[from] GalleryError),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Owns every piece of mutable state; driven from a single thread.
pub struct App<U, A> {
    config: Config,
    mode: Mode,
    gallery: Gallery,
    recognizer: Recognizer,
    cooldown: Cooldown,
    encoder: Box<dyn FaceEncoder + Send>,
    cameras: Box<dyn CameraProvider + Send>,
    camera: Option<Box<dyn FrameSource + Send>>,
    /// Newest un-annotated frame, kept while registering.
    retained: Option<Frame>,
    ui: U,
    announcer: A,
}

impl<U: Ui, A: Announce> App<U, A> {
    /// Build an idle app with an empty gallery; call [`App::load_gallery`] next.
    pub fn new(
        config: Config,
        encoder: Box<dyn FaceEncoder + Send>,
        cameras: Box<dyn CameraProvider + Send>,
        ui: U,
        announcer: A,
    ) -> Self {
        Self {
            recognizer: Recognizer::new(config.tolerance),
            cooldown: Cooldown::new(config.cooldown),
            config,
            mode: Mode::Idle,
            gallery: Gallery::default(),
            encoder,
            cameras,
            camera: None,
            retained: None,
            ui,
            announcer,
        }
    }

    pub fn is_camera_open(&self) -> bool {
        self.camera.is_some()
    }

    /// Rebuild the gallery from the dataset directory.
    ///
    /// The previous gallery stays in place if the directory cannot be read.
    pub fn load_gallery(&mut self) {
        self.ui.log("Loading face data...");
        match Gallery::load(&self.config.dataset_dir, self.encoder.as_mut()) {
            Ok(loaded) => {
                self.gallery = loaded;
                self.ui.log(&format!("Data loaded: {} users found.", self.gallery.len()));
            }
            Err(e) => {
                tracing::error!(error = %e, "gallery load failed");
                self.ui.error(&format!("Could not load face data: {e}"));
            }
        }
    }

    /// Write the gallery contents to the log, in load order.
    pub fn list_gallery(&mut self) {
        if self.gallery.is_empty() {
            self.ui.log("No users registered.");
            return;
        }
        let lines: Vec<String> = self
            .gallery
            .entries()
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{i}: {} ({})", e.identity.display_name(), e.identity.stem()))
            .collect();
        for line in lines {
            self.ui.log(&line);
        }
    }

    /// Enter registration mode for `user_id`/`name`, opening the camera if needed.
    pub fn request_registration(&mut self, user_id: &str, name: &str) {
        let user_id = user_id.trim();
        let name = name.trim();

        if user_id.is_empty() || name.is_empty() {
            self.ui.warn("Please enter User ID and Name first!");
            return;
        }
        if user_id.contains(['/', '\\']) {
            self.ui.warn("User ID cannot contain path separators.");
            return;
        }
        if gallery::sanitize_name(name).is_empty() {
            self.ui.warn("Name must contain at least one letter or digit.");
            return;
        }
        if !self.ensure_camera() {
            return;
        }

        self.mode = Mode::Registering {
            user_id: user_id.to_string(),
            name: name.to_string(),
        };
        self.retained = None;
        self.ui.log(&format!("Registration mode: {name}"));
        self.ui.info("Look at the camera. Press 'C' to capture.");
    }

    /// Enter recognition mode, opening the camera if needed.
    pub fn start_recognition(&mut self) {
        if self.gallery.is_empty() {
            self.ui.warn("No user data found! Please register a user first.");
            return;
        }
        if !self.ensure_camera() {
            return;
        }

        self.mode = Mode::Recognizing;
        self.retained = None;
        self.ui.log("Tracking started...");
    }

    /// Back to idle from any mode; releases the camera if one is open.
    pub fn stop(&mut self) {
        self.mode = Mode::Idle;
        if let Some(camera) = self.camera.take() {
            drop(camera);
            tracing::info!("camera released");
        }
        self.retained = None;
        self.ui.clear();
        self.ui.log("Camera stopped.");
    }

    /// Save the retained frame as a new gallery image, reload, and stop.
    ///
    /// No-op unless registering with at least one frame captured.
    pub fn capture(&mut self) {
        let Mode::Registering { user_id, name } = &self.mode else {
            return;
        };
        let Some(frame) = &self.retained else {
            tracing::debug!("capture requested before first frame");
            return;
        };

        let filename = gallery::registration_filename(user_id, name);
        let name = name.clone();

        if let Err(e) = save_frame(&self.config.dataset_dir, &filename, &frame.image) {
            tracing::error!(error = %e, "registration image not saved");
            self.ui.error(&format!("Could not save {filename}: {e}"));
            return;
        }

        self.ui.log(&format!("User saved: {filename}"));
        self.announcer.announce(REGISTRATION_ANNOUNCEMENT);
        self.ui.info(&format!("User {name} registered successfully! Reloading data..."));

        self.load_gallery();
        self.stop();
    }

    /// Write the frame currently on display to `path`.
    pub fn snapshot(&mut self, path: &Path) {
        let Some(frame) = self.ui.last_frame() else {
            self.ui.warn("No frame to save. Start the camera first.");
            return;
        };
        match frame.save(path) {
            Ok(()) => self.ui.log(&format!("Snapshot saved: {}", path.display())),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "snapshot not saved");
                self.ui.error(&format!("Could not save snapshot: {e}"));
            }
        }
    }

    /// One capture → process → render step. Does nothing without an open camera.
    pub fn tick(&mut self, now: Instant) {
        let Some(camera) = self.camera.as_mut() else {
            return;
        };

        let mut frame = match camera.read_frame() {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(error = %e, "frame read failed");
                return;
            }
        };
        if self.config.mirror {
            frame.mirror();
        }

        let recognitions = match self.mode {
            Mode::Recognizing => self.recognize_and_greet(&frame.image, now),
            Mode::Registering { .. } => {
                self.retained = Some(frame.clone());
                Vec::new()
            }
            Mode::Idle => Vec::new(),
        };

        let mut canvas = frame.image;
        annotate::draw(&mut canvas, &self.mode, &recognitions);
        self.ui.render(&canvas, &recognitions);
    }

    fn recognize_and_greet(&mut self, image: &RgbImage, now: Instant) -> Vec<Recognition> {
        let result = self
            .recognizer
            .recognize(image, self.encoder.as_mut(), &self.gallery);
        let recognitions = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "recognition failed");
                return Vec::new();
            }
        };

        for identity in recognitions.iter().filter_map(|r| r.identity.as_ref()) {
            let key = identity.stem();
            if self.cooldown.on_identified(&key, now) {
                self.ui.log(&format!("Identified: {key}"));
                self.announcer.announce(&policy::greeting_now(identity));
            }
        }

        recognitions
    }

    fn ensure_camera(&mut self) -> bool {
        if self.camera.is_some() {
            return true;
        }
        match open_first(self.cameras.as_mut(), &self.config.camera_indices) {
            Ok((index, camera)) => {
                tracing::info!(index, "camera started");
                self.camera = Some(camera);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot open webcam");
                self.ui.error("Cannot open webcam.");
                false
            }
        }
    }
}

fn save_frame(dir: &Path, filename: &str, image: &RgbImage) -> Result<PathBuf, CaptureError> {
    gallery::ensure_dir(dir)?;
    let path = dir.join(filename);
    image.save(&path).map_err(|source| CaptureError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), "registration image saved");
    Ok(path)
}
