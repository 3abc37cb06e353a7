//! Gallery store: enrolled identities loaded from a directory of labeled images.
//!
//! Files are named `"<id>_<name>.<ext>"`. Each image contributes at most one
//! entry (its first detected face); images without a face are skipped.

use crate::encoder::FaceEncoder;
use crate::types::{EnrolledIdentity, Identity};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions picked up by [`Gallery::load`], compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Extension used for newly registered faces.
pub const REGISTRATION_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot create gallery directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot list gallery directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },
}

/// Ordered collection of enrolled identities.
///
/// Order is load order; the matcher resolves distance ties to the lowest index.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<EnrolledIdentity>,
}

impl Gallery {
    pub fn from_entries(entries: Vec<EnrolledIdentity>) -> Self {
        Self { entries }
    }

    /// Build a fresh gallery from every image in `dir`, creating `dir` if needed.
    ///
    /// Unreadable images and encoder failures are logged and skipped; only
    /// directory-level failures are returned.
    pub fn load(dir: &Path, encoder: &mut dyn FaceEncoder) -> Result<Self, GalleryError> {
        ensure_dir(dir)?;

        let listing = std::fs::read_dir(dir).map_err(|source| GalleryError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut entries = Vec::new();
        for dirent in listing {
            let path = match dirent {
                Ok(d) => d.path(),
                Err(e) => {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        "skipping unreadable directory entry"
                    );
                    continue;
                }
            };
            if !is_gallery_image(&path) {
                continue;
            }
            if let Some(entry) = load_entry(&path, encoder) {
                entries.push(entry);
            }
        }

        tracing::info!(dir = %dir.display(), count = entries.len(), "gallery loaded");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[EnrolledIdentity] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&EnrolledIdentity> {
        self.entries.get(index)
    }
}

fn load_entry(path: &Path, encoder: &mut dyn FaceEncoder) -> Option<EnrolledIdentity> {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        tracing::warn!(path = %path.display(), "skipping image with non UTF-8 name");
        return None;
    };

    let image = match image::open(path) {
        Ok(img) => img.to_rgb8(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "error loading gallery image");
            return None;
        }
    };

    let encodings = match encoder.encode(&image) {
        Ok(encs) => encs,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "error encoding gallery image");
            return None;
        }
    };

    let Some(first) = encodings.into_iter().next() else {
        tracing::debug!(path = %path.display(), "no face found, skipping");
        return None;
    };

    Some(EnrolledIdentity {
        identity: Identity::from_stem(stem),
        embedding: first.embedding,
    })
}

/// Create the gallery directory if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<(), GalleryError> {
    std::fs::create_dir_all(dir).map_err(|source| GalleryError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

pub fn is_gallery_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Keep only letters and digits, so a name is safe inside a file stem.
pub fn sanitize_name(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// File name for a new registration: `"<user_id>_<sanitized name>.jpg"`.
pub fn registration_filename(user_id: &str, name: &str) -> String {
    format!("{user_id}_{}.{REGISTRATION_EXTENSION}", sanitize_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{solid_image, ColorEncoder};
    use image::Rgb;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Steve O'Neil"), "SteveONeil");
        assert_eq!(sanitize_name("Zoë-2"), "Zoë2");
        assert_eq!(sanitize_name("!!"), "");
    }

    #[test]
    fn test_registration_filename_round_trip() {
        let file = registration_filename("1001", "Steve O'Neil");
        assert_eq!(file, "1001_SteveONeil.jpg");

        let stem = Path::new(&file).file_stem().unwrap().to_str().unwrap();
        let identity = Identity::from_stem(stem);
        assert_eq!(identity.id.as_deref(), Some("1001"));
        assert_eq!(identity.display_name(), "SteveONeil");
    }

    #[test]
    fn test_is_gallery_image() {
        assert!(is_gallery_image(Path::new("a/1_x.jpg")));
        assert!(is_gallery_image(Path::new("1_x.JPEG")));
        assert!(is_gallery_image(Path::new("1_x.png")));
        assert!(!is_gallery_image(Path::new("1_x.gif")));
        assert!(!is_gallery_image(Path::new("notes")));
    }

    #[test]
    fn test_load_skips_faceless_and_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        solid_image(Rgb([200, 10, 10])).save(dir.path().join("1001_Steve.png")).unwrap();
        solid_image(Rgb([10, 200, 10])).save(dir.path().join("1002_Ann.jpg")).unwrap();
        // Black images have no face for the fake encoder.
        solid_image(Rgb([0, 0, 0])).save(dir.path().join("1003_Ghost.png")).unwrap();
        std::fs::write(dir.path().join("1004_Broken.jpg"), b"not an image").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let gallery = Gallery::load(dir.path(), &mut ColorEncoder).unwrap();

        let mut stems: Vec<String> = gallery.entries().iter().map(|e| e.identity.stem()).collect();
        stems.sort();
        assert_eq!(stems, vec!["1001_Steve", "1002_Ann"]);
    }

    #[test]
    fn test_load_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("dataset");
        let gallery = Gallery::load(&dir, &mut ColorEncoder).unwrap();
        assert!(gallery.is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_load_keeps_first_face() {
        let dir = tempfile::tempdir().unwrap();
        // The fake encoder reports a second face for two-tone images.
        let mut img = solid_image(Rgb([255, 0, 0]));
        img.put_pixel(img.width() - 1, img.height() - 1, Rgb([0, 0, 255]));
        img.save(dir.path().join("7_Two.png")).unwrap();

        let gallery = Gallery::load(dir.path(), &mut ColorEncoder).unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.entries()[0].embedding.values, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_load_fails_when_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dataset");
        std::fs::write(&file, b"").unwrap();
        assert!(Gallery::load(&file, &mut ColorEncoder).is_err());
    }
}
