//! Image I/O backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the three operations the analyzer needs
//! from the outside world: load a file into a [`RasterImage`], push pixels
//! through the lossy codec and back, and write a pixel matrix to disk.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): the `image` crate for
//! pixels and `kamadak-exif` for tags. Tests use [`tests::MockBackend`] to
//! inject codec failures without touching the filesystem.

use super::params::Quality;
use crate::types::RasterImage;
use image::{DynamicImage, RgbImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Trait for image I/O backends.
///
/// `Sync` because the detectors share one backend across rayon tasks.
pub trait ImageBackend: Sync {
    /// Read and decode an image file, extracting embedded metadata alongside.
    fn load(&self, path: &Path) -> Result<RasterImage, BackendError>;

    /// Encode `image` as JPEG at `quality` and decode the result back to pixels.
    fn recompress(&self, image: &RgbImage, quality: Quality) -> Result<RgbImage, BackendError>;

    /// Write an image to `path`, format inferred from the extension.
    fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), BackendError>;
}
