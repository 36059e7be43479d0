//! Pure Rust image I/O backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | EXIF tags | `kamadak-exif` via [`read_exif`](super::exif_reader::read_exif) |
//! | JPEG round-trip | `image::codecs::jpeg::JpegEncoder` → `image::load_from_memory_with_format` |
//! | Save | `image::DynamicImage::save` (format from extension) |

use super::backend::{BackendError, ImageBackend};
use super::exif_reader::read_exif;
use super::params::Quality;
use crate::types::RasterImage;
use image::{DynamicImage, ImageEncoder, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Formats with decoders compiled in.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> Vec<&'static str> {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
}

/// Backend on the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode pixels from an in-memory container, sniffing the format.
fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<RasterImage, BackendError> {
        let bytes = std::fs::read(path)?;
        let pixels = decode_bytes(&bytes).map_err(|e| match e {
            BackendError::Decode(msg) => {
                BackendError::Decode(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        let metadata = read_exif(&bytes);
        debug!(
            path = %path.display(),
            width = pixels.width(),
            height = pixels.height(),
            "image loaded"
        );
        Ok(RasterImage::new(pixels, metadata))
    }

    fn recompress(&self, image: &RgbImage, quality: Quality) -> Result<RgbImage, BackendError> {
        let mut encoded = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, quality.value() as u8)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;

        let decoded = image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)
            .map_err(|e| BackendError::Decode(format!("JPEG decode failed: {}", e)))?;
        Ok(decoded.to_rgb8())
    }

    fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), BackendError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // JPEG has no alpha or 16-bit support; flatten before writing.
        let is_jpeg = ImageFormat::from_path(path).is_ok_and(|f| f == ImageFormat::Jpeg);
        let result = if is_jpeg {
            DynamicImage::ImageRgb8(image.to_rgb8()).save(path)
        } else {
            image.save(path)
        };
        result.map_err(|e| BackendError::Encode(format!("Failed to write {}: {}", path.display(), e)))
    }
}
