//! Error Level Analysis.
//!
//! Re-encode the image as JPEG at a fixed quality, decode it again, and diff
//! against the original. Regions that were pasted in usually carry their own
//! compression history and respond to the re-encode differently from the
//! rest of the frame.
//!
//! The residual is stretched so its brightest channel value maps to 255; the
//! mean of that stretched map is the brightness ratio compared against the
//! threshold.

use super::{DetectorError, INCONCLUSIVE_SCORE};
use crate::imaging::calculations::{
    abs_difference, max_channel_value, mean_intensity, scale_brightness,
};
use crate::imaging::{ImageBackend, Quality};
use crate::report::{Analysis, DetectorKind, DetectorReport};
use crate::types::RasterImage;
use image::RgbImage;
use tracing::debug;

const FAIL_SCORE: f64 = 75.0;
pub const DEFAULT_BRIGHTNESS_THRESHOLD: f64 = 10.0;

pub struct ErrorLevelDetector<'a, B: ImageBackend> {
    backend: &'a B,
    quality: Quality,
    brightness_threshold: f64,
}

/// Normalized residual and its mean brightness.
struct ElaMeasurement {
    map: RgbImage,
    brightness_ratio: f64,
}

impl<'a, B: ImageBackend> ErrorLevelDetector<'a, B> {
    pub fn new(backend: &'a B, quality: Quality, brightness_threshold: f64) -> Self {
        Self {
            backend,
            quality,
            brightness_threshold,
        }
    }

    pub fn with_defaults(backend: &'a B) -> Self {
        Self::new(backend, Quality::default(), DEFAULT_BRIGHTNESS_THRESHOLD)
    }

    /// Run ELA. The returned artifact is the normalized difference map; it is
    /// absent when the analysis could not complete.
    pub fn analyze(&self, image: &RasterImage) -> Analysis<RgbImage> {
        match self.measure(image) {
            Ok(ElaMeasurement {
                map,
                brightness_ratio,
            }) => {
                debug!(
                    brightness_ratio,
                    threshold = self.brightness_threshold,
                    "ELA measured"
                );
                let report = if brightness_ratio > self.brightness_threshold {
                    DetectorReport::fail(
                        DetectorKind::Ela,
                        format!(
                            "High ELA brightness ratio: {:.2} (Threshold: {}). Potential manipulation.",
                            brightness_ratio, self.brightness_threshold
                        ),
                        FAIL_SCORE,
                    )
                } else {
                    DetectorReport::pass(
                        DetectorKind::Ela,
                        format!(
                            "ELA brightness ratio: {:.2} (Threshold: {}).",
                            brightness_ratio, self.brightness_threshold
                        ),
                    )
                };
                Analysis::with_artifact(report, map)
            }
            Err(e) => {
                debug!(error = %e, "ELA could not complete");
                Analysis::without_artifact(DetectorReport::warning(
                    DetectorKind::Ela,
                    format!("Could not perform ELA analysis: {e}"),
                    INCONCLUSIVE_SCORE,
                ))
            }
        }
    }

    fn measure(&self, image: &RasterImage) -> Result<ElaMeasurement, DetectorError> {
        let original = image.pixels().to_rgb8();
        if original.width() == 0 || original.height() == 0 {
            return Err(DetectorError::EmptyImage);
        }

        let resaved = self.backend.recompress(&original, self.quality)?;
        let diff = abs_difference(&original, &resaved).ok_or(DetectorError::DimensionMismatch {
            expected: original.dimensions(),
            actual: resaved.dimensions(),
        })?;

        let max_diff = match max_channel_value(&diff) {
            0 => 1,
            m => m,
        };
        let map = scale_brightness(&diff, 255.0 / max_diff as f64);
        let brightness_ratio = mean_intensity(&map).ok_or(DetectorError::EmptyImage)?;

        Ok(ElaMeasurement {
            map,
            brightness_ratio,
        })
    }
}
