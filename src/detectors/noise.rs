//! Block-wise noise variance.
//!
//! Sensor noise is roughly uniform across a genuine frame. A region pasted in
//! from another source, or smoothed to hide an edit, shows far less
//! high-frequency energy than its surroundings.
//!
//! The Laplacian magnitude serves as the noise estimate. It is tiled into
//! full `block_size` squares (trailing partial tiles are dropped); any tile
//! whose variance is below `average * variance_threshold_ratio` counts as
//! suspicious.

use super::{DetectorError, INCONCLUSIVE_SCORE};
use crate::imaging::calculations::{block_variances, laplacian_magnitude};
use crate::report::{Analysis, DetectorKind, DetectorReport};
use crate::types::RasterImage;
use image::GrayImage;
use tracing::debug;

const FAIL_SCORE: f64 = 85.0;
pub const DEFAULT_BLOCK_SIZE: u32 = 50;
pub const DEFAULT_VARIANCE_THRESHOLD_RATIO: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct NoiseVarianceDetector {
    block_size: u32,
    variance_threshold_ratio: f64,
}

/// Outcome of the block scan, before it is turned into a report.
#[derive(Debug, PartialEq)]
enum BlockScan {
    TooSmall,
    Scanned {
        blocks: usize,
        suspicious: usize,
        average_variance: f64,
    },
}

impl NoiseVarianceDetector {
    pub fn new(block_size: u32, variance_threshold_ratio: f64) -> Self {
        Self {
            block_size,
            variance_threshold_ratio,
        }
    }

    /// Run the block scan. The returned artifact is the noise map, present
    /// whenever the Laplacian could be computed (including the too-small case).
    pub fn analyze(&self, image: &RasterImage) -> Analysis<GrayImage> {
        let noise_map = match noise_map(image) {
            Ok(map) => map,
            Err(e) => return Analysis::without_artifact(inconclusive(e)),
        };

        let report = match self.scan(&noise_map) {
            Ok(BlockScan::TooSmall) => DetectorReport::warning(
                DetectorKind::NoiseVariance,
                format!(
                    "Image is too small for block analysis ({}x{} px, block size {}).",
                    noise_map.width(),
                    noise_map.height(),
                    self.block_size
                ),
                INCONCLUSIVE_SCORE,
            ),
            Ok(BlockScan::Scanned {
                blocks,
                suspicious,
                average_variance,
            }) => {
                debug!(blocks, suspicious, average_variance, "noise blocks scanned");
                if suspicious > 0 {
                    DetectorReport::fail(
                        DetectorKind::NoiseVariance,
                        format!(
                            "Found {suspicious} of {blocks} block(s) with significantly lower \
                             noise variance than average. Potential splicing."
                        ),
                        FAIL_SCORE,
                    )
                } else {
                    DetectorReport::pass(
                        DetectorKind::NoiseVariance,
                        format!("Noise variance is consistent across {blocks} block(s)."),
                    )
                }
            }
            Err(e) => inconclusive(e),
        };

        Analysis::with_artifact(report, noise_map)
    }

    fn scan(&self, noise_map: &GrayImage) -> Result<BlockScan, DetectorError> {
        if self.block_size == 0 {
            return Err(DetectorError::ZeroBlockSize);
        }
        let variances = block_variances(noise_map, self.block_size);
        if variances.is_empty() {
            return Ok(BlockScan::TooSmall);
        }

        let average_variance = variances.iter().sum::<f64>() / variances.len() as f64;
        let threshold = average_variance * self.variance_threshold_ratio;
        let suspicious = variances.iter().filter(|&&v| v < threshold).count();

        Ok(BlockScan::Scanned {
            blocks: variances.len(),
            suspicious,
            average_variance,
        })
    }
}

impl Default for NoiseVarianceDetector {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, DEFAULT_VARIANCE_THRESHOLD_RATIO)
    }
}

/// Grayscale → absolute Laplacian, 8-bit.
fn noise_map(image: &RasterImage) -> Result<GrayImage, DetectorError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DetectorError::EmptyImage);
    }
    Ok(laplacian_magnitude(&image.pixels().to_luma8()))
}

fn inconclusive(e: DetectorError) -> DetectorReport {
    DetectorReport::warning(
        DetectorKind::NoiseVariance,
        format!("Could not perform noise variance analysis: {e}"),
        INCONCLUSIVE_SCORE,
    )
}
