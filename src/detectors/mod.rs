//! The three forensic detectors.
//!
//! | Detector | Looks at | Fires when | Fail score |
//! |---|---|---|---|
//! | [`MetadataDetector`] | EXIF `Software`, `DateTimeOriginal` | editor software or missing capture date | 50 + 30, capped at 100 |
//! | [`ErrorLevelDetector`] | JPEG re-encode residual | mean normalized residual above threshold | 75 |
//! | [`NoiseVarianceDetector`] | Laplacian noise per block | any block far quieter than average | 85 |
//!
//! # Fault isolation
//!
//! Each detector's public `analyze` returns a report value and nothing else.
//! Internally the work runs as `Result<_, DetectorError>`; an `Err` becomes a
//! `Warning` report with a low fixed score. One detector failing never stops
//! the others or the aggregate score.

mod ela;
mod metadata;
mod noise;

pub use ela::{DEFAULT_BRIGHTNESS_THRESHOLD, ErrorLevelDetector};
pub use metadata::{DEFAULT_SUSPICIOUS_SOFTWARE, MetadataDetector};
pub use noise::{DEFAULT_BLOCK_SIZE, DEFAULT_VARIANCE_THRESHOLD_RATIO, NoiseVarianceDetector};

use crate::imaging::BackendError;
use thiserror::Error;

/// Score given to any report that could not complete its analysis.
pub const INCONCLUSIVE_SCORE: f64 = 10.0;

/// Faults internal to a detector. Never escapes `analyze`.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("codec round-trip failed: {0}")]
    Codec(#[from] BackendError),
    #[error("image has no pixels")]
    EmptyImage,
    #[error("re-encoded image is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("block size must be non-zero")]
    ZeroBlockSize,
}
