//! # docuverify
//!
//! Heuristic tamper detection for document images. Three independent
//! forensic checks run over the same decoded image and their scores are
//! combined into one weighted "fake probability" between 0 and 100.
//!
//! # Architecture: One Image, Three Detectors
//!
//! ```text
//! load ──► RasterImage ──► Metadata ─┐
//!                     ├──► ELA ──────┼──► weighted score ──► report
//!                     └──► Noise ────┘         │
//!                                      ELA map | noise map ──► debug_report.jpg
//! ```
//!
//! The image is loaded once and shared by reference. Each detector is a pure
//! function of that image (plus its settings) and returns a report value; the
//! two pixel-based detectors also hand back the map they computed. Nothing
//! reads hidden state left behind by a previous call.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`analyzer`] | Runs the detectors, computes the weighted score, writes the debug image |
//! | [`detectors`] | Metadata inspection, error level analysis, block noise variance |
//! | [`report`] | `DetectorReport`, `Verdict`, `AggregateScore`, `RiskLevel` |
//! | [`types`] | `RasterImage` and the metadata extracted at load time |
//! | [`imaging`] | Pure-Rust image I/O, EXIF reading, pixel math |
//! | [`config`] | `docuverify.toml` loading, merging, and validation |
//! | [`output`] | CLI table formatting |
//!
//! # Design Decisions
//!
//! ## Warnings Are Not Evidence
//!
//! A detector that cannot finish (no EXIF container, codec error, image smaller
//! than one noise block) reports `Warning` with a small fixed score. It never
//! aborts the run. Only a failed initial load, or a panic escaping a detector,
//! stops an analysis: both mean no trustworthy score can be produced.
//!
//! ## Weights Live in One Table
//!
//! Detector kinds are a closed enum and the weights are a map keyed by that
//! enum. A report whose kind has no weight contributes nothing. Adding a
//! detector means extending the enum and the `[weights]` section together.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, JPEG re-encoding, and resizing use the `image` crate; EXIF comes
//! from `kamadak-exif`. No system libraries, so the binary runs anywhere.

pub mod analyzer;
pub mod config;
pub mod detectors;
pub mod imaging;
pub mod output;
pub mod report;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
