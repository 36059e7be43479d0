//! Embedded-metadata inspection.
//!
//! Two signals, scored additively:
//!
//! - `Software` contains a known image editor (case-insensitive) → +50
//! - `DateTimeOriginal` is missing → +30
//!
//! Missing metadata altogether is only a `Warning`: plenty of legitimate
//! pipelines (messengers, scanners, web uploads) strip EXIF.

use crate::report::{DetectorKind, DetectorReport};
use crate::types::{EmbeddedMetadata, RasterImage};

const SUSPICIOUS_SOFTWARE_SCORE: f64 = 50.0;
const MISSING_DATE_SCORE: f64 = 30.0;
const NO_METADATA_SCORE: f64 = 20.0;

pub const DEFAULT_SUSPICIOUS_SOFTWARE: &[&str] = &["photoshop", "gimp", "canva"];

#[derive(Debug, Clone)]
pub struct MetadataDetector {
    /// Lowercased editor names matched as substrings of `Software`.
    suspicious_software: Vec<String>,
}

impl MetadataDetector {
    pub fn new<S: AsRef<str>>(suspicious_software: &[S]) -> Self {
        Self {
            suspicious_software: suspicious_software
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn analyze(&self, image: &RasterImage) -> DetectorReport {
        let tags = match image.metadata() {
            EmbeddedMetadata::Unreadable(reason) => {
                return DetectorReport::warning(
                    DetectorKind::Metadata,
                    format!("Could not read image metadata: {reason}"),
                    super::INCONCLUSIVE_SCORE,
                );
            }
            EmbeddedMetadata::Tags(tags) if tags.is_empty() => {
                return DetectorReport::warning(
                    DetectorKind::Metadata,
                    "No EXIF metadata found. This can indicate tampering, but many \
                     pipelines strip metadata legitimately.",
                    NO_METADATA_SCORE,
                );
            }
            meta @ EmbeddedMetadata::Tags(_) => meta,
        };

        let mut warnings = Vec::new();
        let mut score = 0.0;

        if let Some(software) = tags.get("Software").filter(|s| self.matches_editor(s)) {
            warnings.push(format!("Image was edited with suspicious software: {software}"));
            score += SUSPICIOUS_SOFTWARE_SCORE;
        }

        if tags.get("DateTimeOriginal").is_none_or(|d| d.trim().is_empty()) {
            warnings.push("Original creation date is missing.".to_string());
            score += MISSING_DATE_SCORE;
        }

        if warnings.is_empty() {
            DetectorReport::pass(DetectorKind::Metadata, "No suspicious metadata found.")
        } else {
            DetectorReport::fail(DetectorKind::Metadata, warnings.join("\n"), score.min(100.0))
        }
    }

    fn matches_editor(&self, software: &str) -> bool {
        let software = software.to_lowercase();
        self.suspicious_software
            .iter()
            .any(|editor| software.contains(editor.as_str()))
    }
}

impl Default for MetadataDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SUSPICIOUS_SOFTWARE)
    }
}
