//! Analyzer configuration module.
//!
//! Handles loading, validating, and merging `docuverify.toml`. Stock defaults
//! are overridden by whatever the user file sets; everything is optional.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [metadata]
//! suspicious_software = ["photoshop", "gimp", "canva"]
//!
//! [ela]
//! quality = 90                 # JPEG re-encode quality (1-100)
//! brightness_threshold = 10.0  # Mean normalized residual that counts as a hit
//!
//! [noise]
//! block_size = 50                # Tile edge in pixels
//! variance_threshold_ratio = 0.2 # Tile is suspicious below avg * ratio
//!
//! [weights]
//! metadata = 0.2
//! ela = 0.4
//! noise_variance = 0.4
//!
//! [output]
//! debug_report = "debug_report.jpg"
//! # ela_map = "ela.png"         # Also write the raw ELA map
//! # noise_map = "noise.png"     # Also write the raw noise map
//!
//! [processing]
//! parallel_detectors = true
//! max_processes = 4            # Batch workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::detectors::{
    ErrorLevelDetector, MetadataDetector, NoiseVarianceDetector,
};
use crate::imaging::{ImageBackend, Quality};
use crate::report::DetectorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "docuverify.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Analyzer configuration loaded from `docuverify.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub metadata: MetadataConfig,
    pub ela: ElaConfig,
    pub noise: NoiseConfig,
    pub weights: WeightsConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
}

impl AnalyzerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.ela.quality) {
            return Err(ConfigError::Validation("ela.quality must be 1-100".into()));
        }
        if !(self.ela.brightness_threshold.is_finite() && self.ela.brightness_threshold > 0.0) {
            return Err(ConfigError::Validation(
                "ela.brightness_threshold must be a positive number".into(),
            ));
        }
        if self.noise.block_size < 2 {
            return Err(ConfigError::Validation(
                "noise.block_size must be at least 2".into(),
            ));
        }
        let ratio = self.noise.variance_threshold_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::Validation(
                "noise.variance_threshold_ratio must be in (0, 1]".into(),
            ));
        }
        let weights = [
            self.weights.metadata,
            self.weights.ela,
            self.weights.noise_variance,
        ];
        if weights.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
            return Err(ConfigError::Validation(
                "weights must be non-negative numbers".into(),
            ));
        }
        if weights.iter().sum::<f64>() > 1.0 + 1e-9 {
            return Err(ConfigError::Validation(
                "weights must sum to at most 1.0".into(),
            ));
        }
        if self.output.debug_report.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output.debug_report must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn metadata_detector(&self) -> MetadataDetector {
        MetadataDetector::new(&self.metadata.suspicious_software)
    }

    pub fn ela_detector<'a, B: ImageBackend>(&self, backend: &'a B) -> ErrorLevelDetector<'a, B> {
        ErrorLevelDetector::new(
            backend,
            Quality::new(self.ela.quality),
            self.ela.brightness_threshold,
        )
    }

    pub fn noise_detector(&self) -> NoiseVarianceDetector {
        NoiseVarianceDetector::new(self.noise.block_size, self.noise.variance_threshold_ratio)
    }
}

/// Metadata detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Editor names matched case-insensitively as substrings of EXIF `Software`.
    pub suspicious_software: Vec<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            suspicious_software: crate::detectors::DEFAULT_SUSPICIOUS_SOFTWARE
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Error Level Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElaConfig {
    /// JPEG quality used for the re-encode (1-100).
    pub quality: u32,
    /// Mean normalized residual above which ELA reports a failure.
    pub brightness_threshold: f64,
}

impl Default for ElaConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
            brightness_threshold: crate::detectors::DEFAULT_BRIGHTNESS_THRESHOLD,
        }
    }
}

/// Noise variance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseConfig {
    /// Tile edge length in pixels.
    pub block_size: u32,
    /// A tile is suspicious when its variance is below `average * ratio`.
    pub variance_threshold_ratio: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            block_size: crate::detectors::DEFAULT_BLOCK_SIZE,
            variance_threshold_ratio: crate::detectors::DEFAULT_VARIANCE_THRESHOLD_RATIO,
        }
    }
}

/// Per-detector weights for the aggregate score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightsConfig {
    pub metadata: f64,
    pub ela: f64,
    pub noise_variance: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            metadata: 0.2,
            ela: 0.4,
            noise_variance: 0.4,
        }
    }
}

impl WeightsConfig {
    /// The weight table keyed by detector kind.
    pub fn table(&self) -> BTreeMap<DetectorKind, f64> {
        DetectorKind::ALL
            .into_iter()
            .map(|kind| {
                let weight = match kind {
                    DetectorKind::Metadata => self.metadata,
                    DetectorKind::Ela => self.ela,
                    DetectorKind::NoiseVariance => self.noise_variance,
                };
                (kind, weight)
            })
            .collect()
    }
}

/// Artifact output paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Side-by-side ELA | noise image, overwritten on every run.
    pub debug_report: PathBuf,
    /// Optional path for the raw ELA map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ela_map: Option<PathBuf>,
    /// Optional path for the raw noise map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_map: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            debug_report: PathBuf::from("debug_report.jpg"),
            ela_map: None,
            noise_map: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Run the three detectors concurrently on one image.
    pub parallel_detectors: bool,
    /// Maximum number of images analyzed at once in batch mode.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_detectors: true,
            max_processes: None,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AnalyzerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AnalyzerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AnalyzerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `docuverify.toml` from the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(dir: &Path) -> Result<AnalyzerConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(&dir.join(CONFIG_FILE_NAME))?)
}

/// Load an explicitly named config file. Unlike [`load_config`], a missing
/// file is an error.
pub fn load_config_file(path: &Path) -> Result<AnalyzerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value(), Some(value))
}

/// Returns a fully-commented stock `docuverify.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# docuverify configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Metadata detector
# ---------------------------------------------------------------------------
[metadata]
# Editor names matched case-insensitively against the EXIF Software tag.
suspicious_software = ["photoshop", "gimp", "canva"]

# ---------------------------------------------------------------------------
# Error Level Analysis
# ---------------------------------------------------------------------------
[ela]
# JPEG quality used to re-encode the image (1-100).
quality = 90

# Mean brightness of the normalized residual above which ELA fails.
brightness_threshold = 10.0

# ---------------------------------------------------------------------------
# Noise variance
# ---------------------------------------------------------------------------
[noise]
# Edge length of the square tiles, in pixels. Partial tiles at the right and
# bottom edges are not analyzed.
block_size = 50

# A tile is suspicious when its noise variance is below average * ratio.
variance_threshold_ratio = 0.2

# ---------------------------------------------------------------------------
# Aggregate score weights (must sum to at most 1.0)
# ---------------------------------------------------------------------------
[weights]
metadata = 0.2
ela = 0.4
noise_variance = 0.4

# ---------------------------------------------------------------------------
# Output artifacts
# ---------------------------------------------------------------------------
[output]
# Side-by-side ELA | noise map, overwritten on each run.
debug_report = "debug_report.jpg"

# Also write the individual maps.
# ela_map = "ela_map.png"
# noise_map = "noise_map.png"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Run the three detectors concurrently on each image.
parallel_detectors = true

# Maximum images analyzed in parallel in batch mode.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(
            config.metadata.suspicious_software,
            vec!["photoshop", "gimp", "canva"]
        );
        assert_eq!(config.ela.quality, 90);
        assert_eq!(config.ela.brightness_threshold, 10.0);
        assert_eq!(config.noise.block_size, 50);
        assert_eq!(config.noise.variance_threshold_ratio, 0.2);
        assert_eq!(config.output.debug_report, PathBuf::from("debug_report.jpg"));
        assert!(config.processing.parallel_detectors);
        config.validate().unwrap();
    }

    #[test]
    fn weight_table_covers_every_detector() {
        let table = WeightsConfig::default().table();
        assert_eq!(table.len(), DetectorKind::ALL.len());
        assert_eq!(table[&DetectorKind::Metadata], 0.2);
        assert_eq!(table[&DetectorKind::Ela], 0.4);
        assert_eq!(table[&DetectorKind::NoiseVariance], 0.4);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[ela]
quality = 75
"#;
        let config: AnalyzerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.ela.quality, 75);
        // Defaults preserved
        assert_eq!(config.ela.brightness_threshold, 10.0);
        assert_eq!(config.noise.block_size, 50);
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml = r#"
[noise]
blocksize = 32
"#;
        assert!(toml::from_str::<AnalyzerConfig>(toml).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = AnalyzerConfig::default();
        config.ela.quality = 0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.ela.brightness_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.noise.block_size = 1;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.noise.variance_threshold_ratio = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.weights.ela = 0.9;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.weights.metadata = -0.1;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.output.debug_report = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_overrides_nested_keys_only() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("[weights]\nela = 0.3").unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.weights.ela, 0.3);
        assert_eq!(config.weights.metadata, 0.2);
        assert_eq!(config.weights.noise_variance, 0.4);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.ela.quality, 90);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[metadata]
suspicious_software = ["pixelmator"]

[output]
ela_map = "maps/ela.png"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.metadata.suspicious_software, vec!["pixelmator"]);
        assert_eq!(config.output.ela_map, Some(PathBuf::from("maps/ela.png")));
        assert_eq!(config.output.noise_map, None);
    }

    #[test]
    fn load_config_invalid_toml_errors() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[ela\nquality = ").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_file_missing_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: AnalyzerConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = AnalyzerConfig::default();
        assert_eq!(config.ela.quality, defaults.ela.quality);
        assert_eq!(config.noise.block_size, defaults.noise.block_size);
        assert_eq!(config.weights.ela, defaults.weights.ela);
        assert_eq!(config.output.debug_report, defaults.output.debug_report);
        config.validate().unwrap();
    }

    #[test]
    fn effective_threads_clamps_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            parallel_detectors: true,
            max_processes: Some(10_000),
        };
        assert_eq!(effective_threads(&config), cores);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }
}
