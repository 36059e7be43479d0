//! The analysis pipeline: load once, run every detector, score, compose.
//!
//! ```text
//! path ──load──► RasterImage ──┬──► MetadataDetector      ──► report
//!                              ├──► ErrorLevelDetector    ──► report + ELA map
//!                              └──► NoiseVarianceDetector ──► report + noise map
//!                                                  │
//!                   weighted score ◄── reports ────┤
//!                   debug_report.jpg ◄── ELA map | noise map
//! ```
//!
//! ## Concurrency
//!
//! The detectors only ever see `&RasterImage`, so they run under
//! [`rayon::join`] with no locking. Results are joined before scoring;
//! sequential mode (`processing.parallel_detectors = false`) gives identical
//! output. Batch mode fans out across images with `par_iter`, one independent
//! run per file.
//!
//! ## Failure model
//!
//! Detectors turn their own faults into `Warning` reports. Two things are
//! fatal for a run and surface as [`AnalysisError`]:
//!
//! - the initial image load fails ([`AnalysisError::Load`])
//! - a detector panics past its own boundary ([`AnalysisError::DetectorFault`])
//!
//! Failing to write the debug image is neither: it is logged and the outcome
//! simply carries no `debug_report` path.

use crate::config::{AnalyzerConfig, OutputConfig};
use crate::imaging::{BackendError, ImageBackend, RustBackend, compose_side_by_side};
use crate::report::{AggregateScore, AnalysisOutcome, DetectorKind, DetectorReport};
use crate::types::RasterImage;
use image::{DynamicImage, GrayImage, RgbImage};
use rayon::prelude::*;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to load image {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("{detector} detector faulted: {message}")]
    DetectorFault {
        detector: DetectorKind,
        message: String,
    },
}

/// Reports, score, and visual maps for one in-memory image.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    /// Metadata, ELA, Noise Variance, in that order.
    pub reports: Vec<DetectorReport>,
    pub score: AggregateScore,
    pub ela_map: Option<RgbImage>,
    pub noise_map: Option<GrayImage>,
}

/// Where a run writes its images.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub debug_report: PathBuf,
    pub ela_map: Option<PathBuf>,
    pub noise_map: Option<PathBuf>,
}

impl ArtifactPaths {
    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            debug_report: output.debug_report.clone(),
            ela_map: output.ela_map.clone(),
            noise_map: output.noise_map.clone(),
        }
    }

    /// Per-source variants used in batch mode so runs do not overwrite each other.
    ///
    /// `out/debug_report.jpg` for `scans/invoice.png` becomes
    /// `out/invoice-debug_report.jpg`. Sources whose stems collide (`a/scan.jpg`
    /// and `b/scan.jpg`, or one path given twice) also get their 1-based input
    /// position: `scan-1-debug_report.jpg`, `scan-2-debug_report.jpg`.
    pub fn for_batch(&self, sources: &[PathBuf]) -> Vec<Self> {
        let stems: Vec<String> = sources.iter().map(|s| source_stem(s)).collect();
        let mut stem_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for stem in &stems {
            *stem_counts.entry(stem.as_str()).or_default() += 1;
        }

        let mut used = BTreeSet::new();
        stems
            .iter()
            .enumerate()
            .map(|(i, stem)| {
                let mut prefix = if stem_counts[stem.as_str()] > 1 {
                    format!("{stem}-{}", i + 1)
                } else {
                    stem.clone()
                };
                // A literal stem such as `scan-1` can still clash with a numbered one.
                while !used.insert(prefix.clone()) {
                    prefix = format!("{prefix}-{}", i + 1);
                }
                self.with_prefix(&prefix)
            })
            .collect()
    }

    fn with_prefix(&self, prefix: &str) -> Self {
        Self {
            debug_report: prefixed(&self.debug_report, prefix),
            ela_map: self.ela_map.as_deref().map(|p| prefixed(p, prefix)),
            noise_map: self.noise_map.as_deref().map(|p| prefixed(p, prefix)),
        }
    }
}

fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn prefixed(configured: &Path, prefix: &str) -> PathBuf {
    let name = configured
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    configured.with_file_name(format!("{prefix}-{name}"))
}

/// Runs the detector pipeline against images loaded through `B`.
pub struct DocumentAnalyzer<'a, B: ImageBackend> {
    backend: &'a B,
    config: &'a AnalyzerConfig,
    weights: BTreeMap<DetectorKind, f64>,
}

impl<'a, B: ImageBackend> DocumentAnalyzer<'a, B> {
    pub fn new(backend: &'a B, config: &'a AnalyzerConfig) -> Self {
        Self {
            backend,
            config,
            weights: config.weights.table(),
        }
    }

    /// Analyze one file, writing artifacts where the config says.
    pub fn analyze(&self, path: &Path) -> Result<AnalysisOutcome, AnalysisError> {
        self.analyze_with_artifacts(path, &ArtifactPaths::from_config(&self.config.output))
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn analyze_with_artifacts(
        &self,
        path: &Path,
        artifacts: &ArtifactPaths,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let image = self.backend.load(path).map_err(|source| AnalysisError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            "image loaded"
        );

        let analysis = self.analyze_image(&image)?;
        let debug_report = self.write_artifacts(&analysis, artifacts);

        info!(score = analysis.score.value(), "analysis complete");
        Ok(AnalysisOutcome {
            source: path.to_path_buf(),
            risk: analysis.score.risk_level(),
            score: analysis.score,
            reports: analysis.reports,
            debug_report,
        })
    }

    /// Analyze many files in parallel. Results keep the input order.
    ///
    /// With more than one input, every run gets its own artifact names
    /// (see [`ArtifactPaths::for_batch`]).
    pub fn analyze_batch(&self, paths: &[PathBuf]) -> Vec<Result<AnalysisOutcome, AnalysisError>> {
        let base = ArtifactPaths::from_config(&self.config.output);
        if let [single] = paths {
            return vec![self.analyze_with_artifacts(single, &base)];
        }
        let artifacts = base.for_batch(paths);
        paths
            .par_iter()
            .zip(artifacts.par_iter())
            .map(|(path, artifacts)| self.analyze_with_artifacts(path, artifacts))
            .collect()
    }

    /// Run all three detectors over an already-loaded image and score them.
    pub fn analyze_image(&self, image: &RasterImage) -> Result<ImageAnalysis, AnalysisError> {
        let metadata = self.config.metadata_detector();
        let ela = self.config.ela_detector(self.backend);
        let noise = self.config.noise_detector();

        let run_metadata = || guarded(DetectorKind::Metadata, || metadata.analyze(image));
        let run_ela = || guarded(DetectorKind::Ela, || ela.analyze(image));
        let run_noise = || guarded(DetectorKind::NoiseVariance, || noise.analyze(image));

        let (metadata, (ela, noise)) = if self.config.processing.parallel_detectors {
            rayon::join(run_metadata, || rayon::join(run_ela, run_noise))
        } else {
            (run_metadata(), (run_ela(), run_noise()))
        };
        let (metadata, ela, noise) = (metadata?, ela?, noise?);

        let reports = vec![metadata, ela.report, noise.report];
        for report in &reports {
            debug!(
                detector = %report.detector,
                verdict = %report.verdict,
                score = report.score(),
                "detector finished"
            );
        }
        let score = weighted_score(&reports, &self.weights);

        Ok(ImageAnalysis {
            reports,
            score,
            ela_map: ela.artifact,
            noise_map: noise.artifact,
        })
    }

    /// Write the composite and any requested raw maps. Returns the composite's
    /// path when it was written.
    fn write_artifacts(&self, analysis: &ImageAnalysis, paths: &ArtifactPaths) -> Option<PathBuf> {
        if let (Some(ela), Some(target)) = (&analysis.ela_map, &paths.ela_map) {
            self.save_artifact(DynamicImage::ImageRgb8(ela.clone()), target);
        }
        if let (Some(noise), Some(target)) = (&analysis.noise_map, &paths.noise_map) {
            self.save_artifact(DynamicImage::ImageLuma8(noise.clone()), target);
        }

        let (Some(ela), Some(noise)) = (&analysis.ela_map, &analysis.noise_map) else {
            debug!("a visual map is missing, skipping debug report");
            return None;
        };
        let composite = DynamicImage::ImageRgb8(compose_side_by_side(ela, noise));
        self.save_artifact(composite, &paths.debug_report)
            .then(|| paths.debug_report.clone())
    }

    fn save_artifact(&self, image: DynamicImage, path: &Path) -> bool {
        match self.backend.save(&image, path) {
            Ok(()) => {
                debug!(path = %path.display(), "artifact written");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not write artifact");
                false
            }
        }
    }
}

/// Analyze a file with the production backend.
pub fn analyze_path(path: &Path, config: &AnalyzerConfig) -> Result<AnalysisOutcome, AnalysisError> {
    let backend = RustBackend::new();
    DocumentAnalyzer::new(&backend, config).analyze(path)
}

/// `Σ score × weight` over the reports whose detector has a weight.
pub fn weighted_score(
    reports: &[DetectorReport],
    weights: &BTreeMap<DetectorKind, f64>,
) -> AggregateScore {
    let total = reports
        .iter()
        .filter_map(|r| weights.get(&r.detector).map(|w| r.score() * w))
        .sum();
    AggregateScore::new(total)
}

/// Run a detector, converting a panic into a fatal [`AnalysisError`].
fn guarded<T>(detector: DetectorKind, run: impl FnOnce() -> T) -> Result<T, AnalysisError> {
    panic::catch_unwind(AssertUnwindSafe(run)).map_err(|payload| AnalysisError::DetectorFault {
        detector,
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
