//! Report types produced by the detectors and the analyzer.
//!
//! Every detector returns exactly one [`DetectorReport`]. Its score is clamped
//! to `0..=100` at construction and cannot be changed afterwards, so any
//! report that reaches the aggregation step is already in range.
//!
//! | Verdict | Meaning |
//! |---|---|
//! | `Pass` | The heuristic ran and found nothing |
//! | `Fail` | The heuristic fired: a tamper signal |
//! | `Warning` | The heuristic could not complete: inconclusive, not evidence |

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// The closed set of detectors. Adding one means extending [`DetectorKind::ALL`]
/// and the weight table together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Metadata,
    Ela,
    NoiseVariance,
}

impl DetectorKind {
    /// Run and report order.
    pub const ALL: [DetectorKind; 3] = [Self::Metadata, Self::Ela, Self::NoiseVariance];

    pub fn label(self) -> &'static str {
        match self {
            Self::Metadata => "Metadata",
            Self::Ela => "ELA",
            Self::NoiseVariance => "Noise Variance",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Pass,
    Fail,
    Warning,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Warning => "Warning",
        };
        f.pad(s)
    }
}

/// One detector's verdict for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorReport {
    pub detector: DetectorKind,
    #[serde(rename = "result")]
    pub verdict: Verdict,
    pub details: String,
    score: f64,
}

impl DetectorReport {
    pub fn new(detector: DetectorKind, verdict: Verdict, details: impl Into<String>, score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
        Self {
            detector,
            verdict,
            details: details.into(),
            score,
        }
    }

    pub fn pass(detector: DetectorKind, details: impl Into<String>) -> Self {
        Self::new(detector, Verdict::Pass, details, 0.0)
    }

    pub fn fail(detector: DetectorKind, details: impl Into<String>, score: f64) -> Self {
        Self::new(detector, Verdict::Fail, details, score)
    }

    pub fn warning(detector: DetectorKind, details: impl Into<String>, score: f64) -> Self {
        Self::new(detector, Verdict::Warning, details, score)
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

/// A detector report together with the visual map the detector produced, if any.
///
/// The map is only present when the analysis got far enough to compute it.
#[derive(Debug, Clone)]
pub struct Analysis<A> {
    pub report: DetectorReport,
    pub artifact: Option<A>,
}

impl<A> Analysis<A> {
    pub fn with_artifact(report: DetectorReport, artifact: A) -> Self {
        Self {
            report,
            artifact: Some(artifact),
        }
    }

    pub fn without_artifact(report: DetectorReport) -> Self {
        Self {
            report,
            artifact: None,
        }
    }
}

/// Weighted combination of the detector scores, in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AggregateScore(f64);

impl AggregateScore {
    pub fn new(value: f64) -> Self {
        Self(if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) })
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn risk_level(self) -> RiskLevel {
        RiskLevel::from_score(self.0)
    }
}

/// Coarse bucket for presenting the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Self::Low
        } else if score < 70.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
        };
        f.pad(s)
    }
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub source: PathBuf,
    /// Always Metadata, ELA, Noise Variance, in that order.
    pub reports: Vec<DetectorReport>,
    pub score: AggregateScore,
    pub risk: RiskLevel,
    /// Where the side-by-side debug image was written, when both maps existed
    /// and the write succeeded.
    pub debug_report: Option<PathBuf>,
}
