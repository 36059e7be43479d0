//! CLI output formatting for analysis results.
//!
//! Every `format_*` function is pure and returns the lines to print, so the
//! layout is unit tested without capturing stdout. The `print_*` wrappers are
//! the only place that writes.
//!
//! # Output Format
//!
//! ```text
//! Analyzing: scans/invoice.jpg
//!
//! Detector        Result  Details
//! --------------  ------  ----------------------------------------------------
//! Metadata        Fail    Image was edited with suspicious software: GIMP 2.10
//!                         Original creation date is missing.
//! ELA             Pass    ELA brightness ratio: 3.12 (Threshold: 10).
//! Noise Variance  Pass    Noise variance is consistent across 48 block(s).
//!
//! Final Fake Probability Score: 16.00% (Low Risk)
//! Debug report: debug_report.jpg
//! ```
//!
//! Multi-line details continue on the next line, aligned under the
//! `Details` column.

use crate::analyzer::AnalysisError;
use crate::report::AnalysisOutcome;
use std::path::Path;

const HEADERS: [&str; 3] = ["Detector", "Result", "Details"];
const COLUMN_GAP: &str = "  ";

/// Pad `text` on the right to `width` characters.
fn cell(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

/// Format one outcome as a table followed by the score and artifact lines.
pub fn format_report(outcome: &AnalysisOutcome) -> Vec<String> {
    let rows: Vec<(String, String, Vec<&str>)> = outcome
        .reports
        .iter()
        .map(|r| {
            let details: Vec<&str> = match r.details.lines().collect::<Vec<_>>() {
                lines if lines.is_empty() => vec![""],
                lines => lines,
            };
            (r.detector.to_string(), r.verdict.to_string(), details)
        })
        .collect();

    let detector_width = rows
        .iter()
        .map(|(d, _, _)| d.len())
        .chain([HEADERS[0].len()])
        .max()
        .unwrap_or(0);
    let result_width = rows
        .iter()
        .map(|(_, v, _)| v.len())
        .chain([HEADERS[1].len()])
        .max()
        .unwrap_or(0);
    let details_width = rows
        .iter()
        .flat_map(|(_, _, lines)| lines.iter().map(|l| l.len()))
        .chain([HEADERS[2].len()])
        .max()
        .unwrap_or(0);

    let continuation = " ".repeat(detector_width + result_width + 2 * COLUMN_GAP.len());

    let mut lines = vec![
        format!("Analyzing: {}", outcome.source.display()),
        String::new(),
        format!(
            "{}{COLUMN_GAP}{}{COLUMN_GAP}{}",
            cell(HEADERS[0], detector_width),
            cell(HEADERS[1], result_width),
            HEADERS[2]
        ),
        format!(
            "{}{COLUMN_GAP}{}{COLUMN_GAP}{}",
            "-".repeat(detector_width),
            "-".repeat(result_width),
            "-".repeat(details_width)
        ),
    ];

    for (detector, verdict, details) in &rows {
        let mut details = details.iter();
        let first = details.next().copied().unwrap_or_default();
        lines.push(
            format!(
                "{}{COLUMN_GAP}{}{COLUMN_GAP}{first}",
                cell(detector, detector_width),
                cell(verdict, result_width)
            )
            .trim_end()
            .to_string(),
        );
        for more in details {
            lines.push(format!("{continuation}{more}"));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Final Fake Probability Score: {:.2}% ({})",
        outcome.score.value(),
        outcome.risk
    ));
    match &outcome.debug_report {
        Some(path) => lines.push(format!("Debug report: {}", path.display())),
        None => lines.push("Debug report: not written".to_string()),
    }
    lines
}

/// Print one outcome to stdout.
pub fn print_report(outcome: &AnalysisOutcome) {
    for line in format_report(outcome) {
        println!("{}", line);
    }
}

/// Format a fatal per-image error for batch output.
pub fn format_failure(path: &Path, error: &AnalysisError) -> Vec<String> {
    vec![
        format!("Analyzing: {}", path.display()),
        format!("    Error: {error}"),
    ]
}

/// Format the closing line of a batch run.
pub fn format_batch_summary(analyzed: usize, failed: usize) -> String {
    match failed {
        0 => format!("==> Analyzed {analyzed} image(s)"),
        n => format!("==> Analyzed {analyzed} image(s), {n} failed"),
    }
}
