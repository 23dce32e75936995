use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::compare::CompareError;

/// URL prefix under which run directories are served to browsers.
pub const PUBLIC_MOUNT: &str = "/backstop_data";

const CI_REPORT_RELATIVE: &str = "ci_report/backstop_test_results.json";
const HTML_INDEX_RELATIVE: &str = "html_report/index.html";

/// The stable shape every comparison reduces to, recomputed from the run's
/// report file on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub passed: bool,
    pub mismatch_percentage: Option<f64>,
    pub report_url: String,
}

/// Known on-disk report layouts across engine versions. Adding a layout is a
/// new variant plus one arm in `classify_report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportLayout<'a> {
    /// CI summary object carrying a `tests` array.
    CiSummary(&'a [Value]),
    /// Bare array of test entries, as newer engines write next to the
    /// test bitmaps.
    EntryList(&'a [Value]),
}

fn classify_report(report: &Value) -> Option<ReportLayout<'_>> {
    if let Some(tests) = report.get("tests").and_then(Value::as_array) {
        return Some(ReportLayout::CiSummary(tests.as_slice()));
    }
    if let Some(entries) = report.as_array() {
        return Some(ReportLayout::EntryList(entries.as_slice()));
    }
    None
}

/// Tries the fixed CI-report path first, then each immediate subdirectory of
/// the test-bitmaps tree for a `report.json`.
fn locate_report(run_dir: &Path) -> Result<PathBuf, CompareError> {
    let ci_report = run_dir.join(CI_REPORT_RELATIVE);
    if ci_report.is_file() {
        return Ok(ci_report);
    }

    let bitmaps_test = run_dir.join("bitmaps_test");
    if bitmaps_test.is_dir() {
        let mut subdirs = fs::read_dir(bitmaps_test.as_path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect::<Vec<_>>();
        subdirs.sort();
        for subdir in subdirs {
            let candidate = subdir.join("report.json");
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(CompareError::ReportNotFound)
}

fn mismatch_percentage(entries: &[Value]) -> Option<f64> {
    // Tolerant on purpose: any structural deviation reads as "no value".
    let value = entries.first()?.get("pair")?.get("misMatchPercentage")?;
    match value {
        Value::Number(number) => number.as_f64(),
        // Some engine versions stringify the percentage.
        Value::String(raw) => raw.parse().ok(),
        _ => None,
    }
}

fn all_passed(entries: &[Value]) -> bool {
    // Vacuously true for an empty list; preserved from the original system.
    entries
        .iter()
        .all(|entry| entry.get("status").and_then(Value::as_str) == Some("pass"))
}

/// Reads a run directory's report down to a `ComparisonResult`. Read-only and
/// idempotent, so it is safe to call again after a timed-out run finishes in
/// the background.
pub fn parse_run_report(run_dir: &Path) -> Result<ComparisonResult, CompareError> {
    let report_path = locate_report(run_dir)?;
    let raw = fs::read(report_path.as_path())?;
    let report: Value = serde_json::from_slice(&raw).map_err(CompareError::ReportUnreadable)?;

    let (passed, mismatch) = match classify_report(&report) {
        Some(ReportLayout::CiSummary(tests)) | Some(ReportLayout::EntryList(tests)) => {
            (all_passed(tests), mismatch_percentage(tests))
        }
        None => (true, None),
    };

    let run_name = run_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ComparisonResult {
        passed,
        mismatch_percentage: mismatch,
        report_url: format!("{PUBLIC_MOUNT}/{run_name}/{HTML_INDEX_RELATIVE}"),
    })
}
