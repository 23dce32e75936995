use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::compare::CompareError;

pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;

pub const MISMATCH_THRESHOLD: f64 = 0.1;
pub const ASYNC_CAPTURE_LIMIT: u32 = 5;
pub const ASYNC_COMPARE_LIMIT: u32 = 50;

pub const CONFIG_FILE_NAME: &str = "backstop.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Fills each dimension independently. Zero counts as absent, matching
    /// the falsy fallback of the original API.
    pub fn with_defaults(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.filter(|w| *w > 0).unwrap_or(DEFAULT_VIEWPORT_WIDTH),
            height: height.filter(|h| *h > 0).unwrap_or(DEFAULT_VIEWPORT_HEIGHT),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::with_defaults(None, None)
    }
}

/// The configuration value handed to the external diff engine. Field names
/// follow the engine's `backstop.json` schema exactly.
#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
    pub id: String,
    pub viewports: Vec<ViewportEntry>,
    pub scenarios: Vec<Scenario>,
    pub paths: OutputPaths,
    pub report: Vec<String>,
    pub engine: String,
    #[serde(rename = "engineOptions")]
    pub engine_options: Map<String, Value>,
    #[serde(rename = "asyncCaptureLimit")]
    pub async_capture_limit: u32,
    #[serde(rename = "asyncCompareLimit")]
    pub async_compare_limit: u32,
    pub debug: bool,
    #[serde(rename = "debugWindow")]
    pub debug_window: bool,
    #[serde(rename = "openReport")]
    pub open_report: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewportEntry {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub label: String,
    pub url: String,
    #[serde(rename = "referenceUrl")]
    pub reference_url: String,
    #[serde(rename = "hideSelectors")]
    pub hide_selectors: Vec<String>,
    #[serde(rename = "removeSelectors")]
    pub remove_selectors: Vec<String>,
    pub selectors: Vec<String>,
    #[serde(rename = "readyEvent")]
    pub ready_event: String,
    pub delay: u32,
    #[serde(rename = "misMatchThreshold")]
    pub mismatch_threshold: f64,
    #[serde(rename = "requireSameDimensions")]
    pub require_same_dimensions: bool,
}

/// All five output trees live under the run directory so concurrent runs
/// never share files.
#[derive(Debug, Clone, Serialize)]
pub struct OutputPaths {
    pub bitmaps_reference: PathBuf,
    pub bitmaps_test: PathBuf,
    pub engine_scripts: PathBuf,
    pub html_report: PathBuf,
    pub ci_report: PathBuf,
}

/// Pure translation from one comparison request to the engine's config shape:
/// exactly one viewport and one scenario per run.
pub fn build_engine_config(
    ref_url: &str,
    test_url: &str,
    viewport: Viewport,
    run_dir: &Path,
) -> EngineConfig {
    let now = Utc::now();
    EngineConfig {
        id: format!("backstop_{}", now.timestamp_millis()),
        viewports: vec![ViewportEntry {
            label: String::from("custom"),
            width: viewport.width,
            height: viewport.height,
        }],
        scenarios: vec![Scenario {
            // Timestamped for human readability only.
            label: format!("Visual Regression Test - {}", now.to_rfc3339()),
            url: test_url.to_string(),
            reference_url: ref_url.to_string(),
            hide_selectors: Vec::new(),
            remove_selectors: Vec::new(),
            selectors: vec![String::from("document")],
            ready_event: String::new(),
            delay: 0,
            mismatch_threshold: MISMATCH_THRESHOLD,
            require_same_dimensions: true,
        }],
        paths: OutputPaths {
            bitmaps_reference: run_dir.join("bitmaps_reference"),
            bitmaps_test: run_dir.join("bitmaps_test"),
            engine_scripts: run_dir.join("engine_scripts"),
            html_report: run_dir.join("html_report"),
            ci_report: run_dir.join("ci_report"),
        },
        report: vec![String::from("browser")],
        engine: String::from("puppeteer"),
        engine_options: Map::new(),
        async_capture_limit: ASYNC_CAPTURE_LIMIT,
        async_compare_limit: ASYNC_COMPARE_LIMIT,
        debug: false,
        debug_window: false,
        open_report: false,
    }
}

pub fn write_engine_config(config: &EngineConfig, run_dir: &Path) -> Result<PathBuf, CompareError> {
    let config_path = run_dir.join(CONFIG_FILE_NAME);
    let body = serde_json::to_vec_pretty(config)
        .map_err(|err| CompareError::Io(std::io::Error::other(err)))?;
    fs::write(config_path.as_path(), body)?;
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn viewport_defaults_each_dimension_independently() {
        assert_eq!(
            Viewport::with_defaults(Some(500), None),
            Viewport {
                width: 500,
                height: 800
            }
        );
        assert_eq!(
            Viewport::with_defaults(None, Some(600)),
            Viewport {
                width: 1280,
                height: 600
            }
        );
        assert_eq!(
            Viewport::with_defaults(None, None),
            Viewport {
                width: 1280,
                height: 800
            }
        );
    }

    #[test]
    fn viewport_treats_zero_as_absent() {
        assert_eq!(
            Viewport::with_defaults(Some(0), Some(0)),
            Viewport {
                width: 1280,
                height: 800
            }
        );
    }

    #[test]
    fn config_has_one_viewport_and_one_scenario() {
        let config = build_engine_config(
            "https://ref.example",
            "https://test.example",
            Viewport::default(),
            Path::new("/tmp/run"),
        );

        assert_eq!(config.viewports.len(), 1);
        assert_eq!(config.scenarios.len(), 1);
        let scenario = &config.scenarios[0];
        assert_eq!(scenario.url, "https://test.example");
        assert_eq!(scenario.reference_url, "https://ref.example");
        assert_eq!(scenario.mismatch_threshold, MISMATCH_THRESHOLD);
        assert!(scenario.require_same_dimensions);
        assert!(scenario.label.starts_with("Visual Regression Test - "));
    }

    #[test]
    fn all_output_paths_are_under_the_run_directory() {
        let run_dir = Path::new("/data/runs/abc");
        let config = build_engine_config("https://r", "https://t", Viewport::default(), run_dir);

        for path in [
            &config.paths.bitmaps_reference,
            &config.paths.bitmaps_test,
            &config.paths.engine_scripts,
            &config.paths.html_report,
            &config.paths.ci_report,
        ] {
            assert!(path.starts_with(run_dir), "{} escapes run dir", path.display());
        }
    }

    #[test]
    fn serialized_config_matches_engine_schema_names() {
        let config = build_engine_config(
            "https://r",
            "https://t",
            Viewport::with_defaults(Some(320), Some(480)),
            Path::new("/data/runs/abc"),
        );
        let value = serde_json::to_value(&config).expect("config should serialize");

        assert!(value["id"].as_str().expect("id").starts_with("backstop_"));
        assert_eq!(value["viewports"][0]["label"], "custom");
        assert_eq!(value["viewports"][0]["width"], 320);
        assert_eq!(value["viewports"][0]["height"], 480);
        assert_eq!(value["scenarios"][0]["misMatchThreshold"], 0.1);
        assert_eq!(value["scenarios"][0]["requireSameDimensions"], true);
        assert_eq!(value["scenarios"][0]["selectors"][0], "document");
        assert_eq!(value["scenarios"][0]["readyEvent"], "");
        assert_eq!(value["scenarios"][0]["delay"], 0);
        assert_eq!(value["engine"], "puppeteer");
        assert_eq!(value["engineOptions"], serde_json::json!({}));
        assert_eq!(value["asyncCaptureLimit"], 5);
        assert_eq!(value["asyncCompareLimit"], 50);
        assert_eq!(value["report"][0], "browser");
        assert_eq!(value["debug"], false);
        assert_eq!(value["debugWindow"], false);
        assert_eq!(value["openReport"], false);
        assert!(value["paths"]["bitmaps_reference"]
            .as_str()
            .expect("path")
            .ends_with("bitmaps_reference"));
    }

    #[test]
    fn write_engine_config_lands_next_to_the_run_data() {
        let run_dir = std::env::temp_dir().join(format!("visreg_config_{}", Uuid::new_v4()));
        std::fs::create_dir_all(run_dir.as_path()).expect("run dir");
        let config =
            build_engine_config("https://r", "https://t", Viewport::default(), run_dir.as_path());

        let config_path =
            write_engine_config(&config, run_dir.as_path()).expect("config should be written");

        assert_eq!(config_path, run_dir.join(CONFIG_FILE_NAME));
        let raw = std::fs::read(config_path).expect("config file should exist");
        let value: serde_json::Value = serde_json::from_slice(&raw).expect("valid JSON");
        assert_eq!(value["scenarios"][0]["url"], "https://t");
    }
}
