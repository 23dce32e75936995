use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::timeout;
use tracing::{info, warn};

use crate::compare::config::{build_engine_config, write_engine_config, Viewport};
use crate::compare::engine::{run_comparison, SharedDiffEngine};
use crate::compare::report::{parse_run_report, ComparisonResult};
use crate::compare::run_dir::create_run_dir;
use crate::compare::CompareError;

/// Wall-clock budget for one engine run before the request gives up on it.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// The listing endpoint shows at most this many runs, newest first.
pub const RECENT_RUNS_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRequest {
    pub ref_url: String,
    pub test_url: String,
    pub viewport: Viewport,
}

/// A failed comparison attempt. The run directory is carried along when one
/// was created so the HTTP layer can salvage a partial report.
#[derive(Debug)]
pub struct CompareFailure {
    pub run_dir: Option<PathBuf>,
    pub error: CompareError,
}

impl CompareFailure {
    fn before_run_dir(error: CompareError) -> Self {
        Self {
            run_dir: None,
            error,
        }
    }

    fn in_run_dir(run_dir: PathBuf, error: CompareError) -> Self {
        Self {
            run_dir: Some(run_dir),
            error,
        }
    }
}

/// Orchestrates one comparison end to end: run directory, engine config,
/// two-phase invocation raced against the timeout, report parsing.
#[derive(Clone)]
pub struct CompareService {
    engine: SharedDiffEngine,
    data_root: PathBuf,
    run_timeout: Duration,
}

impl CompareService {
    pub fn new(engine: SharedDiffEngine, data_root: PathBuf) -> Self {
        Self {
            engine,
            data_root,
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn data_root(&self) -> &Path {
        self.data_root.as_path()
    }

    pub async fn run_compare(
        &self,
        request: CompareRequest,
    ) -> Result<ComparisonResult, CompareFailure> {
        let run = create_run_dir(self.data_root.as_path()).map_err(CompareFailure::before_run_dir)?;
        info!(run_id = %run.run_id, "created run directory");

        let config = build_engine_config(
            request.ref_url.as_str(),
            request.test_url.as_str(),
            request.viewport,
            run.path.as_path(),
        );
        let config_path = write_engine_config(&config, run.path.as_path())
            .map_err(|error| CompareFailure::in_run_dir(run.path.clone(), error))?;

        let engine = self.engine.clone();
        let invocation = tokio::task::spawn_blocking(move || {
            run_comparison(engine.as_ref(), config_path.as_path())
        });
        match timeout(self.run_timeout, invocation).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(engine_error))) => {
                return Err(CompareFailure::in_run_dir(
                    run.path.clone(),
                    CompareError::Engine(engine_error),
                ));
            }
            Ok(Err(join_error)) => {
                return Err(CompareFailure::in_run_dir(
                    run.path.clone(),
                    CompareError::Io(std::io::Error::other(join_error)),
                ));
            }
            Err(_elapsed) => {
                // First settled wins, loser detached: the blocking task and
                // any engine subprocess keep running and may still write a
                // report that the listing endpoint picks up later.
                warn!(run_id = %run.run_id, "engine run timed out; abandoning in-flight invocation");
                return Err(CompareFailure::in_run_dir(
                    run.path.clone(),
                    CompareError::Timeout,
                ));
            }
        }

        parse_run_report(run.path.as_path())
            .map_err(|error| CompareFailure::in_run_dir(run.path, error))
    }

    /// Newest-first results for the most recent runs. Runs whose report does
    /// not parse are dropped silently; a data root that does not exist yet is
    /// an empty listing, not an error.
    pub fn list_recent_results(&self) -> Result<Vec<ComparisonResult>, CompareError> {
        let entries = match fs::read_dir(self.data_root.as_path()) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(CompareError::Io(err)),
        };

        let mut runs: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in entries.filter_map(|entry| entry.ok()) {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }
            // Creation time is not available on every filesystem.
            let Ok(stamp) = metadata.created().or_else(|_| metadata.modified()) else {
                continue;
            };
            runs.push((stamp, entry.path()));
        }
        runs.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(runs
            .into_iter()
            .take(RECENT_RUNS_LIMIT)
            .filter_map(|(_, run_dir)| parse_run_report(run_dir.as_path()).ok())
            .collect())
    }
}
