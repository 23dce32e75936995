use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Reference,
    Test,
}

impl EnginePhase {
    pub fn subcommand(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn diff engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("diff engine {phase} phase exited with status {status}: {stderr}")]
    Failed {
        phase: &'static str,
        status: i32,
        stderr: String,
    },
}

/// Seam around the external screenshot/diff engine. The engine owns browser
/// automation, pixel comparison, and report rendering; this crate only drives
/// its two phases.
pub trait DiffEngine: Send + Sync + 'static {
    fn run_phase(&self, phase: EnginePhase, config_path: &Path) -> Result<(), EngineError>;
}

pub type SharedDiffEngine = Arc<dyn DiffEngine>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub program: String,
    /// When set the engine is told not to open its HTML report in a browser.
    /// Decided once at construction instead of mutating process-global env.
    pub suppress_report_open: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            program: String::from("backstop"),
            suppress_report_open: true,
        }
    }
}

/// Invokes the BackstopJS-compatible CLI: `<program> <phase> --config=<path>`.
pub struct BackstopCliEngine {
    options: EngineOptions,
}

impl BackstopCliEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }
}

impl DiffEngine for BackstopCliEngine {
    fn run_phase(&self, phase: EnginePhase, config_path: &Path) -> Result<(), EngineError> {
        let mut command = Command::new(self.options.program.as_str());
        command
            .arg(phase.subcommand())
            .arg(format!("--config={}", config_path.display()));
        if self.options.suppress_report_open {
            command.env("BACKSTOPJS_NO_OPEN", "true");
        }

        let output = command.output().map_err(|source| EngineError::Spawn {
            program: self.options.program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(EngineError::Failed {
                phase: phase.subcommand(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Runs both engine phases against a written config.
///
/// Phase-one failure means there is no reference to compare against and is
/// fatal. The engine signals a detected mismatch through the same error
/// channel as a real phase-two crash, so phase-two failures are swallowed:
/// whatever report landed on disk is the outcome.
pub fn run_comparison(engine: &dyn DiffEngine, config_path: &Path) -> Result<(), EngineError> {
    engine.run_phase(EnginePhase::Reference, config_path)?;
    if let Err(err) = engine.run_phase(EnginePhase::Test, config_path) {
        warn!(error = %err, "test/compare phase failed; treating as a reportable outcome");
    }
    Ok(())
}
