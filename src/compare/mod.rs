pub mod config;
pub mod engine;
pub mod report;
pub mod run_dir;
pub mod service;

use thiserror::Error;

use crate::compare::engine::EngineError;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("visual diff engine run timed out")]
    Timeout,
    #[error("engine report not found")]
    ReportNotFound,
    #[error("engine report unreadable: {0}")]
    ReportUnreadable(serde_json::Error),
}
