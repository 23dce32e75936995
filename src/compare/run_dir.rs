use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::compare::CompareError;

/// One comparison attempt's isolated working directory under the data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDir {
    pub run_id: String,
    pub path: PathBuf,
}

/// Allocates a fresh run directory. The uuid makes concurrent requests
/// collision-free without any coordination; creation failure is fatal for
/// the request.
pub fn create_run_dir(data_root: &Path) -> Result<RunDir, CompareError> {
    let run_id = Uuid::new_v4().to_string();
    let path = data_root.join(run_id.as_str());
    fs::create_dir_all(path.as_path())?;
    Ok(RunDir { run_id, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("visreg_run_dir_{tag}_{}", Uuid::new_v4()))
    }

    #[test]
    fn creates_directory_named_after_run_id() {
        let root = temp_root("create");
        let run = create_run_dir(root.as_path()).expect("run dir should be created");

        assert!(run.path.is_dir());
        assert_eq!(run.path, root.join(run.run_id.as_str()));
        Uuid::parse_str(run.run_id.as_str()).expect("run id should be a uuid");
    }

    #[test]
    fn consecutive_runs_get_distinct_directories() {
        let root = temp_root("distinct");
        let first = create_run_dir(root.as_path()).expect("first run dir");
        let second = create_run_dir(root.as_path()).expect("second run dir");

        assert_ne!(first.run_id, second.run_id);
        assert_ne!(first.path, second.path);
    }

    #[test]
    fn creates_missing_data_root_on_the_way() {
        let root = temp_root("nested").join("deeper");
        let run = create_run_dir(root.as_path()).expect("nested creation should succeed");
        assert!(run.path.is_dir());
    }
}
