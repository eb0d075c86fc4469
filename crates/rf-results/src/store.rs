//! Run storage API.

use std::fs;
use std::path::{Path, PathBuf};

use rf_sim::CheckpointError;

use crate::aggregate::StepRates;
use crate::atomic::write_atomic;
use crate::checkpoint_store::CheckpointStore;
use crate::types::{RunManifest, RunSummary};
use crate::{ResultsError, ResultsResult};

const MANIFEST: &str = "manifest.json";
const TIMESERIES: &str = "timeseries.jsonl";
const SUMMARY: &str = "summary.json";

/// Directory of cached runs, one subdirectory per run id.
#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Store under `.resflow/runs` next to the project file.
    pub fn for_project(project_path: &Path) -> ResultsResult<Self> {
        let project_dir = project_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "project path has no parent directory".to_string(),
            })?;
        Self::new(project_dir.join(".resflow").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST).exists()
    }

    /// Checkpoints for `run_id`, in `<run>/checkpoints`.
    pub fn checkpoint_store(&self, run_id: &str) -> Result<CheckpointStore, CheckpointError> {
        CheckpointStore::new(self.run_dir(run_id).join("checkpoints"))
    }

    /// Write time series, summary and finally the manifest, each atomically.
    ///
    /// The manifest goes last so `has_run` never sees a half-written run.
    pub fn save_run(
        &self,
        manifest: &RunManifest,
        steps: &[StepRates],
        summary: &RunSummary,
    ) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let mut timeseries = String::new();
        for step in steps {
            timeseries.push_str(&serde_json::to_string(step)?);
            timeseries.push('\n');
        }
        write_atomic(&run_dir.join(TIMESERIES), timeseries.as_bytes())?;
        write_atomic(
            &run_dir.join(SUMMARY),
            serde_json::to_string_pretty(summary)?.as_bytes(),
        )?;
        write_atomic(
            &run_dir.join(MANIFEST),
            serde_json::to_string_pretty(manifest)?.as_bytes(),
        )?;

        tracing::debug!(run_id = %manifest.run_id, steps = steps.len(), "saved run");
        Ok(())
    }

    fn existing_file(&self, run_id: &str, name: &str) -> ResultsResult<PathBuf> {
        let path = self.run_dir(run_id).join(name);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(path)
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let content = fs::read_to_string(self.existing_file(run_id, MANIFEST)?)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_summary(&self, run_id: &str) -> ResultsResult<RunSummary> {
        let content = fs::read_to_string(self.existing_file(run_id, SUMMARY)?)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_timeseries(&self, run_id: &str) -> ResultsResult<Vec<StepRates>> {
        let content = fs::read_to_string(self.existing_file(run_id, TIMESERIES)?)?;
        let mut steps = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                steps.push(serde_json::from_str(line)?);
            }
        }
        Ok(steps)
    }

    /// Saved runs of `case_id`, newest first.
    pub fn list_runs(&self, case_id: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.case_id == case_id
                {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
