//! Versioned, checksummed checkpoint files.

use std::fs;
use std::path::{Path, PathBuf};

use rf_sim::{Checkpoint, CheckpointError, CheckpointSink};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::atomic::write_atomic;

/// Current on-disk checkpoint format.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

const PREFIX: &str = "checkpoint_";
const SUFFIX: &str = ".json";

/// File envelope. `payload` is the checkpoint JSON; `checksum` is its SHA-256.
#[derive(Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    checksum: String,
    payload: String,
}

/// A directory of `checkpoint_<step>.json` files.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    keep_last: Option<usize>,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            keep_last: None,
        })
    }

    /// Keep only the newest `keep_last` checkpoints after each write.
    pub fn with_retention(mut self, keep_last: usize) -> Self {
        self.keep_last = Some(keep_last.max(1));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, step_index: usize) -> PathBuf {
        self.dir.join(format!("{PREFIX}{step_index:06}{SUFFIX}"))
    }

    /// Persist `checkpoint` atomically and return its path.
    pub fn write(&self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        let payload = serde_json::to_string(checkpoint).map_err(encoding)?;
        let envelope = Envelope {
            format_version: CHECKPOINT_FORMAT_VERSION,
            checksum: checksum(&payload),
            payload,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(encoding)?;

        let path = self.path_for(checkpoint.step_index);
        write_atomic(&path, &bytes)?;
        debug!(
            step = checkpoint.step_index,
            bytes = bytes.len(),
            path = %path.display(),
            "checkpoint written"
        );

        if let Some(keep) = self.keep_last {
            self.prune(keep)?;
        }
        Ok(path)
    }

    /// Load and verify the checkpoint taken after `step_index`.
    pub fn load(&self, step_index: usize) -> Result<Checkpoint, CheckpointError> {
        let path = self.path_for(step_index);
        if !path.exists() {
            return Err(CheckpointError::NotFound { step_index });
        }
        let corrupt = |what: String| CheckpointError::Corrupt {
            path: path.display().to_string(),
            what,
        };

        let bytes = fs::read(&path)?;
        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if envelope.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: envelope.format_version,
                expected: CHECKPOINT_FORMAT_VERSION,
            });
        }
        if checksum(&envelope.payload) != envelope.checksum {
            return Err(corrupt("checksum mismatch".to_string()));
        }

        let checkpoint: Checkpoint =
            serde_json::from_str(&envelope.payload).map_err(|e| corrupt(e.to_string()))?;
        if checkpoint.step_index != step_index {
            return Err(corrupt(format!(
                "file holds step {}",
                checkpoint.step_index
            )));
        }
        checkpoint.check_consistency().map_err(corrupt)?;
        Ok(checkpoint)
    }

    /// Steps with a checkpoint file, ascending.
    pub fn list_steps(&self) -> Result<Vec<usize>, CheckpointError> {
        let mut steps = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(step) = name
                .strip_prefix(PREFIX)
                .and_then(|rest| rest.strip_suffix(SUFFIX))
                .and_then(|digits| digits.parse::<usize>().ok())
            {
                steps.push(step);
            }
        }
        steps.sort_unstable();
        Ok(steps)
    }

    /// Newest checkpoint that passes verification; unreadable files are skipped.
    pub fn latest(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        for step in self.list_steps()?.into_iter().rev() {
            match self.load(step) {
                Ok(checkpoint) => return Ok(Some(checkpoint)),
                Err(err) => warn!(step, error = %err, "skipping unusable checkpoint"),
            }
        }
        Ok(None)
    }

    /// Delete all but the newest `keep_last` checkpoints. Returns how many were removed.
    pub fn prune(&self, keep_last: usize) -> Result<usize, CheckpointError> {
        let steps = self.list_steps()?;
        let excess = steps.len().saturating_sub(keep_last);
        for &step in &steps[..excess] {
            fs::remove_file(self.path_for(step))?;
        }
        Ok(excess)
    }
}

impl CheckpointSink for CheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.write(checkpoint).map(|_| ())
    }
}

fn checksum(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

fn encoding(e: serde_json::Error) -> CheckpointError {
    CheckpointError::Encoding {
        message: e.to_string(),
    }
}
