#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rf_app::{CheckpointMode, RunOptions};

/// Copy of the demo project in a fresh directory, so run caches stay out of the repo.
pub fn demo_project() -> (tempfile::TempDir, PathBuf) {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/waterflood.yaml");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waterflood.yaml");
    std::fs::copy(&source, &path).unwrap();
    (dir, path)
}

pub fn fresh(checkpoints: CheckpointMode) -> RunOptions {
    RunOptions {
        use_cache: false,
        checkpoints,
        ..RunOptions::default()
    }
}
