//! Content-based hashing for run IDs.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ResultsResult;

/// SHA-256 over the case definition's JSON and the engine version.
pub fn compute_run_id<T: Serialize>(case: &T, engine_version: &str) -> ResultsResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(case)?);
    hasher.update(b"\n");
    hasher.update(engine_version.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
