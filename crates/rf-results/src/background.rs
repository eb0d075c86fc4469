//! Checkpoint writes on a worker thread.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded};
use rf_sim::{Checkpoint, CheckpointError, CheckpointSink};
use tracing::warn;

use crate::checkpoint_store::CheckpointStore;

struct WorkerReport {
    written: usize,
    first_error: Option<CheckpointError>,
}

/// Hands snapshots to a writer thread so the step loop does not wait on disk.
///
/// Snapshots share their states with the run through `Arc`; the worker only
/// reads them. `save` blocks only when `capacity` snapshots are already queued.
pub struct BackgroundCheckpointer {
    tx: Option<Sender<Checkpoint>>,
    worker: Option<JoinHandle<WorkerReport>>,
}

impl BackgroundCheckpointer {
    pub fn spawn(store: CheckpointStore, capacity: usize) -> Result<Self, CheckpointError> {
        let (tx, rx) = bounded::<Checkpoint>(capacity.max(1));
        let worker = thread::Builder::new()
            .name("rf-checkpoint".to_string())
            .spawn(move || {
                let mut report = WorkerReport {
                    written: 0,
                    first_error: None,
                };
                for checkpoint in rx.iter() {
                    match store.write(&checkpoint) {
                        Ok(_) => report.written += 1,
                        Err(err) => {
                            warn!(step = checkpoint.step_index, error = %err, "background checkpoint failed");
                            report.first_error.get_or_insert(err);
                        }
                    }
                }
                report
            })?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Drain the queue, stop the worker and return how many checkpoints were written.
    ///
    /// Fails with the first write error the worker saw.
    pub fn finish(mut self) -> Result<usize, CheckpointError> {
        self.tx = None;
        let handle = self.worker.take().ok_or_else(|| CheckpointError::WriterStopped {
            message: "worker already joined".to_string(),
        })?;
        let report = handle.join().map_err(|_| CheckpointError::WriterStopped {
            message: "checkpoint worker panicked".to_string(),
        })?;
        match report.first_error {
            Some(err) => Err(err),
            None => Ok(report.written),
        }
    }
}

impl CheckpointSink for BackgroundCheckpointer {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let tx = self.tx.as_ref().ok_or_else(|| CheckpointError::WriterStopped {
            message: "checkpointer finished".to_string(),
        })?;
        tx.send(checkpoint.clone())
            .map_err(|_| CheckpointError::WriterStopped {
                message: "checkpoint worker exited".to_string(),
            })
    }
}

impl Drop for BackgroundCheckpointer {
    fn drop(&mut self) {
        self.tx = None;
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
