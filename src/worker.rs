use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, trace};

use crate::candidate::Candidate;
use crate::channel::{Outcome, OutcomeStatus, Task};
use crate::error::WorkerError;
use crate::verifier::{Verification, Verifier};

/// Settings shared by every worker in a pool
#[derive(Clone)]
pub struct WorkerContext {
    pub verifier: Arc<dyn Verifier>,
    pub archive: PathBuf,
    pub timeout: Duration,
}

/// Turn a verifier report into an outcome.
///
/// The success marker wins over the exit status: some tools exit nonzero
/// even when the password is right.
pub fn classify(candidate: Candidate, verification: Verification, marker: &str) -> Outcome {
    let matched = verification.matched(marker);
    let (status, detail) = match verification {
        Verification::Completed { .. } if matched => (OutcomeStatus::Success, String::new()),
        Verification::Completed { exit_code, .. } => {
            let detail = match exit_code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            (OutcomeStatus::Failure, detail)
        }
        Verification::TimedOut => (OutcomeStatus::TimedOut, "verification timed out".to_string()),
        Verification::Failed(reason) => (OutcomeStatus::Error, reason),
    };

    Outcome {
        index: candidate.index,
        password: candidate.password,
        status,
        detail,
    }
}

fn worker_loop(id: usize, ctx: WorkerContext, tasks: Receiver<Task>, results: Sender<Outcome>) -> u64 {
    let mut checked = 0u64;

    // A disconnected task channel is treated like a stop sentinel
    while let Ok(Task::Check(candidate)) = tasks.recv() {
        trace!(worker = id, index = candidate.index, "Verifying candidate");
        let verification = ctx.verifier.test(&candidate.password, &ctx.archive, ctx.timeout);
        let outcome = classify(candidate, verification, ctx.verifier.success_marker());
        checked += 1;

        if results.send(outcome).is_err() {
            break;
        }
    }

    debug!(worker = id, checked, "Worker exiting");
    checked
}

/// Fixed set of OS threads verifying candidates
pub struct WorkerPool {
    handles: Vec<(usize, JoinHandle<u64>)>,
}

impl WorkerPool {
    pub fn spawn(
        count: usize,
        ctx: WorkerContext,
        tasks: &Receiver<Task>,
        results: &Sender<Outcome>,
    ) -> Result<Self, WorkerError> {
        let mut handles = Vec::with_capacity(count);

        for id in 0..count {
            let ctx = ctx.clone();
            let tasks = tasks.clone();
            let results = results.clone();

            let handle = thread::Builder::new()
                .name(format!("cracker-{}", id))
                .spawn(move || worker_loop(id, ctx, tasks, results))
                .map_err(|e| WorkerError::SpawnFailed {
                    id,
                    reason: e.to_string(),
                })?;
            handles.push((id, handle));
        }

        Ok(WorkerPool { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// True while at least one worker thread is still running
    pub fn is_alive(&self) -> bool {
        self.handles.iter().any(|(_, handle)| !handle.is_finished())
    }

    /// Wait for every worker to exit. Returns the total number of candidates
    /// checked, plus one error per worker that panicked.
    pub fn join(self) -> (u64, Vec<WorkerError>) {
        let mut checked = 0;
        let mut errors = Vec::new();

        for (id, handle) in self.handles {
            match handle.join() {
                Ok(count) => checked += count,
                Err(payload) => {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "Worker thread panicked".to_string());
                    errors.push(WorkerError::Panicked { id, message });
                }
            }
        }

        (checked, errors)
    }
}
