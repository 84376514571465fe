//! Channels between the coordinator and the worker pool
//!
//! Tasks flow through a bounded channel so the candidate source can never
//! run ahead of verification by more than the channel capacity. Outcomes
//! flow back through an unbounded channel that the coordinator polls
//! without blocking.

use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender};

use crate::candidate::Candidate;

const LIVENESS_POLL: Duration = Duration::from_millis(50);

/// Work item handed to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Check(Candidate),
    /// Sentinel: the worker exits when it pulls this
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failure,
    TimedOut,
    Error,
}

/// Result of verifying one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub index: u64,
    pub password: String,
    pub status: OutcomeStatus,
    pub detail: String,
}

/// Bounded coordinator-to-worker channel
pub struct TaskChannel {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    capacity: usize,
}

impl TaskChannel {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        TaskChannel {
            sender,
            receiver,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receiver handle for a worker
    pub fn receiver(&self) -> Receiver<Task> {
        self.receiver.clone()
    }

    /// Enqueue a task, blocking while the channel is full.
    ///
    /// The coordinator holds a receiver of its own, so a full channel stays
    /// full if every consumer has died. While blocked, `consumers_alive` is
    /// polled; once it reports false the task is handed back as `Err`.
    pub fn send_while<F>(&self, task: Task, mut consumers_alive: F) -> Result<(), Task>
    where
        F: FnMut() -> bool,
    {
        let mut task = task;
        loop {
            match self.sender.send_timeout(task, LIVENESS_POLL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => {
                    if !consumers_alive() {
                        return Err(returned);
                    }
                    task = returned;
                }
                Err(SendTimeoutError::Disconnected(returned)) => return Err(returned),
            }
        }
    }

    /// Drop every queued task no worker has picked up yet, returning how many
    pub fn discard_pending(&self) -> usize {
        self.receiver
            .try_iter()
            .filter(|task| matches!(task, Task::Check(_)))
            .count()
    }

    /// Tasks queued but not yet picked up by a worker
    pub fn len(&self) -> usize {
        self.sender.len()
    }
}

/// Unbounded worker-to-coordinator channel
pub struct ResultChannel {
    sender: Sender<Outcome>,
    receiver: Receiver<Outcome>,
}

impl Default for ResultChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultChannel {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        ResultChannel { sender, receiver }
    }

    /// Sender handle for a worker
    pub fn sender(&self) -> Sender<Outcome> {
        self.sender.clone()
    }

    /// Take every outcome available right now without waiting for more
    pub fn drain(&self) -> Vec<Outcome> {
        self.receiver.try_iter().collect()
    }
}
