//! Crack coordinator - drives candidates through the worker pool
//!
//! The coordinator is responsible for:
//! - Short-circuiting when the checkpoint already holds a password
//! - Pumping candidates into the bounded task channel
//! - Draining outcomes and tracking which indices are still in flight
//! - Persisting the checkpoint floor
//! - The stop-sentinel shutdown protocol

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::candidate::CandidateSource;
use crate::channel::{Outcome, OutcomeStatus, ResultChannel, Task, TaskChannel};
use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::config::CrackConfig;
use crate::error::{CrackError, Result};
use crate::verifier::Verifier;
use crate::worker::{WorkerContext, WorkerPool};

/// How candidates are produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// Every string over the configured alphabet up to the maximum length
    Combinatorial,
    /// One candidate per line of the given file
    Wordlist(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrackStatus {
    /// Found during this run
    Found(String),
    /// The checkpoint already held the password; nothing was verified
    AlreadyFound(String),
    /// Every candidate was tried without success
    Exhausted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub errors: u64,
}

impl OutcomeTally {
    pub fn total(&self) -> u64 {
        self.successes + self.failures + self.timeouts + self.errors
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct CrackReport {
    pub status: CrackStatus,
    pub start_index: u64,
    pub candidates_sent: u64,
    pub tally: OutcomeTally,
    pub elapsed: Duration,
}

impl CrackReport {
    pub fn password(&self) -> Option<&str> {
        match &self.status {
            CrackStatus::Found(pw) | CrackStatus::AlreadyFound(pw) => Some(pw),
            CrackStatus::Exhausted => None,
        }
    }
}

/// Indices dispatched to workers but not yet acknowledged by an outcome.
///
/// Outcomes arrive in any order, so the resumable floor is the minimum of
/// this set, never the most recent acknowledgement.
#[derive(Debug, Clone)]
pub struct OutstandingSet {
    pending: BTreeSet<u64>,
    next_unsent: u64,
}

impl OutstandingSet {
    pub fn new(start_index: u64) -> Self {
        OutstandingSet {
            pending: BTreeSet::new(),
            next_unsent: start_index,
        }
    }

    pub fn dispatch(&mut self, index: u64) {
        self.pending.insert(index);
        self.next_unsent = self.next_unsent.max(index + 1);
    }

    pub fn acknowledge(&mut self, index: u64) -> bool {
        self.pending.remove(&index)
    }

    /// Lowest index that may still be unverified
    pub fn floor(&self) -> u64 {
        self.pending.first().copied().unwrap_or(self.next_unsent)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

struct RunState {
    outstanding: OutstandingSet,
    found: Option<(u64, String)>,
    tally: OutcomeTally,
    sent: u64,
}

impl RunState {
    fn absorb(&mut self, outcomes: Vec<Outcome>) {
        for outcome in outcomes {
            if !self.outstanding.acknowledge(outcome.index) {
                debug!(index = outcome.index, "Outcome for an index that was not outstanding");
            }

            match outcome.status {
                OutcomeStatus::Success => {
                    self.tally.successes += 1;
                    if self.found.is_none() {
                        info!(index = outcome.index, password = %outcome.password, "Password found");
                        self.found = Some((outcome.index, outcome.password));
                    } else {
                        debug!(index = outcome.index, "Ignoring later success");
                    }
                }
                OutcomeStatus::Failure => self.tally.failures += 1,
                OutcomeStatus::TimedOut => {
                    self.tally.timeouts += 1;
                    debug!(index = outcome.index, "Verification timed out");
                }
                OutcomeStatus::Error => {
                    self.tally.errors += 1;
                    warn!(index = outcome.index, detail = %outcome.detail, "Verifier could not run");
                }
            }
        }
    }
}

pub struct Coordinator {
    config: CrackConfig,
    archive: PathBuf,
    verifier: Arc<dyn Verifier>,
    store: CheckpointStore,
}

impl Coordinator {
    /// Create a coordinator whose checkpoint lives next to the archive
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count, timeout, intervals and candidate settings
    /// * `archive` - Archive handed to the verifier; also names the checkpoint file
    /// * `verifier` - Shared by every worker in the pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use archive_cracker::{ArchiveKind, CommandVerifier, Coordinator, CrackConfig};
    /// use std::path::Path;
    /// use std::sync::Arc;
    ///
    /// let archive = Path::new("secret.zip");
    /// let verifier = Arc::new(CommandVerifier::for_kind(ArchiveKind::Zip));
    /// let coordinator = Coordinator::new(CrackConfig::default(), archive, verifier);
    /// assert!(coordinator.store().path().ends_with("secret.zip_status.json"));
    /// ```
    pub fn new(config: CrackConfig, archive: &Path, verifier: Arc<dyn Verifier>) -> Self {
        Coordinator {
            config,
            archive: archive.to_path_buf(),
            verifier,
            store: CheckpointStore::for_archive(archive),
        }
    }

    pub fn with_store(mut self, store: CheckpointStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Load the checkpoint, build the candidate source and search.
    ///
    /// A password already recorded in the checkpoint is reported straight
    /// away without starting any worker. Wordlist runs resume from the
    /// checkpoint's `current_line`; combinatorial runs always start at 0.
    ///
    /// # Arguments
    ///
    /// * `mode` - Combinatorial enumeration or a wordlist path
    ///
    /// # Returns
    ///
    /// A `CrackReport` whose status is `Found`, `AlreadyFound` or `Exhausted`.
    /// Configuration errors, including an unreadable wordlist, are returned
    /// before any worker starts. `CrackError::Worker` is returned if every
    /// worker died before a password was found.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use archive_cracker::{ArchiveKind, CommandVerifier, Coordinator, CrackConfig, SearchMode};
    /// use std::path::{Path, PathBuf};
    /// use std::sync::Arc;
    ///
    /// let verifier = Arc::new(CommandVerifier::for_kind(ArchiveKind::Rar));
    /// let coordinator = Coordinator::new(CrackConfig::default(), Path::new("secret.rar"), verifier);
    /// let report = coordinator
    ///     .run(&SearchMode::Wordlist(PathBuf::from("words.txt")))
    ///     .unwrap();
    /// if let Some(password) = report.password() {
    ///     println!("Password is {}", password);
    /// }
    /// ```
    pub fn run(&self, mode: &SearchMode) -> Result<CrackReport> {
        self.config.validate()?;

        let state = self.store.load_or_fresh();
        if let Some(password) = state.found_password() {
            info!(checkpoint = %self.store.path().display(), "Password already recorded");
            return Ok(CrackReport {
                status: CrackStatus::AlreadyFound(password.to_string()),
                start_index: state.current_line,
                candidates_sent: 0,
                tally: OutcomeTally::default(),
                elapsed: Duration::ZERO,
            });
        }

        let source = match mode {
            SearchMode::Combinatorial => {
                CandidateSource::combinatorial(&self.config.charset, self.config.max_length)
            }
            SearchMode::Wordlist(path) => {
                CandidateSource::wordlist(path, state.current_line, &self.config.comment_marker)?
            }
        };

        self.search(source)
    }

    /// Run the producer/consumer search over `source` until it is exhausted
    /// or a password is found.
    pub fn search(&self, source: CandidateSource) -> Result<CrackReport> {
        self.config.validate()?;

        let started = Instant::now();
        let resumable = source.resumable();
        let start_index = source.start_index();

        if resumable {
            if start_index > 0 {
                info!(line = start_index, "Resuming wordlist");
            }
            self.persist(&CheckpointState::new(start_index));
        }

        let tasks = TaskChannel::new(self.config.queue_capacity());
        let results = ResultChannel::new();
        let ctx = WorkerContext {
            verifier: Arc::clone(&self.verifier),
            archive: self.archive.clone(),
            timeout: self.config.timeout(),
        };
        let pool = WorkerPool::spawn(self.config.workers, ctx, &tasks.receiver(), &results.sender())?;

        info!(
            archive = %self.archive.display(),
            workers = pool.size(),
            queue = tasks.capacity(),
            "Starting"
        );

        let mut state = RunState {
            outstanding: OutstandingSet::new(start_index),
            found: None,
            tally: OutcomeTally::default(),
            sent: 0,
        };
        let mut read_error = None;
        let mut pool_lost = false;

        for item in source {
            let candidate = match item {
                Ok(candidate) => candidate,
                Err(e) => {
                    error!(error = %e, "Wordlist read failed, stopping");
                    read_error = Some(e);
                    break;
                }
            };

            state.outstanding.dispatch(candidate.index);
            state.sent += 1;

            if state.sent % self.config.progress_interval == 0 {
                info!(
                    count = state.sent,
                    index = candidate.index,
                    word = %candidate.password,
                    in_flight = state.outstanding.len(),
                    queued = tasks.len(),
                    "Progress"
                );
            }

            // Blocks while the channel is full
            if tasks.send_while(Task::Check(candidate), || pool.is_alive()).is_err() {
                error!("Every worker has exited, stopping");
                pool_lost = true;
                break;
            }
            state.absorb(results.drain());

            if state.found.is_some() {
                break;
            }

            if resumable && state.sent % self.config.checkpoint_interval == 0 {
                self.persist(&CheckpointState::new(state.outstanding.floor()));
            }
        }

        if state.found.is_some() {
            let discarded = tasks.discard_pending();
            debug!(discarded, "Dropped queued candidates after success");
        }

        for _ in 0..pool.size() {
            if tasks.send_while(Task::Stop, || pool.is_alive()).is_err() {
                pool_lost = true;
                break;
            }
        }
        let (checked, worker_errors) = pool.join();
        for e in &worker_errors {
            warn!(error = %e, "Worker did not exit cleanly");
        }

        state.absorb(results.drain());

        match &state.found {
            Some((index, password)) => self.persist(&CheckpointState::found(*index, password)),
            None if resumable => self.persist(&CheckpointState::new(state.outstanding.floor())),
            None => {}
        }

        info!(
            sent = state.sent,
            checked,
            timeouts = state.tally.timeouts,
            errors = state.tally.errors,
            "Finished"
        );

        if pool_lost && state.found.is_none() {
            if let Some(e) = worker_errors.into_iter().next() {
                return Err(CrackError::Worker(e));
            }
        }

        if let Some(source) = read_error {
            if state.found.is_none() {
                return Err(CrackError::Io(source));
            }
        }

        let status = match state.found {
            Some((_, password)) => CrackStatus::Found(password),
            None => CrackStatus::Exhausted,
        };

        Ok(CrackReport {
            status,
            start_index,
            candidates_sent: state.sent,
            tally: state.tally,
            elapsed: started.elapsed(),
        })
    }

    fn persist(&self, state: &CheckpointState) {
        if let Err(e) = self.store.save(state) {
            warn!(error = %e, "Failed to save checkpoint");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: u64, status: OutcomeStatus) -> Outcome {
        Outcome {
            index,
            password: format!("pw{}", index),
            status,
            detail: String::new(),
        }
    }

    #[test]
    fn test_floor_is_minimum_of_outstanding() {
        let mut set = OutstandingSet::new(10);
        assert_eq!(set.floor(), 10);

        for i in 10..15 {
            set.dispatch(i);
        }
        // Out-of-order acknowledgements do not move the floor past 11
        set.acknowledge(14);
        set.acknowledge(12);
        set.acknowledge(10);
        assert_eq!(set.floor(), 11);

        set.acknowledge(11);
        assert_eq!(set.floor(), 13);
        set.acknowledge(13);
        assert!(set.is_empty());
        assert_eq!(set.floor(), 15);
    }

    #[test]
    fn test_floor_ignores_gaps_from_skipped_lines() {
        let mut set = OutstandingSet::new(0);
        set.dispatch(0);
        set.dispatch(2);
        assert!(set.acknowledge(0));
        assert!(!set.acknowledge(1));
        assert!(set.acknowledge(2));
        assert_eq!(set.floor(), 3);
    }

    #[test]
    fn test_first_success_wins() {
        let mut state = RunState {
            outstanding: OutstandingSet::new(0),
            found: None,
            tally: OutcomeTally::default(),
            sent: 0,
        };
        for i in 0..4 {
            state.outstanding.dispatch(i);
        }

        state.absorb(vec![
            outcome(0, OutcomeStatus::Failure),
            outcome(2, OutcomeStatus::Success),
            outcome(1, OutcomeStatus::TimedOut),
            outcome(3, OutcomeStatus::Success),
        ]);

        assert_eq!(state.found, Some((2, "pw2".to_string())));
        assert_eq!(state.tally.successes, 2);
        assert_eq!(state.tally.total(), 4);
        assert!(state.outstanding.is_empty());
    }

    #[test]
    fn test_report_password() {
        let report = CrackReport {
            status: CrackStatus::AlreadyFound("x".into()),
            start_index: 0,
            candidates_sent: 0,
            tally: OutcomeTally::default(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.password(), Some("x"));
    }
}
