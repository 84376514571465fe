pub mod archive;
pub mod candidate;
pub mod channel;
pub mod checkpoint;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod io_utils;
pub mod password_generator;
pub mod verifier;
pub mod worker;

pub use archive::{ArchiveKind, CommandTemplate};
pub use candidate::{Candidate, CandidateSource, WordlistReader};
pub use channel::{Outcome, OutcomeStatus, ResultChannel, Task, TaskChannel};
pub use checkpoint::{CheckpointState, CheckpointStore};
pub use config::CrackConfig;
pub use coordinator::{Coordinator, CrackReport, CrackStatus, OutcomeTally, OutstandingSet, SearchMode};
pub use error::{CheckpointError, CrackError, WorkerError};
pub use password_generator::PasswordGenerator;
pub use verifier::{CommandVerifier, Verification, Verifier};
