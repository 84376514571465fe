//! Password verification against an archive
//!
//! The engine only ever talks to the [`Verifier`] trait. [`CommandVerifier`]
//! is the production implementation: it runs the archive tool for one
//! password and captures whatever it prints.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};

use crate::archive::{ArchiveKind, CommandTemplate};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What a single verification attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The tool ran to completion; `output` is stdout followed by stderr
    Completed { output: String, exit_code: Option<i32> },
    /// The time bound elapsed and the tool was killed
    TimedOut,
    /// The tool could not be run at all
    Failed(String),
}

impl Verification {
    pub fn matched(&self, marker: &str) -> bool {
        matches!(self, Verification::Completed { output, .. } if output.contains(marker))
    }
}

/// Tests one password against an archive within a time bound
pub trait Verifier: Send + Sync {
    /// Substring of the captured output that means the password is correct
    fn success_marker(&self) -> &str;

    fn test(&self, password: &str, archive: &Path, timeout: Duration) -> Verification;
}

/// Runs an external archive tool per candidate
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    template: CommandTemplate,
    marker: String,
}

impl CommandVerifier {
    pub fn new(template: CommandTemplate, marker: &str) -> Self {
        CommandVerifier {
            template,
            marker: marker.to_string(),
        }
    }

    pub fn for_kind(kind: ArchiveKind) -> Self {
        Self::new(kind.command(), kind.success_marker())
    }

    fn spawn(&self, password: &str, archive: &Path) -> std::io::Result<Child> {
        // stdin is the null device for this invocation only, so a tool that
        // prompts for input sees EOF instead of hanging until the timeout
        Command::new(&self.template.program)
            .args(self.template.render(password, archive))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }
}

/// Read a pipe to EOF on its own thread; the bytes arrive on the returned receiver.
///
/// A background process started by the tool can inherit the pipe and keep it
/// open after the tool exits. The reader thread is then left to finish on its
/// own while the caller gives up at its deadline.
fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

impl Verifier for CommandVerifier {
    fn success_marker(&self) -> &str {
        &self.marker
    }

    fn test(&self, password: &str, archive: &Path, timeout: Duration) -> Verification {
        let mut child = match self.spawn(password, archive) {
            Ok(child) => child,
            Err(e) => return Verification::Failed(format!("{}: {}", self.template.program, e)),
        };

        // Both pipes are drained concurrently so a chatty tool cannot block on a full pipe
        let stdout = drain_pipe(child.stdout.take());
        let stderr = drain_pipe(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) if Instant::now() >= deadline => break None,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Verification::Failed(e.to_string());
                }
            }
        };

        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            return Verification::TimedOut;
        };

        // The pipes share the deadline with the tool itself
        let (Ok(mut output), Ok(errors)) = (
            stdout.recv_deadline(deadline),
            stderr.recv_deadline(deadline),
        ) else {
            return Verification::TimedOut;
        };
        output.extend(errors);

        Verification::Completed {
            output: String::from_utf8_lossy(&output).into_owned(),
            exit_code: status.code(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str, marker: &str) -> CommandVerifier {
        CommandVerifier::new(CommandTemplate::new("sh", &["-c", script]), marker)
    }

    #[test]
    fn test_marker_detected_despite_nonzero_exit() {
        let verifier = shell("echo 'All OK'; exit 3", "All OK");
        let result = verifier.test("pw", Path::new("x.rar"), Duration::from_secs(5));
        assert!(result.matched(verifier.success_marker()));
        assert!(matches!(result, Verification::Completed { exit_code: Some(3), .. }));
    }

    #[test]
    fn test_password_is_substituted() {
        let verifier = shell("echo got-{password}", "got-secret");
        let result = verifier.test("secret", Path::new("x.zip"), Duration::from_secs(5));
        assert!(result.matched("got-secret"));
        let result = verifier.test("wrong", Path::new("x.zip"), Duration::from_secs(5));
        assert!(!result.matched("got-secret"));
    }

    #[test]
    fn test_stderr_is_captured() {
        let verifier = shell("echo 'Everything is Ok' 1>&2", "Everything is Ok");
        let result = verifier.test("pw", Path::new("x.7z"), Duration::from_secs(5));
        assert!(result.matched("Everything is Ok"));
    }

    #[test]
    fn test_timeout_kills_the_tool() {
        let verifier = shell("sleep 5; echo 'All OK'", "All OK");
        let started = Instant::now();
        let result = verifier.test("pw", Path::new("x.rar"), Duration::from_millis(200));
        assert_eq!(result, Verification::TimedOut);
        assert!(!result.matched("All OK"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_inherited_pipe_does_not_outlive_the_deadline() {
        // The background sleep keeps stdout open after sh itself has exited
        let verifier = shell("sleep 5 & echo 'All OK'", "All OK");
        let started = Instant::now();
        let result = verifier.test("pw", Path::new("x.rar"), Duration::from_millis(300));
        assert_eq!(result, Verification::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_tool_fails() {
        let verifier = CommandVerifier::new(
            CommandTemplate::new("definitely-not-an-archive-tool", &["{password}"]),
            "OK",
        );
        let result = verifier.test("pw", Path::new("x.zip"), Duration::from_secs(1));
        assert!(matches!(result, Verification::Failed(_)));
    }
}
