//! Sub-process execution: spawning a step's command and reporting how it
//! terminated.

use anyhow::anyhow;
use std::process::Command;

#[derive(Debug, PartialEq)]
pub enum Termination {
    Success,
    Interrupted,
    /// Non-zero exit, carrying the exit code (-1 when killed by a signal).
    Failure(i32),
}

/// The outcome of one spawned command.
#[derive(Debug)]
pub struct TaskResult {
    pub termination: Termination,
    /// Combined console output.
    pub output: Vec<u8>,
}

/// The seam between the scheduler and the operating system: an argv vector
/// in, a termination plus console output out.  Tests substitute their own
/// implementation to observe scheduling without spawning anything.
pub trait Runner: Sync {
    fn run(&self, argv: &[String]) -> anyhow::Result<TaskResult>;
}

/// Runs commands as real child processes.  The first argv entry is resolved
/// via PATH; a spawn failure is an error distinct from a non-zero exit.
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, argv: &[String]) -> anyhow::Result<TaskResult> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty command line"))?;
        let out = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| anyhow!("spawn {}: {}", program, err))?;

        let mut output = out.stdout;
        output.extend_from_slice(&out.stderr);

        let termination = if out.status.success() {
            Termination::Success
        } else if interrupted(&out.status) {
            Termination::Interrupted
        } else {
            Termination::Failure(out.status.code().unwrap_or(-1))
        };

        Ok(TaskResult {
            termination,
            output,
        })
    }
}

#[cfg(unix)]
fn interrupted(status: &std::process::ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(libc::SIGINT)
}

#[cfg(not(unix))]
fn interrupted(_status: &std::process::ExitStatus) -> bool {
    false
}
