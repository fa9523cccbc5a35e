//! Waiting for, detaching, and aborting spawned stages.

use crate::command::ExitCode;
use crate::jobs::JobTable;
use crate::launcher::{Launched, ProcessHandle};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::io::Write;
use std::process::ExitStatus;
use tracing::{debug, warn};

/// Blocks until every running stage has terminated.
///
/// Returns one exit code per stage, in pipeline order. Skipped stages keep
/// the code recorded at launch.
pub fn wait_all(stages: Vec<Launched>) -> Vec<ExitCode> {
    stages
        .into_iter()
        .map(|stage| match stage {
            Launched::Running(handle) => wait(handle),
            Launched::Skipped { code, .. } => code,
        })
        .collect()
}

fn wait(handle: ProcessHandle) -> ExitCode {
    let pid = handle.pid();
    match handle.into_child().wait() {
        Ok(status) => {
            let code = exit_code(status);
            debug!(pid, code, "stage finished");
            code
        }
        Err(err) => {
            warn!(pid, "wait failed: {err}");
            1
        }
    }
}

/// Registers every running stage in `jobs` and reports its pid to `notices`
/// without waiting.
pub fn detach(stages: Vec<Launched>, jobs: &mut JobTable, notices: &mut dyn Write) -> Vec<u32> {
    let mut pids = Vec::new();
    for stage in stages {
        if let Launched::Running(handle) = stage {
            let pid = jobs.insert(handle);
            if let Err(err) = writeln!(notices, "[{pid}] running in background") {
                warn!(pid, "failed to report background process: {err}");
            }
            pids.push(pid);
        }
    }
    pids
}

/// Asks already-spawned stages to terminate and reaps them.
///
/// Used when a later stage of the same pipeline could not be started.
pub fn abort(stages: Vec<Launched>) {
    for stage in stages {
        let Launched::Running(handle) = stage else {
            continue;
        };
        let pid = handle.pid();
        debug!(pid, "terminating stage of aborted pipeline");
        if let Err(err) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(pid, "failed to signal stage: {err}");
        }
        wait(handle);
    }
}

/// Converts a process status into a shell exit code; death by signal `n`
/// becomes `128 + n`.
#[cfg(unix)]
pub fn exit_code(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(code) = status.code() {
        code
    } else if let Some(signal) = status.signal() {
        128 + signal
    } else {
        -1
    }
}

#[cfg(not(unix))]
pub fn exit_code(status: ExitStatus) -> ExitCode {
    status.code().unwrap_or(-1)
}
