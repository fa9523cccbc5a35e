//! Registry of background processes.
//!
//! Background stages are never waited on by the engine. They are kept here,
//! keyed by pid, until [`JobTable::reap`] finds them finished, so no exited
//! child lingers as a zombie for longer than one prompt.

use crate::command::ExitCode;
use crate::launcher::ProcessHandle;
use crate::supervisor::exit_code;
use std::collections::BTreeMap;
use std::process::Child;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Job {
    pub command: String,
    child: Child,
}

/// A background process that has terminated and been reaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub pid: u32,
    pub command: String,
    pub code: ExitCode,
}

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: BTreeMap<u32, Job>,
}

impl JobTable {
    /// Takes ownership of a detached stage and returns its pid.
    pub fn insert(&mut self, handle: ProcessHandle) -> u32 {
        let pid = handle.pid();
        let command = handle.command().to_owned();
        debug!(pid, %command, "registered background process");
        self.jobs.insert(
            pid,
            Job {
                command,
                child: handle.into_child(),
            },
        );
        pid
    }

    /// Collects every background process that has terminated, without
    /// blocking on the ones still running.
    pub fn reap(&mut self) -> Vec<Finished> {
        let mut finished = Vec::new();
        self.jobs.retain(|&pid, job| match job.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                let code = exit_code(status);
                debug!(pid, code, "reaped background process");
                finished.push(Finished {
                    pid,
                    command: job.command.clone(),
                    code,
                });
                false
            }
            Err(err) => {
                warn!(pid, "dropping background process after failed wait: {err}");
                false
            }
        });
        finished
    }

    /// Live entries in pid order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Job)> {
        self.jobs.iter().map(|(&pid, job)| (pid, job))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Finished {
    /// Line printed before the next prompt.
    pub fn report(&self) -> String {
        if self.code == 0 {
            format!("[{}] done  {}", self.pid, self.command)
        } else {
            format!("[{}] exit {}  {}", self.pid, self.code, self.command)
        }
    }
}
