//! Spawning of a single pipeline stage.

use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ExecError;
use crate::external::find_command_path;
use crate::pipeline::StageWiring;
use crate::splitter::CommandSegment;
use nix::libc;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command};
use tracing::debug;

/// Exit code recorded for a stage whose program could not be found.
pub const NOT_FOUND: ExitCode = 127;
/// Exit code recorded for a stage whose program exists but could not be run.
pub const NOT_EXECUTABLE: ExitCode = 126;

/// A spawned stage.
#[derive(Debug)]
pub struct ProcessHandle {
    command: String,
    child: Child,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// The stage's command line, for reporting.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn into_child(self) -> Child {
        self.child
    }
}

/// Result of launching one stage.
#[derive(Debug)]
pub enum Launched {
    Running(ProcessHandle),
    /// The program could not be resolved or executed. The stage's descriptors
    /// have been released so its neighbours see end-of-stream.
    Skipped { program: String, code: ExitCode },
}

/// Spawns `segment` with the given wiring, in the session's working
/// directory and environment.
///
/// Program resolution and exec failures are reported on stderr and yield
/// [`Launched::Skipped`]; only a failure of process creation itself is an
/// error.
pub fn launch(
    segment: &CommandSegment,
    wiring: StageWiring,
    env: &Environment,
) -> Result<Launched, ExecError> {
    let program = segment.program();
    let search_paths = env.get_var("PATH").unwrap_or_default();
    // A name with a separator is relative to the stage's directory.
    let typed = Path::new(program);
    let located = if typed.is_relative() && typed.components().nth(1).is_some() {
        Cow::Owned(env.current_dir.join(typed))
    } else {
        Cow::Borrowed(typed)
    };
    let Some(executable) = find_command_path(OsStr::new(&search_paths), &located) else {
        eprintln!("{program}: command not found");
        return Ok(Launched::Skipped {
            program: program.to_owned(),
            code: NOT_FOUND,
        });
    };

    let mut command = Command::new(executable.as_ref());
    command
        .arg0(program)
        .args(segment.args())
        .stdin(wiring.stdin)
        .stdout(wiring.stdout)
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir);

    match command.spawn() {
        Ok(child) => {
            debug!(pid = child.id(), command = %segment, "spawned stage");
            Ok(Launched::Running(ProcessHandle {
                command: segment.to_string(),
                child,
            }))
        }
        Err(err) if is_exec_failure(&err) => {
            eprintln!("{program}: {err}");
            let code = if err.kind() == io::ErrorKind::NotFound {
                NOT_FOUND
            } else {
                NOT_EXECUTABLE
            };
            Ok(Launched::Skipped {
                program: program.to_owned(),
                code,
            })
        }
        Err(source) => Err(ExecError::Spawn {
            program: program.to_owned(),
            source,
        }),
    }
}

/// Distinguishes a failed program replacement from a failure to create the
/// process at all (out of processes or memory).
fn is_exec_failure(err: &io::Error) -> bool {
    !matches!(
        err.raw_os_error(),
        Some(code) if code == libc::EAGAIN || code == libc::ENOMEM
    )
}
