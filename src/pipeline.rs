//! Descriptor wiring for the stages of a pipeline.
//!
//! Every descriptor is an owned handle (`File` or `OwnedFd`) moved into the
//! [`Stdio`] of exactly one stage, so the parent's copy is closed as soon as
//! that stage's `Command` is dropped, and on every early-return path.

use crate::error::ExecError;
use crate::splitter::{OutputTarget, PipelineSpec};
use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use std::fs::{File, OpenOptions};
use std::mem;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::process::Stdio;
use tracing::debug;

/// One outer end of a pipeline when no redirection applies to it.
#[derive(Debug, Default)]
pub enum Endpoint {
    /// The engine's own standard stream.
    #[default]
    Inherit,
    File(File),
}

impl From<Endpoint> for Stdio {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Inherit => Stdio::inherit(),
            Endpoint::File(file) => Stdio::from(file),
        }
    }
}

/// What the first stage reads from and the last stage writes to when the
/// line carries no redirection.
#[derive(Debug, Default)]
pub struct Terminal {
    pub stdin: Endpoint,
    pub stdout: Endpoint,
}

/// Standard input and output prepared for a single stage.
#[derive(Debug)]
pub struct StageWiring {
    pub stdin: Stdio,
    pub stdout: Stdio,
}

/// Hands out the wiring of each stage in order.
///
/// The pipe between stage `i` and `i + 1` is created when stage `i` asks for
/// its wiring: the write end goes to stage `i`, the read end is held until
/// stage `i + 1` asks for its own.
#[derive(Debug)]
pub struct Wiring {
    stages: usize,
    next: usize,
    input: Stdio,
    output: Stdio,
}

impl Wiring {
    /// Opens the redirection files of `spec`, input first. Relative paths
    /// are taken from `cwd`, the directory the stages will run in.
    ///
    /// Fails without creating the output file if the input cannot be opened.
    pub fn prepare(
        spec: &PipelineSpec,
        terminal: Terminal,
        cwd: &Path,
    ) -> Result<Self, ExecError> {
        let input = match &spec.input {
            Some(path) => {
                let file = File::open(cwd.join(path)).map_err(|source| ExecError::Input {
                    path: path.clone(),
                    source,
                })?;
                Stdio::from(file)
            }
            None => terminal.stdin.into(),
        };
        let output = match &spec.output {
            Some(target) => Stdio::from(open_output(target, cwd)?),
            None => terminal.stdout.into(),
        };

        Ok(Self {
            stages: spec.stages.len(),
            next: 0,
            input,
            output,
        })
    }

    /// Wiring for the next stage in line.
    pub fn next_stage(&mut self) -> Result<StageWiring, ExecError> {
        let index = self.next;
        self.next += 1;

        let stdin = mem::replace(&mut self.input, Stdio::null());
        let stdout = if index + 1 < self.stages {
            let (reader, writer) = cloexec_pipe()?;
            self.input = Stdio::from(reader);
            Stdio::from(writer)
        } else {
            mem::replace(&mut self.output, Stdio::null())
        };

        Ok(StageWiring { stdin, stdout })
    }
}

/// Opens (creating if needed) an output redirection target, owner
/// read/write. A relative target is taken from `cwd`.
pub fn open_output(target: &OutputTarget, cwd: &Path) -> Result<File, ExecError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(0o644);
    if target.append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options.open(cwd.join(&target.path)).map_err(|source| ExecError::Output {
        path: target.path.clone(),
        source,
    })
}

/// A pipe whose ends are not inherited across exec, so that each stage only
/// holds the ends duplicated onto its own stdin/stdout.
///
/// Both ends are close-on-exec from the moment they exist; a process spawned
/// concurrently from another thread never inherits them.
fn cloexec_pipe() -> Result<(OwnedFd, OwnedFd), ExecError> {
    let (reader, writer) = pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?;
    debug!(
        reader = reader.as_raw_fd(),
        writer = writer.as_raw_fd(),
        "created pipe"
    );
    Ok((reader, writer))
}
