//! Execution of a [`PipelineSpec`]: wiring, spawning, and supervision.

use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ExecError;
use crate::jobs::JobTable;
use crate::launcher::{self, Launched};
use crate::pipeline::{Terminal, Wiring};
use crate::splitter::PipelineSpec;
use crate::supervisor;
use std::io::Write;
use tracing::debug;

/// What happened to a launched pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every stage ran to completion; one exit code per stage.
    Foreground { statuses: Vec<ExitCode> },
    /// The pipeline was detached; pids of the stages that started.
    Background { pids: Vec<u32> },
}

impl Outcome {
    /// The last stage's exit code, or 0 for a detached pipeline.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Foreground { statuses } => statuses.last().copied().unwrap_or(0),
            Outcome::Background { .. } => 0,
        }
    }

    /// Pids of a detached pipeline, empty for a foreground one.
    pub fn background_pids(&self) -> &[u32] {
        match self {
            Outcome::Background { pids } => pids,
            Outcome::Foreground { .. } => &[],
        }
    }
}

/// Spawns every stage of `spec` and either waits for all of them or hands
/// them to `jobs`, writing background notices to `notices`.
///
/// Nothing is spawned if a redirection file cannot be opened. If a pipe or
/// a process cannot be created, stages already started are terminated and
/// the error is returned.
pub fn execute(
    spec: &PipelineSpec,
    env: &Environment,
    jobs: &mut JobTable,
    terminal: Terminal,
    notices: &mut dyn Write,
) -> Result<Outcome, ExecError> {
    debug!(pipeline = %spec, "executing");
    let stages = spawn(spec, env, terminal)?;

    if spec.background {
        let pids = supervisor::detach(stages, jobs, notices);
        Ok(Outcome::Background { pids })
    } else {
        let statuses = supervisor::wait_all(stages);
        debug!(?statuses, "pipeline finished");
        Ok(Outcome::Foreground { statuses })
    }
}

/// Spawns the stages of `spec` in order, each connected to its neighbours.
///
/// Stage `i + 1` is only started once stage `i` holds its end of the pipe
/// between them; the parent's copies are closed as each stage is spawned.
pub fn spawn(
    spec: &PipelineSpec,
    env: &Environment,
    terminal: Terminal,
) -> Result<Vec<Launched>, ExecError> {
    let mut wiring = Wiring::prepare(spec, terminal, &env.current_dir)?;
    let mut launched = Vec::with_capacity(spec.stages.len());

    for segment in &spec.stages {
        let stage = wiring
            .next_stage()
            .and_then(|io| launcher::launch(segment, io, env));
        match stage {
            Ok(stage) => launched.push(stage),
            Err(err) => {
                supervisor::abort(launched);
                return Err(err);
            }
        }
    }

    Ok(launched)
}
