use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole pipeline.
///
/// A program that cannot be found or executed is not one of these: only the
/// affected stage is skipped and the rest of the pipeline keeps running.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{}: {source}", .path.display())]
    Input { path: PathBuf, source: io::Error },

    #[error("{}: {source}", .path.display())]
    Output { path: PathBuf, source: io::Error },

    #[error("pipe: {0}")]
    Pipe(#[source] nix::Error),

    #[error("{program}: {source}")]
    Spawn { program: String, source: io::Error },
}
