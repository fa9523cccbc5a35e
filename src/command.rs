use crate::session::Session;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Programs killed by signal `n` are reported as `128 + n`, as POSIX shells do.
pub type ExitCode = i32;

/// Object-safe trait for a command the interpreter runs in-process.
///
/// Implemented for every built-in via a blanket impl.
pub trait ExecutableCommand {
    /// Executes the command, writing its output to `stdout`.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, session: &mut Session)
    -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`, in which
/// case the line is handed to the execution engine.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
