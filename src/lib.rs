//! An interactive command interpreter with pipes, redirection and background
//! processes.
//!
//! A line of input such as `sort < names.txt | uniq -c >> counts.txt &` is
//! split by [`split_line`] into a [`PipelineSpec`], which [`execute`] turns
//! into one child process per stage: stages are connected by pipes, the
//! first reads the input file and the last writes the output file. The
//! engine then either waits for every stage or registers them in a
//! [`JobTable`] and returns at once.
//!
//! [`Interpreter`] wraps the engine in a read-eval loop with a handful of
//! built-ins (`cd`, `pwd`, `history`, `help`, `jobs`, `alias`, `exit`) that
//! operate on the interpreter's [`Session`].

mod builtin;
pub mod command;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod jobs;
pub mod launcher;
pub mod pipeline;
pub mod session;
pub mod splitter;
pub mod supervisor;
pub mod tokenizer;

pub use config::Config;
pub use engine::{Outcome, execute};
pub use error::ExecError;
pub use interpreter::Interpreter;
pub use jobs::JobTable;
pub use pipeline::{Endpoint, Terminal};
pub use session::Session;
pub use splitter::{Grammar, PipelineSpec, SyntaxError, split_line};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::env::Environment;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serializes tests that change the process working directory.
    pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A process environment rooted in a directory no test removes.
    pub(crate) fn test_env() -> Environment {
        let mut env = Environment::new();
        env.current_dir = std::env::temp_dir();
        env
    }
}
