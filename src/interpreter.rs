use crate::command::{CommandFactory, ExitCode};
use crate::config::Config;
use crate::engine;
use crate::env::Environment;
use crate::pipeline::Terminal;
use crate::session::Session;
use crate::splitter::{PipelineSpec, split_line};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};
use tracing::debug;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the built-ins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// An interactive command interpreter.
///
/// Each input line is split into a [`PipelineSpec`]. A lone command that
/// names a built-in runs in-process against the [`Session`]; everything else
/// goes to the execution engine.
///
/// Example
/// ```no_run
/// use coltrane_shell::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.execute_line("echo hello | wc -w");
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    config: Config,
    session: Session,
    builtins: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of built-in factories.
    pub fn new(config: Config, builtins: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            config,
            session: Session::new(Environment::new()),
            builtins,
        }
    }

    /// Create an interpreter with the default built-ins.
    pub fn with_config(config: Config) -> Self {
        use crate::builtin::*;
        Self::new(
            config,
            vec![
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Pwd>::default()),
                Box::new(Factory::<History>::default()),
                Box::new(Factory::<Help>::default()),
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Jobs>::default()),
                Box::new(Factory::<Alias>::default()),
                Box::new(Factory::<Unalias>::default()),
            ],
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run one input line, writing built-in output and background notices
    /// to standard output.
    pub fn execute_line(&mut self, line: &str) -> ExitCode {
        self.execute_line_with_output(line, &mut io::stdout())
    }

    /// Run one input line with built-in output and background notices
    /// redirected to `out`.
    ///
    /// Never fails: every problem is reported on stderr and turned into a
    /// non-zero exit code, so the caller can always read the next line.
    pub fn execute_line_with_output(&mut self, line: &str, out: &mut dyn Write) -> ExitCode {
        if line.trim().is_empty() {
            return 0;
        }
        self.session.history.push(line.to_string());

        let mut spec = match split_line(line, self.config.grammar) {
            Ok(Some(spec)) => spec,
            Ok(None) => return 0,
            Err(err) => {
                eprintln!("coltrane: syntax error: {err}");
                return 2;
            }
        };
        spec.expand_aliases(&self.session.aliases);

        let code = match self.run_builtin(&spec, out) {
            Some(code) => code,
            None => self.run_pipeline(&spec, out),
        };
        debug!(code, "line finished");
        code
    }

    fn run_builtin(&mut self, spec: &PipelineSpec, out: &mut dyn Write) -> Option<ExitCode> {
        if !spec.is_simple() {
            return None;
        }
        let stage = &spec.stages[0];
        let args: Vec<&str> = stage.args().iter().map(String::as_str).collect();
        let cmd = self
            .builtins
            .iter()
            .find_map(|factory| factory.try_create(stage.program(), &args))?;

        Some(match cmd.execute(out, &mut self.session) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("coltrane: {err:#}");
                1
            }
        })
    }

    fn run_pipeline(&mut self, spec: &PipelineSpec, out: &mut dyn Write) -> ExitCode {
        let session = &mut self.session;
        match engine::execute(
            spec,
            &session.env,
            &mut session.jobs,
            Terminal::default(),
            out,
        ) {
            Ok(outcome) => outcome.exit_code(),
            Err(err) => {
                eprintln!("coltrane: {err}");
                1
            }
        }
    }

    /// Print a line for every background process that has finished since
    /// the last call.
    pub fn report_finished_jobs(&mut self, out: &mut dyn Write) -> io::Result<()> {
        for finished in self.session.jobs.reap() {
            writeln!(out, "{}", finished.report())?;
        }
        Ok(())
    }

    /// Read-Eval-Print Loop over the terminal until `exit`, `quit` or EOF.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;
        if self.config.banner {
            println!("Coltrane Shell - smooth as jazz");
        }

        while !self.session.env.should_exit {
            self.report_finished_jobs(&mut io::stdout())?;
            match rl.readline(&self.session.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.execute_line(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        if !self.session.jobs.is_empty() {
            debug!(
                count = self.session.jobs.len(),
                "leaving background processes running"
            );
        }
        if self.config.banner {
            println!("Take five!");
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}
