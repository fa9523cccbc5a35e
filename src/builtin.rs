use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::interpreter::Factory;
use crate::session::Session;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "history".
    fn name() -> &'static str;

    /// Other names the command answers to.
    fn aliases() -> &'static [&'static str] {
        &[]
    }

    /// Executes the command against the session state.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                eprintln!("{e:#}");
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() && !T::aliases().contains(&name) {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", session.env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; a leading `~` stands for $HOME. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let env = &mut session.env;
        let target = match self.target.as_deref() {
            None | Some("") => env.home(),
            Some(t) => match t.strip_prefix('~') {
                Some(rest) => {
                    let mut home = env.home().into_os_string();
                    home.push(rest);
                    PathBuf::from(home)
                }
                None => PathBuf::from(t),
            },
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: {}", canonical.display()))?;
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn aliases() -> &'static [&'static str] {
        &["quit"]
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the lines entered in this session, oldest first.
pub struct History {}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        for (i, line) in session.history.iter().enumerate() {
            writeln!(stdout, " {}  {}", i + 1, line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Describe the built-in commands and supported operators.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        writeln!(
            stdout,
            "Coltrane Shell v{}.{}",
            env!("CARGO_PKG_VERSION_MAJOR"),
            env!("CARGO_PKG_VERSION_MINOR")
        )?;
        writeln!(
            stdout,
            "Built-ins: cd, pwd, history, help, jobs, alias, unalias, exit, quit"
        )?;
        writeln!(
            stdout,
            "Features: pipes (|), redirection (<, >, >>), background (&)"
        )?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List background processes that have not finished yet.
pub struct Jobs {}

impl BuiltinCommand for Jobs {
    fn name() -> &'static str {
        "jobs"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        for finished in session.jobs.reap() {
            writeln!(stdout, "{}", finished.report())?;
        }
        for (pid, job) in session.jobs.iter() {
            writeln!(stdout, "[{pid}] running  {}", job.command)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Define or list aliases. `alias name=text...` defines one alias; `alias name`
/// prints it; plain `alias` prints all of them.
pub struct Alias {
    #[argh(positional, greedy)]
    /// a definition `name=replacement words`, or a name to print.
    pub definition: Vec<String>,
}

impl BuiltinCommand for Alias {
    fn name() -> &'static str {
        "alias"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        if self.definition.is_empty() {
            for (name, value) in &session.aliases {
                writeln!(stdout, "alias {name}='{value}'")?;
            }
            return Ok(0);
        }

        let definition = self.definition.join(" ");
        match definition.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                session
                    .aliases
                    .insert(name.to_string(), value.trim().to_string());
                Ok(0)
            }
            Some(_) => Err(anyhow!("alias: missing name in `{definition}`")),
            None => match session.aliases.get(&definition) {
                Some(value) => {
                    writeln!(stdout, "alias {definition}='{value}'")?;
                    Ok(0)
                }
                None => Err(anyhow!("alias: {definition}: not found")),
            },
        }
    }
}

#[derive(FromArgs)]
/// Remove aliases.
pub struct Unalias {
    #[argh(positional, greedy)]
    /// alias names to remove.
    pub names: Vec<String>,
}

impl BuiltinCommand for Unalias {
    fn name() -> &'static str {
        "unalias"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let mut code = 0;
        for name in &self.names {
            if session.aliases.remove(name).is_none() {
                eprintln!("unalias: {name}: not found");
                code = 1;
            }
        }
        Ok(code)
    }
}
