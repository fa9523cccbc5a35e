use anyhow::Context;
use argh::FromArgs;
use coltrane_shell::{Config, Grammar, Interpreter};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Coltrane: an interactive shell with pipes, redirection and background processes.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status
    command: Option<String>,

    #[argh(switch)]
    /// reject incomplete or ambiguous use of `|`, `<`, `>` and `>>`
    strict: bool,

    #[argh(switch, short = 'q')]
    /// do not print the greeting and farewell
    quiet: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            grammar: if self.strict {
                Grammar::Strict
            } else {
                Grammar::Lenient
            },
            banner: !self.quiet,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Args = argh::from_env();
    let mut interpreter = Interpreter::with_config(args.config());

    if let Some(line) = &args.command {
        let code = interpreter.execute_line(line);
        std::process::exit(code);
    }

    interpreter.repl().context("line editor failed")?;
    Ok(())
}
