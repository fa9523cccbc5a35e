use coltrane_shell::env::Environment;
use coltrane_shell::{
    Config, Endpoint, ExecError, Grammar, Interpreter, JobTable, Outcome, PipelineSpec, Terminal,
    execute, split_line,
};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

fn spec(line: &str) -> PipelineSpec {
    split_line(line, Grammar::Lenient).unwrap().unwrap()
}

fn env_in(dir: &Path) -> Environment {
    let mut env = Environment::new();
    env.current_dir = dir.to_path_buf();
    env
}

fn capture(line: &str, dir: &Path) -> (Outcome, String) {
    let path = dir.join("captured.txt");
    let file = File::create(&path).unwrap();
    let terminal = Terminal {
        stdin: Endpoint::Inherit,
        stdout: Endpoint::File(file),
    };
    let outcome = execute(
        &spec(line),
        &env_in(dir),
        &mut JobTable::default(),
        terminal,
        &mut io::sink(),
    )
    .unwrap();
    (outcome, fs::read_to_string(path).unwrap())
}

fn run(line: &str, dir: &Path) -> Result<Outcome, ExecError> {
    execute(
        &spec(line),
        &env_in(dir),
        &mut JobTable::default(),
        Terminal::default(),
        &mut io::sink(),
    )
}

#[test]
fn test_two_stage_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let (outcome, out) = capture("echo hello | wc -w", dir.path());
    assert_eq!(out.trim(), "1");
    assert_eq!(outcome.exit_code(), 0);
}

#[test]
fn test_output_redirection_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("marker"), "").unwrap();
    let target = dir.path().join("out.txt");

    let line = format!("ls {} > {}", dir.path().display(), target.display());
    let outcome = run(&line, dir.path()).unwrap();
    assert_eq!(outcome, Outcome::Foreground { statuses: vec![0] });
    assert!(fs::read_to_string(&target).unwrap().contains("marker"));
}

#[test]
fn test_truncate_keeps_only_last_run() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");

    run(&format!("echo first > {}", target.display()), dir.path()).unwrap();
    run(&format!("echo second > {}", target.display()), dir.path()).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "second\n");
}

#[test]
fn test_append_accumulates() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("log.txt");

    run(&format!("echo one >> {}", target.display()), dir.path()).unwrap();
    run(&format!("echo two >> {}", target.display()), dir.path()).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "one\ntwo\n");
}

#[test]
fn test_input_and_output_redirection_together() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("names.txt");
    let target = dir.path().join("sorted.txt");
    fs::write(&source, "b\na\nb\n").unwrap();

    let line = format!("sort < {} > {}", source.display(), target.display());
    run(&line, dir.path()).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "a\nb\nb\n");
}

#[test]
fn test_pipe_with_redirection_characters_stays_a_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let (outcome, out) = capture("echo a < b > c | cat", dir.path());
    assert_eq!(outcome, Outcome::Foreground { statuses: vec![0, 0] });
    assert_eq!(out, "a < b > c\n");
    assert!(!dir.path().join("b").exists());
    assert!(!dir.path().join("c").exists());
}

#[test]
fn test_relative_redirections_use_session_directory() {
    let dir = tempfile::tempdir().unwrap();
    let name = format!("relative-{}.txt", std::process::id());
    fs::write(dir.path().join("names.txt"), "b\na\n").unwrap();

    run(&format!("sort < names.txt > {name}"), dir.path()).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join(&name)).unwrap(),
        "a\nb\n"
    );
    assert!(!Path::new(&name).exists());
}

#[test]
fn test_unknown_program_mid_pipeline_lets_neighbours_finish() {
    let dir = tempfile::tempdir().unwrap();
    let (outcome, out) = capture("echo hi | no-such-program-coltrane | wc -l", dir.path());
    assert_eq!(
        outcome,
        Outcome::Foreground {
            statuses: vec![0, 127, 0]
        }
    );
    assert_eq!(out.trim(), "0");
}

#[test]
fn test_missing_input_file_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let target = dir.path().join("never.txt");

    let line = format!("cat < {} > {}", missing.display(), target.display());
    let err = run(&line, dir.path()).unwrap_err();
    assert!(matches!(err, ExecError::Input { .. }));
    assert!(err.to_string().contains("missing.txt"));
    assert!(!target.exists());
}

#[test]
fn test_missing_input_through_interpreter() {
    let dir = tempfile::tempdir().unwrap();
    let mut sh = Interpreter::with_config(Config {
        grammar: Grammar::Lenient,
        banner: false,
    });
    sh.session_mut().env.current_dir = dir.path().to_path_buf();

    let mut out = Vec::new();
    let code = sh.execute_line_with_output("cat < missing.txt > copy.txt", &mut out);
    assert_eq!(code, 1);
    assert!(out.is_empty());
    assert!(!dir.path().join("copy.txt").exists());
    assert!(sh.session().jobs.is_empty());
}

#[test]
fn test_background_returns_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let mut jobs = JobTable::default();
    let mut notices = Vec::new();

    let started = Instant::now();
    let outcome = execute(
        &spec("sleep 2 &"),
        &env_in(dir.path()),
        &mut jobs,
        Terminal::default(),
        &mut notices,
    )
    .unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    let pids = outcome.background_pids().to_vec();
    assert_eq!(pids.len(), 1);
    assert_eq!(jobs.len(), 1);
    let notices = String::from_utf8(notices).unwrap();
    assert_eq!(notices, format!("[{}] running in background\n", pids[0]));

    Command::new("kill").arg(pids[0].to_string()).status().unwrap();
}

#[test]
fn test_single_command_exit_status_matches_direct_run() {
    let dir = tempfile::tempdir().unwrap();
    let direct = Command::new("sh")
        .args(["-c", "exit 3"])
        .status()
        .unwrap()
        .code()
        .unwrap();

    // Arguments are split on whitespace only, so the script goes in a file.
    let script = dir.path().join("exit3.sh");
    fs::write(&script, "exit 3\n").unwrap();
    let outcome = run(&format!("sh {}", script.display()), dir.path()).unwrap();
    assert_eq!(outcome.exit_code(), direct);
}

#[test]
fn test_blank_and_bare_operator_lines_are_empty() {
    assert_eq!(split_line("   ", Grammar::Lenient).unwrap(), None);
    assert_eq!(split_line("|", Grammar::Lenient).unwrap(), None);
}
