//! Classification of a raw input line into a [`PipelineSpec`].
//!
//! A line has exactly one shape, tested in this order:
//! 1. it contains `|`: a pipeline of two or more stages;
//! 2. it contains `<` or `>`: a single command with redirections;
//! 3. anything else: a plain command.
//!
//! A trailing `&` token is removed before classification and marks the whole
//! line as a background invocation.

use crate::tokenizer::tokenize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// How forgiving the splitter is about incomplete or ambiguous operator usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Grammar {
    /// Incomplete redirections are dropped and `<`/`>` inside a pipeline are
    /// passed through as ordinary arguments.
    #[default]
    Lenient,
    /// Incomplete or ambiguous operator usage is a [`SyntaxError`].
    Strict,
}

/// Errors reported by [`split_line`] under [`Grammar::Strict`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("missing file name after `{0}`")]
    MissingTarget(&'static str),
    #[error("`|` cannot be combined with `<` or `>`")]
    MixedOperators,
    #[error("empty command in pipeline")]
    EmptyStage,
    #[error("more than one `{0}` redirection")]
    DuplicateRedirection(&'static str),
    #[error("missing command before redirection")]
    MissingCommand,
}

/// One stage of a pipeline: the program name followed by its arguments.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSegment {
    argv: Vec<String>,
}

impl CommandSegment {
    /// Wraps a tokenized argument vector, or returns `None` if it is empty.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            None
        } else {
            Some(Self { argv })
        }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for CommandSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Output redirection applied to the last stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    /// `>>` when true, `>` otherwise.
    pub append: bool,
}

/// Everything needed to launch one input line.
///
/// `input` feeds the first stage, `output` receives the last stage's
/// standard output. Built fresh for every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub stages: Vec<CommandSegment>,
    pub input: Option<PathBuf>,
    pub output: Option<OutputTarget>,
    pub background: bool,
}

impl PipelineSpec {
    /// A single stage without redirections, launched in the foreground.
    pub fn single(segment: CommandSegment) -> Self {
        Self {
            stages: vec![segment],
            input: None,
            output: None,
            background: false,
        }
    }

    /// True for a lone command with no redirections, the only form
    /// built-in commands are dispatched for.
    pub fn is_simple(&self) -> bool {
        self.stages.len() == 1 && self.input.is_none() && self.output.is_none()
    }

    /// Replaces the program name of every stage that names an alias with the
    /// alias's tokens. Expansion is not recursive.
    pub fn expand_aliases(&mut self, aliases: &BTreeMap<String, String>) {
        for stage in &mut self.stages {
            if let Some(value) = aliases.get(stage.program()) {
                let mut argv = tokenize(value);
                if argv.is_empty() {
                    continue;
                }
                argv.extend(stage.argv.drain(1..));
                stage.argv = argv;
            }
        }
    }
}

impl fmt::Display for PipelineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{stage}")?;
        }
        if let Some(input) = &self.input {
            write!(f, " < {}", input.display())?;
        }
        if let Some(output) = &self.output {
            let op = if output.append { ">>" } else { ">" };
            write!(f, " {op} {}", output.path.display())?;
        }
        if self.background {
            f.write_str(" &")?;
        }
        Ok(())
    }
}

/// Splits a raw input line into a pipeline specification.
///
/// # Returns
/// * `Ok(Some(spec))` - something to execute.
/// * `Ok(None)` - nothing to execute: a blank line, a pipeline with fewer than
///   two non-empty stages, or (leniently) a redirection without a command.
/// * `Err(_)` - only under [`Grammar::Strict`].
pub fn split_line(line: &str, grammar: Grammar) -> Result<Option<PipelineSpec>, SyntaxError> {
    let (body, background) = strip_background(line);

    let spec = if body.contains('|') {
        split_pipeline(body, grammar)?
    } else if body.contains(['<', '>']) {
        split_redirection(body, grammar)?
    } else {
        CommandSegment::new(tokenize(body)).map(PipelineSpec::single)
    };

    Ok(spec.map(|mut spec| {
        spec.background = background;
        spec
    }))
}

fn strip_background(line: &str) -> (&str, bool) {
    let trimmed = line.trim_end();
    match trimmed.strip_suffix('&') {
        Some(rest) if rest.is_empty() || rest.ends_with(char::is_whitespace) => (rest, true),
        _ => (line, false),
    }
}

fn split_pipeline(body: &str, grammar: Grammar) -> Result<Option<PipelineSpec>, SyntaxError> {
    if grammar == Grammar::Strict && body.contains(['<', '>']) {
        return Err(SyntaxError::MixedOperators);
    }

    let segments: Vec<&str> = body.split('|').map(str::trim).collect();
    let stages: Vec<CommandSegment> = segments
        .iter()
        .filter_map(|segment| CommandSegment::new(tokenize(segment)))
        .collect();

    if grammar == Grammar::Strict && !stages.is_empty() && stages.len() != segments.len() {
        return Err(SyntaxError::EmptyStage);
    }
    if stages.len() < 2 {
        return Ok(None);
    }

    Ok(Some(PipelineSpec {
        stages,
        input: None,
        output: None,
        background: false,
    }))
}

fn split_redirection(body: &str, grammar: Grammar) -> Result<Option<PipelineSpec>, SyntaxError> {
    if grammar == Grammar::Strict {
        if body.matches('<').count() > 1 {
            return Err(SyntaxError::DuplicateRedirection("<"));
        }
        let mut runs = body.split(|c: char| c != '>').filter(|run| !run.is_empty());
        let first = runs.next();
        if runs.next().is_some() || first.is_some_and(|run| run.len() > 2) {
            return Err(SyntaxError::DuplicateRedirection(">"));
        }
    }

    // `>>` is searched first so that append wins over truncate.
    let output_op = match body.find(">>") {
        Some(pos) => Some((pos, ">>")),
        None => body.find('>').map(|pos| (pos, ">")),
    };
    let input_op = body.find('<');

    let operators = [output_op.map(|(pos, _)| pos), input_op];
    let end_of = |start: usize| {
        operators
            .iter()
            .flatten()
            .copied()
            .filter(|&pos| pos > start)
            .min()
            .unwrap_or(body.len())
    };

    let output = match output_op {
        Some((pos, op)) => {
            redirect_target(&body[pos + op.len()..end_of(pos)], op, grammar)?.map(|path| {
                OutputTarget {
                    path,
                    append: op == ">>",
                }
            })
        }
        None => None,
    };
    let input = match input_op {
        Some(pos) => redirect_target(&body[pos + 1..end_of(pos)], "<", grammar)?,
        None => None,
    };

    let command_end = operators.iter().flatten().copied().min().unwrap_or(body.len());
    let Some(segment) = CommandSegment::new(tokenize(&body[..command_end])) else {
        return match grammar {
            Grammar::Strict => Err(SyntaxError::MissingCommand),
            Grammar::Lenient => Ok(None),
        };
    };

    Ok(Some(PipelineSpec {
        stages: vec![segment],
        input,
        output,
        background: false,
    }))
}

fn redirect_target(
    text: &str,
    op: &'static str,
    grammar: Grammar,
) -> Result<Option<PathBuf>, SyntaxError> {
    let text = text.trim();
    if !text.is_empty() {
        return Ok(Some(PathBuf::from(text)));
    }
    match grammar {
        Grammar::Strict => Err(SyntaxError::MissingTarget(op)),
        Grammar::Lenient => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient(line: &str) -> Option<PipelineSpec> {
        split_line(line, Grammar::Lenient).unwrap()
    }

    fn argvs(spec: &PipelineSpec) -> Vec<Vec<String>> {
        spec.stages.iter().map(|s| s.argv().to_vec()).collect()
    }

    #[test]
    fn test_pipeline_segments_are_trimmed() {
        let spec = lenient("a | b | c").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["a"], vec!["b"], vec!["c"]]);
        assert!(spec.input.is_none() && spec.output.is_none());
        assert!(!spec.background);
    }

    #[test]
    fn test_pipeline_without_spaces() {
        let spec = lenient("ls -l|wc -l").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["ls", "-l"], vec!["wc", "-l"]]);
    }

    #[test]
    fn test_append_redirection() {
        let spec = lenient("cmd >> file").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["cmd"]]);
        assert_eq!(
            spec.output,
            Some(OutputTarget {
                path: PathBuf::from("file"),
                append: true
            })
        );
    }

    #[test]
    fn test_truncate_redirection() {
        let spec = lenient("ls -a > out.txt").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["ls", "-a"]]);
        let output = spec.output.unwrap();
        assert_eq!(output.path, PathBuf::from("out.txt"));
        assert!(!output.append);
    }

    #[test]
    fn test_input_and_output_in_either_order() {
        for line in ["sort < in.txt > out.txt", "sort > out.txt < in.txt"] {
            let spec = lenient(line).unwrap();
            assert_eq!(argvs(&spec), vec![vec!["sort"]], "{line}");
            assert_eq!(spec.input, Some(PathBuf::from("in.txt")), "{line}");
            assert_eq!(spec.output.unwrap().path, PathBuf::from("out.txt"), "{line}");
        }
    }

    #[test]
    fn test_pipe_takes_priority_over_redirection() {
        let spec = lenient("cat < in | wc").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["cat", "<", "in"], vec!["wc"]]);
        assert!(spec.input.is_none());

        let err = split_line("cat < in | wc", Grammar::Strict).unwrap_err();
        assert_eq!(err, SyntaxError::MixedOperators);
    }

    #[test]
    fn test_blank_and_degenerate_pipelines_are_skipped() {
        assert_eq!(lenient(""), None);
        assert_eq!(lenient("   \t "), None);
        assert_eq!(lenient("|"), None);
        assert_eq!(lenient("ls |"), None);
        assert_eq!(split_line("|", Grammar::Strict), Ok(None));
        assert_eq!(split_line("  ", Grammar::Strict), Ok(None));
    }

    #[test]
    fn test_empty_stage_is_dropped_or_rejected() {
        let spec = lenient("a | | b").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["a"], vec!["b"]]);
        assert_eq!(
            split_line("a | | b", Grammar::Strict),
            Err(SyntaxError::EmptyStage)
        );
        assert_eq!(split_line("ls |", Grammar::Strict), Err(SyntaxError::EmptyStage));
    }

    #[test]
    fn test_missing_target_is_dropped_or_rejected() {
        let spec = lenient("ls >").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["ls"]]);
        assert!(spec.output.is_none());

        assert_eq!(
            split_line("ls >", Grammar::Strict),
            Err(SyntaxError::MissingTarget(">"))
        );
        assert_eq!(
            split_line("cat < > out", Grammar::Strict),
            Err(SyntaxError::MissingTarget("<"))
        );
    }

    #[test]
    fn test_redirection_without_command() {
        assert_eq!(lenient("> out"), None);
        assert_eq!(
            split_line("> out", Grammar::Strict),
            Err(SyntaxError::MissingCommand)
        );
    }

    #[test]
    fn test_duplicate_redirections_rejected_when_strict() {
        assert_eq!(
            split_line("a > b > c", Grammar::Strict),
            Err(SyntaxError::DuplicateRedirection(">"))
        );
        assert_eq!(
            split_line("a >>> b", Grammar::Strict),
            Err(SyntaxError::DuplicateRedirection(">"))
        );
        assert_eq!(
            split_line("a < b < c", Grammar::Strict),
            Err(SyntaxError::DuplicateRedirection("<"))
        );
    }

    #[test]
    fn test_trailing_ampersand_marks_background() {
        let spec = lenient("sleep 5 &").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["sleep", "5"]]);
        assert!(spec.background);

        let spec = lenient("yes | head -n 1 &").unwrap();
        assert_eq!(spec.stages.len(), 2);
        assert!(spec.background);

        let spec = lenient("sort < in > out &").unwrap();
        assert_eq!(spec.output.unwrap().path, PathBuf::from("out"));
        assert!(spec.background);
    }

    #[test]
    fn test_ampersand_inside_word_is_literal() {
        let spec = lenient("echo a&").unwrap();
        assert_eq!(argvs(&spec), vec![vec!["echo", "a&"]]);
        assert!(!spec.background);
        assert_eq!(lenient("&"), None);
    }

    #[test]
    fn test_alias_expansion_replaces_program_only() {
        let mut aliases = BTreeMap::new();
        aliases.insert("ll".to_string(), "ls -l".to_string());
        aliases.insert("ls".to_string(), "ls --color".to_string());

        let mut spec = lenient("ll /tmp | grep ll").unwrap();
        spec.expand_aliases(&aliases);
        assert_eq!(
            argvs(&spec),
            vec![vec!["ls", "-l", "/tmp"], vec!["grep", "ll"]]
        );
    }

    #[test]
    fn test_display_renders_operators() {
        let spec = lenient("sort -r < in >> out &").unwrap();
        assert_eq!(spec.to_string(), "sort -r < in >> out &");
        let spec = lenient("a | b x").unwrap();
        assert_eq!(spec.to_string(), "a | b x");
    }
}
