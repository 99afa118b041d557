//! Turns a raw input line into the [`Pipeline`] list the launcher and
//! built-in dispatcher consume.
//!
//! Pipeline of stages:
//!
//! ```text
//! tokenize → split on ';' → split on '&' (trailing) → split on '|' → expand → extract redirections
//! ```
//!
//! This is the teacher's own `tokenize → expand → extract_redirections`
//! flow (see the old single-command `main.rs`), generalized with the `;`/`|`
//! splitting a job-control shell needs and narrowed to the redirection forms
//! the job table actually has to reason about: `<` on the first stage, `>`/
//! `>>` on the last stage, `2>&1` on any stage.

use crate::ast::{CommandSpec, Pipeline};
use crate::expander;
use crate::parser::{self, Word};
use crate::redirect::{self, RedirectTarget};

/// Parse a full input line into the `;`-separated list of pipelines it
/// describes. Returns `Ok(vec![])` for a blank or comment-only line.
pub fn parse_line(line: &str, last_exit_code: i32) -> Result<Vec<Pipeline>, String> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return Ok(Vec::new());
    }

    let words = parser::tokenize(line)?;
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let mut pipelines = Vec::new();
    for segment in split_on(&words, ";") {
        if segment.is_empty() {
            continue;
        }
        pipelines.push(parse_pipeline(segment, last_exit_code)?);
    }
    Ok(pipelines)
}

fn split_on<'a>(words: &'a [Word], sep: &str) -> Vec<&'a [Word]> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, w) in words.iter().enumerate() {
        if parser::is_metachar(w, sep) {
            parts.push(&words[start..i]);
            start = i + 1;
        }
    }
    parts.push(&words[start..]);
    parts
}

fn parse_pipeline(words: &[Word], last_exit_code: i32) -> Result<Pipeline, String> {
    let mut words = words;
    let mut background = false;
    if let Some(last) = words.last() {
        if parser::is_metachar(last, "&") {
            background = true;
            words = &words[..words.len() - 1];
        }
    }
    if words.iter().any(|w| parser::is_metachar(w, "&")) {
        return Err("jsh: syntax error near '&'".to_string());
    }

    let stages = split_on(words, "|");
    if stages.iter().any(|s| s.is_empty()) {
        return Err("jsh: syntax error near '|'".to_string());
    }

    let stage_count = stages.len();
    let mut commands = Vec::with_capacity(stage_count);
    let mut input_redirect = None;
    let mut output_redirect = None;
    let mut append_output = false;

    for (idx, stage_words) in stages.into_iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx + 1 == stage_count;

        let tokens = expander::expand_words(stage_words, last_exit_code);
        let (argv, redirs) = redirect::extract_redirections(&tokens)?;
        if argv.is_empty() {
            return Err("jsh: syntax error: empty command".to_string());
        }

        let mut merge_stderr = false;
        for r in redirs {
            match (r.fd, r.target) {
                (2, RedirectTarget::Fd(1)) => merge_stderr = true,
                (0, RedirectTarget::FileRead(path)) if is_first => {
                    if input_redirect.is_some() {
                        return Err("jsh: syntax error: multiple input redirections".to_string());
                    }
                    input_redirect = Some(path);
                }
                (0, RedirectTarget::FileRead(_)) => {
                    return Err(
                        "jsh: syntax error: input redirection only valid on the first pipeline stage"
                            .to_string(),
                    );
                }
                (1, RedirectTarget::File(path)) if is_last => {
                    if output_redirect.is_some() {
                        return Err("jsh: syntax error: multiple output redirections".to_string());
                    }
                    output_redirect = Some(path);
                    append_output = false;
                }
                (1, RedirectTarget::FileAppend(path)) if is_last => {
                    if output_redirect.is_some() {
                        return Err("jsh: syntax error: multiple output redirections".to_string());
                    }
                    output_redirect = Some(path);
                    append_output = true;
                }
                (1, RedirectTarget::File(_) | RedirectTarget::FileAppend(_)) => {
                    return Err(
                        "jsh: syntax error: output redirection only valid on the last pipeline stage"
                            .to_string(),
                    );
                }
                _ => return Err("jsh: syntax error: unsupported redirection".to_string()),
            }
        }

        commands.push(CommandSpec { argv, merge_stderr });
    }

    Ok(Pipeline {
        commands,
        input_redirect,
        output_redirect,
        append_output,
        background,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_command() {
        let pipelines = parse_line("echo hello", 0).unwrap();
        assert_eq!(pipelines.len(), 1);
        assert!(pipelines[0].is_single_command());
        assert_eq!(pipelines[0].commands[0].argv, vec!["echo", "hello"]);
        assert!(!pipelines[0].background);
    }

    #[test]
    fn background_job() {
        let pipelines = parse_line("sleep 30 &", 0).unwrap();
        assert_eq!(pipelines.len(), 1);
        assert!(pipelines[0].background);
        assert_eq!(pipelines[0].commands[0].argv, vec!["sleep", "30"]);
    }

    #[test]
    fn two_stage_pipeline() {
        let pipelines = parse_line("cat file.txt | wc -l", 0).unwrap();
        assert_eq!(pipelines.len(), 1);
        assert_eq!(pipelines[0].stage_count(), 2);
        assert_eq!(pipelines[0].commands[1].argv, vec!["wc", "-l"]);
    }

    #[test]
    fn sequenced_commands() {
        let pipelines = parse_line("echo a ; echo b", 0).unwrap();
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].commands[0].argv, vec!["echo", "a"]);
        assert_eq!(pipelines[1].commands[0].argv, vec!["echo", "b"]);
    }

    #[test]
    fn input_and_output_redirect() {
        let pipelines = parse_line("sort < in.txt > out.txt", 0).unwrap();
        let p = &pipelines[0];
        assert_eq!(p.input_redirect.as_deref(), Some("in.txt"));
        assert_eq!(p.output_redirect.as_deref(), Some("out.txt"));
        assert!(!p.append_output);
    }

    #[test]
    fn append_redirect() {
        let pipelines = parse_line("echo hi >> out.txt", 0).unwrap();
        assert!(pipelines[0].append_output);
    }

    #[test]
    fn stderr_merge_on_any_stage() {
        let pipelines = parse_line("grep foo 2>&1 | wc -l", 0).unwrap();
        assert!(pipelines[0].commands[0].merge_stderr);
        assert!(!pipelines[0].commands[1].merge_stderr);
    }

    #[test]
    fn output_redirect_mid_pipeline_is_error() {
        assert!(parse_line("echo hi > out.txt | wc -l", 0).is_err());
    }

    #[test]
    fn input_redirect_non_first_stage_is_error() {
        assert!(parse_line("echo hi | wc -l < in.txt", 0).is_err());
    }

    #[test]
    fn empty_stage_between_pipes_is_error() {
        assert!(parse_line("echo hi | | wc -l", 0).is_err());
    }

    #[test]
    fn blank_line_is_no_pipelines() {
        assert!(parse_line("", 0).unwrap().is_empty());
        assert!(parse_line("   ", 0).unwrap().is_empty());
    }

    #[test]
    fn comment_line_is_no_pipelines() {
        assert!(parse_line("# just a comment", 0).unwrap().is_empty());
    }

    #[test]
    fn pipeline_display_round_trips() {
        let pipelines = parse_line("cat file.txt | wc -l > out.txt", 0).unwrap();
        let text = pipelines[0].to_string();
        let reparsed = parse_line(&text, 0).unwrap();
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].commands.len(), pipelines[0].commands.len());
        assert_eq!(reparsed[0].output_redirect, pipelines[0].output_redirect);
    }
}
