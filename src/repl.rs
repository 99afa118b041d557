//! The REPL (§4.5): reads one line at a time, parses it into pipelines,
//! and dispatches each to the built-in dispatcher or the pipeline
//! launcher.
//!
//! Grounded in the teacher's `main.rs` loop (prompt → read_line → parse →
//! expand → execute), generalized to the job-control invariants §4.5/§4.6
//! and §5 require: a reap sweep between reads, a prompt gated on stdin
//! being a tty, and the pipeline-per-`;`-segment dispatch loop.

use crate::ast::Pipeline;
use crate::builtins;
use crate::editor::LineEditor;
use crate::error::{ShellError, ShellResult};
use crate::launcher;
use crate::pipeline_parser;
use crate::state;

use crossterm::tty::IsTty;

const PROMPT: &str = "jsh> ";

/// Run the REPL until EOF or a fatal error. Returns the exit code the
/// process should terminate with (the last pipeline's exit status, or a
/// non-zero code on a fatal bookkeeping error).
pub fn run() -> i32 {
    let mut editor = LineEditor::new();
    let mut last_exit_code: i32 = 0;
    let interactive = std::io::stdin().is_tty();

    loop {
        // §4.6: only safe between reads, where no wait is in progress and
        // the async reaper cannot race this sweep.
        state::shared().jobs.reap_terminated();

        let prompt = if interactive { PROMPT } else { "" };
        let line = match editor.read_line(prompt) {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("jsh: error reading input: {e}");
                break;
            }
        };

        if !line.trim().is_empty() {
            editor.add_to_history(&line);
        }

        let pipelines = match pipeline_parser::parse_line(&line, last_exit_code) {
            Ok(pipelines) => pipelines,
            Err(msg) => {
                eprintln!("{msg}");
                last_exit_code = 2;
                continue;
            }
        };

        for pipeline in pipelines {
            match dispatch(pipeline, editor.history()) {
                Ok(code) => last_exit_code = code,
                Err(ShellError::Reportable(msg)) => {
                    eprintln!("{msg}");
                    last_exit_code = 1;
                }
                Err(ShellError::Fatal(msg)) => {
                    eprintln!("{msg}");
                    std::process::exit(1);
                }
            }
        }
    }

    last_exit_code
}

/// Run one pipeline: a builtin if it names one (subject to the
/// single-command gate below), else hand it to the launcher.
///
/// Builtins are job-control or shell-state operations with no meaning
/// split across pipe stages or deferred to a background process group —
/// rejected outright rather than silently mis-executed (see SPEC_FULL.md's
/// "Builtin-first-stage gate" decision).
fn dispatch(pipeline: Pipeline, history: &[String]) -> ShellResult<i32> {
    let name = pipeline.first_program().to_string();
    if !builtins::is_builtin(&name) {
        let tty_fd = state::shared().term.tty_fd();
        return launcher::launch(pipeline, tty_fd);
    }

    if !pipeline.is_single_command() {
        return Err(ShellError::reportable(format!(
            "jsh: {name}: cannot appear in a pipeline"
        )));
    }
    if pipeline.background {
        return Err(ShellError::reportable(format!(
            "jsh: {name}: cannot run in the background"
        )));
    }

    let args = pipeline.commands[0].args().to_vec();
    Ok(builtins::run(&name, &args, history))
}
