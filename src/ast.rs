//! The pipeline data model the parser produces and the launcher consumes.
//!
//! A *command line* is an ordered list of [`Pipeline`]s (one per `;`-separated
//! segment). Each pipeline owns an ordered list of [`CommandSpec`] stages,
//! plus the I/O redirection and background attributes that apply to the
//! pipeline as a whole.

use std::fmt;

/// One stage of a pipeline: a program name, its arguments, and whether this
/// stage's stderr should be merged into its stdout (`2>&1`).
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub merge_stderr: bool,
}

impl CommandSpec {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// A pipeline of one or more commands joined by `|`, with at most one input
/// redirect (on the first stage) and one output redirect (on the last stage).
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub commands: Vec<CommandSpec>,
    pub input_redirect: Option<String>,
    pub output_redirect: Option<String>,
    pub append_output: bool,
    pub background: bool,
}

impl Pipeline {
    pub fn stage_count(&self) -> usize {
        self.commands.len()
    }

    pub fn is_single_command(&self) -> bool {
        self.commands.len() == 1
    }

    pub fn first_program(&self) -> &str {
        self.commands.first().map(CommandSpec::program).unwrap_or("")
    }
}

/// Reconstruct the pipeline's command text, the way `cush`'s `print_cmdline`
/// does: stages joined by `| `, redirections appended literally. This is
/// what `jobs` prints and what a job's saved command text is derived from —
/// it round-trips back through the parser to an equivalent `Pipeline` (P5).
impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, "| ")?;
            }
            write!(f, "{cmd}")?;
            if cmd.merge_stderr {
                write!(f, " 2>&1")?;
            }
            if i + 1 < self.commands.len() {
                write!(f, " ")?;
            }
        }
        if let Some(path) = &self.input_redirect {
            write!(f, " < {path}")?;
        }
        if let Some(path) = &self.output_redirect {
            if self.append_output {
                write!(f, " >> {path}")?;
            } else {
                write!(f, " > {path}")?;
            }
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}
