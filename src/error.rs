//! Error taxonomy for the shell core.
//!
//! The shell never builds a `std::error::Error` tree — diagnostics are short,
//! user-facing lines printed to stderr, exactly as the job-control errors in
//! `cush`-style shells are reported. [`ShellError`] exists only to separate
//! the two outcomes that matter to callers: keep running, or give up.

use std::fmt;

/// What went wrong, and whether the shell can keep running afterward.
#[derive(Debug)]
pub enum ShellError {
    /// A bookkeeping invariant was violated (job table exhausted, `waitpid`
    /// failed in the synchronous foreground wait). The shell cannot trust
    /// its own state afterward and must exit non-zero.
    Fatal(String),
    /// A user-level problem (spawn failure, unknown job id, bad argument).
    /// Reported to stderr; the REPL continues.
    Reportable(String),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Fatal(msg) | ShellError::Reportable(msg) => write!(f, "{msg}"),
        }
    }
}

impl ShellError {
    pub fn fatal(msg: impl Into<String>) -> Self {
        ShellError::Fatal(msg.into())
    }

    pub fn reportable(msg: impl Into<String>) -> Self {
        ShellError::Reportable(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Fatal(_))
    }
}

pub type ShellResult<T> = Result<T, ShellError>;
