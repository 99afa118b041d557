//! Child-status reaper: one `apply` update routine shared by the
//! asynchronous `SIGCHLD` handler and the synchronous foreground-wait
//! loop (§4.2).
//!
//! Grounded in the teacher's `wait_for_pid`/`WaitOutcome` (the exited-vs-
//! stopped split) and `cush.c`'s `handle_child_status`, generalized to the
//! full stopped-signal breakdown (SIGTSTP vs SIGSTOP vs SIGTTIN/SIGTTOU)
//! the spec's table requires and to updating a job in a shared table
//! instead of a single tracked pid.

use std::io;

use crate::error::{ShellError, ShellResult};
use crate::jobs::{JobStatus, JobTable};
use crate::state;
use crate::termstate::TermState;

/// Apply one `waitpid` result to the job owning `pid`. Ignored (per §7)
/// if no tracked job owns this pid — a spurious report, or a pid already
/// reaped by a previous call in the same drain loop.
pub fn apply(jobs: &mut JobTable, term: &TermState, pid: libc::pid_t, raw_status: libc::c_int) {
    let Some(job) = jobs.find_by_pid(pid) else {
        return;
    };

    if unsafe { libc::WIFSTOPPED(raw_status) } {
        let stop_signal = unsafe { libc::WSTOPSIG(raw_status) };
        term.save(&mut job.saved_modes);
        match stop_signal {
            libc::SIGTSTP => {
                job.status = JobStatus::Stopped;
                println!("{}", job.print_line());
            }
            libc::SIGTTIN | libc::SIGTTOU => {
                job.status = JobStatus::NeedsTerminal;
            }
            _ => {
                // SIGSTOP, or another stop signal the table doesn't name.
                job.status = JobStatus::Stopped;
            }
        }
    } else if unsafe { libc::WIFEXITED(raw_status) } {
        if job.status == JobStatus::Foreground {
            term.sample();
        }
        if job.pids.last() == Some(&pid) {
            job.last_exit_code = Some(unsafe { libc::WEXITSTATUS(raw_status) });
        }
        job.alive -= 1;
    } else if unsafe { libc::WIFSIGNALED(raw_status) } {
        let term_signal = unsafe { libc::WTERMSIG(raw_status) };
        if let Some(message) = signal_diagnostic(term_signal) {
            eprintln!("jsh: {message}");
        }
        if job.pids.last() == Some(&pid) {
            job.last_exit_code = Some(128 + term_signal);
        }
        job.alive -= 1;
    }
}

fn signal_diagnostic(signal: libc::c_int) -> Option<&'static str> {
    match signal {
        libc::SIGFPE => Some("floating point exception"),
        libc::SIGSEGV => Some("segmentation fault"),
        libc::SIGABRT => Some("aborted"),
        libc::SIGKILL => Some("killed"),
        libc::SIGTERM => Some("terminated"),
        _ => None,
    }
}

/// Asynchronous driver: invoked from the `SIGCHLD` handler. Drains every
/// pending status change non-blockingly; stops at the first
/// "no children ready" report (an `ECHILD` with no tracked jobs is not an
/// error — it just means nothing is pending).
pub extern "C" fn handle_sigchld(_signo: libc::c_int) {
    let shared = state::shared();
    loop {
        let mut raw_status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, libc::WNOHANG | libc::WUNTRACED) };
        if pid <= 0 {
            break;
        }
        apply(&mut shared.jobs, &shared.term, pid, raw_status);
    }
}

/// Synchronous driver: blocks waiting for status changes on `job_id`
/// until it is no longer Foreground or has no live children left.
///
/// Precondition: the child-status signal is blocked by the caller (see
/// `siggate::BlockGuard`), so this cannot race `handle_sigchld`. A
/// `waitpid` failure here means the bookkeeping (alive count, pid set) has
/// drifted from reality — a bug, not a recoverable condition.
pub fn wait_foreground(jobs: &mut JobTable, term: &TermState, job_id: usize) -> ShellResult<()> {
    debug_assert!(
        crate::siggate::is_blocked(libc::SIGCHLD),
        "wait_foreground called with SIGCHLD unblocked"
    );

    loop {
        let (status, alive) = match jobs.get(job_id) {
            Some(job) => (job.status, job.alive),
            None => return Ok(()),
        };
        if status != JobStatus::Foreground || alive == 0 {
            return Ok(());
        }

        let mut raw_status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, libc::WUNTRACED) };
        if pid < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(ShellError::fatal(format!(
                "jsh: waitpid failed during foreground wait: {err}"
            )));
        }

        apply(jobs, term, pid, raw_status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CommandSpec, Pipeline};

    fn dummy_pipeline() -> Pipeline {
        Pipeline {
            commands: vec![CommandSpec {
                argv: vec!["true".to_string()],
                merge_stderr: false,
            }],
            input_redirect: None,
            output_redirect: None,
            append_output: false,
            background: false,
        }
    }

    fn exited_status(code: i32) -> libc::c_int {
        (code & 0xff) << 8
    }

    #[test]
    fn apply_ignores_untracked_pid() {
        let mut jobs = JobTable::new();
        let term = TermState::init_headless();
        // Should not panic even though no job owns pid 999.
        apply(&mut jobs, &term, 999, exited_status(0));
    }

    #[test]
    fn apply_decrements_alive_on_exit() {
        let mut jobs = JobTable::new();
        let term = TermState::init_headless();
        let job = jobs.add(dummy_pipeline()).unwrap();
        job.push_pid(1234);
        job.status = JobStatus::Background;

        apply(&mut jobs, &term, 1234, exited_status(0));
        assert_eq!(jobs.get(1).unwrap().alive, 0);
    }
}
