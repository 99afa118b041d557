//! Pipeline launcher (§4.3): turns a parsed [`Pipeline`] into a tracked
//! [`Job`], wires up inter-stage pipes and redirections, assigns process
//! groups, spawns every stage, and — if foreground — drives the
//! synchronous reaper until the job leaves the foreground.
//!
//! Grounded in the teacher's `executor.rs` (`execute_pipeline`'s per-stage
//! loop, `InputHandle`/`OutputHandle`, `pre_exec` signal reset) but fixes
//! the process-group race the spec calls out (§9): the teacher calls
//! `tcsetpgrp` from the *parent* after `spawn()` returns
//! (`ForegroundTerminalGuard::new`), leaving a window where stage 0 can
//! read the terminal before it is foreground and get stopped by
//! `SIGTTIN`. Here, stage 0's `pre_exec` closure sets the pgrp *and*
//! (if the job is foreground) calls `tcsetpgrp` on itself before
//! returning — both happen in the child, before `exec`, with no parent-side
//! gap.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::RawFd;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use os_pipe::{PipeReader, PipeWriter, pipe};

use crate::ast::Pipeline;
use crate::error::{ShellError, ShellResult};
use crate::jobs::JobStatus;
use crate::reaper;
use crate::siggate::BlockGuard;
use crate::state;

/// Signals the shell leaves ignored; child stages must reset these to
/// `SIG_DFL` before `exec` or they'd inherit the shell's dispositions.
const RESET_SIGNALS: &[libc::c_int] = &[
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGTSTP,
    libc::SIGTTIN,
    libc::SIGTTOU,
    libc::SIGPIPE,
];

enum Stdout {
    Inherit,
    File(File),
    Pipe(PipeWriter),
}

impl Stdout {
    fn try_clone(&self) -> io::Result<Stdout> {
        Ok(match self {
            Stdout::Inherit => Stdout::Inherit,
            Stdout::File(f) => Stdout::File(f.try_clone()?),
            Stdout::Pipe(w) => Stdout::Pipe(w.try_clone()?),
        })
    }

    fn into_stdio(self) -> Stdio {
        match self {
            Stdout::Inherit => Stdio::inherit(),
            Stdout::File(f) => Stdio::from(f),
            Stdout::Pipe(w) => Stdio::from(w),
        }
    }
}

enum Stdin {
    Inherit,
    File(File),
    Pipe(PipeReader),
}

impl Stdin {
    fn into_stdio(self) -> Stdio {
        match self {
            Stdin::Inherit => Stdio::inherit(),
            Stdin::File(f) => Stdio::from(f),
            Stdin::Pipe(r) => Stdio::from(r),
        }
    }
}

/// Run a single pipeline to completion (if foreground) or hand it off to
/// the job table (if background). Returns the exit code of the last
/// stage for a foreground pipeline, or 0 immediately for a background one.
pub fn launch(pipeline: Pipeline, tty_fd: Option<RawFd>) -> ShellResult<i32> {
    let foreground = !pipeline.background;
    let input_redirect = pipeline.input_redirect.clone();
    let output_redirect = pipeline.output_redirect.clone();
    let append_output = pipeline.append_output;
    let stage_count = pipeline.stage_count();

    let shared = state::shared();
    let job = shared.jobs.add(pipeline)?;
    let job_id = job.id;
    job.status = if foreground {
        JobStatus::Foreground
    } else {
        JobStatus::Background
    };

    // Step 2: N-1 close-on-exec pipes (os_pipe sets CLOEXEC by default).
    let mut pipes: Vec<(PipeReader, PipeWriter)> = Vec::with_capacity(stage_count.saturating_sub(1));
    for _ in 0..stage_count.saturating_sub(1) {
        match pipe() {
            Ok(p) => pipes.push(p),
            Err(e) => return Err(ShellError::reportable(format!("jsh: failed to create pipe: {e}"))),
        }
    }

    let mut readers: Vec<Option<PipeReader>> = pipes.iter_mut().map(|_| None).collect();
    let mut writers: Vec<Option<PipeWriter>> = pipes.iter_mut().map(|_| None).collect();
    for (i, (r, w)) in pipes.into_iter().enumerate() {
        readers[i] = Some(r);
        writers[i] = Some(w);
    }

    let argvs: Vec<Vec<String>> = {
        let job = shared.jobs.get(job_id).expect("job just created");
        job.pipeline.commands.iter().map(|c| c.argv.clone()).collect()
    };
    let merges: Vec<bool> = {
        let job = shared.jobs.get(job_id).expect("job just created");
        job.pipeline.commands.iter().map(|c| c.merge_stderr).collect()
    };

    let mut leader_pid: Option<libc::pid_t> = None;

    for i in 0..stage_count {
        let is_first = i == 0;
        let is_last = i + 1 == stage_count;

        let stdin = if is_first {
            match &input_redirect {
                Some(path) => match File::open(path) {
                    Ok(f) => Stdin::File(f),
                    Err(e) => {
                        eprintln!("jsh: {path}: {e}");
                        continue;
                    }
                },
                None => Stdin::Inherit,
            }
        } else {
            Stdin::Pipe(readers[i - 1].take().expect("reader consumed once"))
        };

        let stdout_base = if is_last {
            match &output_redirect {
                Some(path) => {
                    let opened = if append_output {
                        OpenOptions::new().create(true).append(true).open(path)
                    } else {
                        OpenOptions::new().create(true).write(true).truncate(true).open(path)
                    };
                    match opened {
                        Ok(f) => Stdout::File(f),
                        Err(e) => {
                            eprintln!("jsh: {path}: {e}");
                            continue;
                        }
                    }
                }
                None => Stdout::Inherit,
            }
        } else {
            Stdout::Pipe(writers[i].take().expect("writer consumed once"))
        };

        let stderr = if merges[i] {
            match stdout_base.try_clone() {
                Ok(dup) => dup,
                Err(e) => {
                    eprintln!("jsh: failed to merge stderr into stdout: {e}");
                    continue;
                }
            }
        } else {
            Stdout::Inherit
        };

        let mut command = Command::new(&argvs[i][0]);
        command.args(&argvs[i][1..]);
        command.stdin(stdin.into_stdio());
        command.stdout(stdout_base.into_stdio());
        command.stderr(stderr.into_stdio());

        let target_pgid = leader_pid;
        let set_foreground = is_first && foreground;
        unsafe {
            command.pre_exec(move || {
                let target = target_pgid.unwrap_or(0);
                if libc::setpgid(0, target) != 0 {
                    return Err(io::Error::last_os_error());
                }
                if set_foreground {
                    if let Some(fd) = tty_fd {
                        let pgid = if target == 0 { libc::getpid() } else { target };
                        if libc::tcsetpgrp(fd, pgid) != 0 {
                            return Err(io::Error::last_os_error());
                        }
                    }
                }
                for &sig in RESET_SIGNALS {
                    if libc::signal(sig, libc::SIG_DFL) == libc::SIG_ERR {
                        return Err(io::Error::last_os_error());
                    }
                }
                Ok(())
            });
        }

        match command.spawn() {
            Ok(child) => {
                let pid = child.id() as libc::pid_t;
                if leader_pid.is_none() {
                    // Close the setpgid race on the parent side too — whichever of
                    // parent/child wins is fine, the loser gets EACCES/ESRCH.
                    unsafe { libc::setpgid(pid, pid) };
                    leader_pid = Some(pid);
                } else {
                    unsafe { libc::setpgid(pid, leader_pid.unwrap()) };
                }
                let job = shared.jobs.get_mut(job_id).expect("job still present");
                job.push_pid(pid);
                // `child` is dropped here without `.wait()`-ing: the reaper
                // (not `std::process::Child`) owns this pid's lifetime from
                // here on, via raw `waitpid` calls keyed on the job table.
            }
            Err(e) => {
                report_spawn_error(&argvs[i][0], &e);
            }
        }
    }

    // Step 6: parent-side pipe fds. Dropping `readers`/`writers` closes any
    // ends a stage didn't consume (e.g. because that stage failed to spawn).
    drop(readers);
    drop(writers);

    if foreground {
        run_foreground(job_id, tty_fd)
    } else {
        let job = shared.jobs.get(job_id).expect("job still present");
        if let Some(pgid) = job.pgid {
            println!("[{job_id}] {pgid}");
        }
        Ok(0)
    }
}

fn run_foreground(job_id: usize, tty_fd: Option<RawFd>) -> ShellResult<i32> {
    let _block = BlockGuard::new(libc::SIGCHLD)
        .map_err(|e| ShellError::fatal(format!("jsh: failed to block SIGCHLD: {e}")))?;

    let shared = state::shared();
    reaper::wait_foreground(&mut shared.jobs, &shared.term, job_id)?;

    let exit_code = shared
        .jobs
        .get(job_id)
        .and_then(|job| job.last_exit_code)
        .unwrap_or(0);

    if tty_fd.is_some() {
        let _ = shared.term.give_back_to_shell();
    }

    Ok(exit_code)
}

fn report_spawn_error(program: &str, e: &io::Error) {
    if e.kind() == io::ErrorKind::NotFound {
        eprintln!("jsh: {program}: no such file or directory");
    } else {
        eprintln!("jsh: {program}: {e}");
    }
}
