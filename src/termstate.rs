//! Terminal-state manager: owns the controlling terminal's attributes and
//! the current foreground process-group assignment.
//!
//! Grounded in the teacher's `job_control.rs` (`ForegroundTerminalGuard`,
//! `SignalIgnoreGuard`, `set_terminal_foreground`), generalized into the
//! named operations the core spec calls out as an external collaborator:
//! init, sample, save(slot), give-terminal-to, give-back-to-shell,
//! current-owner, tty-fd.

use std::cell::RefCell;
use std::io;

pub type TermModes = libc::termios;

pub struct TermState {
    tty_fd: Option<libc::c_int>,
    shell_pgid: libc::pid_t,
    shell_modes: RefCell<Option<TermModes>>,
}

/// Job-control signals the shell itself must ignore; children reset them
/// to `SIG_DFL` before `exec` (see the `RESET_SIGNALS` loop in `launcher.rs`).
const IGNORED_SIGNALS: &[libc::c_int] = &[
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGTSTP,
    libc::SIGTTIN,
    libc::SIGTTOU,
];

impl TermState {
    /// Put the shell in its own process group and loop until that group
    /// owns the terminal, the way `cush`'s `init_job_control` does: a
    /// shell started as part of another job's pgrp (e.g. via `sh -c`)
    /// sends itself `SIGTTIN` until the kernel schedules it into the
    /// foreground.
    pub fn init() -> io::Result<Self> {
        for &sig in IGNORED_SIGNALS {
            if unsafe { libc::signal(sig, libc::SIG_IGN) } == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
        }

        let shell_pgid = unsafe { libc::getpid() };
        set_pgid_retrying(shell_pgid, shell_pgid)?;

        let tty_fd = if unsafe { libc::isatty(libc::STDIN_FILENO) } == 1 {
            Some(libc::STDIN_FILENO)
        } else {
            None
        };

        if let Some(fd) = tty_fd {
            loop {
                let owner = unsafe { libc::tcgetpgrp(fd) };
                if owner == shell_pgid {
                    break;
                }
                unsafe { libc::kill(-shell_pgid, libc::SIGTTIN) };
            }
            set_terminal_pgrp(fd, shell_pgid)?;
        }

        let shell_modes = tty_fd.and_then(|fd| sample_fd(fd).ok());

        Ok(Self {
            tty_fd,
            shell_pgid,
            shell_modes: RefCell::new(shell_modes),
        })
    }

    pub fn tty_fd(&self) -> Option<libc::c_int> {
        self.tty_fd
    }

    /// Refresh the cached "current shell modes" from the terminal. Called
    /// by the reaper after a foreground job exits normally — the child may
    /// have left the terminal in a state the shell should simply adopt
    /// rather than stomp on.
    pub fn sample(&self) -> Option<TermModes> {
        let fd = self.tty_fd?;
        let modes = sample_fd(fd).ok();
        if modes.is_some() {
            *self.shell_modes.borrow_mut() = modes.clone();
        }
        modes
    }

    /// Save the terminal's current attributes into a caller-owned slot
    /// (a job's `saved_modes` field).
    pub fn save(&self, slot: &mut Option<TermModes>) {
        if let Some(fd) = self.tty_fd {
            *slot = sample_fd(fd).ok();
        }
    }

    /// Transfer foreground pgrp to `pgid`, restoring `modes` first if
    /// given, else the shell's last-known modes. This is the only place
    /// terminal attributes are written back out.
    pub fn give_terminal_to(&self, modes: Option<&TermModes>, pgid: libc::pid_t) -> io::Result<()> {
        let Some(fd) = self.tty_fd else { return Ok(()) };

        let cached = self.shell_modes.borrow();
        if let Some(m) = modes.or(cached.as_ref()) {
            set_attrs(fd, m)?;
        }
        drop(cached);
        set_terminal_pgrp(fd, pgid)
    }

    /// Reclaim the terminal's foreground pgrp for the shell. Does not
    /// touch attributes — a job that exited cleanly already left the
    /// terminal the way it wants it; `sample` is what absorbs that.
    pub fn give_back_to_shell(&self) -> io::Result<()> {
        let Some(fd) = self.tty_fd else { return Ok(()) };
        set_terminal_pgrp(fd, self.shell_pgid)
    }

    pub fn current_owner(&self) -> io::Result<libc::pid_t> {
        let Some(fd) = self.tty_fd else {
            return Ok(self.shell_pgid);
        };
        let rc = unsafe { libc::tcgetpgrp(fd) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(rc)
    }

    pub fn shell_pgid(&self) -> libc::pid_t {
        self.shell_pgid
    }

    /// A `TermState` for tests that doesn't touch signal dispositions or
    /// the process group of the test harness itself — `tty_fd` is always
    /// `None`, so every terminal-touching operation becomes a no-op.
    #[cfg(test)]
    pub fn init_headless() -> Self {
        Self {
            tty_fd: None,
            shell_pgid: unsafe { libc::getpid() },
            shell_modes: RefCell::new(None),
        }
    }
}

fn sample_fd(fd: libc::c_int) -> io::Result<TermModes> {
    unsafe {
        let mut modes: TermModes = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut modes) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(modes)
    }
}

fn set_attrs(fd: libc::c_int, modes: &TermModes) -> io::Result<()> {
    let rc = unsafe { libc::tcsetattr(fd, libc::TCSADRAIN, modes) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// `tcsetpgrp` raises `SIGTTOU` against callers not already in the
/// foreground pgrp; the shell ignores that signal permanently (see
/// `init`), so no per-call guard is needed here, unlike the teacher's
/// `ForegroundTerminalGuard` which briefly ignored it around a single call.
fn set_terminal_pgrp(fd: libc::c_int, pgid: libc::pid_t) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::tcsetpgrp(fd, pgid) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

fn set_pgid_retrying(pid: libc::pid_t, pgid: libc::pid_t) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::setpgid(pid, pgid) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}
