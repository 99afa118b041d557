//! Signal gate: install a handler for child-status changes, and block/
//! unblock it atomically around the critical sections that must not race
//! the handler (§5).
//!
//! Grounded in `cush.c`'s `signal_support.c` (`sigaction`+`SA_RESTART` for
//! the handler, `sigprocmask` for block/unblock) and the teacher's
//! `SignalIgnoreGuard`, generalized from "ignore one signal for one call"
//! to "install a real handler and query/toggle its block state".

use std::io;

pub fn set_handler(signo: libc::c_int, handler: extern "C" fn(libc::c_int)) -> io::Result<()> {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = handler as usize;
        libc::sigemptyset(&mut sa.sa_mask);
        sa.sa_flags = libc::SA_RESTART;
        if libc::sigaction(signo, &sa, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

pub fn block(signo: libc::c_int) -> io::Result<()> {
    set_mask(libc::SIG_BLOCK, signo)
}

pub fn unblock(signo: libc::c_int) -> io::Result<()> {
    set_mask(libc::SIG_UNBLOCK, signo)
}

pub fn is_blocked(signo: libc::c_int) -> bool {
    unsafe {
        let mut current: libc::sigset_t = std::mem::zeroed();
        if libc::sigprocmask(0, std::ptr::null(), &mut current) != 0 {
            return false;
        }
        libc::sigismember(&current, signo) == 1
    }
}

fn set_mask(how: libc::c_int, signo: libc::c_int) -> io::Result<()> {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, signo);
        if libc::sigprocmask(how, &set, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// RAII guard: blocks `signo` on construction, unblocks on drop. Used
/// around foreground waits and reap sweeps (§5's critical sections).
pub struct BlockGuard {
    signo: libc::c_int,
}

impl BlockGuard {
    pub fn new(signo: libc::c_int) -> io::Result<Self> {
        block(signo)?;
        Ok(Self { signo })
    }
}

impl Drop for BlockGuard {
    fn drop(&mut self) {
        let _ = unblock(self.signo);
    }
}
