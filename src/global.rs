//! A cell that lets the real `SIGCHLD` handler and the main REPL flow
//! share one `JobTable`/`TermState` without locks.
//!
//! This is option (a) from the spec's signal-handler design note: the
//! same block/unblock discipline around foreground waits and reap sweeps
//! that the main flow already has to follow is what makes touching this
//! cell from the handler safe. `UnsafeCell` instead of a `Mutex` because a
//! mutex the handler might need to lock while interrupting a critical
//! section is itself a deadlock hazard inside a signal handler; the
//! teacher's own `job_control.rs` uses the equivalent discipline (raw
//! libc calls, no lock) for the same reason.
//!
//! # Safety
//!
//! Callers must only dereference the contents while the child-status
//! signal is blocked (see [`crate::siggate::BlockGuard`]), *or* from
//! inside the handler itself (which runs with the signal it was invoked
//! for already blocked by the kernel). [`GlobalCell::get`] does not check
//! this — it is a bare escape hatch, not a safe API.

use std::cell::UnsafeCell;

pub struct GlobalCell<T> {
    inner: UnsafeCell<Option<T>>,
}

unsafe impl<T> Sync for GlobalCell<T> {}

impl<T> GlobalCell<T> {
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(None),
        }
    }

    /// Install the value. Must be called exactly once, before the signal
    /// handler that reads this cell is installed.
    pub fn set(&self, value: T) {
        unsafe {
            *self.inner.get() = Some(value);
        }
    }

    /// Borrow the value mutably. See the module-level safety note.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get(&self) -> &mut T {
        unsafe {
            (*self.inner.get())
                .as_mut()
                .expect("GlobalCell accessed before set()")
        }
    }
}
