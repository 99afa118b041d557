//! The shell's single piece of global state: the job table and the
//! terminal-state manager, reachable from both the main flow and the
//! `SIGCHLD` handler via [`GlobalCell`].

use crate::global::GlobalCell;
use crate::jobs::JobTable;
use crate::termstate::TermState;

pub struct Shared {
    pub jobs: JobTable,
    pub term: TermState,
}

static SHARED: GlobalCell<Shared> = GlobalCell::new();

pub fn init(term: TermState) {
    SHARED.set(Shared {
        jobs: JobTable::new(),
        term,
    });
}

/// Borrow the shared state. See [`GlobalCell`]'s safety note: only valid
/// while `SIGCHLD` is blocked, or from inside its handler.
pub fn shared() -> &'static mut Shared {
    unsafe { SHARED.get() }
}
