//! The job table: an in-memory registry of every pipeline the shell
//! currently tracks.
//!
//! Grounded in the teacher's `jobs.rs` (`HashMap<usize, Job>` plus an id
//! counter), generalized to the richer `Job` the spec's data model needs
//! (process-group id, raw pid set, alive count, saved terminal modes) and
//! to smallest-free-id allocation rather than a monotonic counter, since
//! job ids are reused after reaping (J5).

use std::collections::HashMap;

use crate::ast::Pipeline;
use crate::error::{ShellError, ShellResult};
use crate::termstate::TermModes;

/// Mirrors §3/§4.4's four states exactly, including their `jobs` status
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Foreground,
    Background,
    Stopped,
    NeedsTerminal,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Foreground => "Foreground",
            JobStatus::Background => "Running",
            JobStatus::Stopped => "Stopped",
            JobStatus::NeedsTerminal => "Stopped (tty)",
        }
    }
}

/// One pipeline submitted as a unit (§3).
pub struct Job {
    pub id: usize,
    pub pipeline: Pipeline,
    pub pgid: Option<libc::pid_t>,
    pub pids: Vec<libc::pid_t>,
    pub alive: usize,
    pub status: JobStatus,
    pub saved_modes: Option<TermModes>,
    /// Exit code of the last-stage pid, once it has terminated. The
    /// pipeline's own exit status, by the usual shell convention — not
    /// part of the spec's core data model, but needed to feed `$?` back
    /// into the parser's expansion pass between REPL iterations.
    pub last_exit_code: Option<i32>,
}

impl Job {
    fn new(id: usize, pipeline: Pipeline) -> Self {
        Self {
            id,
            pipeline,
            pgid: None,
            pids: Vec::new(),
            alive: 0,
            status: JobStatus::Background,
            last_exit_code: None,
            saved_modes: None,
        }
    }

    /// Record a just-spawned child. The first pid spawned for a job
    /// becomes its pgid (§4.3 step 5).
    pub fn push_pid(&mut self, pid: libc::pid_t) {
        if self.pgid.is_none() {
            self.pgid = Some(pid);
        }
        self.pids.push(pid);
        self.alive += 1;
    }

    pub fn has_pid(&self, pid: libc::pid_t) -> bool {
        self.pids.contains(&pid)
    }

    /// The `jobs` line: `[<id>]\t<status>\t\t(<cmdline>)`, per `cush.c`'s
    /// `print_job`/`print_cmdline`.
    pub fn print_line(&self) -> String {
        format!("[{}]\t{}\t\t({})", self.id, self.status.as_str(), self.pipeline)
    }
}

/// Job table capacity. Mirrors the teacher's array-backed predecessor's
/// size (2^16) — the spec only requires "at least a few thousand".
const MAX_JOBS: usize = 1 << 16;

#[derive(Default)]
pub struct JobTable {
    jobs: HashMap<usize, Job>,
    order: Vec<usize>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the smallest free id >= 1 and register a new job with
    /// alive=0 and no pids yet. Caller assigns `status` before spawning.
    pub fn add(&mut self, pipeline: Pipeline) -> ShellResult<&mut Job> {
        let id = self.smallest_free_id()?;
        self.jobs.insert(id, Job::new(id, pipeline));
        self.order.push(id);
        Ok(self.jobs.get_mut(&id).expect("just inserted"))
    }

    fn smallest_free_id(&self) -> ShellResult<usize> {
        for id in 1..=MAX_JOBS {
            if !self.jobs.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(ShellError::fatal("jsh: job table exhausted"))
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    /// Remove a job. Precondition: `alive == 0`.
    pub fn remove(&mut self, id: usize) -> Option<Job> {
        let job = self.jobs.remove(&id)?;
        debug_assert_eq!(job.alive, 0, "removed a job with live children");
        self.order.retain(|&existing| existing != id);
        Some(job)
    }

    /// Insertion-ordered traversal (§4.1). Only safe against concurrent
    /// mutation when the child-status signal is blocked — callers that
    /// iterate across a wait point must hold a `siggate::BlockGuard`.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(move |id| self.jobs.get(id))
    }

    /// The job owning `pid`, if any (used by the reaper's `apply`).
    pub fn find_by_pid(&mut self, pid: libc::pid_t) -> Option<&mut Job> {
        self.jobs.values_mut().find(|job| job.has_pid(pid))
    }

    /// Two-pass reap sweep (§4.6): collect every alive=0 job, then remove
    /// each. Returns the removed jobs so the caller can decide what (if
    /// anything) to print — only the `jobs` builtin and the reaper's own
    /// notifications print on state *change*; the sweep itself is silent
    /// bookkeeping.
    pub fn reap_terminated(&mut self) -> Vec<Job> {
        let done: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.jobs.get(id).is_some_and(|j| j.alive == 0))
            .collect();

        done.into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_pipeline() -> Pipeline {
        Pipeline {
            commands: vec![crate::ast::CommandSpec {
                argv: vec!["true".to_string()],
                merge_stderr: false,
            }],
            input_redirect: None,
            output_redirect: None,
            append_output: false,
            background: false,
        }
    }

    #[test]
    fn allocates_smallest_free_id() {
        let mut table = JobTable::new();
        let id1 = table.add(dummy_pipeline()).unwrap().id;
        let id2 = table.add(dummy_pipeline()).unwrap().id;
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);

        table.get_mut(1).unwrap().alive = 0;
        table.remove(1);

        let id3 = table.add(dummy_pipeline()).unwrap().id;
        assert_eq!(id3, 1, "freed id 1 should be reused before allocating 3");
    }

    #[test]
    fn push_pid_sets_pgid_from_first_child() {
        let mut table = JobTable::new();
        let job = table.add(dummy_pipeline()).unwrap();
        job.push_pid(100);
        job.push_pid(101);
        assert_eq!(job.pgid, Some(100));
        assert_eq!(job.pids, vec![100, 101]);
        assert_eq!(job.alive, 2);
    }

    #[test]
    fn reap_terminated_removes_only_dead_jobs() {
        let mut table = JobTable::new();
        table.add(dummy_pipeline()).unwrap().push_pid(1);
        let alive_job = table.add(dummy_pipeline()).unwrap();
        alive_job.push_pid(2);
        table.get_mut(1).unwrap().alive = 0;

        let removed = table.reap_terminated();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, 1);
        assert!(table.get(1).is_none());
        assert!(table.get(2).is_some());
    }

    #[test]
    fn iter_is_insertion_ordered() {
        let mut table = JobTable::new();
        table.add(dummy_pipeline()).unwrap();
        table.add(dummy_pipeline()).unwrap();
        table.get_mut(1).unwrap().alive = 0;
        table.remove(1);
        table.add(dummy_pipeline()).unwrap();

        let ids: Vec<usize> = table.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn find_by_pid_locates_owning_job() {
        let mut table = JobTable::new();
        table.add(dummy_pipeline()).unwrap().push_pid(42);
        table.add(dummy_pipeline()).unwrap().push_pid(43);

        assert_eq!(table.find_by_pid(43).unwrap().id, 2);
        assert!(table.find_by_pid(999).is_none());
    }
}
