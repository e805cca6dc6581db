//! Polling strategy: a fixed table of background PIDs.

use super::{Job, Reaper};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 200;

/// Fixed-capacity table of outstanding background PIDs.
///
/// Writes go to a cyclic index. Once the index wraps, a new PID overwrites
/// whatever sits in its slot, even if that PID is still running; the older
/// PID is then no longer tracked and is only collected at shutdown.
#[derive(Debug, Clone)]
pub struct JobTable {
    slots: Vec<Option<Pid>>,
    next: usize,
}

impl JobTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            next: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store `pid` at the write index and advance it.
    ///
    /// Returns the PID that was overwritten, if the slot was occupied.
    pub fn insert(&mut self, pid: Pid) -> Option<Pid> {
        let evicted = self.slots[self.next].replace(pid);
        self.next = (self.next + 1) % self.slots.len();
        evicted
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.pids().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Probe every tracked PID once, in slot order.
    ///
    /// Terminated children are returned and their slots freed. A PID the
    /// probe no longer knows (`ECHILD`) is dropped without a report.
    pub fn sweep<F>(&mut self, mut probe: F) -> Vec<Job>
    where
        F: FnMut(Pid) -> nix::Result<WaitStatus>,
    {
        let mut finished = Vec::new();
        for slot in self.slots.iter_mut() {
            let Some(pid) = *slot else { continue };
            match probe(pid) {
                Ok(WaitStatus::StillAlive) => {}
                Ok(status) => {
                    if let Some(job) = Job::from_wait_status(status) {
                        finished.push(job);
                        *slot = None;
                    }
                }
                Err(Errno::ECHILD) => {
                    debug!(%pid, "background pid already reaped");
                    *slot = None;
                }
                Err(_) => {}
            }
        }
        finished
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// Reaps background children by polling a [`JobTable`].
#[derive(Debug, Default)]
pub struct PollingReaper {
    table: JobTable,
}

impl PollingReaper {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: JobTable::with_capacity(capacity),
        }
    }

    pub fn table(&self) -> &JobTable {
        &self.table
    }
}

impl Reaper for PollingReaper {
    fn track(&mut self, pid: Pid) {
        if let Some(evicted) = self.table.insert(pid) {
            debug!(%evicted, %pid, "job table full, oldest slot overwritten");
        }
    }

    fn collect(&mut self) -> Vec<Job> {
        let jobs = self
            .table
            .sweep(|pid| waitpid(pid, Some(WaitPidFlag::WNOHANG)));
        for job in &jobs {
            debug!(pid = %job.pid, disposition = %job.disposition, "reaped background job");
        }
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Disposition;
    use nix::sys::signal::{kill, Signal};
    use std::process::Command;
    use std::thread;
    use std::time::{Duration, Instant};

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    #[test]
    fn test_insert_and_len() {
        let mut table = JobTable::with_capacity(4);
        assert!(table.is_empty());
        assert_eq!(table.insert(pid(10)), None);
        assert_eq!(table.insert(pid(11)), None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.pids().collect::<Vec<_>>(), vec![pid(10), pid(11)]);
    }

    #[test]
    fn test_wraparound_overwrites_oldest_slot() {
        let mut table = JobTable::with_capacity(3);
        table.insert(pid(1));
        table.insert(pid(2));
        table.insert(pid(3));
        assert_eq!(table.insert(pid(4)), Some(pid(1)));
        assert_eq!(table.len(), 3);
        assert_eq!(table.pids().collect::<Vec<_>>(), vec![pid(4), pid(2), pid(3)]);
    }

    #[test]
    fn test_wraparound_ignores_free_slots() {
        let mut table = JobTable::with_capacity(2);
        table.insert(pid(1));
        table.insert(pid(2));
        // Free slot 1, then write twice: the first write lands on slot 0.
        table.sweep(|p| {
            if p == pid(2) {
                Ok(WaitStatus::Exited(p, 0))
            } else {
                Ok(WaitStatus::StillAlive)
            }
        });
        assert_eq!(table.insert(pid(3)), Some(pid(1)));
        assert_eq!(table.insert(pid(4)), None);
        assert_eq!(table.pids().collect::<Vec<_>>(), vec![pid(3), pid(4)]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let table = JobTable::with_capacity(0);
        assert_eq!(table.capacity(), 1);
    }

    #[test]
    fn test_sweep_reports_once() {
        let mut table = JobTable::with_capacity(4);
        table.insert(pid(5));
        table.insert(pid(6));
        table.insert(pid(7));

        let jobs = table.sweep(|p| match p.as_raw() {
            5 => Ok(WaitStatus::Exited(p, 0)),
            6 => Ok(WaitStatus::StillAlive),
            _ => Ok(WaitStatus::Signaled(p, Signal::SIGTERM, false)),
        });
        assert_eq!(
            jobs,
            vec![
                Job::new(pid(5), Disposition::Exited(0)),
                Job::new(pid(7), Disposition::Signaled(15)),
            ]
        );
        assert_eq!(table.pids().collect::<Vec<_>>(), vec![pid(6)]);

        let jobs = table.sweep(|_| Ok(WaitStatus::StillAlive));
        assert!(jobs.is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sweep_drops_unknown_children() {
        let mut table = JobTable::with_capacity(2);
        table.insert(pid(8));
        let jobs = table.sweep(|_| Err(Errno::ECHILD));
        assert!(jobs.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_sweep_keeps_slot_on_eintr() {
        let mut table = JobTable::with_capacity(2);
        table.insert(pid(9));
        let jobs = table.sweep(|_| Err(Errno::EINTR));
        assert!(jobs.is_empty());
        assert_eq!(table.len(), 1);
    }

    fn collect_until(reaper: &mut PollingReaper, timeout: Duration) -> Vec<Job> {
        let deadline = Instant::now() + timeout;
        loop {
            let jobs = reaper.collect();
            if !jobs.is_empty() || Instant::now() > deadline {
                return jobs;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_polling_reaper_real_child() {
        let child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        let child_pid = Pid::from_raw(child.id() as i32);

        let mut reaper = PollingReaper::new(4);
        reaper.track(child_pid);
        let jobs = collect_until(&mut reaper, Duration::from_secs(5));
        assert_eq!(jobs, vec![Job::new(child_pid, Disposition::Exited(3))]);
        assert!(reaper.table().is_empty());
        assert!(reaper.collect().is_empty());
    }

    #[test]
    fn test_polling_reaper_running_then_killed() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let child_pid = Pid::from_raw(child.id() as i32);

        let mut reaper = PollingReaper::default();
        reaper.track(child_pid);
        assert!(reaper.collect().is_empty());
        assert_eq!(reaper.table().len(), 1);

        kill(child_pid, Signal::SIGKILL).unwrap();
        let jobs = collect_until(&mut reaper, Duration::from_secs(5));
        assert_eq!(jobs, vec![Job::new(child_pid, Disposition::Signaled(9))]);
    }
}
