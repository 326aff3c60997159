//! Job registry: background and stopped processes the shell is tracking.
//!
//! The table is only touched from the main control flow. Signal handlers
//! see nothing but the foreground marker in [`signals`].

/// Foreground marker and signal forwarding.
pub mod signals;
/// Blocking waits on foreground children.
pub mod wait;

pub use signals::ForegroundGuard;
pub use wait::{WaitOutcome, wait_foreground};

use std::fmt;

use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => f.write_str("Running"),
            JobStatus::Stopped => f.write_str("Stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: usize,
    pub pid: Pid,
    /// Display form of the command line that started the job.
    pub command: String,
    pub status: JobStatus,
}

/// Registered jobs. Ids are handed out from a counter and never reused
/// within a session.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a job and return its id.
    pub fn add(&mut self, pid: Pid, command: &str, status: JobStatus) -> usize {
        let job_id = self.next_id;
        self.next_id += 1;
        log::info!("job [{job_id}] pid {pid} registered as {status}: {command}");
        self.jobs.push(Job {
            job_id,
            pid,
            command: command.to_string(),
            status,
        });
        job_id
    }

    /// Snapshot ordered by command text.
    pub fn list(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self.jobs.iter().collect();
        jobs.sort_by(|a, b| a.command.cmp(&b.command).then(a.job_id.cmp(&b.job_id)));
        jobs
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.pid == pid)
    }

    pub fn find_by_id(&self, job_id: usize) -> Option<&Job> {
        self.jobs.iter().find(|j| j.job_id == job_id)
    }

    pub fn remove_by_pid(&mut self, pid: Pid) -> Option<Job> {
        let index = self.jobs.iter().position(|j| j.pid == pid)?;
        Some(self.jobs.remove(index))
    }

    /// Update a job's status. Returns false if no job has that pid.
    pub fn set_status(&mut self, pid: Pid, status: JobStatus) -> bool {
        match self.jobs.iter_mut().find(|j| j.pid == pid) {
            Some(job) => {
                job.status = status;
                true
            }
            None => false,
        }
    }

    /// The most recently registered job still in the table.
    pub fn most_recent(&self) -> Option<&Job> {
        self.jobs.iter().max_by_key(|j| j.job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Non-blocking pass over every job.
    ///
    /// Finished jobs are removed and described in the returned notices;
    /// stopped or resumed jobs have their status updated in place. A job
    /// whose pid can no longer be waited on is dropped silently.
    pub fn reap(&mut self) -> Vec<String> {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        let mut notices = Vec::new();

        self.jobs.retain_mut(|job| match waitpid(job.pid, Some(flags)) {
            Ok(WaitStatus::Exited(_, code)) => {
                let how = if code == 0 {
                    "exited normally"
                } else {
                    "exited abnormally"
                };
                log::info!("job [{}] pid {} exited with {code}", job.job_id, job.pid);
                notices.push(format!("{} with pid {} {how}", job.command, job.pid));
                false
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                log::info!("job [{}] pid {} killed by {signal}", job.job_id, job.pid);
                notices.push(format!(
                    "{} with pid {} was killed by signal {}",
                    job.command, job.pid, signal as i32
                ));
                false
            }
            Ok(WaitStatus::Stopped(..)) => {
                job.status = JobStatus::Stopped;
                true
            }
            Ok(WaitStatus::Continued(_)) => {
                job.status = JobStatus::Running;
                true
            }
            Ok(_) => true,
            Err(err) => {
                log::warn!("job [{}] pid {} vanished: {err}", job.job_id, job.pid);
                false
            }
        });

        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    #[test]
    fn ids_are_fresh() {
        let mut table = JobTable::new();
        let a = table.add(pid(100), "sleep 1", JobStatus::Running);
        let b = table.add(pid(101), "sleep 2", JobStatus::Running);
        table.remove_by_pid(pid(101));
        let c = table.add(pid(102), "sleep 3", JobStatus::Running);
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn list_sorted_by_command() {
        let mut table = JobTable::new();
        table.add(pid(1), "vim notes", JobStatus::Stopped);
        table.add(pid(2), "cat", JobStatus::Running);
        table.add(pid(3), "make", JobStatus::Running);
        let commands: Vec<_> = table.list().iter().map(|j| j.command.as_str()).collect();
        assert_eq!(commands, vec!["cat", "make", "vim notes"]);
    }

    #[test]
    fn lookups() {
        let mut table = JobTable::new();
        let id = table.add(pid(42), "top", JobStatus::Stopped);
        assert_eq!(table.find_by_pid(pid(42)).map(|j| j.job_id), Some(id));
        assert_eq!(table.find_by_id(id).map(|j| j.pid), Some(pid(42)));
        assert!(table.find_by_id(id + 1).is_none());
        assert!(table.set_status(pid(42), JobStatus::Running));
        assert_eq!(table.find_by_id(id).unwrap().status, JobStatus::Running);
        assert!(table.remove_by_pid(pid(42)).is_some());
        assert!(table.is_empty());
        assert!(!table.set_status(pid(42), JobStatus::Stopped));
    }

    #[test]
    fn most_recent_is_highest_id() {
        let mut table = JobTable::new();
        table.add(pid(1), "b", JobStatus::Running);
        table.add(pid(2), "a", JobStatus::Running);
        assert_eq!(table.most_recent().map(|j| j.pid), Some(pid(2)));
    }

    #[test]
    fn status_display() {
        assert_eq!(JobStatus::Running.to_string(), "Running");
        assert_eq!(JobStatus::Stopped.to_string(), "Stopped");
    }
}
