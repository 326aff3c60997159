use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

use crate::error::ShellError;

/// How a foreground child stopped being foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Exited(i32),
    Signaled(Signal),
    Stopped(Signal),
}

impl WaitOutcome {
    /// Shell status: the exit code, or `128 + signal`.
    pub fn status(self) -> i32 {
        match self {
            WaitOutcome::Exited(code) => code,
            WaitOutcome::Signaled(signal) | WaitOutcome::Stopped(signal) => 128 + signal as i32,
        }
    }
}

/// Block until `pid` exits, dies or stops. Interrupted waits are retried.
pub fn wait_foreground(pid: Pid) -> Result<WaitOutcome, ShellError> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(WaitOutcome::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(WaitOutcome::Signaled(signal)),
            Ok(WaitStatus::Stopped(_, signal)) => return Ok(WaitOutcome::Stopped(signal)),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(err) => return Err(ShellError::Wait(err)),
        }
    }
}
