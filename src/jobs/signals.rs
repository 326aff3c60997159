//! Foreground marker shared with the signal handlers.
//!
//! The marker is an `AtomicI32` holding the foreground pid, or 0 when the
//! shell itself is in the foreground. Handlers only load it and call
//! `kill`/`write`.

use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::unistd::Pid;

static FOREGROUND_PID: AtomicI32 = AtomicI32::new(0);

/// The pid currently receiving forwarded signals, if any.
pub fn foreground_pid() -> Option<Pid> {
    match FOREGROUND_PID.load(Ordering::SeqCst) {
        0 => None,
        pid => Some(Pid::from_raw(pid)),
    }
}

/// Marks a pid as foreground for as long as the guard lives.
#[must_use = "the marker is cleared when the guard is dropped"]
pub struct ForegroundGuard(());

impl ForegroundGuard {
    pub fn set(pid: Pid) -> Self {
        FOREGROUND_PID.store(pid.as_raw(), Ordering::SeqCst);
        ForegroundGuard(())
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        FOREGROUND_PID.store(0, Ordering::SeqCst);
    }
}

extern "C" fn forward_to_foreground(signum: libc::c_int) {
    let pid = FOREGROUND_PID.load(Ordering::SeqCst);
    if pid > 0 {
        // SAFETY: kill(2) is async-signal-safe.
        unsafe {
            libc::kill(pid, signum);
        }
    } else {
        // SAFETY: write(2) is async-signal-safe and the buffer is static.
        unsafe {
            libc::write(libc::STDOUT_FILENO, b"\n".as_ptr().cast(), 1);
        }
    }
}

/// Install the interactive shell's handlers: Ctrl+C and Ctrl+Z are
/// forwarded to the foreground child, Ctrl+\ is ignored.
pub fn install_handlers() -> nix::Result<()> {
    let forward = SigAction::new(
        SigHandler::Handler(forward_to_foreground),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());

    // SAFETY: the handler only touches an atomic and async-signal-safe calls.
    unsafe {
        sigaction(Signal::SIGINT, &forward)?;
        sigaction(Signal::SIGTSTP, &forward)?;
        sigaction(Signal::SIGQUIT, &ignore)?;
    }
    log::debug!("signal handlers installed");
    Ok(())
}

/// Restore default dispositions in a freshly forked child.
pub fn reset_child_signals() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGQUIT] {
        // SAFETY: installing SIG_DFL has no handler invariants to uphold.
        let _ = unsafe { sigaction(signal, &default) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_sets_and_clears_marker() {
        assert_eq!(foreground_pid(), None);
        {
            let _guard = ForegroundGuard::set(Pid::from_raw(4242));
            assert_eq!(foreground_pid(), Some(Pid::from_raw(4242)));
        }
        assert_eq!(foreground_pid(), None);
    }
}
