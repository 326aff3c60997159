//! Descriptor plumbing for redirections.

use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use nix::fcntl::{FcntlArg, fcntl};
use nix::unistd::dup2;

use crate::error::ShellError;
use crate::parse::{Command, open_input, open_output};

pub const STDIN: RawFd = libc::STDIN_FILENO;
pub const STDOUT: RawFd = libc::STDOUT_FILENO;

/// Redirects the shell's own stdin/stdout while an in-process builtin
/// runs, and puts the originals back when dropped.
///
/// Saved copies are close-on-exec so children started by the builtin
/// never inherit them.
#[derive(Debug, Default)]
pub struct StdioGuard {
    saved: Vec<(RawFd, OwnedFd)>,
}

impl StdioGuard {
    pub fn for_command(command: &Command) -> Result<Self, ShellError> {
        let mut guard = StdioGuard::default();
        if let Some(path) = &command.input_file {
            let file = open_input(path)?;
            guard.replace(STDIN, file.as_raw_fd())?;
        }
        if let Some(path) = &command.output_file {
            let file = open_output(path, command.append)?;
            let _ = io::stdout().flush();
            guard.replace(STDOUT, file.as_raw_fd())?;
        }
        Ok(guard)
    }

    fn replace(&mut self, target: RawFd, source: RawFd) -> Result<(), ShellError> {
        let copy = fcntl(target, FcntlArg::F_DUPFD_CLOEXEC(0)).map_err(ShellError::Redirect)?;
        // SAFETY: fcntl just returned a fresh descriptor nobody else owns.
        let copy = unsafe { OwnedFd::from_raw_fd(copy) };
        self.saved.push((target, copy));
        dup2(source, target).map_err(ShellError::Redirect)?;
        Ok(())
    }
}

impl Drop for StdioGuard {
    fn drop(&mut self) {
        if self.saved.is_empty() {
            return;
        }
        let _ = io::stdout().flush();
        while let Some((target, copy)) = self.saved.pop() {
            if let Err(err) = dup2(copy.as_raw_fd(), target) {
                log::warn!("failed to restore fd {target}: {err}");
            }
        }
    }
}

/// Point the child's stdin/stdout at the given descriptors.
/// Only call in a forked child; the caller still owns and closes `input`
/// and `output`.
pub fn redirect_child(input: Option<RawFd>, output: Option<RawFd>) -> nix::Result<()> {
    if let Some(fd) = input
        && fd != STDIN
    {
        dup2(fd, STDIN)?;
    }
    if let Some(fd) = output
        && fd != STDOUT
    {
        dup2(fd, STDOUT)?;
    }
    Ok(())
}
