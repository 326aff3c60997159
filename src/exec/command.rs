use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::rc::Rc;

use nix::unistd::{ForkResult, Pid, fork};

use super::process::{ExecImage, child_exit};
use super::redirect::{StdioGuard, redirect_child};
use crate::builtins::Builtin;
use crate::error::{STATUS_FAILURE, ShellError};
use crate::jobs::signals::reset_child_signals;
use crate::jobs::{ForegroundGuard, JobStatus, WaitOutcome, wait_foreground};
use crate::parse::{Command, open_input, open_output};
use crate::shell::Shell;

impl Shell {
    /// Run one command in the foreground.
    pub(crate) fn run_command(&mut self, command: &Command) -> Result<i32, ShellError> {
        if let Some((name, value)) = command.assignment() {
            log::debug!("assign {name}");
            self.vars.set(name, value);
            return Ok(0);
        }

        let builtins = Rc::clone(&self.builtins);
        if let Some(builtin) = builtins.get(command.name()) {
            return self.run_builtin(builtin, command);
        }

        self.run_external(command)
    }

    /// Builtins run in the shell process with fds 0/1 temporarily swapped.
    fn run_builtin(&mut self, builtin: &dyn Builtin, command: &Command) -> Result<i32, ShellError> {
        log::debug!("builtin: {}", command.display());
        let _stdio = StdioGuard::for_command(command)?;
        let status = builtin.run(self, &command.argv);
        let _ = io::stdout().flush();
        Ok(status)
    }

    fn run_external(&mut self, command: &Command) -> Result<i32, ShellError> {
        let image = self.exec_image(&command.argv)?;
        let input = command.input_file.as_deref().map(open_input).transpose()?;
        let output = command
            .output_file
            .as_deref()
            .map(|path| open_output(path, command.append))
            .transpose()?;
        let _ = io::stdout().flush();

        // SAFETY: the child only adjusts signals and descriptors before
        // exec or _exit.
        match unsafe { fork() }.map_err(ShellError::Fork)? {
            ForkResult::Child => {
                reset_child_signals();
                let redirected = redirect_child(
                    input.as_ref().map(|f| f.as_raw_fd()),
                    output.as_ref().map(|f| f.as_raw_fd()),
                );
                drop(input);
                drop(output);
                if redirected.is_err() {
                    child_exit(STATUS_FAILURE);
                }
                image.exec()
            }
            ForkResult::Parent { child } => {
                drop(input);
                drop(output);
                log::debug!("forked {child} for {}", command.display());
                let outcome = {
                    let _foreground = ForegroundGuard::set(child);
                    wait_foreground(child)?
                };
                Ok(self.settle_foreground(child, &command.display(), outcome))
            }
        }
    }

    pub(crate) fn exec_image(&self, argv: &[String]) -> Result<ExecImage, ShellError> {
        let search_path = self.vars.get("PATH");
        ExecImage::new(argv, &self.vars.environment(), search_path.as_deref())
    }

    /// Turn a foreground wait result into a status, registering the
    /// process as a stopped job if it was suspended.
    pub(crate) fn settle_foreground(&mut self, pid: Pid, display: &str, outcome: WaitOutcome) -> i32 {
        log::debug!("{pid} finished foreground wait: {outcome:?}");
        if let WaitOutcome::Stopped(_) = outcome {
            let job_id = self.jobs.add(pid, display, JobStatus::Stopped);
            let _ = writeln!(io::stdout(), "\n[{job_id}] Stopped {display}");
        }
        outcome.status()
    }
}
