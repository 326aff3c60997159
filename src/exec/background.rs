use std::fs::File;
use std::io::{self, Write};
use std::os::fd::AsRawFd;

use nix::unistd::{ForkResult, Pid, fork, setpgid};

use super::process::{ExecImage, child_exit};
use super::redirect::redirect_child;
use crate::error::{STATUS_FAILURE, ShellError};
use crate::jobs::JobStatus;
use crate::jobs::signals::reset_child_signals;
use crate::parse::{Command, Token, build_command, open_input, open_output, render_tokens};
use crate::shell::Shell;

/// How a backgrounded segment is launched.
enum Launch {
    /// One external program: exec it directly so the job pid is the
    /// program itself.
    Exec(Command, ExecImage),
    /// Anything else runs in a forked copy of the shell.
    Subshell,
}

impl Shell {
    /// Start `tokens` without waiting and register it as a running job.
    /// Returns the job id.
    pub(crate) fn run_background(&mut self, tokens: &[Token]) -> Option<usize> {
        match self.spawn_background(tokens) {
            Ok(job_id) => Some(job_id),
            Err(err) => {
                let status = self.report(err);
                self.vars.set_last_status(status);
                None
            }
        }
    }

    fn spawn_background(&mut self, tokens: &[Token]) -> Result<usize, ShellError> {
        let display = render_tokens(tokens);
        let launch = self.plan_background(tokens)?;

        let (input, output) = match &launch {
            Launch::Exec(command, _) => (
                command.input_file.as_deref().map(open_input).transpose()?,
                command
                    .output_file
                    .as_deref()
                    .map(|path| open_output(path, command.append))
                    .transpose()?,
            ),
            Launch::Subshell => (None, None),
        };
        let input = match input {
            Some(file) => file,
            None => open_input("/dev/null")?,
        };
        let _ = io::stdout().flush();

        // SAFETY: the child rewires descriptors and then execs, or runs the
        // segment in this single-threaded shell image and _exits.
        match unsafe { fork() }.map_err(ShellError::Fork)? {
            ForkResult::Child => {
                let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
                reset_child_signals();
                let redirected = redirect_child(
                    Some(input.as_raw_fd()),
                    output.as_ref().map(File::as_raw_fd),
                );
                drop(input);
                drop(output);
                if redirected.is_err() {
                    child_exit(STATUS_FAILURE);
                }
                match launch {
                    Launch::Exec(_, image) => image.exec(),
                    Launch::Subshell => {
                        self.set_interactive(false);
                        let status = self.execute_and_or(tokens);
                        child_exit(status)
                    }
                }
            }
            ForkResult::Parent { child } => {
                drop(input);
                drop(output);
                // Also set from the parent so the group exists before any
                // later signal is sent to it.
                let _ = setpgid(child, child);
                let job_id = self.jobs.add(child, &display, JobStatus::Running);
                self.vars.set_last_background_pid(child.as_raw());
                let _ = writeln!(io::stdout(), "[{job_id}] {child}");
                Ok(job_id)
            }
        }
    }

    fn plan_background(&self, tokens: &[Token]) -> Result<Launch, ShellError> {
        if tokens.iter().any(|t| t.kind.is_operator()) {
            return Ok(Launch::Subshell);
        }
        let command = build_command(tokens)?;
        if command.assignment().is_some() || self.builtins.get(command.name()).is_some() {
            return Ok(Launch::Subshell);
        }
        let image = self.exec_image(&command.argv)?;
        Ok(Launch::Exec(command, image))
    }
}
