use std::io::{self, Write};
use std::mem;
use std::os::fd::{AsRawFd, OwnedFd};
use std::rc::Rc;

use nix::fcntl::OFlag;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, fork, pipe2};

use super::process::{ExecImage, child_exit};
use super::redirect::redirect_child;
use crate::builtins::Builtin;
use crate::error::{STATUS_FAILURE, ShellError};
use crate::jobs::signals::reset_child_signals;
use crate::jobs::{ForegroundGuard, wait_foreground};
use crate::parse::{Pipeline, open_input, open_output};
use crate::shell::Shell;

/// Combine per-stage statuses into the pipeline's status.
///
/// With `pipefail` the rightmost non-zero status wins (0 when every stage
/// succeeded); without it only the last stage counts.
pub fn pipeline_status(statuses: &[i32], pipefail: bool) -> i32 {
    if pipefail {
        statuses.iter().rev().copied().find(|s| *s != 0).unwrap_or(0)
    } else {
        statuses.last().copied().unwrap_or(0)
    }
}

/// What a pipeline stage runs once forked.
enum Stage<'a> {
    /// `NAME=value` in a pipeline only affects its own subprocess.
    Assignment,
    Builtin(&'a dyn Builtin),
    External(ExecImage),
}

impl Shell {
    pub(crate) fn run_pipeline(&mut self, pipeline: &Pipeline) -> Result<i32, ShellError> {
        let count = pipeline.len();
        let (Some(first), Some(last)) = (pipeline.commands.first(), pipeline.commands.last())
        else {
            return Err(ShellError::EmptyCommand);
        };

        let builtins = Rc::clone(&self.builtins);
        let stages = pipeline
            .commands
            .iter()
            .map(|command| {
                if command.assignment().is_some() {
                    Ok(Stage::Assignment)
                } else if let Some(builtin) = builtins.get(command.name()) {
                    Ok(Stage::Builtin(builtin))
                } else {
                    self.exec_image(&command.argv).map(Stage::External)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut input = first.input_file.as_deref().map(open_input).transpose()?;
        let mut output = last
            .output_file
            .as_deref()
            .map(|path| open_output(path, last.append))
            .transpose()?;

        // (read end, write end) between stage i and i + 1
        let mut pipes: Vec<(OwnedFd, OwnedFd)> = (1..count)
            .map(|_| pipe2(OFlag::O_CLOEXEC))
            .collect::<Result<_, _>>()
            .map_err(ShellError::Pipe)?;
        log::debug!("pipeline of {count} stages, {} pipes", pipes.len());

        let _ = io::stdout().flush();
        let mut pids: Vec<Pid> = Vec::with_capacity(count);

        for (index, (stage, command)) in stages.iter().zip(&pipeline.commands).enumerate() {
            // SAFETY: children only rewire descriptors before exec or _exit.
            match unsafe { fork() } {
                Err(err) => {
                    abort_stages(&pids);
                    return Err(ShellError::Fork(err));
                }
                Ok(ForkResult::Child) => {
                    reset_child_signals();
                    let stdin = if index == 0 {
                        input.as_ref().map(|f| f.as_raw_fd())
                    } else {
                        Some(pipes[index - 1].0.as_raw_fd())
                    };
                    let stdout = if index == count - 1 {
                        output.as_ref().map(|f| f.as_raw_fd())
                    } else {
                        Some(pipes[index].1.as_raw_fd())
                    };
                    let redirected = redirect_child(stdin, stdout);
                    drop(mem::take(&mut pipes));
                    drop(input.take());
                    drop(output.take());
                    if redirected.is_err() {
                        child_exit(STATUS_FAILURE);
                    }

                    let status = match stage {
                        Stage::Assignment => 0,
                        Stage::Builtin(builtin) => builtin.run(self, &command.argv),
                        Stage::External(image) => image.exec(),
                    };
                    child_exit(status)
                }
                Ok(ForkResult::Parent { child }) => {
                    log::debug!("stage {index} forked as {child}: {}", command.display());
                    pids.push(child);
                }
            }
        }

        drop(pipes);
        drop(input);
        drop(output);

        let Some(&last_pid) = pids.last() else {
            return Err(ShellError::EmptyCommand);
        };
        let _foreground = ForegroundGuard::set(last_pid);
        let mut statuses = Vec::with_capacity(count);
        for (pid, command) in pids.iter().zip(&pipeline.commands) {
            let status = match wait_foreground(*pid) {
                Ok(outcome) => self.settle_foreground(*pid, &command.display(), outcome),
                Err(err) => {
                    log::warn!("lost pipeline stage {pid}: {err}");
                    STATUS_FAILURE
                }
            };
            statuses.push(status);
        }

        Ok(pipeline_status(&statuses, self.config.settings.pipefail))
    }
}

/// Terminate and reap stages that started before a later fork failed.
fn abort_stages(pids: &[Pid]) {
    for pid in pids {
        let _ = kill(*pid, Signal::SIGTERM);
        let _ = waitpid(*pid, None);
    }
}
