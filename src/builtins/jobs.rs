use std::io::{self, Write};
use std::str::FromStr;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use super::{Builtin, fail};
use crate::error::{STATUS_FAILURE, STATUS_SYNTAX};
use crate::jobs::{ForegroundGuard, Job, JobStatus, wait_foreground};
use crate::shell::Shell;

/// Resolve an optional `ID` / `%ID` argument to a job, defaulting to the
/// most recently registered one.
fn select_job(shell: &Shell, name: &str, arg: Option<&String>) -> Result<Job, i32> {
    let job = match arg {
        None => shell.jobs().most_recent(),
        Some(spec) => spec
            .trim_start_matches('%')
            .parse::<usize>()
            .ok()
            .and_then(|id| shell.jobs().find_by_id(id)),
    };
    match (job, arg) {
        (Some(job), _) => Ok(job.clone()),
        (None, Some(spec)) => Err(fail(name, format!("{spec}: no such job"), STATUS_FAILURE)),
        (None, None) => Err(fail(name, "current: no such job", STATUS_FAILURE)),
    }
}

/// Parse `-9`, `-KILL` or `-SIGKILL`.
fn parse_signal(spec: &str) -> Option<Signal> {
    if let Ok(number) = spec.parse::<i32>() {
        return Signal::try_from(number).ok();
    }
    let upper = spec.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    Signal::from_str(&name).ok()
}

/// `jobs`
pub struct Jobs;

impl Builtin for Jobs {
    fn name(&self) -> &'static str {
        "jobs"
    }

    fn description(&self) -> &'static str {
        "List background jobs"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() > 1 {
            return fail("jobs", "too many arguments", STATUS_FAILURE);
        }
        let mut out = io::stdout().lock();
        for job in shell.jobs().list() {
            let _ = writeln!(
                out,
                "[{}] {} {}: {}",
                job.job_id, job.pid, job.command, job.status
            );
        }
        0
    }
}

/// `fg [ID]`
pub struct Fg;

impl Builtin for Fg {
    fn name(&self) -> &'static str {
        "fg"
    }

    fn description(&self) -> &'static str {
        "Move a job to the foreground"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() > 2 {
            return fail("fg", "too many arguments", STATUS_FAILURE);
        }
        let job = match select_job(shell, "fg", argv.get(1)) {
            Ok(job) => job,
            Err(status) => return status,
        };

        let _ = writeln!(io::stdout(), "{}", job.command);
        let _ = io::stdout().flush();
        shell.jobs.remove_by_pid(job.pid);
        log::info!("job [{}] pid {} to foreground", job.job_id, job.pid);

        let outcome = {
            let _foreground = ForegroundGuard::set(job.pid);
            if job.status == JobStatus::Stopped
                && let Err(err) = kill(job.pid, Signal::SIGCONT)
            {
                let message = match err {
                    Errno::ESRCH => "job has terminated".to_string(),
                    other => other.to_string(),
                };
                return fail("fg", message, STATUS_FAILURE);
            }
            wait_foreground(job.pid)
        };

        match outcome {
            Ok(outcome) => shell.settle_foreground(job.pid, &job.command, outcome),
            Err(err) => fail("fg", err, STATUS_FAILURE),
        }
    }
}

/// `bg [ID]`
pub struct Bg;

impl Builtin for Bg {
    fn name(&self) -> &'static str {
        "bg"
    }

    fn description(&self) -> &'static str {
        "Resume a stopped job in the background"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() > 2 {
            return fail("bg", "too many arguments", STATUS_FAILURE);
        }
        let job = match select_job(shell, "bg", argv.get(1)) {
            Ok(job) => job,
            Err(status) => return status,
        };

        if job.status == JobStatus::Running {
            eprintln!("bg: job {} already in background", job.job_id);
            return 0;
        }
        if let Err(err) = kill(job.pid, Signal::SIGCONT) {
            if err == Errno::ESRCH {
                shell.jobs.remove_by_pid(job.pid);
                return fail("bg", "job has terminated", STATUS_FAILURE);
            }
            return fail("bg", err, STATUS_FAILURE);
        }

        shell.jobs.set_status(job.pid, JobStatus::Running);
        log::info!("job [{}] pid {} resumed in background", job.job_id, job.pid);
        let _ = writeln!(io::stdout(), "[{}] {} &", job.job_id, job.command);
        0
    }
}

/// `kill [-SIG] PID|%ID...`
pub struct Kill;

impl Builtin for Kill {
    fn name(&self) -> &'static str {
        "kill"
    }

    fn description(&self) -> &'static str {
        "Send a signal to a process or job"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        let mut args = &argv[1.min(argv.len())..];
        let mut signal = Signal::SIGTERM;

        if let Some(spec) = args.first().and_then(|a| a.strip_prefix('-')) {
            match parse_signal(spec) {
                Some(sig) => signal = sig,
                None => {
                    return fail(
                        "kill",
                        format!("-{spec}: invalid signal specification"),
                        STATUS_FAILURE,
                    );
                }
            }
            args = &args[1..];
        }
        if args.is_empty() {
            return fail("kill", "usage: kill [-SIG] PID|%ID...", STATUS_SYNTAX);
        }

        let mut status = 0;
        for target in args {
            let pid = match target.strip_prefix('%') {
                Some(id) => id
                    .parse::<usize>()
                    .ok()
                    .and_then(|id| shell.jobs().find_by_id(id))
                    .map(|job| job.pid),
                None => target.parse::<i32>().ok().map(Pid::from_raw),
            };
            let Some(pid) = pid else {
                status = fail("kill", format!("{target}: no such process or job"), STATUS_FAILURE);
                continue;
            };
            match kill(pid, signal) {
                Ok(()) => log::info!("sent {signal} to {pid}"),
                Err(err) => status = fail("kill", format!("({pid}) - {err}"), STATUS_FAILURE),
            }
        }
        status
    }
}

/// `ping PID SIGNAL`: numeric signal, taken modulo 32; 0 sends nothing.
pub struct Ping;

impl Builtin for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn description(&self) -> &'static str {
        "Send a numbered signal to a process"
    }

    fn run(&self, _shell: &mut Shell, argv: &[String]) -> i32 {
        let [_, pid, number] = argv else {
            return fail("ping", "usage: ping PID SIGNAL", STATUS_FAILURE);
        };
        // pids <= 0 address process groups, including our own
        let (Some(pid), Ok(number)) = (
            pid.parse::<i32>().ok().filter(|p| *p > 0),
            number.parse::<i32>(),
        ) else {
            return fail("ping", "invalid signal or process", STATUS_FAILURE);
        };
        let number = number.rem_euclid(32);
        let signal = match number {
            0 => None,
            n => match Signal::try_from(n) {
                Ok(signal) => Some(signal),
                Err(_) => return fail("ping", "invalid signal or process", STATUS_FAILURE),
            },
        };

        let pid = Pid::from_raw(pid);
        match kill(pid, signal) {
            Ok(()) => {
                log::info!("ping: sent {number} to {pid}");
                let _ = writeln!(
                    io::stdout(),
                    "Sent signal {number} to process with pid {pid}"
                );
                0
            }
            Err(Errno::ESRCH) => fail("ping", format!("({pid}) - No such process"), STATUS_FAILURE),
            Err(_) => fail("ping", "invalid signal or process", STATUS_FAILURE),
        }
    }
}
