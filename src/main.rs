//! jobsh: interactive Unix command shell.
//!
//! Usage: `jobsh [--dump-config] [--no-rc] [-c COMMAND] [SCRIPT [ARGS...]]`
//!
//! Without `-c` or `SCRIPT`, lines are read from stdin until EOF or `exit`.
//! A prompt is printed only when stdin is a terminal.

use std::io::{self, BufRead, Write};
use std::path::Path;

use jobsh::Shell;
use jobsh::config::Config;
use jobsh::jobs::signals;

// ─── Arguments ───────────────────────────────────────

#[derive(Debug, Default)]
struct Args {
    dump_config: bool,
    no_rc: bool,
    command: Option<String>,
    script: Option<String>,
    script_args: Vec<String>,
}

fn usage() -> ! {
    eprintln!("usage: jobsh [--dump-config] [--no-rc] [-c COMMAND] [SCRIPT [ARGS...]]");
    std::process::exit(2);
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> Args {
    let mut args = Args::default();
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--dump-config" => args.dump_config = true,
            "--no-rc" => args.no_rc = true,
            "-c" => match argv.next() {
                Some(command) => args.command = Some(command),
                None => usage(),
            },
            "-h" | "--help" => usage(),
            flag if flag.starts_with('-') && flag.len() > 1 => {
                eprintln!("jobsh: unknown option {flag}");
                usage();
            }
            _ => {
                args.script = Some(arg);
                args.script_args = argv.by_ref().collect();
                break;
            }
        }
    }
    args
}

fn stdin_is_terminal() -> bool {
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

// ─── Session ─────────────────────────────────────────

fn source_rc(shell: &mut Shell) {
    let path = shell.config().rc_path();
    if !path.is_file() {
        return;
    }
    if let Err(e) = shell.source_file(&path) {
        eprintln!("jobsh: {}: {e}", path.display());
    }
}

/// Read-eval-print until EOF or `exit`.
fn repl(shell: &mut Shell) {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        shell.reap_jobs();
        if shell.is_interactive() {
            print!("{}", shell.prompt());
            let _ = io::stdout().flush();
        }

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                if shell.is_interactive() {
                    println!("exit");
                }
                break;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("jobsh: read error: {e}");
                break;
            }
        }

        if !line.trim().is_empty() {
            shell.run_line(line.trim_end_matches(['\n', '\r']));
        }
        if shell.exit_request().is_some() {
            break;
        }
    }
}

// ─── Entry point ─────────────────────────────────────

fn main() {
    let args = parse_args(std::env::args().skip(1));
    let config = Config::load();

    if args.dump_config {
        match config.to_toml() {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("jobsh: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    jobsh::logging::init(config.log_level_filter());
    let no_rc = args.no_rc;
    let mut shell = Shell::from_environment(config);

    let interactive = args.command.is_none() && args.script.is_none() && stdin_is_terminal();
    shell.set_interactive(interactive);
    if interactive && let Err(e) = signals::install_handlers() {
        log::warn!("installing signal handlers: {e}");
    }

    let zeroth = args.script.clone().unwrap_or_else(|| "jobsh".to_string());
    let mut positional = vec![zeroth];
    positional.extend(args.script_args);
    shell.vars_mut().set_positional(positional);

    if !no_rc {
        source_rc(&mut shell);
    }

    if shell.exit_request().is_none() {
        if let Some(command) = args.command {
            shell.run_line(&command);
        } else if let Some(script) = args.script {
            if let Err(e) = shell.source_file(Path::new(&script)) {
                eprintln!("jobsh: {script}: {e}");
                std::process::exit(127);
            }
        } else {
            repl(&mut shell);
        }
    }

    let status = shell.exit_request().unwrap_or_else(|| shell.last_status());
    log::debug!("exiting with {status}");
    let _ = io::stdout().flush();
    std::process::exit(status);
}
