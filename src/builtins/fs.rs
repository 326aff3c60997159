use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{Builtin, fail};
use crate::error::{STATUS_FAILURE, STATUS_SYNTAX};
use crate::shell::Shell;

/// `cd [DIR | - | ~]`
pub struct Cd;

impl Builtin for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn description(&self) -> &'static str {
        "Change the working directory"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() > 2 {
            return fail("cd", "too many arguments", STATUS_FAILURE);
        }

        let mut announce = false;
        let target: PathBuf = match argv.get(1).map(String::as_str) {
            None | Some("~") => match shell.vars().get("HOME").filter(|h| !h.is_empty()) {
                Some(home) => PathBuf::from(home),
                None => return fail("cd", "HOME not set", STATUS_FAILURE),
            },
            Some("-") => match shell.previous_dir.clone() {
                Some(previous) => {
                    announce = true;
                    previous
                }
                None => return fail("cd", "OLDPWD not set", STATUS_FAILURE),
            },
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).as_ref()),
        };

        let current = env::current_dir().ok();
        if let Err(err) = env::set_current_dir(&target) {
            return fail("cd", format!("{}: {err}", target.display()), STATUS_FAILURE);
        }
        let now = env::current_dir().unwrap_or(target);
        log::debug!("cd -> {}", now.display());

        if let Some(previous) = current {
            shell
                .vars_mut()
                .set("OLDPWD", &previous.display().to_string());
            shell.previous_dir = Some(previous);
        }
        shell.vars_mut().set("PWD", &now.display().to_string());

        if announce {
            let _ = writeln!(io::stdout(), "{}", now.display());
        }
        0
    }
}

/// `pwd`
pub struct Pwd;

impl Builtin for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn description(&self) -> &'static str {
        "Print the working directory"
    }

    fn run(&self, _shell: &mut Shell, _argv: &[String]) -> i32 {
        match env::current_dir() {
            Ok(dir) => {
                let _ = writeln!(io::stdout(), "{}", dir.display());
                0
            }
            Err(err) => fail("pwd", err, STATUS_FAILURE),
        }
    }
}

/// `source FILE` and `. FILE`
pub struct Source {
    name: &'static str,
}

impl Source {
    pub const SOURCE: Source = Source { name: "source" };
    pub const DOT: Source = Source { name: "." };
}

impl Builtin for Source {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "Execute commands from a file in the current shell"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        let Some(file) = argv.get(1) else {
            return fail(self.name, "filename argument required", STATUS_SYNTAX);
        };
        match shell.source_file(Path::new(file)) {
            Ok(status) => status,
            Err(err) => fail(self.name, format!("{file}: {err}"), STATUS_FAILURE),
        }
    }
}
