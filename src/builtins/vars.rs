use std::io::{self, Write};

use super::{Builtin, fail};
use crate::error::{STATUS_FAILURE, STATUS_SYNTAX};
use crate::parse::split_assignment;
use crate::shell::Shell;

fn quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn is_identifier(name: &str) -> bool {
    split_assignment(&format!("{name}=")).is_some()
}

/// `export [NAME[=VALUE]...]`
pub struct Export;

impl Builtin for Export {
    fn name(&self) -> &'static str {
        "export"
    }

    fn description(&self) -> &'static str {
        "Mark variables for export to child processes"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() == 1 {
            let mut out = io::stdout().lock();
            for (name, value) in shell.vars().environment() {
                let _ = writeln!(out, "export {name}={}", quote(&value));
            }
            return 0;
        }

        let mut status = 0;
        for arg in &argv[1..] {
            if let Some((name, value)) = split_assignment(arg) {
                shell.vars_mut().set_exported(name, value);
            } else if is_identifier(arg) {
                shell.vars_mut().export(arg);
            } else {
                status = fail(
                    "export",
                    format!("`{arg}': not a valid identifier"),
                    STATUS_FAILURE,
                );
            }
        }
        status
    }
}

/// `unset NAME...`
pub struct Unset;

impl Builtin for Unset {
    fn name(&self) -> &'static str {
        "unset"
    }

    fn description(&self) -> &'static str {
        "Remove variables"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() < 2 {
            return fail("unset", "usage: unset NAME...", STATUS_SYNTAX);
        }
        for name in &argv[1..] {
            shell.vars_mut().unset(name);
        }
        0
    }
}

/// `env`: print the environment children would receive.
pub struct Env;

impl Builtin for Env {
    fn name(&self) -> &'static str {
        "env"
    }

    fn description(&self) -> &'static str {
        "Print exported variables"
    }

    fn run(&self, shell: &mut Shell, _argv: &[String]) -> i32 {
        let mut out = io::stdout().lock();
        for (name, value) in shell.vars().environment() {
            let _ = writeln!(out, "{name}={value}");
        }
        0
    }
}

/// `set`: list every variable.
pub struct Set;

impl Builtin for Set {
    fn name(&self) -> &'static str {
        "set"
    }

    fn description(&self) -> &'static str {
        "Display shell variables"
    }

    fn run(&self, shell: &mut Shell, _argv: &[String]) -> i32 {
        let mut out = io::stdout().lock();
        for (name, var) in shell.vars().iter_sorted() {
            let _ = writeln!(out, "{name}={}", quote(&var.value));
        }
        0
    }
}

/// `alias [NAME[=VALUE]...]`
pub struct Alias;

impl Builtin for Alias {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn description(&self) -> &'static str {
        "Define or display aliases"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        let mut out = io::stdout().lock();
        if argv.len() == 1 {
            for (name, value) in shell.aliases().iter() {
                let _ = writeln!(out, "alias {name}={}", quote(value));
            }
            return 0;
        }

        let mut status = 0;
        for arg in &argv[1..] {
            match arg.split_once('=') {
                Some((name, value)) if !name.is_empty() => shell.aliases_mut().set(name, value),
                Some(_) => {
                    status = fail("alias", format!("`{arg}': invalid alias name"), STATUS_FAILURE);
                }
                None => match shell.aliases().get(arg) {
                    Some(value) => {
                        let _ = writeln!(out, "alias {arg}={}", quote(value));
                    }
                    None => status = fail("alias", format!("{arg}: not found"), STATUS_FAILURE),
                },
            }
        }
        status
    }
}

/// `unalias [-a] NAME...`
pub struct Unalias;

impl Builtin for Unalias {
    fn name(&self) -> &'static str {
        "unalias"
    }

    fn description(&self) -> &'static str {
        "Remove alias definitions"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() < 2 {
            return fail("unalias", "usage: unalias [-a] NAME...", STATUS_SYNTAX);
        }
        let mut status = 0;
        for name in &argv[1..] {
            if name == "-a" {
                shell.aliases_mut().clear();
            } else if !shell.aliases_mut().remove(name) {
                status = fail("unalias", format!("{name}: not found"), STATUS_FAILURE);
            }
        }
        status
    }
}
