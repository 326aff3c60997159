//! Commands implemented inside the shell process.
//!
//! Builtins that change session state (`cd`, `export`, `fg`, ...) must run
//! in-process. The engine swaps fds 0/1 around each call for redirection,
//! so builtins write through `io::stdout()` and never cache a handle.

/// `test` / `[`.
pub mod condition;
/// `cd`, `pwd`, `source` / `.`.
pub mod fs;
/// `echo`, `true`, `false`, `:`, `exit`/`quit`, `clear`, `help`, `type`, `which`.
pub mod general;
/// `jobs`, `fg`, `bg`, `kill`, `ping`.
pub mod jobs;
/// `export`, `unset`, `env`, `set`, `alias`, `unalias`.
pub mod vars;

use std::collections::HashMap;

use crate::shell::Shell;

/// A command run in the shell process.
pub trait Builtin {
    /// Name the builtin is invoked by.
    fn name(&self) -> &'static str;

    /// One-line summary for `help`.
    fn description(&self) -> &'static str;

    /// Run with the full argv (`argv[0]` is the name). Returns the status.
    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32;
}

/// Registry of all builtins, keyed by name.
pub struct BuiltinRegistry {
    builtins: HashMap<&'static str, Box<dyn Builtin>>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            builtins: HashMap::new(),
        };

        registry.register(Box::new(general::Echo));
        registry.register(Box::new(general::Constant::TRUE));
        registry.register(Box::new(general::Constant::FALSE));
        registry.register(Box::new(general::Constant::COLON));
        registry.register(Box::new(general::Exit::EXIT));
        registry.register(Box::new(general::Exit::QUIT));
        registry.register(Box::new(general::Clear));
        registry.register(Box::new(general::Help));
        registry.register(Box::new(general::Type));
        registry.register(Box::new(general::Which));

        registry.register(Box::new(fs::Cd));
        registry.register(Box::new(fs::Pwd));
        registry.register(Box::new(fs::Source::SOURCE));
        registry.register(Box::new(fs::Source::DOT));

        registry.register(Box::new(vars::Export));
        registry.register(Box::new(vars::Unset));
        registry.register(Box::new(vars::Env));
        registry.register(Box::new(vars::Set));
        registry.register(Box::new(vars::Alias));
        registry.register(Box::new(vars::Unalias));

        registry.register(Box::new(jobs::Jobs));
        registry.register(Box::new(jobs::Fg));
        registry.register(Box::new(jobs::Bg));
        registry.register(Box::new(jobs::Kill));
        registry.register(Box::new(jobs::Ping));

        registry.register(Box::new(condition::Test::TEST));
        registry.register(Box::new(condition::Test::BRACKET));

        registry
    }

    fn register(&mut self, builtin: Box<dyn Builtin>) {
        self.builtins.insert(builtin.name(), builtin);
    }

    /// Look up a builtin by exact name.
    pub fn get(&self, name: &str) -> Option<&dyn Builtin> {
        self.builtins.get(name).map(|b| b.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// All builtins sorted by name.
    pub fn sorted(&self) -> Vec<&dyn Builtin> {
        let mut all: Vec<&dyn Builtin> = self.builtins.values().map(|b| b.as_ref()).collect();
        all.sort_by_key(|b| b.name());
        all
    }
}

/// Print `name: message` on stderr and return `status`.
pub(crate) fn fail(name: &str, message: impl std::fmt::Display, status: i32) -> i32 {
    eprintln!("{name}: {message}");
    status
}
