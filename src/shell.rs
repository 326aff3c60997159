//! The shell session: variable and alias stores, job table, builtin
//! registry and configuration, plus the line-level entry points.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::builtins::BuiltinRegistry;
use crate::config::Config;
use crate::error::ShellError;
use crate::expand::preprocess;
use crate::jobs::JobTable;
use crate::parse::tokenize;
use crate::store::{Aliases, Variables};

/// `source` may nest at most this deep.
pub const MAX_SOURCE_DEPTH: usize = 64;

pub struct Shell {
    pub(crate) vars: Variables,
    pub(crate) aliases: Aliases,
    pub(crate) jobs: JobTable,
    pub(crate) config: Config,
    pub(crate) builtins: Rc<BuiltinRegistry>,
    pub(crate) previous_dir: Option<PathBuf>,
    exit_request: Option<i32>,
    source_depth: usize,
    interactive: bool,
}

impl Shell {
    /// A session with the given configuration. Aliases are seeded from the
    /// config's `[aliases]` table; the variable table starts empty.
    pub fn new(config: Config) -> Self {
        let aliases = config
            .aliases
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            vars: Variables::new(),
            aliases,
            jobs: JobTable::new(),
            config,
            builtins: Rc::new(BuiltinRegistry::new()),
            previous_dir: None,
            exit_request: None,
            source_depth: 0,
            interactive: false,
        }
    }

    /// Like [`Shell::new`] but with the process environment imported.
    pub fn from_environment(config: Config) -> Self {
        let mut shell = Self::new(config);
        shell.vars = Variables::from_environment();
        shell
    }

    pub fn vars(&self) -> &Variables {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut Variables {
        &mut self.vars
    }

    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut Aliases {
        &mut self.aliases
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    pub fn last_status(&self) -> i32 {
        self.vars.last_status()
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    /// Set by the `exit` builtin; the main loop stops when this is `Some`.
    pub fn exit_request(&self) -> Option<i32> {
        self.exit_request
    }

    pub fn request_exit(&mut self, status: i32) {
        self.exit_request = Some(status);
    }

    /// Expand, tokenize and run one line of input.
    pub fn run_line(&mut self, line: &str) -> i32 {
        let expanded = preprocess(line, &self.aliases, &mut self.vars);
        log::debug!("run_line: {expanded:?}");
        let tokens = match tokenize(&expanded, self.config.settings.max_tokens) {
            Ok(tokens) => tokens,
            Err(err) => {
                let status = self.report(err);
                self.vars.set_last_status(status);
                return status;
            }
        };
        self.run(&tokens)
    }

    /// Run every non-blank, non-comment line of `path` in this session.
    /// Returns the status of the last line run.
    pub fn source_file(&mut self, path: &Path) -> io::Result<i32> {
        if self.source_depth >= MAX_SOURCE_DEPTH {
            return Err(io::Error::other(format!(
                "maximum source depth ({MAX_SOURCE_DEPTH}) exceeded"
            )));
        }
        let contents = fs::read_to_string(path)?;
        log::debug!("sourcing {}", path.display());

        self.source_depth += 1;
        let mut status = 0;
        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            status = self.run_line(line);
            if self.exit_request.is_some() {
                break;
            }
        }
        self.source_depth -= 1;
        Ok(status)
    }

    /// Print and drop notices for background jobs that changed state.
    pub fn reap_jobs(&mut self) {
        let notices = self.jobs.reap();
        if notices.is_empty() {
            return;
        }
        let mut out = io::stdout().lock();
        for notice in notices {
            let _ = writeln!(out, "{notice}");
        }
        let _ = out.flush();
    }

    /// Render the configured prompt for the current directory.
    pub fn prompt(&self) -> String {
        let cwd = match std::env::current_dir() {
            Ok(dir) => abbreviate_home(&dir, self.vars.get("HOME").as_deref()),
            Err(_) => "?".to_string(),
        };
        self.config.settings.prompt.replace("{cwd}", &cwd)
    }

    /// Print an error the way every failure surfaces, and return its status.
    pub(crate) fn report(&self, err: ShellError) -> i32 {
        log::warn!("{err}");
        eprintln!("{}: {err}", env!("CARGO_PKG_NAME"));
        err.exit_status()
    }
}

/// Show `dir` with a leading `$HOME` component replaced by `~`.
fn abbreviate_home(dir: &Path, home: Option<&str>) -> String {
    let rest = home
        .filter(|h| !h.is_empty())
        .and_then(|h| dir.strip_prefix(h).ok());
    match rest {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => dir.display().to_string(),
    }
}
