//! Variable and alias storage.
//!
//! The expansion passes only need `get`/`set`, expressed by [`VarStore`];
//! [`Variables`] adds the shell's special parameters and export tracking.

use std::collections::{BTreeMap, HashMap};

/// Minimal key/value interface the expansion passes depend on.
pub trait VarStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str);
}

impl VarStore for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) {
        self.insert(name.to_string(), value.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub value: String,
    pub exported: bool,
}

/// Shell variables plus the special parameters (`$?`, `$$`, `$!`, `$#`,
/// `$0`..`$9`, `$@`, `$*`).
#[derive(Debug, Clone)]
pub struct Variables {
    vars: HashMap<String, Variable>,
    last_status: i32,
    shell_pid: i32,
    last_background_pid: Option<i32>,
    /// `positional[0]` is `$0`.
    positional: Vec<String>,
}

impl Default for Variables {
    fn default() -> Self {
        Self::new()
    }
}

impl Variables {
    /// An empty table; nothing imported from the process environment.
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            last_status: 0,
            shell_pid: std::process::id() as i32,
            last_background_pid: None,
            positional: vec![env!("CARGO_PKG_NAME").to_string()],
        }
    }

    /// A table seeded from the process environment, every entry exported.
    pub fn from_environment() -> Self {
        let mut vars = Self::new();
        for (name, value) in std::env::vars() {
            vars.set_exported(&name, &value);
        }
        vars
    }

    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    pub fn set_last_status(&mut self, status: i32) {
        self.last_status = status;
    }

    pub fn set_last_background_pid(&mut self, pid: i32) {
        self.last_background_pid = Some(pid);
    }

    /// Replace `$0` and the positional parameters.
    pub fn set_positional(&mut self, args: Vec<String>) {
        if args.is_empty() {
            self.positional.truncate(1);
        } else {
            self.positional = args;
        }
    }

    fn special(&self, name: &str) -> Option<String> {
        let value = match name {
            "?" => self.last_status.to_string(),
            "$" => self.shell_pid.to_string(),
            "!" => self
                .last_background_pid
                .map(|p| p.to_string())
                .unwrap_or_default(),
            "#" => (self.positional.len() - 1).to_string(),
            "@" | "*" => self.positional[1..].join(" "),
            _ => {
                let index: usize = name.parse().ok()?;
                self.positional.get(index).cloned().unwrap_or_default()
            }
        };
        Some(value)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.special(name) {
            return Some(value);
        }
        self.vars.get(name).map(|v| v.value.clone())
    }

    /// Set a value, keeping any existing export flag.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.vars.get_mut(name) {
            Some(var) => var.value = value.to_string(),
            None => {
                self.vars.insert(
                    name.to_string(),
                    Variable {
                        value: value.to_string(),
                        exported: false,
                    },
                );
            }
        }
    }

    pub fn set_exported(&mut self, name: &str, value: &str) {
        self.vars.insert(
            name.to_string(),
            Variable {
                value: value.to_string(),
                exported: true,
            },
        );
    }

    /// Mark an existing variable exported, creating it empty if missing.
    pub fn export(&mut self, name: &str) {
        self.vars
            .entry(name.to_string())
            .or_insert_with(|| Variable {
                value: String::new(),
                exported: true,
            })
            .exported = true;
    }

    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.vars.get(name).is_some_and(|v| v.exported)
    }

    /// All variables, sorted by name.
    pub fn iter_sorted(&self) -> Vec<(&str, &Variable)> {
        let mut all: Vec<_> = self.vars.iter().map(|(k, v)| (k.as_str(), v)).collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }

    /// `NAME=value` pairs handed to child processes.
    pub fn environment(&self) -> Vec<(String, String)> {
        self.iter_sorted()
            .into_iter()
            .filter(|(_, v)| v.exported)
            .map(|(k, v)| (k.to_string(), v.value.clone()))
            .collect()
    }
}

impl VarStore for Variables {
    fn get(&self, name: &str) -> Option<String> {
        Variables::get(self, name)
    }

    fn set(&mut self, name: &str, value: &str) {
        Variables::set(self, name, value);
    }
}

/// Alias table, ordered by name for listing.
#[derive(Debug, Clone, Default)]
pub struct Aliases {
    entries: BTreeMap<String, String>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.entries.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Aliases {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
