use std::collections::BTreeMap;
use std::path::PathBuf;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Aliases seeded into the shell at startup.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    /// Upper bound on tokens in one input line.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Pipeline status is the rightmost failing stage rather than the last.
    #[serde(default = "default_pipefail")]
    pub pipefail: bool,
    /// Startup file sourced by interactive and script sessions.
    #[serde(default = "default_rc_file")]
    pub rc_file: String,
    /// Prompt template; `{cwd}` is replaced with the working directory.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// One of off, error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_tokens() -> usize {
    1024
}

fn default_pipefail() -> bool {
    true
}

fn default_rc_file() -> String {
    "~/.jobshrc".to_string()
}

fn default_prompt() -> String {
    "jobsh:{cwd}$ ".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            pipefail: default_pipefail(),
            rc_file: default_rc_file(),
            prompt: default_prompt(),
            log_level: default_log_level(),
        }
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    aliases: AliasesOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    max_tokens: Option<usize>,
    pipefail: Option<bool>,
    rc_file: Option<String>,
    prompt: Option<String>,
    log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AliasesOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    remove: Vec<String>,
    #[serde(flatten)]
    entries: BTreeMap<String, String>,
}

// ── Merge logic ──

/// Merge a user alias table into the default one.
/// In replace mode: user table replaces default entirely.
/// In merge mode: remove names first, then insert additions (overriding).
fn merge_table(
    base: &mut BTreeMap<String, String>,
    add: BTreeMap<String, String>,
    remove: &[String],
    replace: bool,
) {
    if replace {
        *base = add;
    } else {
        base.retain(|name, _| !remove.contains(name));
        base.extend(add);
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/jobsh/config.toml (if exists)
    ///
    /// Scalars override. Aliases merge by name; `remove = [..]` drops
    /// default aliases and `replace = true` discards the default table.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        config
    }

    /// Try to load user overlay from ~/.config/jobsh/config.toml.
    fn load_overlay() -> Option<ConfigOverlay> {
        let home = std::env::var_os("HOME")?;
        let path = std::path::Path::new(&home).join(".config/jobsh/config.toml");
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("jobsh: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.max_tokens {
            self.settings.max_tokens = v;
        }
        if let Some(v) = s.pipefail {
            self.settings.pipefail = v;
        }
        if let Some(v) = s.rc_file {
            self.settings.rc_file = v;
        }
        if let Some(v) = s.prompt {
            self.settings.prompt = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }

        let a = overlay.aliases;
        merge_table(&mut self.aliases, a.entries, &a.remove, a.replace);
    }

    /// The rc file with `~` expanded.
    pub fn rc_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.settings.rc_file).as_ref())
    }

    /// Parsed `log_level`; unknown names fall back to `warn`.
    pub fn log_level_filter(&self) -> LevelFilter {
        self.settings.log_level.parse().unwrap_or(LevelFilter::Warn)
    }

    /// Render the effective configuration for `--dump-config`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default_config();
        assert_eq!(config.settings.max_tokens, 1024);
        assert!(config.settings.pipefail);
        assert_eq!(config.settings.rc_file, "~/.jobshrc");
        assert_eq!(config.settings.prompt, "jobsh:{cwd}$ ");
        assert_eq!(config.log_level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn default_config_has_expected_aliases() {
        let config = Config::default_config();
        assert_eq!(config.aliases.get("ll").map(String::as_str), Some("ls -l"));
        assert_eq!(config.aliases.get("hop").map(String::as_str), Some("cd"));
        assert_eq!(
            config.aliases.get("activities").map(String::as_str),
            Some("jobs")
        );
    }

    // ── Merge semantics ──

    #[test]
    fn overlay_extends_aliases() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [aliases]
            gs = "git status"
        "#,
        );
        assert!(config.aliases.contains_key("ll"));
        assert_eq!(
            config.aliases.get("gs").map(String::as_str),
            Some("git status")
        );
    }

    #[test]
    fn overlay_overrides_alias_value() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [aliases]
            ll = "ls -lah"
        "#,
        );
        assert_eq!(config.aliases.get("ll").map(String::as_str), Some("ls -lah"));
    }

    #[test]
    fn overlay_removes_aliases() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [aliases]
            remove = ["hop", "reveal"]
        "#,
        );
        assert!(!config.aliases.contains_key("hop"));
        assert!(!config.aliases.contains_key("reveal"));
        assert!(config.aliases.contains_key("ll"));
        assert!(!config.aliases.contains_key("remove"));
    }

    #[test]
    fn overlay_replace_aliases() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [aliases]
            replace = true
            x = "exit"
        "#,
        );
        assert_eq!(config.aliases.len(), 1);
        assert_eq!(config.aliases.get("x").map(String::as_str), Some("exit"));
    }

    #[test]
    fn overlay_scalars() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [settings]
            pipefail = false
            max_tokens = 16
            log_level = "debug"
        "#,
        );
        assert!(!config.settings.pipefail);
        assert_eq!(config.settings.max_tokens, 16);
        assert_eq!(config.log_level_filter(), LevelFilter::Debug);
        // untouched
        assert_eq!(config.settings.rc_file, "~/.jobshrc");
    }

    #[test]
    fn unknown_log_level_falls_back() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [settings]
            log_level = "chatty"
        "#,
        );
        assert_eq!(config.log_level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn empty_overlay_changes_nothing() {
        let original = Config::default_config();
        let mut config = Config::default_config();
        config.apply_overlay_str("");
        assert_eq!(config.aliases, original.aliases);
        assert_eq!(config.settings.prompt, original.settings.prompt);
    }

    #[test]
    fn dump_round_trips() {
        let config = Config::default_config();
        let text = config.to_toml().unwrap();
        let reparsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(reparsed.aliases, config.aliases);
        assert_eq!(reparsed.settings.max_tokens, config.settings.max_tokens);
    }

    #[test]
    fn rc_path_expands_tilde() {
        let config = Config::default_config();
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(config.rc_path(), PathBuf::from(home).join(".jobshrc"));
        }
    }
}
