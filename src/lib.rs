//! jobsh: an interactive Unix command-language engine.
//!
//! A line of input is expanded (aliases, then variables), tokenized,
//! validated against the grammar, and executed as a list of and-or chains
//! of pipelines. External programs run as forked children; builtins run
//! in-process against the [`Shell`] session. Background segments become
//! jobs that can be listed, resumed, signalled and reaped.
//!
//! # Architecture
//!
//! - **[`parse`]**: tokenizer, grammar validator, command/pipeline builder.
//! - **[`expand`]**: alias, variable and glob expansion.
//! - **[`exec`]**: list dispatch, single commands, pipelines, redirection.
//! - **[`jobs`]**: job table, foreground waits, signal forwarding.
//! - **[`builtins`]**: the builtin trait and registry.
//! - **[`config`]**: embedded defaults + user overlay merge.
//! - **[`logging`]**: diagnostic log under `~/.local/share/jobsh/`.

/// Builtin trait, registry and the builtin families.
pub mod builtins;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Error taxonomy and exit-status mapping.
pub mod error;
/// Execution engine: lists, and-or chains, pipelines, background segments.
pub mod exec;
/// Alias, variable and glob expansion.
pub mod expand;
/// Job table, foreground waits and signal handling.
pub mod jobs;
/// File-based diagnostic logging.
pub mod logging;
/// Tokenizer, grammar validation and command building.
pub mod parse;
/// The interactive session object.
pub mod shell;
/// Variable and alias storage.
pub mod store;

pub use error::ShellError;
pub use shell::Shell;
