//! Error taxonomy for the command-language engine.
//!
//! Every variant is recovered at the [`Shell`](crate::Shell) boundary and
//! turned into an exit status plus a message on stderr.

use std::io;

use thiserror::Error;

/// Exit status used for generic failures.
pub const STATUS_FAILURE: i32 = 1;
/// Exit status for syntax-class errors (bad grammar, unterminated quote).
pub const STATUS_SYNTAX: i32 = 2;
/// Exit status a child reports when the program cannot be executed.
pub const STATUS_NOT_FOUND: i32 = 127;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("too many tokens (limit is {limit})")]
    TooManyTokens { limit: usize },

    #[error("token exceeds {limit} characters")]
    TokenTooLong { limit: usize },

    #[error("{0}")]
    Syntax(String),

    #[error("unexpected end of input while looking for matching `{quote}'")]
    UnterminatedQuote { quote: char },

    #[error("{path}: {source}")]
    RedirectionTarget {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("empty command in pipeline")]
    EmptyCommand,

    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("pipe creation failed: {0}")]
    Pipe(#[source] nix::Error),

    #[error("wait failed: {0}")]
    Wait(#[source] nix::Error),

    #[error("descriptor redirection failed: {0}")]
    Redirect(#[source] nix::Error),

    #[error("{program}: {}", exec_reason(.source))]
    Exec {
        program: String,
        #[source]
        source: nix::Error,
    },
}

fn exec_reason(err: &nix::Error) -> &'static str {
    match err {
        nix::Error::ENOENT => "command not found",
        nix::Error::EACCES => "permission denied",
        nix::Error::ENOEXEC => "exec format error",
        _ => "cannot execute",
    }
}

impl ShellError {
    /// The `$?` value this error produces.
    pub fn exit_status(&self) -> i32 {
        match self {
            ShellError::TooManyTokens { .. }
            | ShellError::TokenTooLong { .. }
            | ShellError::Syntax(_)
            | ShellError::UnterminatedQuote { .. } => STATUS_SYNTAX,
            ShellError::Exec { .. } => STATUS_NOT_FOUND,
            _ => STATUS_FAILURE,
        }
    }
}
