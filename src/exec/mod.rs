//! Execution engine: turns a validated token stream into processes.
//!
//! Dispatch order for a line:
//! 1. split on `;`, `&` and newlines; `&` segments go to the background
//! 2. split each foreground segment on `&&`/`||` and short-circuit
//! 3. a segment containing `|` runs as a pipeline
//! 4. anything else runs as a single command

/// Background segments and sub-shell children.
pub mod background;
/// Single commands: assignments, builtins and external programs.
pub mod command;
/// Multi-stage pipelines.
pub mod pipeline;
/// Child-side exec helpers and program lookup.
pub mod process;
/// Descriptor redirection for builtins and children.
pub mod redirect;

pub use pipeline::pipeline_status;
pub use process::{ExecImage, resolve_program};

use crate::error::ShellError;
use crate::parse::{Token, TokenKind, Verdict, build_command, build_pipeline, validate};
use crate::shell::Shell;

impl Shell {
    /// Run an already-tokenized line and return its status, which is also
    /// stored as `$?`.
    ///
    /// Nothing is executed unless the whole line passes validation.
    pub fn run(&mut self, tokens: &[Token]) -> i32 {
        let limit = self.config.settings.max_tokens;
        let checked = match validate(tokens, limit) {
            Verdict::Success => Ok(()),
            Verdict::SyntaxError(msg) => Err(ShellError::Syntax(msg)),
            Verdict::TooManyTokens => Err(ShellError::TooManyTokens { limit }),
        };
        if let Err(err) = checked {
            let status = self.report(err);
            self.vars.set_last_status(status);
            return status;
        }

        let tokens: Vec<Token> = tokens
            .iter()
            .filter(|t| !t.is(TokenKind::Eof))
            .cloned()
            .collect();
        self.execute_list(&tokens)
    }

    /// Step 1: sequencing and backgrounding.
    pub(crate) fn execute_list(&mut self, tokens: &[Token]) -> i32 {
        let mut status = self.vars.last_status();
        let mut start = 0;

        for end in 0..=tokens.len() {
            let separator = tokens.get(end);
            if separator.is_some_and(|t| !t.kind.is_list_separator()) {
                continue;
            }
            let segment = &tokens[start..end];
            start = end + 1;
            if segment.is_empty() {
                continue;
            }

            if separator.is_some_and(|t| t.is(TokenKind::Ampersand)) {
                if self.run_background(segment).is_some() {
                    self.vars.set_last_status(0);
                }
                status = self.vars.last_status();
            } else {
                status = self.execute_and_or(segment);
                self.vars.set_last_status(status);
            }
            if self.exit_request().is_some() {
                break;
            }
        }

        status
    }

    /// Step 2: `&&` and `||` with short-circuiting.
    pub(crate) fn execute_and_or(&mut self, tokens: &[Token]) -> i32 {
        let mut status = 0;
        let mut connector: Option<TokenKind> = None;
        let mut start = 0;

        for end in 0..=tokens.len() {
            let next = tokens.get(end).map(|t| t.kind);
            if next.is_some_and(|k| !matches!(k, TokenKind::And | TokenKind::Or)) {
                continue;
            }
            let should_run = match connector {
                None => true,
                Some(TokenKind::And) => status == 0,
                Some(_) => status != 0,
            };
            if should_run {
                status = self.execute_pipeline_tokens(&tokens[start..end]);
                self.vars.set_last_status(status);
            } else {
                log::debug!("short-circuit: skipping {:?}", &tokens[start..end]);
            }
            if self.exit_request().is_some() {
                break;
            }
            connector = next;
            start = end + 1;
        }

        status
    }

    /// Steps 3 and 4. Build errors are reported here and become the status.
    pub(crate) fn execute_pipeline_tokens(&mut self, tokens: &[Token]) -> i32 {
        let result = if tokens.iter().any(|t| t.is(TokenKind::Pipe)) {
            build_pipeline(tokens).and_then(|pipeline| self.run_pipeline(&pipeline))
        } else {
            build_command(tokens).and_then(|command| self.run_command(&command))
        };
        result.unwrap_or_else(|err| self.report(err))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::shell::Shell;

    fn shell() -> Shell {
        Shell::new(Config::default_config())
    }

    #[test]
    fn and_skips_after_failure() {
        let mut shell = shell();
        assert_eq!(shell.run_line("false && X=ran"), 1);
        assert_eq!(shell.vars().get("X"), None);
    }

    #[test]
    fn or_skips_after_success() {
        let mut shell = shell();
        assert_eq!(shell.run_line("true || X=ran"), 0);
        assert_eq!(shell.vars().get("X"), None);
    }

    #[test]
    fn mixed_chain() {
        let mut shell = shell();
        assert_eq!(shell.run_line("false && A=1 || B=2"), 0);
        assert_eq!(shell.vars().get("A"), None);
        assert_eq!(shell.vars().get("B").as_deref(), Some("2"));

        assert_eq!(shell.run_line("true && C=3 || D=4"), 0);
        assert_eq!(shell.vars().get("C").as_deref(), Some("3"));
        assert_eq!(shell.vars().get("D"), None);
    }

    #[test]
    fn sequence_runs_everything() {
        let mut shell = shell();
        assert_eq!(shell.run_line("A=1; false; B=2"), 0);
        assert_eq!(shell.vars().get("A").as_deref(), Some("1"));
        assert_eq!(shell.vars().get("B").as_deref(), Some("2"));
    }

    #[test]
    fn status_is_last_foreground_segment() {
        let mut shell = shell();
        assert_eq!(shell.run_line("true; false"), 1);
        assert_eq!(shell.run_line("false; true"), 0);
    }

    #[test]
    fn invalid_line_runs_nothing() {
        let mut shell = shell();
        assert_eq!(shell.run_line("A=1; | B=2"), 2);
        assert_eq!(shell.vars().get("A"), None);
    }

    #[test]
    fn too_many_tokens_rejected() {
        let mut config = Config::default_config();
        config.settings.max_tokens = 4;
        let mut shell = Shell::new(config);
        assert_eq!(shell.run_line("A=1 ; B=2 ; C=3"), 2);
        assert_eq!(shell.vars().get("A"), None);
    }

    #[test]
    fn redirection_failure_does_not_stop_list() {
        let mut shell = shell();
        assert_eq!(shell.run_line("true < /no/such/input; B=2"), 0);
        assert_eq!(shell.vars().get("B").as_deref(), Some("2"));
    }
}
