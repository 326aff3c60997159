//! Token slice → [`Command`] / [`Pipeline`].
//!
//! Callers hand in a slice already split on `;`, `&`, `&&` and `||`.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

use super::types::{Command, Pipeline, Token, TokenKind};
use crate::error::ShellError;
use crate::expand::{expand_glob, has_glob_chars};

/// Permission bits for files created by `>` and `>>`.
pub const REDIRECT_FILE_MODE: u32 = 0o644;

/// Open a redirection target for reading.
pub fn open_input(path: &str) -> Result<File, ShellError> {
    File::open(path).map_err(|source| ShellError::RedirectionTarget {
        path: path.to_string(),
        source,
    })
}

/// Open a redirection target for writing, creating it if absent.
pub fn open_output(path: &str, append: bool) -> Result<File, ShellError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(REDIRECT_FILE_MODE);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options
        .open(path)
        .map_err(|source| ShellError::RedirectionTarget {
            path: path.to_string(),
            source,
        })
}

/// Check that every redirection target in `tokens` can be opened.
///
/// Output targets are created (and truncated for `>`) as a side effect,
/// exactly as the later real open would do.
pub fn check_redirections(tokens: &[Token]) -> Result<(), ShellError> {
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if !token.kind.is_redirection() {
            continue;
        }
        let Some(target) = iter.next() else {
            break;
        };
        let path = target_path(target);
        match token.kind {
            TokenKind::InputRedirect => drop(open_input(&path)?),
            TokenKind::OutputRedirect { append } => drop(open_output(&path, append)?),
            _ => {}
        }
    }
    Ok(())
}

/// Build a single command from a pipe-free slice.
pub fn build_command(tokens: &[Token]) -> Result<Command, ShellError> {
    check_redirections(tokens)?;
    command_from(tokens)
}

/// Build a pipeline by splitting on `|`.
///
/// Redirections on interior stages are dropped: only the first stage
/// reads from a file and only the last writes to one.
pub fn build_pipeline(tokens: &[Token]) -> Result<Pipeline, ShellError> {
    check_redirections(tokens)?;

    let segments: Vec<&[Token]> = tokens.split(|t| t.is(TokenKind::Pipe)).collect();
    let last = segments.len() - 1;
    let mut commands = Vec::with_capacity(segments.len());

    for (index, segment) in segments.into_iter().enumerate() {
        let mut command = command_from(segment)?;
        if index != 0 && command.input_file.take().is_some() {
            log::warn!("ignoring input redirection on pipeline stage {index}");
        }
        if index != last && command.output_file.take().is_some() {
            log::warn!("ignoring output redirection on pipeline stage {index}");
            command.append = false;
        }
        commands.push(command);
    }

    Ok(Pipeline { commands })
}

fn command_from(tokens: &[Token]) -> Result<Command, ShellError> {
    let mut command = Command::default();
    let mut iter = tokens.iter().filter(|t| !t.is(TokenKind::Eof));

    while let Some(token) = iter.next() {
        match token.kind {
            TokenKind::Word => push_word(&mut command.argv, token),
            TokenKind::InputRedirect => {
                let target = iter.next().ok_or_else(missing_target)?;
                command.input_file = Some(target_path(target));
            }
            TokenKind::OutputRedirect { append } => {
                let target = iter.next().ok_or_else(missing_target)?;
                command.output_file = Some(target_path(target));
                command.append = append;
            }
            _ => {
                return Err(ShellError::Syntax(format!(
                    "syntax error near unexpected token `{}'",
                    token.text
                )));
            }
        }
    }

    if command.argv.is_empty() {
        return Err(ShellError::EmptyCommand);
    }
    Ok(command)
}

/// Tilde and glob expansion for one argv word. Quoted words pass through.
fn push_word(argv: &mut Vec<String>, token: &Token) {
    if token.was_quoted {
        argv.push(token.text.clone());
        return;
    }
    let word = shellexpand::tilde(&token.text);
    if has_glob_chars(&word) {
        argv.extend(expand_glob(&word));
    } else {
        argv.push(word.into_owned());
    }
}

fn target_path(token: &Token) -> String {
    if token.was_quoted {
        token.text.clone()
    } else {
        shellexpand::tilde(&token.text).into_owned()
    }
}

fn missing_target() -> ShellError {
    ShellError::Syntax("syntax error near unexpected token `newline'".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::tokenize;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input, 1024).unwrap()
    }

    #[test]
    fn plain_command() {
        let cmd = build_command(&tokens("ls -la /tmp")).unwrap();
        assert_eq!(cmd.argv, vec!["ls", "-la", "/tmp"]);
        assert_eq!(cmd.input_file, None);
        assert_eq!(cmd.output_file, None);
    }

    #[test]
    fn redirections_collected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        std::fs::write(&input, "x").unwrap();
        let line = format!("sort < {} >> {}", input.display(), output.display());
        let cmd = build_command(&tokens(&line)).unwrap();
        assert_eq!(cmd.argv, vec!["sort"]);
        assert_eq!(cmd.input_file.as_deref(), input.to_str());
        assert_eq!(cmd.output_file.as_deref(), output.to_str());
        assert!(cmd.append);
        assert!(output.exists());
    }

    #[test]
    fn last_redirection_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        let line = format!(
            "echo hi >> {} > {}",
            first.display(),
            second.display()
        );
        let cmd = build_command(&tokens(&line)).unwrap();
        assert_eq!(cmd.output_file.as_deref(), second.to_str());
        assert!(!cmd.append);
    }

    #[test]
    fn unreadable_input_aborts_build() {
        let err = build_command(&tokens("cat < /no/such/file/here")).unwrap_err();
        assert!(matches!(err, ShellError::RedirectionTarget { .. }));
    }

    #[test]
    fn unopenable_target_aborts_whole_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("created");
        let line = format!("cat < /no/such/file | wc > {}", out.display());
        assert!(build_pipeline(&tokens(&line)).is_err());
    }

    #[test]
    fn pipeline_stages_in_order() {
        let pipeline = build_pipeline(&tokens("cat f | grep x | wc -l")).unwrap();
        let names: Vec<_> = pipeline.commands.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["cat", "grep", "wc"]);
    }

    #[test]
    fn interior_redirections_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mid = dir.path().join("mid");
        let line = format!("echo a > {} | cat", mid.display());
        let pipeline = build_pipeline(&tokens(&line)).unwrap();
        assert_eq!(pipeline.commands[0].output_file, None);
    }

    #[test]
    fn quoted_glob_stays_literal() {
        let cmd = build_command(&tokens("echo '*' \"?\"")).unwrap();
        assert_eq!(cmd.argv, vec!["echo", "*", "?"]);
    }

    #[test]
    fn unmatched_glob_stays_literal() {
        let cmd = build_command(&tokens("ls *.nonexistent_ext_xyz")).unwrap();
        assert_eq!(cmd.argv, vec!["ls", "*.nonexistent_ext_xyz"]);
    }

    #[test]
    fn tilde_expands_unless_quoted() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let cmd = build_command(&tokens("ls ~/src '~'")).unwrap();
        assert_eq!(cmd.argv, vec!["ls".to_string(), format!("{home}/src"), "~".to_string()]);
    }

    #[test]
    fn redirection_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o");
        let mut toks = vec![Token::operator(
            TokenKind::OutputRedirect { append: false },
            ">",
        )];
        toks.push(Token::word(out.to_str().unwrap()));
        assert!(matches!(
            build_command(&toks),
            Err(ShellError::EmptyCommand)
        ));
    }

    #[test]
    fn created_file_has_mode_0644() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new");
        drop(open_output(path.to_str().unwrap(), false).unwrap());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        // umask can only clear bits
        assert_eq!(mode & 0o7133, 0);
    }
}
