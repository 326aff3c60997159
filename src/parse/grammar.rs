//! Recursive-descent grammar check, run before anything executes.
//!
//! ```text
//! shell_cmd   := and_or_list ((';' | '&' | NL) and_or_list)* (';' | '&' | NL)?
//! and_or_list := pipeline (('&&' | '||') pipeline)*
//! pipeline    := atomic ('|' atomic)*
//! atomic      := word (word | '<' word | ('>' | '>>') word)*
//! ```

use super::types::{Token, TokenKind};

/// Outcome of validating a token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    SyntaxError(String),
    TooManyTokens,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }
}

/// Validate a full token stream (as produced by `tokenize`).
pub fn validate(tokens: &[Token], max_tokens: usize) -> Verdict {
    if tokens.len() >= max_tokens {
        return Verdict::TooManyTokens;
    }
    let mut validator = Validator { tokens, pos: 0 };
    match validator.shell_cmd() {
        Ok(()) => Verdict::Success,
        Err(msg) => Verdict::SyntaxError(msg),
    }
}

struct Validator<'a> {
    tokens: &'a [Token],
    pos: usize,
}

type Check = Result<(), String>;

impl Validator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens
            .get(self.pos)
            .filter(|t| t.kind != TokenKind::Eof)
    }

    fn at_end(&self) -> bool {
        self.peek().is_none()
    }

    fn unexpected(&self) -> String {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Newline => {
                "syntax error near unexpected token `newline'".to_string()
            }
            Some(t) => format!("syntax error near unexpected token `{}'", t.text),
            None => "syntax error: unexpected end of input".to_string(),
        }
    }

    fn shell_cmd(&mut self) -> Check {
        if self.at_end() {
            return Ok(());
        }
        self.and_or_list()?;
        while let Some(token) = self.peek() {
            if !token.kind.is_list_separator() {
                return Err(self.unexpected());
            }
            self.pos += 1;
            if self.at_end() {
                return Ok(());
            }
            self.and_or_list()?;
        }
        Ok(())
    }

    fn and_or_list(&mut self) -> Check {
        self.pipeline()?;
        while let Some(token) = self.peek() {
            if !matches!(token.kind, TokenKind::And | TokenKind::Or) {
                break;
            }
            self.pos += 1;
            if self.at_end() {
                return Err(self.unexpected());
            }
            self.pipeline()?;
        }
        Ok(())
    }

    fn pipeline(&mut self) -> Check {
        self.atomic()?;
        while let Some(token) = self.peek() {
            if token.kind != TokenKind::Pipe {
                break;
            }
            self.pos += 1;
            match self.peek() {
                Some(t) if t.kind == TokenKind::Word => self.atomic()?,
                _ => return Err(self.unexpected()),
            }
        }
        Ok(())
    }

    fn atomic(&mut self) -> Check {
        self.word()?;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Word => self.pos += 1,
                TokenKind::InputRedirect | TokenKind::OutputRedirect { .. } => {
                    self.pos += 1;
                    self.word()?;
                }
                TokenKind::Heredoc | TokenKind::Herestring => {
                    return Err(format!(
                        "syntax error: `{}' redirection is not supported",
                        token.text
                    ));
                }
                TokenKind::LParen | TokenKind::RParen => {
                    return Err(format!(
                        "syntax error: subshell grouping `{}' is not supported",
                        token.text
                    ));
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn word(&mut self) -> Check {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Word => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }
}
