//! Lexer: raw line → token stream.

use super::types::{Token, TokenKind};
use crate::error::ShellError;

/// Longest word the lexer accepts.
pub const MAX_TOKEN_LENGTH: usize = 4096;

/// Characters that end an unquoted word.
fn is_operator_char(c: char) -> bool {
    matches!(c, '|' | '&' | ';' | '<' | '>' | '(' | ')')
}

/// Tokenize a line, honoring quotes, escapes and comments.
///
/// At most `max_tokens - 1` tokens are produced before the terminating
/// `Eof`; a stream that reaches `max_tokens` has been truncated and the
/// grammar validator rejects it as too long.
pub fn tokenize(input: &str, max_tokens: usize) -> Result<Vec<Token>, ShellError> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let budget = max_tokens.saturating_sub(1);
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len && tokens.len() < budget {
        let c = chars[i];

        if c == '\n' {
            tokens.push(Token::operator(TokenKind::Newline, "\n"));
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // Comment: only at the start of a token
        if c == '#' {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        let next = chars.get(i + 1).copied();
        let after = chars.get(i + 2).copied();

        // Two- and three-char operators before their one-char prefixes
        let op = match (c, next, after) {
            ('<', Some('<'), Some('<')) => Some((TokenKind::Herestring, 3)),
            ('<', Some('<'), _) => Some((TokenKind::Heredoc, 2)),
            ('&', Some('&'), _) => Some((TokenKind::And, 2)),
            ('|', Some('|'), _) => Some((TokenKind::Or, 2)),
            ('>', Some('>'), _) => Some((TokenKind::OutputRedirect { append: true }, 2)),
            ('|', _, _) => Some((TokenKind::Pipe, 1)),
            ('&', _, _) => Some((TokenKind::Ampersand, 1)),
            (';', _, _) => Some((TokenKind::Semicolon, 1)),
            ('<', _, _) => Some((TokenKind::InputRedirect, 1)),
            ('>', _, _) => Some((TokenKind::OutputRedirect { append: false }, 1)),
            ('(', _, _) => Some((TokenKind::LParen, 1)),
            (')', _, _) => Some((TokenKind::RParen, 1)),
            _ => None,
        };
        if let Some((kind, width)) = op {
            let text: String = chars[i..i + width].iter().collect();
            tokens.push(Token::operator(kind, &text));
            i += width;
            continue;
        }

        let (token, consumed) = lex_word(&chars[i..])?;
        tokens.push(token);
        i += consumed;
    }

    tokens.push(Token::eof());
    Ok(tokens)
}

/// Lex one word starting at `chars[0]`. Quoted spans may be glued to
/// unquoted text (`--name="a b"` is one word).
fn lex_word(chars: &[char]) -> Result<(Token, usize), ShellError> {
    let len = chars.len();
    let mut text = String::new();
    let mut was_quoted = false;
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if c.is_whitespace() || is_operator_char(c) {
            break;
        }
        match c {
            '\'' => {
                was_quoted = true;
                i += 1;
                let start = i;
                while i < len && chars[i] != '\'' {
                    i += 1;
                }
                if i == len {
                    return Err(ShellError::UnterminatedQuote { quote: '\'' });
                }
                text.extend(&chars[start..i]);
                i += 1;
            }
            '"' => {
                was_quoted = true;
                i += 1;
                loop {
                    let Some(&dc) = chars.get(i) else {
                        return Err(ShellError::UnterminatedQuote { quote: '"' });
                    };
                    if dc == '"' {
                        i += 1;
                        break;
                    }
                    if dc == '\\' && i + 1 < len {
                        let escaped = chars[i + 1];
                        match escaped {
                            'n' => text.push('\n'),
                            't' => text.push('\t'),
                            'r' => text.push('\r'),
                            '\\' | '"' | '$' | '`' => text.push(escaped),
                            other => {
                                text.push('\\');
                                text.push(other);
                            }
                        }
                        i += 2;
                        continue;
                    }
                    text.push(dc);
                    i += 1;
                }
            }
            '\\' => {
                // Unquoted escape: next char is literal; a trailing
                // backslash stands for itself
                if let Some(&escaped) = chars.get(i + 1) {
                    was_quoted = true;
                    text.push(escaped);
                    i += 2;
                } else {
                    text.push('\\');
                    i += 1;
                }
            }
            _ => {
                text.push(c);
                i += 1;
            }
        }
        if text.len() > MAX_TOKEN_LENGTH {
            return Err(ShellError::TokenTooLong {
                limit: MAX_TOKEN_LENGTH,
            });
        }
    }

    let token = Token {
        kind: TokenKind::Word,
        text,
        was_quoted,
    };
    Ok((token, i))
}
