//! Types produced by the tokenizer and builder and consumed by the engine.

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    /// `|`
    Pipe,
    /// `;`
    Semicolon,
    /// `&`
    Ampersand,
    /// `&&`: run next only if previous succeeded
    And,
    /// `||`: run next only if previous failed
    Or,
    /// `<`
    InputRedirect,
    /// `>` or `>>`
    OutputRedirect { append: bool },
    /// `<<`
    Heredoc,
    /// `<<<`
    Herestring,
    LParen,
    RParen,
    Newline,
    Eof,
}

impl TokenKind {
    /// True for the operators that separate list elements or pipeline stages.
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Pipe
                | TokenKind::Semicolon
                | TokenKind::Ampersand
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Newline
        )
    }

    /// True for operators that consume the following word as a file target.
    pub fn is_redirection(self) -> bool {
        matches!(
            self,
            TokenKind::InputRedirect | TokenKind::OutputRedirect { .. }
        )
    }

    /// True for `;`, `&` and newline, which split a line into list segments.
    pub fn is_list_separator(self) -> bool {
        matches!(
            self,
            TokenKind::Semicolon | TokenKind::Ampersand | TokenKind::Newline
        )
    }
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Word text after quote removal, or the operator's spelling.
    pub text: String,
    /// Set when any part of a word was quoted or escaped; such words are
    /// never glob-expanded.
    pub was_quoted: bool,
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Word,
            text: text.into(),
            was_quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Word,
            text: text.into(),
            was_quoted: true,
        }
    }

    pub fn operator(kind: TokenKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            was_quoted: false,
        }
    }

    pub fn eof() -> Self {
        Self::operator(TokenKind::Eof, "")
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Render tokens back into a display string, quoting words that need it.
///
/// Used for job listings, where the original line is no longer available.
pub fn render_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| match t.kind {
            TokenKind::Word => shlex::try_quote(&t.text)
                .map(|q| q.into_owned())
                .unwrap_or_else(|_| t.text.clone()),
            _ => t.text.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render an argv as a display string.
pub fn render_argv(argv: &[String]) -> String {
    shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
}

/// A single command ready for execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// `argv[0]` is the program or builtin name. Never empty once built.
    pub argv: Vec<String>,
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    /// Open `output_file` for append (`>>`) instead of truncate (`>`).
    pub append: bool,
}

impl Command {
    pub fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    /// `NAME=value` alone on the line: a shell variable assignment.
    pub fn assignment(&self) -> Option<(&str, &str)> {
        match self.argv.as_slice() {
            [only] => split_assignment(only),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        render_argv(&self.argv)
    }
}

/// Split `NAME=value` where NAME is a valid identifier.
pub fn split_assignment(word: &str) -> Option<(&str, &str)> {
    let (name, value) = word.split_once('=')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Some((name, value))
    } else {
        None
    }
}

/// Commands joined by `|`, left to right.
///
/// Only the first command's `input_file` and the last command's
/// `output_file` are honored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
