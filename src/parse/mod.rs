pub mod builder;
pub mod grammar;
pub mod tokenize;
pub mod types;

pub use builder::{build_command, build_pipeline, open_input, open_output, check_redirections};
pub use grammar::{Verdict, validate};
pub use tokenize::{MAX_TOKEN_LENGTH, tokenize};
pub use types::{Command, Pipeline, Token, TokenKind, render_argv, render_tokens, split_assignment};
