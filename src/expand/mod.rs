//! Text-level expansion applied to a line before tokenizing.
//!
//! Order: aliases on the leading word, then variable references. Globbing
//! runs later, per word, in the command builder.

pub mod alias;
pub mod glob;
pub mod variables;

pub use alias::expand_aliases;
pub use glob::{expand_glob, glob_match, has_glob_chars};
pub use variables::expand_variables;

use crate::store::{Aliases, VarStore};

/// Alias expansion followed by variable expansion.
pub fn preprocess<S: VarStore + ?Sized>(line: &str, aliases: &Aliases, vars: &mut S) -> String {
    let aliased = expand_aliases(line, aliases);
    expand_variables(&aliased, vars)
}
