use crate::store::Aliases;

/// Replace the leading word of `input` with its alias value, if any.
///
/// Exactly one substitution pass: an alias whose value starts with another
/// alias name (or itself) is not expanded again.
pub fn expand_aliases(input: &str, aliases: &Aliases) -> String {
    let trimmed = input.trim_start();
    let prefix_len = input.len() - trimmed.len();
    let word_len = trimmed
        .find(char::is_whitespace)
        .unwrap_or(trimmed.len());
    let word = &trimmed[..word_len];
    if word.is_empty() {
        return input.to_string();
    }

    match aliases.get(word) {
        Some(value) => {
            let mut out = String::with_capacity(input.len() + value.len());
            out.push_str(&input[..prefix_len]);
            out.push_str(value);
            out.push_str(&trimmed[word_len..]);
            out
        }
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> Aliases {
        [("ll", "ls -l"), ("loop", "loop --again"), ("a", "b"), ("b", "c")]
            .into_iter()
            .collect()
    }

    #[test]
    fn leading_word_replaced() {
        assert_eq!(expand_aliases("ll /tmp", &aliases()), "ls -l /tmp");
    }

    #[test]
    fn leading_whitespace_kept() {
        assert_eq!(expand_aliases("  ll", &aliases()), "  ls -l");
    }

    #[test]
    fn only_leading_word() {
        assert_eq!(expand_aliases("echo ll", &aliases()), "echo ll");
    }

    #[test]
    fn not_recursive() {
        assert_eq!(expand_aliases("loop", &aliases()), "loop --again");
        assert_eq!(expand_aliases("a x", &aliases()), "b x");
    }

    #[test]
    fn empty_line() {
        assert_eq!(expand_aliases("   ", &aliases()), "   ");
    }
}
