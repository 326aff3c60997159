//! Filename globbing: `*`, `?`, `[...]` with ranges and `!`/`^` negation.
//!
//! Matching is confined to a single directory level: the directory part
//! of a pattern (everything up to the last `/`) is taken literally.

use std::fs;
use std::path::Path;

/// True when `word` contains a glob metacharacter.
pub fn has_glob_chars(word: &str) -> bool {
    word.contains(['*', '?', '['])
}

/// Match `name` against `pattern` in full.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    match_from(&pattern, &name)
}

fn match_from(pattern: &[char], name: &[char]) -> bool {
    let (mut p, mut n) = (0, 0);
    // Backtrack point: pattern index after the last `*`, and the name
    // index that star is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    star = Some((p + 1, n));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    n += 1;
                    continue;
                }
                '[' => match match_class(&pattern[p..], name[n]) {
                    Some((true, width)) => {
                        p += width;
                        n += 1;
                        continue;
                    }
                    // Unclosed bracket: literal `[`
                    None if name[n] == '[' => {
                        p += 1;
                        n += 1;
                        continue;
                    }
                    _ => {}
                },
                c if c == name[n] => {
                    p += 1;
                    n += 1;
                    continue;
                }
                _ => {}
            }
        }
        match star {
            Some((star_p, star_n)) => {
                p = star_p;
                n = star_n + 1;
                star = Some((star_p, star_n + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Match one char against the bracket expression at `class[0] == '['`.
/// Returns `(matched, width)` or `None` when there is no closing `]`.
fn match_class(class: &[char], c: char) -> Option<(bool, usize)> {
    let mut i = 1;
    let negated = matches!(class.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }
    let mut matched = false;
    let mut first = true;

    loop {
        let current = *class.get(i)?;
        if current == ']' && !first {
            break;
        }
        first = false;
        if class.get(i + 1) == Some(&'-')
            && let Some(&hi) = class.get(i + 2)
            && hi != ']'
        {
            if current <= c && c <= hi {
                matched = true;
            }
            i += 3;
        } else {
            if current == c {
                matched = true;
            }
            i += 1;
        }
    }

    Some((matched != negated, i + 1))
}

/// Expand `pattern` against the filesystem.
///
/// Returns the sorted list of matching paths, or `pattern` itself when
/// nothing matches or the directory cannot be read. Dotfiles only match
/// patterns whose final component starts with `.`.
pub fn expand_glob(pattern: &str) -> Vec<String> {
    let (dir, prefix, file_pattern) = match pattern.rfind('/') {
        Some(0) => ("/", "/", &pattern[1..]),
        Some(idx) => (&pattern[..idx], &pattern[..=idx], &pattern[idx + 1..]),
        None => (".", "", pattern),
    };

    let Ok(entries) = fs::read_dir(Path::new(dir)) else {
        return vec![pattern.to_string()];
    };

    let show_hidden = file_pattern.starts_with('.');
    let mut matches: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| show_hidden || !name.starts_with('.'))
        .filter(|name| glob_match(file_pattern, name))
        .map(|name| format!("{prefix}{name}"))
        .collect();

    if matches.is_empty() {
        return vec![pattern.to_string()];
    }
    matches.sort();
    matches
}
