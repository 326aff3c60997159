//! `$name`, `${name}`, `${name:-default}`, `${name:=default}`, `${#name}`.

use crate::store::VarStore;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_special(c: char) -> bool {
    matches!(c, '?' | '$' | '!' | '#' | '@' | '*')
}

/// Expand variable references left to right.
///
/// Backslash pairs are copied through untouched so the tokenizer can
/// resolve them (`\$X` stays a literal `$X`), and nothing inside single
/// quotes is expanded. Substituted values are escaped so the tokenizer
/// reads them as data; whitespace is left bare so unquoted values still
/// split into words.
pub fn expand_variables<S: VarStore + ?Sized>(input: &str, vars: &mut S) -> String {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let (mut sq, mut dq) = (false, false);

    while i < len {
        let c = chars[i];

        if c == '\\' && !sq && i + 1 < len {
            out.push(c);
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == '\'' && !dq {
            sq = !sq;
            out.push(c);
            i += 1;
            continue;
        }
        if c == '"' && !sq {
            dq = !dq;
            out.push(c);
            i += 1;
            continue;
        }
        if c == '$' && !sq {
            let (value, consumed) = expand_reference(&chars[i..], vars);
            escape_value(&value, dq, &mut out);
            i += consumed;
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

/// Characters the tokenizer would treat as syntax outside quotes.
fn is_syntax_char(c: char) -> bool {
    matches!(
        c,
        '\'' | '"' | '\\' | ';' | '|' | '&' | '<' | '>' | '(' | ')' | '#'
    )
}

/// Append `value` so that re-lexing yields exactly its characters.
/// Inside double quotes only `"`, `\`, `$` and `` ` `` need a backslash.
fn escape_value(value: &str, in_double_quotes: bool, out: &mut String) {
    for c in value.chars() {
        let escape = if in_double_quotes {
            matches!(c, '"' | '\\' | '$' | '`')
        } else {
            is_syntax_char(c)
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
}

fn is_identifier(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(is_name_char)
}

/// Expand one reference starting at `chars[0] == '$'`.
/// Returns the replacement text and the number of chars consumed.
fn expand_reference<S: VarStore + ?Sized>(chars: &[char], vars: &mut S) -> (String, usize) {
    let Some(&first) = chars.get(1) else {
        return ("$".to_string(), 1);
    };

    if first == '{' {
        return expand_braced(chars, vars);
    }
    if is_special(first) || first.is_ascii_digit() {
        let name = first.to_string();
        return (vars.get(&name).unwrap_or_default(), 2);
    }
    if is_name_char(first) {
        let end = chars[1..]
            .iter()
            .position(|c| !is_name_char(*c))
            .map_or(chars.len(), |p| p + 1);
        let name: String = chars[1..end].iter().collect();
        return (vars.get(&name).unwrap_or_default(), end);
    }

    ("$".to_string(), 1)
}

fn expand_braced<S: VarStore + ?Sized>(chars: &[char], vars: &mut S) -> (String, usize) {
    // chars = "${...}"
    let Some(close) = chars.iter().position(|c| *c == '}') else {
        return ("$".to_string(), 1);
    };
    let consumed = close + 1;
    let body = &chars[2..close];

    if let Some(('#', rest)) = body.split_first()
        && !rest.is_empty()
    {
        let name: String = rest.iter().collect();
        let len = vars.get(&name).map_or(0, |v| v.chars().count());
        return (len.to_string(), consumed);
    }

    let name_end = match body.first() {
        Some(c) if is_special(*c) => 1,
        _ => body
            .iter()
            .position(|c| !is_name_char(*c))
            .unwrap_or(body.len()),
    };
    let name: String = body[..name_end].iter().collect();
    if name.is_empty() {
        // `${}` or `${:-x}`: nothing to look up, keep the text
        return (chars[..consumed].iter().collect(), consumed);
    }
    let modifier = &body[name_end..];
    let value = vars.get(&name).filter(|v| !v.is_empty());

    let replacement = match modifier {
        [':', '-', default @ ..] => value.unwrap_or_else(|| default.iter().collect()),
        [':', '=', default @ ..] => match value {
            Some(v) => v,
            None => {
                let default: String = default.iter().collect();
                if is_identifier(&name) {
                    vars.set(&name, &default);
                }
                default
            }
        },
        _ => value.unwrap_or_default(),
    };
    (replacement, consumed)
}
