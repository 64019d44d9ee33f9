//! Name tokens.
//!
//! A name is written bare when it starts with a letter or `_` and holds only
//! alphanumerics and `_`. Anything else is wrapped in single quotes with
//! embedded quotes doubled, so `unquote(quote(n)) == n` for every name.

use std::borrow::Cow;

pub fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return true,
    }
    !chars.all(|c| c.is_alphanumeric() || c == '_')
}

pub fn quote(name: &str) -> Cow<'_, str> {
    if needs_quoting(name) {
        Cow::Owned(format!("'{}'", name.replace('\'', "''")))
    } else {
        Cow::Borrowed(name)
    }
}

/// `Table.Column` with each part quoted as needed.
pub fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", quote(table), quote(column))
}

/// Inverse of [`quote`]. Returns `None` unless `token` is exactly one name.
pub fn unquote(token: &str) -> Option<String> {
    match split_name(token) {
        Some((name, "")) => Some(name),
        _ => None,
    }
}

/// Read one name token from the start of `input`, returning it with the
/// unconsumed remainder.
pub fn split_name(input: &str) -> Option<(String, &str)> {
    if let Some(body) = input.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                name.push('\'');
            } else {
                return Some((name, &body[i + 1..]));
            }
        }
        // Unterminated quote
        None
    } else {
        let end = input
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(input.len());
        let name = &input[..end];
        if name.is_empty() || needs_quoting(name) {
            return None;
        }
        Some((name.to_string(), &input[end..]))
    }
}

/// Split `Table.Column` back into its parts.
pub fn split_qualified(input: &str) -> Option<(String, String)> {
    let (table, rest) = split_name(input)?;
    let rest = rest.strip_prefix('.')?;
    let column = unquote(rest)?;
    Some((table, column))
}
