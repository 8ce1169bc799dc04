//! Groovy literal formatting

use crate::pipeline::{ArgValue, Argument};

/// Formats text as a Groovy string literal.
///
/// Plain text becomes a single-quoted literal. Text holding a closed `${...}`
/// expression becomes a double-quoted GString so the interpolation survives;
/// every other `$` is escaped. Text spanning several lines uses the
/// triple-quoted forms.
#[must_use]
pub fn string(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let interpolated = (0..chars.len()).any(|i| interpolation_end(&chars, i).is_some());
    let multiline = value.contains('\n');
    match (interpolated, multiline) {
        (false, false) => format!("'{}'", escape_single(value)),
        (false, true) => format!("'''{}'''", escape_single(value)),
        (true, false) => format!("\"{}\"", escape_double(&chars)),
        (true, true) => format!("\"\"\"{}\"\"\"", escape_double(&chars)),
    }
}

/// Index of the `}` closing a `${` that starts at `start`.
///
/// The expression must be non-empty, balance its braces and hold no quotes
/// or backslashes, which would need escaping inside the literal.
fn interpolation_end(chars: &[char], start: usize) -> Option<usize> {
    if chars.get(start) != Some(&'$') || chars.get(start + 1) != Some(&'{') {
        return None;
    }
    let mut depth = 0_usize;
    for (offset, c) in chars[start + 2..].iter().enumerate() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return (offset > 0).then_some(start + 2 + offset),
            '}' => depth -= 1,
            '"' | '\'' | '\\' => return None,
            _ => {}
        }
    }
    None
}

fn escape_single(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn escape_double(chars: &[char]) -> String {
    let mut escaped = String::with_capacity(chars.len());
    let mut index = 0;
    while index < chars.len() {
        if let Some(end) = interpolation_end(chars, index) {
            escaped.extend(&chars[index..=end]);
            index = end + 1;
            continue;
        }
        match chars[index] {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            c => escaped.push(c),
        }
        index += 1;
    }
    escaped
}

/// Formats an argument value
#[must_use]
pub fn value(value: &ArgValue) -> String {
    match value {
        ArgValue::String(s) => string(s),
        ArgValue::Integer(i) => i.to_string(),
        ArgValue::Float(f) => format!("{f:?}"),
        ArgValue::Boolean(b) => b.to_string(),
        ArgValue::List(items) => {
            let items: Vec<_> = items.iter().map(self::value).collect();
            format!("[{}]", items.join(", "))
        }
        // blocks are emitted as trailing closures by the step renderer
        ArgValue::Block(_) => String::new(),
    }
}

/// Formats a call argument list: positionals first as written, then `key: value`
#[must_use]
pub fn arguments<'a>(args: impl IntoIterator<Item = &'a Argument>) -> String {
    args.into_iter()
        .filter(|arg| !matches!(arg.value, ArgValue::Block(_)))
        .map(|arg| match &arg.keyword {
            Some(keyword) => format!("{keyword}: {}", value(&arg.value)),
            None => value(&arg.value),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
