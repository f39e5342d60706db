//! Invocation-name normalization.
//!
//! Logic-layer call sites arrive as written: `this.userDao.getUserById(id)`,
//! `dao.<User>find(a, b(c))`, `UserDao::delete`. Matching against DAO methods
//! compares the bare method name only.

use std::sync::LazyLock;

use compact_str::CompactString;
use regex::Regex;

/// Explicit generic type witness, innermost first: `<User>`, `<K, V>`
static GENERIC_WITNESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("valid regex"));

/// Receiver separators: `.`, `::` and `->`
static RECEIVER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.|::|->").expect("valid regex"));

/// Reduce an invocation to the bare method name
pub fn normalize_invocation(raw: &str) -> CompactString {
    let text = strip_trailing_arguments(raw.trim());

    let mut text = text.to_string();
    while GENERIC_WITNESS_REGEX.is_match(&text) {
        text = GENERIC_WITNESS_REGEX.replace_all(&text, "").into_owned();
    }

    RECEIVER_REGEX
        .split(&text)
        .last()
        .map(str::trim)
        .unwrap_or_default()
        .into()
}

/// Drop the balanced argument list closing the text, if any
fn strip_trailing_arguments(text: &str) -> &str {
    if !text.ends_with(')') {
        return text;
    }
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return text[..idx].trim_end();
                }
            }
            _ => {}
        }
    }
    text
}
