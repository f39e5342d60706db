//! MyBatis mapper-text preprocessing.
//!
//! Dynamic elements are flattened into one static statement. Every `<if>`
//! body contributes its columns; a `<choose>` contributes a single branch:
//! - `<if>`: tag dropped, body kept
//! - `<choose>`: first `<when>` body kept (or `<otherwise>` without one)
//! - `<foreach open="(" close=")">`: `open body close`
//! - `<where>`, `<set>`, `<trim>`: prefix emitted, leading `AND`/`OR` and
//!   trailing commas removed; nested blocks are rendered innermost first
//! - `<include>`, `<bind>`: dropped
//!
//! # Placeholders
//!
//! ```sql
//! SELECT * FROM users WHERE id = #{id, jdbcType=INTEGER} ORDER BY ${sort}
//! ```
//!
//! becomes `SELECT * FROM users WHERE id = ? ORDER BY sort`.

use std::sync::LazyLock;

use compact_str::CompactString;
use regex::{Captures, Regex};

use super::{Placeholder, PreprocessorMetadata, PreprocessorResult};

/// CDATA section; its body is escaped so tag patterns skip it
static CDATA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));

/// XML comment
static COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// `<choose>` block
static CHOOSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<choose\s*>(.*?)</choose\s*>").expect("valid regex"));

/// `<when>` / `<otherwise>` branch inside a choose block
static BRANCH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(when|otherwise)\b(?:[^>"']|"[^"]*"|'[^']*')*>(.*?)</(?:when|otherwise)\s*>"#)
        .expect("valid regex")
});

/// `<foreach ...>body</foreach>`
static FOREACH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<foreach\b((?:[^>"']|"[^"]*"|'[^']*')*)>(.*?)</foreach\s*>"#)
        .expect("valid regex")
});

/// Conditional and inert elements whose tags are dropped
static CONDITIONAL_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"</?(?:if|when|otherwise|include|bind|property)\b(?:[^>"']|"[^"]*"|'[^']*')*/?>"#)
        .expect("valid regex")
});

/// Opening `<where>`, `<set>` or `<trim>` tag
static CLAUSE_OPEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(where|set|trim)\b((?:[^>"'/]|"[^"]*"|'[^']*')*)>"#).expect("valid regex")
});

static CLAUSE_CLOSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</(?:where|set|trim)\s*>").expect("valid regex"));

/// Any remaining element tag
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"</?[A-Za-z][\w:.-]*(?:[^>"']|"[^"]*"|'[^']*')*/?>"#).expect("valid regex")
});

/// `name="value"` attribute
static ATTRIBUTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z]+)\s*=\s*"([^"]*)""#).expect("valid regex"));

/// `#{name, jdbcType=...}`
static PARAMETER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\{\s*([^,}\s]+)[^}]*\}").expect("valid regex"));

/// `${name}`
static SUBSTITUTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\s*([^}\s]+)\s*\}").expect("valid regex"));

static LEADING_CONNECTIVE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:AND|OR)\b").expect("valid regex"));

static TRAILING_COMMA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*$").expect("valid regex"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Preprocess one MyBatis statement body, rendering parameters as `?`.
pub fn preprocess(sql: &str) -> PreprocessorResult {
    preprocess_with(sql, Placeholder::Question)
}

/// Preprocess one MyBatis statement body.
pub fn preprocess_with(sql: &str, placeholder: Placeholder) -> PreprocessorResult {
    let mut metadata = PreprocessorMetadata::default();

    let result = COMMENT_REGEX.replace_all(sql, " ");
    let result = CDATA_REGEX.replace_all(&result, |caps: &Captures<'_>| escape(&caps[1]));
    let result = CHOOSE_REGEX.replace_all(&result, |caps: &Captures<'_>| first_branch(&caps[1]));
    let result = FOREACH_REGEX.replace_all(&result, |caps: &Captures<'_>| {
        let open = attribute(&caps[1], "open").unwrap_or_default();
        let close = attribute(&caps[1], "close").unwrap_or_default();
        format!(" {}{}{} ", open, &caps[2], close)
    });
    let result = CONDITIONAL_TAG_REGEX.replace_all(&result, " ");
    let result = expand_clauses(&result);
    let result = TAG_REGEX.replace_all(&result, " ");

    extract_parameters(&result, &mut metadata);
    extract_substitutions(&result, &mut metadata);

    let mut position = 0usize;
    let result = PARAMETER_REGEX.replace_all(&result, |_: &Captures<'_>| match placeholder {
        Placeholder::Question => "?".to_string(),
        Placeholder::Numbered => {
            position += 1;
            format!("${}", position)
        }
    });
    let result = SUBSTITUTION_REGEX.replace_all(&result, |caps: &Captures<'_>| identifier(&caps[1]));
    let result = unescape(&result);

    PreprocessorResult {
        sql: normalize_whitespace(&result),
        metadata
    }
}

fn first_branch(body: &str) -> String {
    let mut otherwise = None;
    for caps in BRANCH_REGEX.captures_iter(body) {
        match &caps[1] {
            "when" => return format!(" {} ", &caps[2]),
            _ => otherwise = otherwise.or_else(|| Some(caps[2].to_string()))
        }
    }
    format!(" {} ", otherwise.unwrap_or_default())
}

/// Render clause blocks innermost first: the last opening tag is always
/// closed by the first closing tag after it
fn expand_clauses(text: &str) -> String {
    let mut text = text.to_string();
    while let Some((range, rendered)) = innermost_clause(&text) {
        text.replace_range(range, &rendered);
    }
    text
}

fn innermost_clause(text: &str) -> Option<(std::ops::Range<usize>, String)> {
    let open = CLAUSE_OPEN_REGEX.captures_iter(text).last()?;
    let tag = open.get(0)?;
    match CLAUSE_CLOSE_REGEX.find_at(text, tag.end()) {
        Some(close) => Some((
            tag.start()..close.end(),
            clause(&open[1], &open[2], &text[tag.end()..close.start()])
        )),
        // Unclosed: drop the tag alone
        None => Some((tag.range(), " ".to_string()))
    }
}

/// Render a `<where>`, `<set>` or `<trim>` block
fn clause(kind: &str, attributes: &str, body: &str) -> String {
    let body = body.trim();
    let (prefix, body) = match kind {
        "where" => ("WHERE".to_string(), LEADING_CONNECTIVE_REGEX.replace(body, "").into_owned()),
        "set" => ("SET".to_string(), TRAILING_COMMA_REGEX.replace(body, "").into_owned()),
        _ => {
            let mut body = body.to_string();
            if let Some(overrides) = attribute(attributes, "prefixOverrides") {
                body = strip_overrides(&body, &overrides, true);
            }
            if let Some(overrides) = attribute(attributes, "suffixOverrides") {
                body = strip_overrides(&body, &overrides, false);
            }
            let suffix = attribute(attributes, "suffix").unwrap_or_default();
            body.push(' ');
            body.push_str(&suffix);
            (attribute(attributes, "prefix").unwrap_or_default(), body)
        }
    };
    if body.trim().is_empty() {
        return " ".to_string();
    }
    format!(" {} {} ", prefix, body.trim())
}

/// Remove the first matching `|`-separated override at the start or end
fn strip_overrides(body: &str, overrides: &str, leading: bool) -> String {
    let trimmed = body.trim();
    for candidate in overrides.split('|').map(str::trim).filter(|c| !c.is_empty()) {
        let len = candidate.len();
        if leading {
            if trimmed.len() >= len
                && trimmed.is_char_boundary(len)
                && trimmed[..len].eq_ignore_ascii_case(candidate)
            {
                return trimmed[len..].to_string();
            }
        } else if trimmed.len() >= len
            && trimmed.is_char_boundary(trimmed.len() - len)
            && trimmed[trimmed.len() - len..].eq_ignore_ascii_case(candidate)
        {
            return trimmed[..trimmed.len() - len].to_string();
        }
    }
    trimmed.to_string()
}

fn attribute(attributes: &str, name: &str) -> Option<String> {
    ATTRIBUTE_REGEX
        .captures_iter(attributes)
        .find(|caps| &caps[1] == name)
        .map(|caps| unescape(&caps[2]))
}

fn extract_parameters(sql: &str, metadata: &mut PreprocessorMetadata) {
    for cap in PARAMETER_REGEX.captures_iter(sql) {
        push_unique(&mut metadata.parameters, &cap[1]);
    }
}

fn extract_substitutions(sql: &str, metadata: &mut PreprocessorMetadata) {
    for cap in SUBSTITUTION_REGEX.captures_iter(sql) {
        push_unique(&mut metadata.substitutions, &cap[1]);
    }
}

fn push_unique(names: &mut Vec<CompactString>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.into());
    }
}

/// `${user.sort}` → `user_sort`
fn identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Normalize excessive whitespace.
fn normalize_whitespace(sql: &str) -> String {
    WHITESPACE_REGEX.replace_all(sql.trim(), " ").to_string()
}
