//! MyBatis mapper XML decoding.
//!
//! `<mapper namespace>` supplies the namespace; each `<select>`, `<insert>`,
//! `<update>` and `<delete>` element becomes one statement whose body is
//! the element's inner markup, re-serialized as written. Dynamic tags,
//! entities and CDATA are left for the preprocessor. `<include refid>` is
//! replaced by the body of the matching `<sql id>` fragment.

use std::{collections::HashMap, sync::LazyLock};

use compact_str::CompactString;
use quick_xml::{
    Reader,
    events::{BytesStart, Event}
};
use regex::{Captures, Regex};
use tracing::debug;

use super::types::{MapperDocument, MapperStatement};
use crate::{
    error::{AppResult, malformed_input_error},
    lineage::CrudKind
};

/// `<include refid="..."/>`, self-closing or with `<property>` children
static INCLUDE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<include\s+refid\s*=\s*["']([^"']+)["']\s*(?:/>|>.*?</include\s*>)"#)
        .expect("valid regex")
});

/// Fragments may include other fragments; expansion stops past this depth
const MAX_INCLUDE_DEPTH: usize = 8;

/// Element currently being captured
struct Capture {
    id:    CompactString,
    kind:  Option<CrudKind>,
    depth: usize,
    body:  String
}

/// Decode a mapper XML file
///
/// # Errors
///
/// Returns a malformed-input error when the text is not well-formed XML
pub fn parse_mapper_xml(file: &str, text: &str) -> AppResult<MapperDocument> {
    let mut reader = Reader::from_str(text);
    let mut namespace = CompactString::default();
    let mut statements = Vec::new();
    let mut fragments: HashMap<CompactString, String> = HashMap::new();
    let mut capture: Option<Capture> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed_input_error(file, e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Start(start) => {
                if let Some(open) = capture.as_mut() {
                    open.depth += 1;
                    open.body.push('<');
                    open.body.push_str(&String::from_utf8_lossy(&start));
                    open.body.push('>');
                    continue;
                }
                let name = start.local_name();
                match name.as_ref() {
                    b"mapper" => {
                        namespace = attribute(&start, "namespace").unwrap_or_default();
                    }
                    b"select" | b"insert" | b"update" | b"delete" | b"sql" => {
                        capture = Some(Capture {
                            id:    attribute(&start, "id").unwrap_or_default(),
                            kind:  element_kind(name.as_ref()),
                            depth: 0,
                            body:  String::new()
                        });
                    }
                    _ => {}
                }
            }
            Event::Empty(empty) => {
                if let Some(open) = capture.as_mut() {
                    open.body.push('<');
                    open.body.push_str(&String::from_utf8_lossy(&empty));
                    open.body.push_str("/>");
                }
            }
            Event::End(end) => {
                let Some(open) = capture.as_mut() else {
                    continue;
                };
                if open.depth > 0 {
                    open.depth -= 1;
                    open.body.push_str("</");
                    open.body.push_str(&String::from_utf8_lossy(end.name().as_ref()));
                    open.body.push('>');
                    continue;
                }
                if let Some(done) = capture.take() {
                    match done.kind {
                        Some(kind) => statements.push((done.id, done.body, kind)),
                        None => {
                            fragments.insert(done.id, done.body);
                        }
                    }
                }
            }
            Event::Text(text) => {
                if let Some(open) = capture.as_mut() {
                    open.body.push_str(&String::from_utf8_lossy(&text));
                }
            }
            Event::CData(data) => {
                if let Some(open) = capture.as_mut() {
                    open.body.push_str("<![CDATA[");
                    open.body.push_str(&String::from_utf8_lossy(&data));
                    open.body.push_str("]]>");
                }
            }
            _ => {}
        }
    }

    let statements: Vec<MapperStatement> = statements
        .into_iter()
        .map(|(id, body, kind)| MapperStatement {
            id,
            sql: inline_fragments(&body, &fragments, 0),
            kind: Some(kind)
        })
        .collect();
    debug!(file, namespace = %namespace, statements = statements.len(), "decoded mapper xml");
    Ok(MapperDocument {
        namespace,
        statements
    })
}

fn element_kind(name: &[u8]) -> Option<CrudKind> {
    match name {
        b"select" => Some(CrudKind::Read),
        b"insert" => Some(CrudKind::Create),
        b"update" => Some(CrudKind::Update),
        b"delete" => Some(CrudKind::Delete),
        _ => None
    }
}

fn attribute(start: &BytesStart<'_>, key: &str) -> Option<CompactString> {
    let attr = start.try_get_attribute(key).ok().flatten()?;
    let value = attr.unescape_value().ok()?;
    Some(value.trim().into())
}

/// Replace includes with fragment bodies; unknown refids are left for the
/// preprocessor to drop
fn inline_fragments(body: &str, fragments: &HashMap<CompactString, String>, depth: usize) -> String {
    if depth >= MAX_INCLUDE_DEPTH || !body.contains("<include") {
        return body.to_string();
    }
    INCLUDE_REGEX
        .replace_all(body, |caps: &Captures<'_>| {
            let refid = &caps[1];
            // Cross-mapper refids are namespace-qualified
            let local = refid.rsplit('.').next().unwrap_or(refid);
            match fragments.get(refid).or_else(|| fragments.get(local)) {
                Some(fragment) => format!(" {} ", inline_fragments(fragment, fragments, depth + 1)),
                None => caps[0].to_string()
            }
        })
        .into_owned()
}
