//! Best-effort repair of near-JSON produced by a language model.
//!
//! Stages run in order and the first text that `serde_json` accepts wins:
//! the candidate as-is, targeted escaping of long free-text fields, a
//! token-level structural pass, and finally a bounded truncation loop for
//! output that was cut off mid-object.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

pub const MAX_TRUNCATION_PASSES: usize = 12;
const MAX_TRIM_ROUNDS: usize = 8;

/// Fields whose values are long free text and most often carry raw
/// newlines or unescaped quotes.
const LONG_TEXT_FIELDS: &[&str] = &[
    "code",
    "gameCode",
    "styles",
    "cssStyles",
    "htmlStructure",
    "rules",
    "description",
    "rawModelOutput",
];

static FIELD_START: LazyLock<Regex> = LazyLock::new(|| {
    let names = LONG_TEXT_FIELDS.join("|");
    Regex::new(&format!(r#""(?:{names})"\s*:\s*""#)).expect("field pattern compiles")
});

/// What may follow the closing quote of an object member's string value.
static VALUE_TERMINATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:,\s*(?:"[A-Za-z_][A-Za-z0-9_]*"\s*:|[}\]]|$)|\}\s*(?:[,}\]]|$)|$)"#)
        .expect("terminator pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    AsIs,
    FieldEscaped,
    Structural,
    Truncated { passes: usize },
}

#[derive(Debug, Clone)]
pub struct Repaired {
    pub text: String,
    pub value: Value,
    pub stage: RepairStage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepairError {
    #[error("candidate is empty")]
    Empty,

    #[error("no parseable JSON after {passes} truncation passes")]
    Exhausted { passes: usize },
}

pub fn repair(candidate: &str) -> Result<Repaired, RepairError> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err(RepairError::Empty);
    }

    if let Some(done) = attempt(candidate, RepairStage::AsIs) {
        return Ok(done);
    }
    if let Some(done) = leading_value(candidate) {
        return Ok(done);
    }

    let escaped = escape_long_fields(candidate);
    if escaped != candidate {
        if let Some(done) = attempt(&escaped, RepairStage::FieldEscaped) {
            return Ok(done);
        }
    }

    if let Some(done) = attempt(&close_structure(&escaped), RepairStage::Structural) {
        return Ok(done);
    }
    // The field pass can misjudge where a value ends; retry without it.
    if escaped != candidate {
        if let Some(done) = attempt(&close_structure(candidate), RepairStage::Structural) {
            return Ok(done);
        }
    }

    truncate_until_valid(&escaped)
}

fn attempt(text: &str, stage: RepairStage) -> Option<Repaired> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            debug!("repair stage {stage:?} produced valid JSON");
            Some(Repaired {
                text: text.to_string(),
                value,
                stage,
            })
        }
        Err(e) => {
            debug!("repair stage {stage:?} failed: {e}");
            None
        }
    }
}

/// A complete value followed by stray text, such as prose after the object.
fn leading_value(text: &str) -> Option<Repaired> {
    let mut values = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    let value = values.next()?.ok()?;
    let end = values.byte_offset();
    debug!("candidate holds a complete value in its first {end} bytes");
    Some(Repaired {
        text: text[..end].to_string(),
        value,
        stage: RepairStage::AsIs,
    })
}

/* =========================
   Field-targeted escaping
   ========================= */

/// Escape raw newlines, stray quotes and lone backslashes inside the values
/// of known long-text fields, leaving the rest of the document untouched.
pub fn escape_long_fields(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut cursor = 0;

    while let Some(m) = FIELD_START.find_at(text, cursor) {
        let value_start = m.end();
        let value_end = find_value_end(text, value_start);
        out.push_str(&text[cursor..value_start]);
        out.push_str(&escape_string_body(&text[value_start..value_end]));
        cursor = value_end;
    }

    out.push_str(&text[cursor..]);
    out
}

/// Offset of the quote that really closes the value starting at `start`,
/// or the end of text for a value cut off by truncation.
fn find_value_end(text: &str, start: usize) -> usize {
    let mut backslashes = 0usize;
    for (offset, b) in text.as_bytes()[start..].iter().enumerate() {
        match b {
            b'\\' => backslashes += 1,
            b'"' => {
                let i = start + offset;
                if backslashes % 2 == 0 && VALUE_TERMINATOR.is_match(&text[i + 1..]) {
                    return i;
                }
                backslashes = 0;
            }
            _ => backslashes = 0,
        }
    }
    text.len()
}

fn is_simple_escape(c: char) -> bool {
    matches!(c, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't')
}

fn is_unicode_escape<I: Iterator<Item = char>>(mut after_u: I) -> bool {
    (0..4).all(|_| after_u.next().is_some_and(|c| c.is_ascii_hexdigit()))
}

fn push_control(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c => out.push_str(&format!("\\u{:04x}", c as u32)),
    }
}

fn escape_string_body(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 8);
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some('u') if is_unicode_escape(chars.clone().skip(1)) => out.push('\\'),
                Some(next) if is_simple_escape(next) => {
                    out.push('\\');
                    out.push(next);
                    chars.next();
                }
                _ => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            c if c.is_control() && (c as u32) < 0x20 => push_control(&mut out, c),
            c => out.push(c),
        }
    }

    out
}

/* =========================
   Structural pass
   ========================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Start,
    Open,
    Key,
    Colon,
    Value,
    Comma,
}

/// Token-level repair: escapes control characters inside strings, accepts
/// typographic quotes as delimiters, drops dangling commas, fills a missing
/// value with `null` and closes open strings and containers in stack order.
pub fn close_structure(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut last = Last::Start;
    let mut string: Option<StringState> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(state) = string {
            match c {
                '\\' => match chars.peek().copied() {
                    Some('u') if is_unicode_escape(chars.clone().skip(1)) => out.push('\\'),
                    Some(next) if is_simple_escape(next) => {
                        out.push('\\');
                        out.push(next);
                        chars.next();
                    }
                    Some(_) => out.push_str("\\\\"),
                    None => {}
                },
                '"' => {
                    out.push('"');
                    string = None;
                    last = state.closed();
                }
                '\u{201d}' if state.typographic => {
                    out.push('"');
                    string = None;
                    last = state.closed();
                }
                c if (c as u32) < 0x20 => push_control(&mut out, c),
                c => out.push(c),
            }
            continue;
        }

        match c {
            '"' | '\u{201c}' | '\u{201d}' => {
                if last == Last::Value {
                    out.push(',');
                    last = Last::Comma;
                }
                string = Some(StringState {
                    typographic: c != '"',
                    key: stack.last() == Some(&'}') && matches!(last, Last::Open | Last::Comma),
                });
                out.push('"');
            }
            '{' | '[' => {
                if last == Last::Value {
                    out.push(',');
                }
                out.push(c);
                stack.push(if c == '{' { '}' } else { ']' });
                last = Last::Open;
            }
            '}' | ']' => {
                if !stack.contains(&c) {
                    continue;
                }
                finish_pending(&mut out, last);
                while let Some(closer) = stack.pop() {
                    out.push(closer);
                    if closer == c {
                        break;
                    }
                }
                last = Last::Value;
                if stack.is_empty() {
                    break;
                }
            }
            ',' => match last {
                Last::Value => {
                    out.push(',');
                    last = Last::Comma;
                }
                Last::Key | Last::Colon => {
                    finish_pending(&mut out, last);
                    out.push(',');
                    last = Last::Comma;
                }
                _ => {}
            },
            ':' => {
                if last == Last::Key {
                    out.push(':');
                    last = Last::Colon;
                }
            }
            c if c.is_whitespace() => out.push(c),
            c if c.is_control() => {}
            c => {
                out.push(c);
                last = Last::Value;
            }
        }
    }

    if let Some(state) = string {
        out.push('"');
        last = state.closed();
    }
    finish_pending(&mut out, last);
    if last == Last::Open {
        drop_empty_element(&mut out, &mut stack);
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct StringState {
    typographic: bool,
    key: bool,
}

impl StringState {
    fn closed(&self) -> Last {
        if self.key {
            Last::Key
        } else {
            Last::Value
        }
    }
}

/// A list element opened right before the input ended holds nothing; drop
/// it with its comma rather than closing it into an empty entry.
fn drop_empty_element(out: &mut String, stack: &mut Vec<char>) {
    let body = out.trim_end();
    if !(body.ends_with('{') || body.ends_with('[')) {
        return;
    }
    let before = body[..body.len() - 1].trim_end();
    if before.ends_with(',') {
        out.truncate(before.len() - 1);
    } else if before.ends_with('[') {
        out.truncate(before.len());
    } else {
        return;
    }
    stack.pop();
}

fn finish_pending(out: &mut String, last: Last) {
    match last {
        Last::Comma => {
            let end = out.trim_end().len();
            if out[..end].ends_with(',') {
                out.truncate(end - 1);
            }
        }
        Last::Colon => out.push_str("null"),
        Last::Key => out.push_str(":null"),
        _ => {}
    }
}

/* =========================
   Truncation loop
   ========================= */

struct Opener {
    pos: usize,
    closer: char,
    /// Last comma directly inside this container.
    last_comma: Option<usize>,
}

struct Scan {
    open: Vec<Opener>,
    open_string: Option<usize>,
    last_string: Option<usize>,
}

fn scan(text: &str) -> Scan {
    let mut open: Vec<Opener> = Vec::new();
    let mut open_string = None;
    let mut last_string = None;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if let Some(start) = open_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                open_string = None;
                last_string = Some(start);
            }
            continue;
        }

        match b {
            b'"' => open_string = Some(i),
            b'{' | b'[' => open.push(Opener {
                pos: i,
                closer: if b == b'{' { '}' } else { ']' },
                last_comma: None,
            }),
            b'}' | b']' => {
                let closer = if b == b'}' { '}' } else { ']' };
                if open.last().map(|o| o.closer) == Some(closer) {
                    open.pop();
                }
            }
            b',' => {
                if let Some(inner) = open.last_mut() {
                    inner.last_comma = Some(i);
                }
            }
            _ => {}
        }
    }

    Scan {
        open,
        open_string,
        last_string,
    }
}

fn closers(scan: &Scan) -> String {
    scan.open.iter().rev().map(|o| o.closer).collect()
}

/// Start of a trailing object key that has no value yet.
fn dangling_key(text: &str) -> Option<usize> {
    if !text.ends_with('"') {
        return None;
    }
    let scan = scan(text);
    if scan.open_string.is_some() || scan.open.last()?.closer != '}' {
        return None;
    }
    let start = scan.last_string?;
    let before = text[..start].trim_end();
    (before.ends_with('{') || before.ends_with(',')).then_some(start)
}

/// Start of a trailing `{` or `[` opened as a list element with nothing in it.
fn empty_element_opener(text: &str) -> Option<usize> {
    if !(text.ends_with('{') || text.ends_with('[')) {
        return None;
    }
    let start = text.len() - 1;
    let before = text[..start].trim_end();
    (before.ends_with('[') || before.ends_with(',')).then_some(start)
}

/// Strip an unterminated string, then dangling commas, colons, keys and
/// empty element openers. Each round is a constant number of linear scans.
fn trim_dangling(text: &str) -> String {
    let mut current = text.trim_end().to_string();
    for _ in 0..MAX_TRIM_ROUNDS {
        let before = current.len();

        if let Some(start) = scan(&current).open_string {
            current.truncate(start);
        }
        let kept = current
            .trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == ':')
            .len();
        current.truncate(kept);

        if let Some(start) = dangling_key(&current).or_else(|| empty_element_opener(&current)) {
            current.truncate(start);
            current.truncate(current.trim_end().len());
        }

        if current.len() == before {
            break;
        }
    }
    current
}

/// Drop the last incomplete unit: a bare literal, the last element of the
/// innermost open container, or that container itself.
fn drop_last_unit(text: &str) -> String {
    let trimmed = text.trim_end();
    let literal_start = trimmed
        .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        .len();
    if literal_start < trimmed.len() {
        return trimmed[..literal_start].to_string();
    }

    match scan(trimmed).open.last() {
        Some(Opener {
            last_comma: Some(comma),
            ..
        }) => trimmed[..*comma].to_string(),
        Some(inner) => trimmed[..inner.pos].to_string(),
        None => trimmed.to_string(),
    }
}

fn truncate_until_valid(text: &str) -> Result<Repaired, RepairError> {
    let mut current = text.to_string();

    for pass in 1..=MAX_TRUNCATION_PASSES {
        current = trim_dangling(&current);
        if current.is_empty() {
            break;
        }

        let closed = format!("{current}{}", closers(&scan(&current)));
        if let Some(done) = attempt(&closed, RepairStage::Truncated { passes: pass }) {
            return Ok(done);
        }

        let next = drop_last_unit(&current);
        if next.len() >= current.len() {
            break;
        }
        current = next;
    }

    Err(RepairError::Exhausted {
        passes: MAX_TRUNCATION_PASSES,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn valid_json_passes_untouched() {
        let done = repair(r#"{"name":"Foo","code":"x=1;"}"#).unwrap();
        assert_eq!(done.stage, RepairStage::AsIs);
        assert_eq!(done.value, json!({"name": "Foo", "code": "x=1;"}));
    }

    #[test]
    fn complete_value_with_trailing_text_is_as_is() {
        let done = repair(r#"{"name":"A","code":"if (x) {"} Enjoy!"#).unwrap();
        assert_eq!(done.stage, RepairStage::AsIs);
        assert_eq!(done.text, r#"{"name":"A","code":"if (x) {"}"#);
    }

    #[test]
    fn escapes_raw_newlines_and_quotes_in_code() {
        let raw = "{\"name\":\"A\",\"code\":\"line1\nline2 \"quoted\" end\"}";
        let done = repair(raw).unwrap();

        assert_eq!(done.stage, RepairStage::FieldEscaped);
        assert_eq!(done.value["code"], "line1\nline2 \"quoted\" end");
        assert_eq!(done.value["name"], "A");
    }

    #[test]
    fn keeps_valid_escapes_and_doubles_lone_backslashes() {
        let raw = "{\"code\":\"a\\nb \\d\tc\",\"name\":\"N\"}";
        let done = repair(raw).unwrap();
        assert_eq!(done.value["code"], "a\nb \\d\tc");
    }

    #[test]
    fn field_escaping_skips_keys_inside_code() {
        let raw = "{\"code\":\"var o = {\\\"description\\\": 1};\nrun();\",\"description\":\"two\nlines\"}";
        let done = repair(raw).unwrap();
        assert_eq!(done.value["code"], "var o = {\"description\": 1};\nrun();");
        assert_eq!(done.value["description"], "two\nlines");
    }

    #[test]
    fn drops_trailing_commas() {
        let done = repair(r#"{"name":"A","mechanics":["x","y",],"code":"b",}"#).unwrap();
        assert_eq!(done.stage, RepairStage::Structural);
        assert_eq!(done.value["mechanics"], json!(["x", "y"]));
        assert_eq!(done.value["code"], "b");
    }

    #[test]
    fn closes_truncated_containers_in_order() {
        let done = repair(r#"{"name":"A","code":"b","levels":[{"name":"L1","enemies":["Bat","Ra"#)
            .unwrap();
        assert_eq!(done.stage, RepairStage::Structural);
        assert_eq!(done.value["levels"][0]["enemies"], json!(["Bat", "Ra"]));
    }

    #[test]
    fn accepts_typographic_quotes_as_delimiters() {
        let done = repair("{\u{201c}name\u{201d}: \u{201c}A\u{201d}, \"code\": \"say \u{201c}hi\u{201d}\"}")
            .unwrap();
        assert_eq!(done.value["name"], "A");
        assert_eq!(done.value["code"], "say \u{201c}hi\u{201d}");
    }

    #[test]
    fn dangling_key_gets_null() {
        let done = repair(r#"{"name":"A","code":"b","theme":"#).unwrap();
        assert_eq!(done.value["theme"], Value::Null);
        assert_eq!(done.value["code"], "b");
    }

    #[test]
    fn truncation_loop_drops_broken_tail() {
        let done = repair(r#"{"name":"A","code":"b","n":tru"#).unwrap();
        assert_eq!(done.stage, RepairStage::Truncated { passes: 2 });
        assert_eq!(done.value, json!({"name": "A", "code": "b"}));
    }

    #[test]
    fn truncation_loop_drops_last_element() {
        let done = repair(r#"{"name":"A","code":"b","mechanics":["x", 12ab"#).unwrap();
        assert!(matches!(done.stage, RepairStage::Truncated { .. }));
        assert_eq!(done.value["mechanics"], json!(["x"]));
    }

    #[test]
    fn gives_up_instead_of_returning_garbage() {
        assert_eq!(
            repair(r#"{"a" 1}"#).unwrap_err(),
            RepairError::Exhausted {
                passes: MAX_TRUNCATION_PASSES
            }
        );
        assert_eq!(repair("   ").unwrap_err(), RepairError::Empty);
    }

    #[test]
    fn structural_pass_stops_after_root_closes() {
        assert_eq!(close_structure(r#"{"a":1}} trailing"#), r#"{"a":1}"#);
    }

    #[test]
    fn truncated_element_opener_leaves_list_empty() {
        let done = repair(r#"{"name":"A","code":"b","characters":[{"#).unwrap();
        assert_eq!(done.value["characters"], json!([]));

        let done = repair(r#"{"name":"A","code":"b","levels":[{"name":"L1"},{"#).unwrap();
        assert_eq!(done.value["levels"], json!([{"name": "L1"}]));
    }

    #[test]
    fn long_comma_runs_are_trimmed_in_one_go() {
        let text = format!(r#"{{"a" 1{}"#, ",".repeat(50_000));
        assert_eq!(trim_dangling(&text), r#"{"a" 1"#);
        assert_eq!(repair(&text).unwrap().value, json!({}));
    }

    #[test]
    fn trim_dangling_drops_empty_element_openers() {
        assert_eq!(trim_dangling(r#"{"a":[1,{"#), r#"{"a":[1"#);
        assert_eq!(trim_dangling(r#"{"a":[["#), r#"{"a":["#);
    }

    #[test]
    fn trim_dangling_strips_partial_members() {
        assert_eq!(trim_dangling(r#"{"a":1,"b":"unfinish"#), r#"{"a":1"#);
        assert_eq!(trim_dangling(r#"{"a":[1,2,"#), r#"{"a":[1,2"#);
        assert_eq!(trim_dangling(r#"{"a":1,"b""#), r#"{"a":1"#);
    }
}
