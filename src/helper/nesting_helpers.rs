//! Caps element nesting before markup reaches the HTML parser. The parser's
//! tree-building steps walk the stack of open elements, so unbounded depth
//! turns into quadratic time.
//!
//! The depth tracked here is a tokenizer-level approximation of the parser's
//! stack of open elements.

use std::borrow::Cow;
use std::collections::HashMap;

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 100;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

// Content runs to the matching end tag with no markup inside.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes",
    "noscript",
];

// The parser reopens these after a misnested close, so they stay counted
// until their own end tag.
const FORMATTING_ELEMENTS: &[&str] = &[
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong",
    "tt", "u",
];

// Start tags that implicitly close an open element of a related kind.
const IMPLIED_CLOSERS: &[(&str, &[&str])] = &[
    ("p", &["p"]),
    ("li", &["li"]),
    ("dt", &["dt", "dd"]),
    ("dd", &["dt", "dd"]),
    ("tr", &["tr"]),
    ("td", &["td", "th"]),
    ("th", &["td", "th"]),
    ("thead", &["thead", "tbody", "tfoot"]),
    ("tbody", &["thead", "tbody", "tfoot"]),
    ("tfoot", &["thead", "tbody", "tfoot"]),
    ("option", &["option"]),
];

enum Markup {
    Start { name: String, end: usize },
    End { name: String, end: usize },
    /// Comments, doctypes and processing instructions.
    Other { end: usize },
    /// A `<` that does not open markup.
    NotMarkup,
    /// Markup that runs to the end of the input.
    Unterminated,
}

/// Removes start tags that would open an element deeper than `max_depth`,
/// together with their end tags. Text is never removed. Input that stays
/// within the limit is returned as is.
pub fn limit_nesting(html: &str, max_depth: usize) -> Cow<'_, str> {
    if !html.contains('<') {
        return Cow::Borrowed(html);
    }

    let bytes = html.as_bytes();
    let mut open: Vec<String> = Vec::new();
    let mut suppressed: HashMap<String, usize> = HashMap::new();
    let mut out = String::new();
    let mut copied = 0;
    let mut dropped = 0usize;
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;
        match read_markup(bytes, start) {
            Markup::NotMarkup => pos = start + 1,
            Markup::Unterminated => break,
            Markup::Other { end } => pos = end,
            Markup::End { name, end } => {
                pos = end;
                if let Some(count) = suppressed.get_mut(&name).filter(|count| **count > 0) {
                    *count -= 1;
                    out.push_str(&html[copied..start]);
                    copied = end;
                } else if let Some(index) = open.iter().rposition(|tag| *tag == name) {
                    close_at(&mut open, index);
                }
            }
            Markup::Start { name, end } => {
                pos = end;
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    continue;
                }
                if let Some((_, closes)) = IMPLIED_CLOSERS.iter().find(|(tag, _)| *tag == name) {
                    if let Some(index) = open.iter().rposition(|tag| closes.contains(&tag.as_str())) {
                        close_at(&mut open, index);
                    }
                }
                if open.len() >= max_depth {
                    out.push_str(&html[copied..start]);
                    copied = end;
                    dropped += 1;
                    *suppressed.entry(name).or_insert(0) += 1;
                    continue;
                }
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    match find_end_tag(html, end, &name) {
                        Some(close) => pos = close,
                        None => break,
                    }
                }
                open.push(name);
            }
        }
    }

    if dropped == 0 {
        return Cow::Borrowed(html);
    }
    out.push_str(&html[copied..]);
    log::debug!(
        "Dropped {} start tag(s) nested deeper than {} levels",
        dropped,
        max_depth
    );
    Cow::Owned(out)
}

/// Pops the element at `index` and everything above it, except formatting
/// elements, which the parser would reopen.
fn close_at(open: &mut Vec<String>, index: usize) {
    let above = open.split_off(index + 1);
    open.pop();
    open.extend(
        above
            .into_iter()
            .filter(|tag| FORMATTING_ELEMENTS.contains(&tag.as_str())),
    );
}

fn read_markup(bytes: &[u8], start: usize) -> Markup {
    match bytes.get(start + 1) {
        Some(b'!') => {
            if bytes[start..].starts_with(b"<!--") {
                match find_bytes(bytes, start + 4, b"-->") {
                    Some(at) => Markup::Other { end: at + 3 },
                    None => Markup::Unterminated,
                }
            } else {
                match find_bytes(bytes, start + 2, b">") {
                    Some(at) => Markup::Other { end: at + 1 },
                    None => Markup::Unterminated,
                }
            }
        }
        Some(b'?') => match find_bytes(bytes, start + 2, b">") {
            Some(at) => Markup::Other { end: at + 1 },
            None => Markup::Unterminated,
        },
        Some(b'/') if bytes.get(start + 2).is_some_and(u8::is_ascii_alphabetic) => {
            let (name, after) = read_name(bytes, start + 2);
            match tag_end(bytes, after) {
                Some(end) => Markup::End { name, end },
                None => Markup::Unterminated,
            }
        }
        Some(b) if b.is_ascii_alphabetic() => {
            let (name, after) = read_name(bytes, start + 1);
            match tag_end(bytes, after) {
                Some(end) => Markup::Start { name, end },
                None => Markup::Unterminated,
            }
        }
        _ => Markup::NotMarkup,
    }
}

// Tag names run to whitespace, `/` or `>`.
fn read_name(bytes: &[u8], from: usize) -> (String, usize) {
    let len = bytes[from..]
        .iter()
        .position(|b| b.is_ascii_whitespace() || matches!(b, b'/' | b'>'))
        .unwrap_or(bytes.len() - from);
    let name = String::from_utf8_lossy(&bytes[from..from + len]).to_ascii_lowercase();
    (name, from + len)
}

/// Position just past the `>` closing a tag whose attributes start at
/// `from`. A quote only opens a value directly after `=`.
fn tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    let mut after_equals = false;
    while pos < bytes.len() {
        match bytes[pos] {
            b'>' => return Some(pos + 1),
            b'=' => after_equals = true,
            quote @ (b'"' | b'\'') if after_equals => {
                pos = find_bytes(bytes, pos + 1, &[quote])?;
                after_equals = false;
            }
            b if b.is_ascii_whitespace() => {}
            _ => after_equals = false,
        }
        pos += 1;
    }
    None
}

/// Start of the `</name` that ends a raw text element, matched without
/// regard to case.
fn find_end_tag(html: &str, from: usize, name: &str) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut pos = from;
    while let Some(at) = find_bytes(bytes, pos, b"</") {
        let candidate = &bytes[at + 2..];
        let boundary = candidate.get(name.len());
        if candidate.len() >= name.len()
            && candidate[..name.len()].eq_ignore_ascii_case(name.as_bytes())
            && boundary.map_or(true, |b| b.is_ascii_whitespace() || matches!(b, b'/' | b'>'))
        {
            return Some(at);
        }
        pos = at + 2;
    }
    None
}

fn find_bytes(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|at| from + at)
}
