//! The bracket link syntax.
//!
//! ```text
//! [title]                      /title/title
//! [title|shown]                /title/title, visible text "shown"
//! [title[type]]                /type/title
//! [title[by author]]           /user/author/writeups/title
//! [title[123]]                 /title/title#debatecomment_123
//! [https://example.com|shown]  external link
//! ```
//!
//! The scanner walks the text once. Tags are skipped as opaque units, so
//! brackets inside attribute values are never rewritten, while tags inside a
//! bracket expression are stripped from its target and visible text.

use crate::helper::text_helpers::{
    encode_path_segment, escape_attribute, escape_html, plain_text, restore_literal_brackets,
};
use crate::models::{LinkExpression, LinkKind, Segment};

pub const DEFAULT_LINK_CLASS: &str = "e2-link";
pub const DEFAULT_EXTERNAL_LINK_CLASS: &str = "externalLink";

/// Visible text for an external link written with an empty pipe.
const EMPTY_EXTERNAL_DISPLAY: &str = "[link]";

/// Classes put on generated anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStyle<'a> {
    pub link_class: &'a str,
    pub external_link_class: &'a str,
}

impl Default for LinkStyle<'static> {
    fn default() -> Self {
        LinkStyle {
            link_class: DEFAULT_LINK_CLASS,
            external_link_class: DEFAULT_EXTERNAL_LINK_CLASS,
        }
    }
}

/// Byte offsets of one structurally complete bracket expression.
struct Shape {
    end: usize,
    qualifier: Option<(usize, usize)>,
}

/// Why a structurally complete expression did not become a link.
enum Rejection {
    /// Keep the whole span as text.
    Literal,
    /// Nothing precedes the inner bracket pair (`[[nested]]`): the outer
    /// bracket is text and the inner pair gets its own chance.
    RetryInner,
}

enum Piece<'t> {
    Text(&'t str),
    Link(LinkExpression),
}

/// Replaces every recognized bracket expression with an anchor. Everything
/// else, malformed expressions included, passes through untouched.
pub fn resolve_links(html: &str, style: &LinkStyle<'_>) -> String {
    if !html.contains('[') {
        return html.to_string();
    }
    let mut out = String::with_capacity(html.len() + html.len() / 4);
    for piece in scan(html) {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Link(link) => out.push_str(&link_to_html(&link, style)),
        }
    }
    out
}

/// Splits text into literal runs and parsed links.
pub fn parse_links(text: &str) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for piece in scan(text) {
        match piece {
            Piece::Text(run) => match segments.last_mut() {
                Some(Segment::Text { content }) => content.push_str(run),
                _ => segments.push(Segment::Text {
                    content: run.to_string(),
                }),
            },
            Piece::Link(link) => segments.push(Segment::Link(link)),
        }
    }
    segments
}

/// Parses the inside of one bracket pair, e.g. `title[user]` or `a|b`.
pub fn parse_link_content(content: &str) -> Option<LinkExpression> {
    let raw = format!("[{}]", content);
    let shape = match_expression(raw.as_bytes(), 0)?;
    if shape.end != raw.len() || !tags_balanced(&raw) {
        return None;
    }
    interpret(&raw, &shape).ok()
}

/// Destination path (or URL) of a parsed link, percent-encoded.
pub fn link_href(link: &LinkExpression) -> String {
    let title = encode_path_segment(&link.target);
    let qualifier = link.type_or_author.as_deref().unwrap_or_default();
    match link.kind {
        LinkKind::Plain => format!("/title/{}", title),
        LinkKind::Typed => format!("/{}/{}", encode_path_segment(qualifier), title),
        LinkKind::ByAuthor => format!(
            "/user/{}/writeups/{}",
            encode_path_segment(qualifier),
            title
        ),
        LinkKind::Comment => format!("/title/{}#debatecomment_{}", title, qualifier),
        LinkKind::External => link.target.clone(),
    }
}

/// The anchor element for a parsed link.
pub fn link_to_html(link: &LinkExpression, style: &LinkStyle<'_>) -> String {
    let href = escape_attribute(&link_href(link));
    let display = escape_html(&link.display_text);
    match link.kind {
        LinkKind::External => format!(
            r#"<a href="{}" rel="nofollow" class="{}" target="_blank">{}</a>"#,
            href,
            escape_attribute(style.external_link_class),
            display
        ),
        _ => format!(
            r#"<a href="{}" class="{}" title="{}">{}</a>"#,
            href,
            escape_attribute(style.link_class),
            escape_attribute(&link.target),
            display
        ),
    }
}

fn scan(text: &str) -> Vec<Piece<'_>> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut tags = TagSkipper::default();
    let mut run_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'<' => pos = tags.skip(bytes, pos),
            b'[' => {
                let Some(shape) = match_expression_with(bytes, pos, &mut tags) else {
                    pos += 1;
                    continue;
                };
                let span = &text[pos..shape.end];
                // Replacing a span that closes or leaves open an element
                // would unbalance the surrounding markup.
                if !tags_balanced(span) {
                    log::trace!("Bracket expression crosses element boundaries: {}", span);
                    pos += 1;
                    continue;
                }
                match interpret(span, &shape.shifted(pos)) {
                    Ok(link) => {
                        if run_start < pos {
                            pieces.push(Piece::Text(&text[run_start..pos]));
                        }
                        pieces.push(Piece::Link(link));
                        pos = shape.end;
                        run_start = pos;
                    }
                    Err(Rejection::Literal) => {
                        log::trace!("Leaving bracket expression as text: {}", &text[pos..shape.end]);
                        pos = shape.end;
                    }
                    Err(Rejection::RetryInner) => pos += 1,
                }
            }
            _ => pos += 1,
        }
    }
    if run_start < bytes.len() {
        pieces.push(Piece::Text(&text[run_start..]));
    }
    pieces
}

impl Shape {
    // Offsets relative to a span starting at `origin`.
    fn shifted(&self, origin: usize) -> Shape {
        Shape {
            end: self.end - origin,
            qualifier: self
                .qualifier
                .map(|(open, close)| (open - origin, close - origin)),
        }
    }
}

/// Skips over tags, honouring quoted attribute values. Once a tag runs off
/// the end of the input every later `<` is plain text, which keeps the scan
/// linear on unterminated markup.
#[derive(Default)]
struct TagSkipper {
    unterminated: bool,
}

impl TagSkipper {
    /// Position just past the tag starting at `start`, or `start + 1` when
    /// the `<` does not open a tag.
    fn skip(&mut self, bytes: &[u8], start: usize) -> usize {
        if self.unterminated {
            return start + 1;
        }
        match bytes.get(start + 1) {
            Some(b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?') => {}
            _ => return start + 1,
        }
        let mut quote: Option<u8> = None;
        for (offset, &b) in bytes[start + 1..].iter().enumerate() {
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => return start + 1 + offset + 1,
                None => {}
            }
        }
        self.unterminated = true;
        start + 1
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// True when every element opened inside `span` is also closed inside it,
/// and nothing inside closes an element opened before it.
fn tags_balanced(span: &str) -> bool {
    if !span.contains('<') {
        return true;
    }
    let bytes = span.as_bytes();
    let mut tags = TagSkipper::default();
    let mut open: Vec<&str> = Vec::new();
    let mut pos = 0;

    while let Some(offset) = span[pos..].find('<') {
        let start = pos + offset;
        pos = tags.skip(bytes, start);
        if pos == start + 1 {
            continue;
        }
        let tag = &span[start + 1..pos - 1];
        if let Some(closing) = tag.strip_prefix('/') {
            match open.pop() {
                Some(name) if name.eq_ignore_ascii_case(element_name(closing)) => {}
                _ => return false,
            }
        } else if !tag.starts_with(|c| c == '!' || c == '?') {
            let name = element_name(tag);
            let void = tag.ends_with('/')
                || VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name));
            if !void {
                open.push(name);
            }
        }
    }
    open.is_empty()
}

fn element_name(tag: &str) -> &str {
    tag.split(|c: char| c.is_ascii_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
}

fn match_expression(bytes: &[u8], start: usize) -> Option<Shape> {
    match_expression_with(bytes, start, &mut TagSkipper::default())
}

/// `[` head `]`  or  `[` head `[` qualifier `]` tail `]`, where none of the
/// parts contain a bracket outside a tag.
fn match_expression_with(bytes: &[u8], start: usize, tags: &mut TagSkipper) -> Option<Shape> {
    let (stop, at) = next_bracket(bytes, start + 1, tags)?;
    if stop == b']' {
        return Some(Shape {
            end: at + 1,
            qualifier: None,
        });
    }
    let open = at;
    let (stop, close) = next_bracket(bytes, open + 1, tags)?;
    if stop != b']' {
        return None;
    }
    let (stop, at) = next_bracket(bytes, close + 1, tags)?;
    if stop != b']' {
        return None;
    }
    Some(Shape {
        end: at + 1,
        qualifier: Some((open, close)),
    })
}

fn next_bracket(bytes: &[u8], from: usize, tags: &mut TagSkipper) -> Option<(u8, usize)> {
    let mut pos = from;
    while pos < bytes.len() {
        match bytes[pos] {
            b'<' => pos = tags.skip(bytes, pos),
            b @ (b'[' | b']') => return Some((b, pos)),
            _ => pos += 1,
        }
    }
    None
}

/// Decides what a structurally complete span means. `raw` is the span
/// itself, brackets included; `shape` is relative to it.
fn interpret(raw: &str, shape: &Shape) -> Result<LinkExpression, Rejection> {
    let inner_end = shape.end - 1;
    let Some((open, close)) = shape.qualifier else {
        return interpret_unqualified(raw, &raw[1..inner_end]);
    };

    let head = &raw[1..open];
    let qualifier = &raw[open + 1..close];
    let tail = raw[close + 1..inner_end].trim();

    if head.trim().is_empty() {
        return Err(Rejection::RetryInner);
    }

    // Display goes after the qualifier, [title[type]|shown], or before the
    // title, [shown|title[type]]. Not both.
    let (display_part, title_part) = if !tail.is_empty() {
        let Some(after_pipe) = tail.strip_prefix('|') else {
            return Err(Rejection::Literal);
        };
        if head.contains('|') {
            return Err(Rejection::Literal);
        }
        (Some(after_pipe), head)
    } else if let Some((shown, title)) = head.split_once('|') {
        (Some(shown), title)
    } else {
        (None, head)
    };

    let target = clean_text(title_part);
    let qualifier = clean_text(qualifier);
    if target.is_empty() || qualifier.is_empty() {
        return Err(Rejection::Literal);
    }
    let display_text = display_part
        .and_then(display_text)
        .unwrap_or_else(|| target.clone());

    let author = by_author(&qualifier).map(str::to_string);
    let (kind, type_or_author) = if let Some(author) = author {
        if author.is_empty() {
            return Err(Rejection::Literal);
        }
        (LinkKind::ByAuthor, author)
    } else if qualifier.bytes().all(|b| b.is_ascii_digit()) {
        (LinkKind::Comment, qualifier)
    } else {
        (LinkKind::Typed, qualifier.to_lowercase())
    };

    Ok(LinkExpression {
        raw_span: raw.to_string(),
        target,
        display_text,
        kind,
        type_or_author: Some(type_or_author),
    })
}

fn interpret_unqualified(raw: &str, content: &str) -> Result<LinkExpression, Rejection> {
    if clean_text(content).is_empty() {
        return Err(Rejection::Literal);
    }
    if let Some(link) = external_link(raw, content) {
        return Ok(link);
    }

    let (title_part, display_part) = match content.split_once('|') {
        Some((title, shown)) => (title, Some(shown)),
        None => (content, None),
    };
    let target = clean_text(title_part);
    if target.is_empty() {
        return Err(Rejection::Literal);
    }
    let display_text = display_part
        .and_then(display_text)
        .unwrap_or_else(|| target.clone());

    Ok(LinkExpression {
        raw_span: raw.to_string(),
        target,
        display_text,
        kind: LinkKind::Plain,
        type_or_author: None,
    })
}

fn external_link(raw: &str, content: &str) -> Option<LinkExpression> {
    let trimmed = content.trim_start();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return None;
    }
    let (url_part, display_part) = match trimmed.split_once('|') {
        Some((url, shown)) => (url, Some(shown)),
        None => (trimmed, None),
    };
    if url_part.contains('<') {
        return None;
    }
    let url = html_escape::decode_html_entities(url_part.trim()).into_owned();
    if url.is_empty() || url.contains(|c: char| c.is_whitespace() || c == '"') {
        return None;
    }
    match url::Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => return None,
    }

    let display_text = match display_part {
        Some(shown) => {
            let shown = clean_text(shown);
            if shown.is_empty() {
                EMPTY_EXTERNAL_DISPLAY.to_string()
            } else {
                shown
            }
        }
        None => url.clone(),
    };
    Some(LinkExpression {
        raw_span: raw.to_string(),
        target: url,
        display_text,
        kind: LinkKind::External,
        type_or_author: None,
    })
}

/// Markup stripped, entities decoded, literal-bracket placeholders turned
/// back into brackets, trimmed.
fn clean_text(fragment: &str) -> String {
    restore_literal_brackets(plain_text(fragment).trim())
}

/// Text after the pipe: one leading space dropped, interior spacing kept.
fn display_text(part: &str) -> Option<String> {
    let text = restore_literal_brackets(&plain_text(part));
    let text = text.strip_prefix(' ').unwrap_or(&text).trim_end();
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// `by NAME`, with "by" in any case. Returns the trimmed name, which may be
/// empty for a malformed qualifier like `by `.
fn by_author(qualifier: &str) -> Option<&str> {
    let keyword = qualifier.get(..2)?;
    if !keyword.eq_ignore_ascii_case("by") {
        return None;
    }
    let rest = &qualifier[2..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}
