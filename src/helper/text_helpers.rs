use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Private-use stand-ins for `&#91;` and `&#93;` while the text goes through
/// the HTML parser, which would otherwise decode them into live brackets.
pub const OPEN_BRACKET_PLACEHOLDER: char = '\u{E05B}';
pub const CLOSE_BRACKET_PLACEHOLDER: char = '\u{E05D}';

const ENCODED_OPEN_BRACKET: &str = "&#91;";
const ENCODED_CLOSE_BRACKET: &str = "&#93;";

// Same set as JavaScript's encodeURIComponent.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Escapes text for use between tags.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escapes text for use inside a double-quoted attribute value.
pub fn escape_attribute(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

/// Removes anything that looks like a tag, keeping the text between tags.
pub fn strip_html(input: &str) -> Cow<'_, str> {
    if !input.contains('<') {
        return Cow::Borrowed(input);
    }
    tag_regex().replace_all(input, "")
}

/// Markup-free, entity-decoded text of an HTML fragment.
pub fn plain_text(fragment: &str) -> String {
    let stripped = strip_html(fragment);
    html_escape::decode_html_entities(&stripped).into_owned()
}

/// Percent-encodes one URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Writes brackets the way an author does to keep them literal.
pub fn encode_brackets(text: &str) -> String {
    text.replace('[', ENCODED_OPEN_BRACKET)
        .replace(']', ENCODED_CLOSE_BRACKET)
}

/// Swaps encoded brackets for placeholders that survive entity decoding.
pub fn protect_literal_brackets(text: &str) -> Cow<'_, str> {
    if !text.contains("&#9") {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace(ENCODED_OPEN_BRACKET, &OPEN_BRACKET_PLACEHOLDER.to_string())
            .replace(ENCODED_CLOSE_BRACKET, &CLOSE_BRACKET_PLACEHOLDER.to_string()),
    )
}

/// Turns the placeholders back into plain bracket characters.
pub fn restore_literal_brackets(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            OPEN_BRACKET_PLACEHOLDER => '[',
            CLOSE_BRACKET_PLACEHOLDER => ']',
            other => other,
        })
        .collect()
}
