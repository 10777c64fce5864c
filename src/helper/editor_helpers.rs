//! Conversion between the bracket syntax and the `<e2link>` element the rich
//! text editor uses to show links while they are being edited.

use crate::helper::text_helpers::escape_attribute;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn editor_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<e2link title="([^"]+)">([^<]*)</e2link>"#).expect("valid regex"))
}

fn bracket_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]|\[]+)(?:\|([^\]\[]+))?\]").expect("valid regex"))
}

/// `<e2link title="t">shown</e2link>` back to `[t|shown]`, or `[t]` when the
/// visible text is empty or equal to the title.
pub fn convert_to_link_syntax(html: &str) -> String {
    editor_link_regex()
        .replace_all(html, |caps: &Captures| {
            let title = html_escape::decode_html_entities(&caps[1]);
            let shown = &caps[2];
            if shown.is_empty() || shown == title {
                format!("[{}]", title)
            } else {
                format!("[{}|{}]", title, shown)
            }
        })
        .into_owned()
}

/// Simple `[title]` and `[title|shown]` expressions to editor elements.
/// Qualified forms like `[title[user]]` are left as typed; the editor shows
/// them as text.
pub fn convert_from_link_syntax(text: &str) -> String {
    bracket_link_regex()
        .replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            let end = caps.get(0).map_or(0, |m| m.end());
            if matches!(text.as_bytes().get(end), Some(b']' | b'|')) {
                return whole.to_string();
            }
            let title = html_escape::decode_html_entities(&caps[1]);
            let shown = caps.get(2).map_or(&caps[1], |m| m.as_str());
            format!(
                r#"<e2link title="{}">{}</e2link>"#,
                escape_attribute(&title),
                shown
            )
        })
        .into_owned()
}
