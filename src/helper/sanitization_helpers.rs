use crate::helper::diagnostics_helpers::DiagnosticsCollector;
use crate::helper::policy_helpers::{TagPolicy, CLASS_ATTRIBUTE};
use crate::models::SanitizeIssue;
use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_fragment, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Schemes that run code when a browser follows or loads the value.
const SCRIPT_SCHEMES: &[&str] = &["javascript:", "vbscript:", "livescript:", "data:"];

/// Removed together with everything inside them.
const CONTENT_DROPPING_TAGS: &[&str] = &["script", "style"];

const TOP_LEVEL_HEADING: &str = "h1";
const DEMOTED_HEADING: &str = "h2";

fn h1_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<h1\b([^>]*)>").expect("valid regex"))
}

fn h1_close_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</h1\s*>").expect("valid regex"))
}

// One attribute, quoted values kept whole.
fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("valid regex")
    })
}

/// Rewrites `<h1 …>` to `<h2 class="{marker} …">` and `</h1>` to `</h2>`,
/// keeping the original attributes. An existing class list is extended
/// rather than duplicated.
pub fn demote_top_level_headings<'a>(html: &'a str, marker_class: &str) -> Cow<'a, str> {
    if !h1_open_regex().is_match(html) && !h1_close_regex().is_match(html) {
        return Cow::Borrowed(html);
    }

    let opened = h1_open_regex().replace_all(html, |caps: &Captures| {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let class = attribute_regex()
            .captures_iter(attrs)
            .find(|attr| attr[1].eq_ignore_ascii_case(CLASS_ATTRIBUTE));
        let Some(class) = class else {
            return format!(r#"<h2 class="{}"{}>"#, marker_class, attrs);
        };
        let existing = class
            .get(2)
            .or_else(|| class.get(3))
            .or_else(|| class.get(4))
            .map_or("", |m| m.as_str().trim());
        let merged = if existing.is_empty() {
            marker_class.to_string()
        } else {
            format!("{} {}", marker_class, existing.replace('"', "&quot;"))
        };
        let span = class.get(0).map_or(0..0, |m| m.range());
        format!(
            r#"<h2{}class="{}"{}>"#,
            &attrs[..span.start],
            merged,
            &attrs[span.end..]
        )
    });
    let closed = h1_close_regex().replace_all(&opened, "</h2>");
    Cow::Owned(closed.into_owned())
}

/// True when an attribute value would execute script if followed.
/// Browsers ignore embedded whitespace and control characters in schemes,
/// so those are dropped before comparing.
pub fn has_script_scheme(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_SCHEMES.iter().any(|scheme| compact.starts_with(scheme))
}

fn filter_attribute_value<'u>(
    _element: &str,
    _attribute: &str,
    value: &'u str,
) -> Option<Cow<'u, str>> {
    if has_script_scheme(value) {
        None
    } else {
        Some(Cow::Borrowed(value))
    }
}

fn parse_body_fragment(html: &str) -> RcDom {
    parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        Vec::new(),
    )
    .one(html)
}

/// Records every element and attribute the sanitizer will drop, in document
/// order, reading the same parse tree the sanitizer works on. `h1` counts as
/// the `h2` it is demoted to but is reported under its own name. Nothing is
/// deduplicated.
pub fn collect_issues(html: &str, policy: &TagPolicy, collector: &mut DiagnosticsCollector) {
    let dom = parse_body_fragment(html);
    // The fragment parser wraps its output in a synthetic <html> element.
    let mut pending: Vec<Handle> = match dom.document.children.borrow().first() {
        Some(root) => root.children.borrow().iter().rev().cloned().collect(),
        None => return,
    };

    while let Some(node) = pending.pop() {
        let NodeData::Element { name, attrs, .. } = &node.data else {
            continue;
        };
        let tag = name.local.to_string().to_ascii_lowercase();
        if CONTENT_DROPPING_TAGS.contains(&tag.as_str()) {
            collector.record(SanitizeIssue::unsupported_tag(&tag));
            continue;
        }
        let effective = if tag == TOP_LEVEL_HEADING { DEMOTED_HEADING } else { tag.as_str() };

        if name.ns != ns!(html) || !policy.allows_element(effective) {
            collector.record(SanitizeIssue::unsupported_tag(&tag));
        } else {
            for attr in attrs.borrow().iter() {
                let attr_name = attr.name.local.to_string().to_ascii_lowercase();
                if !policy.allows_attribute(effective, &attr_name) || has_script_scheme(&attr.value) {
                    collector.record(SanitizeIssue::unsupported_attribute(&tag, &attr_name));
                }
            }
        }
        pending.extend(node.children.borrow().iter().rev().cloned());
    }
}

/// Allowlist sanitizer built once from a `TagPolicy`. Parsing is done by
/// ammonia (html5ever), which repairs unbalanced markup instead of failing.
pub struct HtmlSanitizer {
    cleaner: ammonia::Builder<'static>,
}

impl HtmlSanitizer {
    pub fn new(policy: &TagPolicy) -> Self {
        let tags: HashSet<&'static str> = policy.table().keys().copied().collect();
        let tag_attributes: HashMap<&'static str, HashSet<&'static str>> = policy
            .table()
            .iter()
            .filter(|(_, attrs)| !attrs.is_empty())
            .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
            .collect();
        let generic_attributes: HashSet<&'static str> = [CLASS_ATTRIBUTE].into_iter().collect();

        let mut cleaner = ammonia::Builder::default();
        cleaner
            .tags(tags)
            .tag_attributes(tag_attributes)
            .generic_attributes(generic_attributes)
            .link_rel(None)
            .strip_comments(true)
            .attribute_filter(filter_attribute_value);
        Self { cleaner }
    }

    pub fn clean(&self, html: &str) -> String {
        self.cleaner.clean(html).to_string()
    }
}
