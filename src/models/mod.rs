use serde::{Deserialize, Serialize};

/// What the sanitizer removed. Serialized as `unsupported_tag` /
/// `unsupported_attribute` for the authoring tools.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnsupportedTag,
    UnsupportedAttribute,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct SanitizeIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub tag: String,
    #[serde(rename = "attr", skip_serializing_if = "Option::is_none", default)]
    pub attribute: Option<String>,
}

impl SanitizeIssue {
    pub fn unsupported_tag(tag: &str) -> Self {
        SanitizeIssue {
            kind: IssueKind::UnsupportedTag,
            tag: tag.to_string(),
            attribute: None,
        }
    }

    pub fn unsupported_attribute(tag: &str, attribute: &str) -> Self {
        SanitizeIssue {
            kind: IssueKind::UnsupportedAttribute,
            tag: tag.to_string(),
            attribute: Some(attribute.to_string()),
        }
    }
}

/// The only thing the pipeline hands back to callers.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RenderResult {
    pub html: String,
    pub issues: Vec<SanitizeIssue>,
}

// Per-call switches for `render_content_with`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Run the legacy newline-to-paragraph shim first. Off for bodies that
    /// were already structured by the newer editor.
    pub apply_break_tags: bool,
    pub report_issues: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            apply_break_tags: true,
            report_issues: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    pub parse_links: bool,
    pub report_issues: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        SanitizeOptions {
            parse_links: true,
            report_issues: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// `[title]` or `[title|display]`, looked up by title.
    Plain,
    /// `[title[category]]`.
    Typed,
    /// `[title[by author]]`.
    ByAuthor,
    /// `[title[123]]`, a reply inside a discussion.
    Comment,
    /// `[https://example.com|text]`.
    External,
}

/// One parsed bracket occurrence. Built and thrown away during a single
/// pass over one input string.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct LinkExpression {
    pub raw_span: String,
    /// Destination title (or URL for external links), markup stripped and
    /// entities decoded. Not yet percent-encoded.
    pub target: String,
    pub display_text: String,
    pub kind: LinkKind,
    /// Category for typed links, author for by-author links, comment id for
    /// comment links.
    pub type_or_author: Option<String>,
}

/// Output unit of `parse_links`.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text { content: String },
    Link(LinkExpression),
}
