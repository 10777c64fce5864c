//! Renders user-authored writeups into HTML that is safe to insert into a
//! page: legacy paragraph normalization, an allowlist sanitizer, and the
//! bracket link syntax.

pub mod config;
pub mod helper;
pub mod models;
pub mod renderer;

pub use crate::config::{ConfigError, RenderConfig};
pub use crate::helper::diagnostics_helpers::{format_compatibility_report, DiagnosticsCollector};
pub use crate::helper::editor_helpers::{convert_from_link_syntax, convert_to_link_syntax};
pub use crate::helper::link_helpers::{parse_link_content, parse_links, resolve_links, LinkStyle};
pub use crate::helper::paragraph_helpers::break_tags;
pub use crate::helper::policy_helpers::{PolicyError, TagPolicy};
pub use crate::helper::text_helpers::encode_brackets;
pub use crate::models::{
    IssueKind, LinkExpression, LinkKind, RenderOptions, RenderResult, SanitizeIssue,
    SanitizeOptions, Segment,
};
pub use crate::renderer::{
    check_compatibility, render_content, render_content_with, sanitize_html, Renderer,
};
