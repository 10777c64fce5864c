//! The rendering pipeline: paragraph normalization, nesting limit, heading
//! demotion, literal-bracket protection, allowlist sanitizing and link
//! resolution, in that order.

use crate::config::{ConfigError, RenderConfig};
use crate::helper::diagnostics_helpers::DiagnosticsCollector;
use crate::helper::link_helpers::{resolve_links, LinkStyle};
use crate::helper::nesting_helpers::limit_nesting;
use crate::helper::paragraph_helpers::break_tags;
use crate::helper::policy_helpers::{PolicyError, TagPolicy};
use crate::helper::sanitization_helpers::{collect_issues, demote_top_level_headings, HtmlSanitizer};
use crate::helper::text_helpers::{protect_literal_brackets, restore_literal_brackets};
use crate::models::{RenderOptions, RenderResult, SanitizeIssue, SanitizeOptions};
use std::path::Path;
use std::sync::OnceLock;

/// Holds everything that is fixed for the lifetime of a deployment. Shared
/// by reference across threads; rendering never mutates it.
pub struct Renderer {
    config: RenderConfig,
    policy: TagPolicy,
    sanitizer: HtmlSanitizer,
}

impl Default for Renderer {
    fn default() -> Self {
        let policy = TagPolicy::default();
        Renderer {
            config: RenderConfig::default(),
            sanitizer: HtmlSanitizer::new(&policy),
            policy,
        }
    }
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Result<Self, PolicyError> {
        let policy = config.tag_policy()?;
        let sanitizer = HtmlSanitizer::new(&policy);
        Ok(Renderer {
            config,
            policy,
            sanitizer,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = RenderConfig::from_file(path)?;
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn policy(&self) -> &TagPolicy {
        &self.policy
    }

    fn link_style(&self) -> LinkStyle<'_> {
        LinkStyle {
            link_class: &self.config.link_class,
            external_link_class: &self.config.external_link_class,
        }
    }

    /// Full display rendering of an authored body.
    pub fn render(&self, text: &str, options: &RenderOptions) -> RenderResult {
        let normalized = if options.apply_break_tags {
            break_tags(text)
        } else {
            text.to_string()
        };
        self.sanitize(
            &normalized,
            &SanitizeOptions {
                parse_links: true,
                report_issues: options.report_issues,
            },
        )
    }

    pub fn sanitize(&self, html: &str, options: &SanitizeOptions) -> RenderResult {
        if html.is_empty() {
            return RenderResult::default();
        }

        let limited = limit_nesting(html, self.config.max_nesting_depth);

        let mut collector = DiagnosticsCollector::new();
        if options.report_issues {
            collect_issues(&limited, &self.policy, &mut collector);
        }

        let demoted = demote_top_level_headings(&limited, &self.config.heading_class);
        let protected = protect_literal_brackets(&demoted);

        let cleaned = self.sanitizer.clean(&protected);
        let linked = if options.parse_links {
            resolve_links(&cleaned, &self.link_style())
        } else {
            cleaned
        };
        let html = restore_literal_brackets(&linked);

        log::debug!(
            "Sanitized {} bytes into {} bytes ({} issue(s) recorded)",
            limited.len(),
            html.len(),
            collector.issues().len()
        );
        RenderResult {
            html,
            issues: collector.into_issues(),
        }
    }

    /// Diagnostics only: what the sanitizer would drop from `text`.
    pub fn check_compatibility(&self, text: &str) -> Vec<SanitizeIssue> {
        self.sanitize(
            text,
            &SanitizeOptions {
                parse_links: false,
                report_issues: true,
            },
        )
        .issues
    }
}

fn default_renderer() -> &'static Renderer {
    static RENDERER: OnceLock<Renderer> = OnceLock::new();
    RENDERER.get_or_init(Renderer::default)
}

/// Renders with the built-in policy and default options. `None` renders as
/// the empty string.
pub fn render_content<'a>(text: impl Into<Option<&'a str>>) -> RenderResult {
    render_content_with(text, &RenderOptions::default())
}

pub fn render_content_with<'a>(
    text: impl Into<Option<&'a str>>,
    options: &RenderOptions,
) -> RenderResult {
    default_renderer().render(text.into().unwrap_or_default(), options)
}

pub fn sanitize_html<'a>(
    html: impl Into<Option<&'a str>>,
    options: &SanitizeOptions,
) -> RenderResult {
    default_renderer().sanitize(html.into().unwrap_or_default(), options)
}

pub fn check_compatibility<'a>(text: impl Into<Option<&'a str>>) -> Vec<SanitizeIssue> {
    default_renderer().check_compatibility(text.into().unwrap_or_default())
}
