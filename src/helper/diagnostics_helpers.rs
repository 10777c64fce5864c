use crate::models::{IssueKind, SanitizeIssue};

/// Collects what the sanitizer drops during one call. Owned by the caller
/// and passed down explicitly; there is no shared registry.
#[derive(Debug, Default)]
pub struct DiagnosticsCollector {
    issues: Vec<SanitizeIssue>,
}

impl DiagnosticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: SanitizeIssue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[SanitizeIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<SanitizeIssue> {
        self.issues
    }
}

/// Human-readable summary for the "this won't render" warning. Repeated
/// tags and attributes are listed once, in the order first seen.
pub fn format_compatibility_report(issues: &[SanitizeIssue]) -> String {
    if issues.is_empty() {
        return "All HTML tags and attributes are supported.".to_string();
    }

    let mut tags: Vec<String> = Vec::new();
    let mut attributes: Vec<String> = Vec::new();
    for issue in issues {
        let entry = match (&issue.kind, &issue.attribute) {
            (IssueKind::UnsupportedTag, _) => format!("<{}>", issue.tag),
            (IssueKind::UnsupportedAttribute, Some(attr)) => format!("{}[{}]", issue.tag, attr),
            (IssueKind::UnsupportedAttribute, None) => format!("{}[]", issue.tag),
        };
        let list = match issue.kind {
            IssueKind::UnsupportedTag => &mut tags,
            IssueKind::UnsupportedAttribute => &mut attributes,
        };
        if !list.contains(&entry) {
            list.push(entry);
        }
    }

    let mut parts = Vec::new();
    if !tags.is_empty() {
        parts.push(format!("Unsupported tags: {}", tags.join(", ")));
    }
    if !attributes.is_empty() {
        parts.push(format!("Unsupported attributes: {}", attributes.join(", ")));
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_issues_reads_as_success() {
        assert_eq!(
            format_compatibility_report(&[]),
            "All HTML tags and attributes are supported."
        );
    }

    #[test]
    fn formats_tags_and_attributes() {
        let issues = vec![
            SanitizeIssue::unsupported_tag("div"),
            SanitizeIssue::unsupported_tag("span"),
            SanitizeIssue::unsupported_attribute("p", "style"),
        ];
        assert_eq!(
            format_compatibility_report(&issues),
            "Unsupported tags: <div>, <span>\nUnsupported attributes: p[style]"
        );
    }

    #[test]
    fn attribute_only_report_has_one_line() {
        let issues = vec![SanitizeIssue::unsupported_attribute("p", "style")];
        assert_eq!(format_compatibility_report(&issues), "Unsupported attributes: p[style]");
    }

    #[test]
    fn deduplicates_at_report_time_only() {
        let mut collector = DiagnosticsCollector::new();
        for _ in 0..3 {
            collector.record(SanitizeIssue::unsupported_tag("div"));
        }
        assert_eq!(collector.issues().len(), 3);
        let report = format_compatibility_report(collector.issues());
        assert_eq!(report.matches("<div>").count(), 1);
    }
}
