use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Elements an author may use, with the attributes each one keeps.
///
/// Mirrors the platform's "approved html tags" setting, minus `h1`: the page
/// owns the top-level heading, so authored `h1`s are demoted before
/// sanitization instead of being allowed through.
pub const APPROVED_TAGS: &[(&str, &[&str])] = &[
    // Text formatting
    ("b", &[]),
    ("strong", &[]),
    ("i", &[]),
    ("em", &[]),
    ("u", &[]),
    ("s", &[]),
    ("strike", &[]),
    ("del", &[]),
    ("ins", &[]),
    ("big", &[]),
    ("small", &[]),
    ("sub", &[]),
    ("sup", &[]),
    ("tt", &[]),
    ("kbd", &[]),
    ("code", &[]),
    ("samp", &[]),
    ("var", &[]),
    ("cite", &[]),
    ("q", &["cite"]),
    // Block elements
    ("p", &["align"]),
    ("br", &[]),
    ("hr", &["width"]),
    ("pre", &[]),
    ("blockquote", &["cite"]),
    ("center", &[]),
    // Headings
    ("h2", &["align"]),
    ("h3", &["align"]),
    ("h4", &["align"]),
    ("h5", &["align"]),
    ("h6", &["align"]),
    // Lists
    ("ul", &["type"]),
    ("ol", &["type", "start"]),
    ("li", &[]),
    ("dl", &[]),
    ("dt", &[]),
    ("dd", &[]),
    // Tables
    ("table", &["cellpadding", "border", "cellspacing", "cols", "frame", "width"]),
    ("caption", &[]),
    ("thead", &[]),
    ("tbody", &[]),
    ("tr", &["align", "valign"]),
    ("th", &["rowspan", "colspan", "align", "valign", "height", "width"]),
    ("td", &["rowspan", "colspan", "align", "valign", "height", "width"]),
    // Semantic
    ("abbr", &["lang", "title"]),
    ("acronym", &["lang", "title"]),
];

/// Kept on every element; the heading demotion marker lives in it.
pub const CLASS_ATTRIBUTE: &str = "class";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Element '{0}' is not part of the approved tag table")]
    UnknownTag(String),
    #[error("Attribute '{attribute}' is not approved on '{tag}'")]
    UnknownAttribute { tag: String, attribute: String },
    #[error("Malformed attribute rule '{0}', expected 'tag.attribute'")]
    MalformedAttributeRule(String),
}

/// Immutable allowlist. Built once and shared by reference; nothing mutates
/// it after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPolicy {
    tags: BTreeMap<&'static str, BTreeSet<&'static str>>,
}

impl Default for TagPolicy {
    fn default() -> Self {
        let tags = APPROVED_TAGS
            .iter()
            .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
            .collect();
        TagPolicy { tags }
    }
}

impl TagPolicy {
    /// Narrows the built-in table. Names outside it are rejected rather than
    /// ignored.
    ///
    /// Attribute rules are written `tag.attribute`.
    pub fn restricted<S: AsRef<str>>(
        disabled_tags: &[S],
        disabled_attributes: &[S],
    ) -> Result<Self, PolicyError> {
        let mut policy = TagPolicy::default();

        for tag in disabled_tags {
            let tag = tag.as_ref().trim().to_lowercase();
            if policy.tags.remove(tag.as_str()).is_none() {
                return Err(PolicyError::UnknownTag(tag));
            }
        }

        for rule in disabled_attributes {
            let rule = rule.as_ref().trim().to_lowercase();
            let (tag, attribute) = rule
                .split_once('.')
                .ok_or_else(|| PolicyError::MalformedAttributeRule(rule.clone()))?;
            // Disabling an attribute on an element that is itself disabled is a no-op.
            if !policy.tags.contains_key(tag) && is_builtin_tag(tag) {
                continue;
            }
            let attrs = policy
                .tags
                .get_mut(tag)
                .ok_or_else(|| PolicyError::UnknownTag(tag.to_string()))?;
            if !attrs.remove(attribute) {
                return Err(PolicyError::UnknownAttribute {
                    tag: tag.to_string(),
                    attribute: attribute.to_string(),
                });
            }
        }

        Ok(policy)
    }

    pub fn allows_element(&self, tag: &str) -> bool {
        self.tags.contains_key(tag.to_lowercase().as_str())
    }

    /// `class` is accepted on any approved element.
    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        let attribute = attribute.to_lowercase();
        match self.tags.get(tag.to_lowercase().as_str()) {
            Some(attrs) => attribute == CLASS_ATTRIBUTE || attrs.contains(attribute.as_str()),
            None => false,
        }
    }

    pub fn attributes_for(&self, tag: &str) -> Option<&BTreeSet<&'static str>> {
        self.tags.get(tag.to_lowercase().as_str())
    }

    /// Every approved element name.
    pub fn elements(&self) -> BTreeSet<&'static str> {
        self.tags.keys().copied().collect()
    }

    /// Every attribute approved on any element, plus `class`.
    pub fn attributes(&self) -> BTreeSet<&'static str> {
        self.tags
            .values()
            .flat_map(|attrs| attrs.iter().copied())
            .chain(std::iter::once(CLASS_ATTRIBUTE))
            .collect()
    }

    pub(crate) fn table(&self) -> &BTreeMap<&'static str, BTreeSet<&'static str>> {
        &self.tags
    }
}

fn is_builtin_tag(tag: &str) -> bool {
    APPROVED_TAGS.iter().any(|(name, _)| *name == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_46_elements_and_no_h1() {
        let policy = TagPolicy::default();
        assert_eq!(policy.elements().len(), 46);
        assert!(!policy.allows_element("h1"));
        for tag in ["h2", "h3", "h4", "h5", "h6"] {
            assert!(policy.allows_element(tag));
            assert!(policy.allows_attribute(tag, "align"));
        }
    }

    #[test]
    fn dangerous_and_layout_elements_are_absent() {
        let policy = TagPolicy::default();
        for tag in [
            "script", "style", "iframe", "object", "embed", "form", "input", "button", "img",
            "video", "audio", "svg", "math", "link", "meta", "base", "noscript", "template",
            "div", "span", "section", "a",
        ] {
            assert!(!policy.allows_element(tag), "{tag} should not be approved");
        }
    }

    #[test]
    fn attribute_union_includes_class_and_no_handlers() {
        let attrs = TagPolicy::default().attributes();
        assert!(attrs.contains("class"));
        assert!(attrs.contains("cellpadding"));
        assert!(attrs.contains("cite"));
        assert!(!attrs.contains("style"));
        assert!(!attrs.contains("href"));
        assert!(!attrs.contains("src"));
        assert!(attrs.iter().all(|a| !a.starts_with("on")));
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let policy = TagPolicy::default();
        assert!(policy.allows_element("TABLE"));
        assert!(policy.allows_attribute("TD", "ColSpan"));
        assert!(policy.allows_attribute("b", "class"));
        assert!(!policy.allows_attribute("b", "style"));
        assert!(!policy.allows_attribute("div", "class"));
    }

    #[test]
    fn restricted_narrows_the_table() {
        let policy = TagPolicy::restricted(&["center", "BIG"], &["table.frame"]).unwrap();
        assert!(!policy.allows_element("center"));
        assert!(!policy.allows_element("big"));
        assert!(!policy.allows_attribute("table", "frame"));
        assert!(policy.allows_attribute("table", "border"));
    }

    #[test]
    fn restricted_cannot_widen_the_table() {
        assert_eq!(
            TagPolicy::restricted(&["script"], &[]),
            Err(PolicyError::UnknownTag("script".to_string()))
        );
        assert_eq!(
            TagPolicy::restricted::<&str>(&[], &["p.onclick"]),
            Err(PolicyError::UnknownAttribute {
                tag: "p".to_string(),
                attribute: "onclick".to_string()
            })
        );
        assert_eq!(
            TagPolicy::restricted::<&str>(&[], &["width"]),
            Err(PolicyError::MalformedAttributeRule("width".to_string()))
        );
    }

    #[test]
    fn disabling_an_attribute_of_a_disabled_tag_is_accepted() {
        let policy = TagPolicy::restricted(&["hr"], &["hr.width"]).unwrap();
        assert!(!policy.allows_element("hr"));
    }
}
