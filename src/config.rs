use crate::helper::link_helpers::{DEFAULT_EXTERNAL_LINK_CLASS, DEFAULT_LINK_CLASS};
use crate::helper::nesting_helpers::DEFAULT_MAX_NESTING_DEPTH;
use crate::helper::policy_helpers::{PolicyError, TagPolicy};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_HEADING_CLASS: &str = "e2-demoted-h1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load render settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid tag policy: {0}")]
    Policy(#[from] PolicyError),
    #[error("'{field}' must not be empty and can only contain letters, numbers, underscores, and hyphens (got '{value}')")]
    InvalidClassName { field: &'static str, value: String },
    #[error("'max_nesting_depth' must be at least 1")]
    InvalidNestingDepth,
}

/// Deployment settings for the renderer. Every field has a default, so an
/// empty file is valid.
///
/// ```toml
/// link_class = "e2-link"
/// disabled_tags = ["center"]
/// disabled_attributes = ["table.frame"]
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    pub link_class: String,
    pub external_link_class: String,
    /// Marker put on headings demoted from `h1`.
    pub heading_class: String,
    pub disabled_tags: Vec<String>,
    /// Entries are `tag.attribute`.
    pub disabled_attributes: Vec<String>,
    /// Start tags nested deeper than this are dropped before parsing.
    pub max_nesting_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            link_class: DEFAULT_LINK_CLASS.to_string(),
            external_link_class: DEFAULT_EXTERNAL_LINK_CLASS.to_string(),
            heading_class: DEFAULT_HEADING_CLASS.to_string(),
            disabled_tags: Vec::new(),
            disabled_attributes: Vec::new(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl RenderConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::load(config::File::from(path))
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Self::load(config::File::from_str(source, config::FileFormat::Toml))
    }

    fn load<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .set_default("link_class", DEFAULT_LINK_CLASS)?
            .set_default("external_link_class", DEFAULT_EXTERNAL_LINK_CLASS)?
            .set_default("heading_class", DEFAULT_HEADING_CLASS)?
            .add_source(source)
            .build()?;

        let render_config: RenderConfig = settings.try_deserialize()?;
        render_config.validate()?;
        Ok(render_config)
    }

    /// Class names may only contain ASCII letters, digits, `_` and `-`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("link_class", &self.link_class),
            ("external_link_class", &self.external_link_class),
            ("heading_class", &self.heading_class),
        ] {
            if value.is_empty()
                || !value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(ConfigError::InvalidClassName {
                    field,
                    value: value.clone(),
                });
            }
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::InvalidNestingDepth);
        }
        Ok(())
    }

    /// The built-in allowlist minus whatever this configuration disables.
    pub fn tag_policy(&self) -> Result<TagPolicy, PolicyError> {
        if self.disabled_tags.is_empty() && self.disabled_attributes.is_empty() {
            return Ok(TagPolicy::default());
        }
        let policy = TagPolicy::restricted(&self.disabled_tags, &self.disabled_attributes)?;
        log::warn!(
            "Render policy narrowed: {} tag(s) and {} attribute rule(s) disabled.",
            self.disabled_tags.len(),
            self.disabled_attributes.len()
        );
        Ok(policy)
    }
}
