//! Skill trait and metadata.

use crate::error::SkillError;
use crate::input::SkillInput;
use crate::output::SkillOutput;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Descriptive metadata of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMeta {
    /// Unique name within a registry.
    pub name: String,
    pub version: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SkillMeta {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            category: category.into(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Case-insensitive match against name, description, category and tags.
    pub fn matches(&self, text: &str) -> bool {
        let needle = text.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.category.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

/// A self-contained unit of work.
///
/// Skills report business outcomes through [`SkillOutput`] codes. An `Err`
/// is an unexpected failure: the executor may retry it and eventually turns
/// it into a fatal output. The input is borrowed, so a skill can never
/// mutate the read-only context it was given.
///
/// # Examples
///
/// ```
/// use skillflow_core::{Skill, SkillError, SkillInput, SkillMeta, SkillOutput};
/// use async_trait::async_trait;
/// use serde_json::json;
///
/// struct Echo {
///     meta: SkillMeta,
/// }
///
/// #[async_trait]
/// impl Skill for Echo {
///     fn meta(&self) -> &SkillMeta {
///         &self.meta
///     }
///
///     async fn execute(&self, input: &SkillInput) -> Result<SkillOutput, SkillError> {
///         let text = input.param("text").cloned().unwrap_or(json!(""));
///         Ok(SkillOutput::success("echoed").with_data("echo", text))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let skill = Echo { meta: SkillMeta::new("echo", "util") };
/// let input = SkillInput::new("t-1", "echo").with_param("text", json!("hi"));
/// let out = skill.execute(&input).await.unwrap();
/// assert_eq!(out.data.get("echo"), Some(&json!("hi")));
/// # }
/// ```
#[async_trait]
pub trait Skill: Send + Sync {
    /// Returns the skill's metadata.
    fn meta(&self) -> &SkillMeta;

    /// Returns the skill name.
    fn name(&self) -> &str {
        &self.meta().name
    }

    /// Runs the skill against one input.
    async fn execute(&self, input: &SkillInput) -> Result<SkillOutput, SkillError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_matches() {
        let meta = SkillMeta::new("code_generator", "generation")
            .with_description("Generates source files from an analysis")
            .with_tag("Templates");

        assert!(meta.matches("GENERATOR"));
        assert!(meta.matches("source files"));
        assert!(meta.matches("templates"));
        assert!(meta.matches("generation"));
        assert!(!meta.matches("lint"));
    }
}
