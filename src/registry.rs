//! In-memory skill catalogue.

use crate::error::RegistryError;
use skillflow_core::{Skill, SkillMeta};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Counts returned by [`SkillRegistry::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
}

/// Skills keyed by unique name and indexed by category.
///
/// Registration takes `&mut self`; once populated, the registry is usually
/// wrapped in an `Arc` and shared read-only with executors.
///
/// # Examples
///
/// ```
/// use skillflow::SkillRegistry;
/// use skillflow_core::{Skill, SkillError, SkillInput, SkillMeta, SkillOutput};
/// use async_trait::async_trait;
///
/// struct Lint(SkillMeta);
///
/// #[async_trait]
/// impl Skill for Lint {
///     fn meta(&self) -> &SkillMeta { &self.0 }
///     async fn execute(&self, _input: &SkillInput) -> Result<SkillOutput, SkillError> {
///         Ok(SkillOutput::success("clean"))
///     }
/// }
///
/// let mut registry = SkillRegistry::new();
/// registry.register(Lint(SkillMeta::new("lint", "testing"))).unwrap();
///
/// assert!(registry.get("lint").is_some());
/// assert_eq!(registry.get_by_category("testing").len(), 1);
/// assert_eq!(registry.stats().total, 1);
/// ```
#[derive(Default)]
pub struct SkillRegistry {
    skills: BTreeMap<String, Arc<dyn Skill>>,
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillRegistry")
            .field("skills", &self.skills.keys().collect::<Vec<_>>())
            .field("categories", &self.categories)
            .finish()
    }
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a skill under its own name.
    pub fn register(&mut self, skill: impl Skill + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(skill))
    }

    /// Registers an already shared skill.
    pub fn register_arc(&mut self, skill: Arc<dyn Skill>) -> Result<(), RegistryError> {
        let meta = skill.meta();
        let name = meta.name.clone();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidName(name));
        }
        if self.skills.contains_key(&name) {
            return Err(RegistryError::DuplicateSkill(name));
        }

        self.categories
            .entry(meta.category.clone())
            .or_default()
            .insert(name.clone());
        debug!(skill = %name, category = %meta.category, version = %meta.version, "Registered skill");
        self.skills.insert(name, skill);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    pub fn get_meta(&self, name: &str) -> Option<&SkillMeta> {
        self.skills.get(name).map(|s| s.meta())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    /// Skills in `category`, ordered by name.
    pub fn get_by_category(&self, category: &str) -> Vec<Arc<dyn Skill>> {
        self.categories
            .get(category)
            .into_iter()
            .flatten()
            .filter_map(|name| self.skills.get(name).cloned())
            .collect()
    }

    /// Skills whose name, description, category or tags contain `text`.
    pub fn search(&self, text: &str) -> Vec<Arc<dyn Skill>> {
        self.skills
            .values()
            .filter(|s| s.meta().matches(text))
            .cloned()
            .collect()
    }

    /// Removes a skill. Returns `false` if it was not registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(skill) = self.skills.remove(name) else {
            return false;
        };
        let category = &skill.meta().category;
        if let Some(names) = self.categories.get_mut(category) {
            names.remove(name);
            if names.is_empty() {
                self.categories.remove(category);
            }
        }
        debug!(skill = %name, "Unregistered skill");
        true
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.skills.len(),
            by_category: self
                .categories
                .iter()
                .map(|(category, names)| (category.clone(), names.len()))
                .collect(),
        }
    }
}
