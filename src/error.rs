use thiserror::Error;

/// Errors raised while changing a [`crate::SkillRegistry`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// A skill with this name is already registered.
    #[error("Skill already registered: {0}")]
    DuplicateSkill(String),

    /// The skill name is empty or blank.
    #[error("Invalid skill name: {0:?}")]
    InvalidName(String),
}

/// Errors raised by a [`crate::StateStore`].
///
/// The workflow engine logs these and carries on; they never fail a run.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StateError {
    /// The execution record could not be encoded or decoded.
    #[error("Failed to (de)serialize execution record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store rejected the operation.
    #[error("State backend error: {0}")]
    Backend(String),
}

/// Error returned when a [`crate::RetryConfig`] is invalid.
///
/// # Examples
///
/// ```
/// use skillflow::RetryConfig;
///
/// let config = RetryConfig {
///     multiplier: 0.5,
///     ..RetryConfig::default()
/// };
/// assert!(config.validate().is_err());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RetryConfigError(pub &'static str);

/// Errors raised while loading an [`crate::EngineConfig`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid retry configuration: {0}")]
    Retry(#[from] RetryConfigError),
}
