use super::{Transformer, TransformerFactory};
use crate::error::{Error, Result};
use crate::ir::{MARKER_KEY, Role, Sample, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registered type name of the context-prompt transformer.
pub const CONTEXT_PROMPT: &str = "context_prompt";

/// Marker used when none is configured.
pub const DEFAULT_MARKER: &str = "__data_formatter_v1__";

/// Where an injected turn goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Before the first turn
    #[default]
    Prepend,
    /// After the last turn
    Append,
}

fn default_role() -> Role {
    Role::System
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

/// Configuration of [`ContextPromptTransformer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextPromptConfig {
    /// Text of the injected turn
    pub prompt_text: String,
    /// Where a new turn is inserted
    #[serde(default)]
    pub position: Position,
    /// Role of the injected turn
    #[serde(default = "default_role")]
    pub role: Role,
    /// Replace a previously injected turn instead of adding another one
    #[serde(default)]
    pub replace_existing: bool,
    /// Tag identifying injected turns
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl ContextPromptConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            position: Position::default(),
            role: default_role(),
            replace_existing: false,
            marker: default_marker(),
        }
    }

    /// Sets the insert position.
    #[must_use]
    pub const fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Sets the role of the injected turn.
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets replace mode.
    #[must_use]
    pub const fn replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }

    /// Sets the marker.
    #[must_use]
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transform`] if the prompt text, marker or role name
    /// is empty.
    pub fn validate(&self) -> Result<()> {
        if self.prompt_text.is_empty() {
            return Err(Error::transform(CONTEXT_PROMPT, "prompt_text cannot be empty"));
        }
        if self.marker.is_empty() {
            return Err(Error::transform(CONTEXT_PROMPT, "marker cannot be empty"));
        }
        if self.role.as_str().is_empty() {
            return Err(Error::transform(CONTEXT_PROMPT, "role cannot be empty"));
        }
        Ok(())
    }
}

/// Injects or replaces a marked context turn.
///
/// With `replace_existing` the first turn carrying the marker gets the new
/// text in place, which makes repeated runs idempotent. Without it a new
/// marked turn is always inserted, so repeated runs accumulate turns.
#[derive(Debug, Clone)]
pub struct ContextPromptTransformer {
    config: ContextPromptConfig,
}

impl ContextPromptTransformer {
    /// Creates the transformer from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transform`] if the configuration is invalid.
    pub fn new(config: ContextPromptConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ContextPromptConfig {
        &self.config
    }

    fn injected_turn(&self) -> Turn {
        Turn::new(self.config.role.clone(), self.config.prompt_text.as_str())
            .with_metadata(MARKER_KEY, self.config.marker.as_str())
    }
}

impl Transformer for ContextPromptTransformer {
    fn name(&self) -> &str {
        CONTEXT_PROMPT
    }

    fn transform(&self, sample: &Sample) -> Result<Sample> {
        let mut turns = sample.turns.clone();

        if self.config.replace_existing {
            if let Some(existing) = turns.iter_mut().find(|t| t.has_marker(&self.config.marker)) {
                existing.content.clone_from(&self.config.prompt_text);
                return Ok(Sample::new(turns));
            }
        }

        match self.config.position {
            Position::Prepend => turns.insert(0, self.injected_turn()),
            Position::Append => turns.push(self.injected_turn()),
        }
        Ok(Sample::new(turns))
    }
}

/// Builds [`ContextPromptTransformer`]s from JSON configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextPromptFactory;

impl TransformerFactory for ContextPromptFactory {
    fn name(&self) -> &str {
        CONTEXT_PROMPT
    }

    fn build(&self, config: &Value) -> Result<Box<dyn Transformer>> {
        let config: ContextPromptConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::transform(CONTEXT_PROMPT, format!("invalid config: {e}")))?;
        Ok(Box::new(ContextPromptTransformer::new(config)?))
    }
}
