//! IR transformers and the pipeline that chains them.
//!
//! Transformers are registered as factories: a factory decodes and
//! validates its own typed configuration, so a bad step is rejected when
//! the pipeline is built, before any record is read.

mod context_prompt;

pub use context_prompt::{
    CONTEXT_PROMPT, ContextPromptConfig, ContextPromptFactory, ContextPromptTransformer,
    DEFAULT_MARKER, Position,
};

use crate::error::{Error, Result};
use crate::ir::Sample;
use crate::registry::Registries;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A pure sample-to-sample transformation.
pub trait Transformer: Send + Sync {
    /// Transformer type name.
    fn name(&self) -> &str;

    /// Returns a new sample; the input is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transform`] if the sample cannot be transformed.
    fn transform(&self, sample: &Sample) -> Result<Sample>;
}

/// Builds configured transformers of one type.
pub trait TransformerFactory: Send + Sync {
    /// Transformer type name used in [`TransformStep::kind`].
    fn name(&self) -> &str;

    /// Decodes `config` and builds a transformer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transform`] if the configuration is invalid.
    fn build(&self, config: &Value) -> Result<Box<dyn Transformer>>;
}

fn empty_config() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One `{type, config}` entry of a transformation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformStep {
    /// Registered transformer type
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific configuration
    #[serde(default = "empty_config")]
    pub config: Value,
}

impl TransformStep {
    /// Creates a step.
    #[must_use]
    pub fn new(kind: impl Into<String>, config: Value) -> Self {
        Self {
            kind: kind.into(),
            config,
        }
    }

    /// Reads a JSON array of steps from a file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a configuration
    /// error if it is not a list of `{type, config}` objects.
    pub fn load_all(path: &Path) -> Result<Vec<Self>> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            Error::config(format!(
                "invalid transformation list '{}': {e}",
                path.display()
            ))
        })
    }
}

/// Transformers applied in list order.
#[derive(Default)]
pub struct TransformPipeline {
    transformers: Vec<Box<dyn Transformer>>,
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("transformers", &self.names())
            .finish()
    }
}

impl TransformPipeline {
    /// Creates a pipeline from ready transformers.
    #[must_use]
    pub fn new(transformers: Vec<Box<dyn Transformer>>) -> Self {
        Self { transformers }
    }

    /// Builds every step through the registered factories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] for an unregistered type, or the
    /// factory's error for an invalid configuration.
    pub fn from_steps(steps: &[TransformStep], registries: &Registries) -> Result<Self> {
        let transformers = steps
            .iter()
            .map(|step| {
                let factory = registries.transformer(&step.kind)?;
                debug!(transformer = %step.kind, "Building transformer");
                factory.build(&step.config)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(transformers))
    }

    /// Applies every transformer in order.
    ///
    /// # Errors
    ///
    /// Returns the first transformer failure.
    pub fn apply(&self, sample: &Sample) -> Result<Sample> {
        apply(&self.transformers, sample)
    }

    /// Transformer names in application order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    /// Number of transformers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Returns true if the pipeline does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

/// Applies `transformers` to `sample` in list order.
///
/// # Errors
///
/// Returns the first transformer failure; later transformers do not run.
pub fn apply(transformers: &[Box<dyn Transformer>], sample: &Sample) -> Result<Sample> {
    let mut current = sample.clone();
    for transformer in transformers {
        current = transformer.transform(&current)?;
    }
    Ok(current)
}
