use crate::error::{Error, Result};
use crate::format::FormatKind;
use crate::transform::TransformStep;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_PATTERN: &str = "{stem}_{styling}.{ext}";

/// Placeholders accepted in an output pattern.
const PATTERN_PLACEHOLDERS: [&str; 5] = ["stem", "ext", "styling", "format", "name"];

/// One input file of a data configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataEntry {
    /// Input file
    pub data_path: PathBuf,

    /// File format; detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatKind>,

    /// Record styling; detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styling: Option<String>,

    /// Human-readable label used in logs, reports and `{name}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DataEntry {
    /// Creates an entry with format and styling left to detection.
    #[must_use]
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            format: None,
            styling: None,
            name: None,
        }
    }

    /// Fixes the input format.
    #[must_use]
    pub const fn with_format(mut self, format: FormatKind) -> Self {
        self.format = Some(format);
        self
    }

    /// Fixes the input styling.
    #[must_use]
    pub fn with_styling(mut self, styling: impl Into<String>) -> Self {
        self.styling = Some(styling.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name for logs: the configured name or the file path.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.data_path.display().to_string())
    }
}

/// The `{"data": [...]}` document listing input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Input files in processing order
    pub data: Vec<DataEntry>,
}

impl DataConfig {
    /// Creates a configuration from entries.
    #[must_use]
    pub const fn new(data: Vec<DataEntry>) -> Self {
        Self { data }
    }

    /// Parses and validates a JSON data configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid JSON, unknown keys, a
    /// missing `data` list, an unknown format or an empty `data_path`.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| Error::config(format!("invalid data config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a data configuration file.
    ///
    /// Relative `data_path`s are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a configuration
    /// error if its content is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut config = Self::from_json_str(&content)?;

        if let Some(base) = path.parent() {
            for entry in &mut config.data {
                if entry.data_path.is_relative() {
                    entry.data_path = base.join(&entry.data_path);
                }
            }
        }

        Ok(config)
    }

    /// Validates every entry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid entry.
    pub fn validate(&self) -> Result<()> {
        for (index, entry) in self.data.iter().enumerate() {
            if entry.data_path.as_os_str().is_empty() {
                return Err(Error::config(format!("data[{index}]: data_path cannot be empty")));
            }
            if entry.styling.as_deref().is_some_and(str::is_empty) {
                return Err(Error::config(format!("data[{index}]: styling cannot be empty")));
            }
        }
        Ok(())
    }
}

/// Where converted files are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// A new file next to the input (or in the output directory)
    #[default]
    NewFile,
    /// Overwrite the input file
    #[serde(alias = "inplace")]
    InPlace,
}

/// Settings of one conversion run.
///
/// Use [`ConversionConfig::builder()`] to construct a new configuration.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ConversionConfig {
    /// Styling of the output records
    pub target_styling: String,

    /// Format of the output files
    pub target_format: FormatKind,

    /// New files or in-place rewrite
    pub output_mode: OutputMode,

    /// Output directory for new files; the input's directory when absent
    pub output_dir: Option<PathBuf>,

    /// Output filename pattern (supports {stem}, {ext}, {styling}, {format}, {name})
    pub output_pattern: String,

    /// Transformations applied to every sample, in order
    pub transformations: Vec<TransformStep>,

    /// Abort an entry on its first record error
    pub strict: bool,

    /// Dry run mode (no file writes)
    pub dry_run: bool,

    /// Create backups of existing files
    pub backup_existing: bool,

    /// Where to write a JSON summary of the run
    pub report_path: Option<PathBuf>,
}

impl ConversionConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use data_formatter::{ConversionConfig, FormatKind};
    ///
    /// let config = ConversionConfig::builder()
    ///     .target_styling("sharegpt")
    ///     .target_format(FormatKind::Json)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The target styling is empty
    /// - The output pattern lacks `{stem}` or `{ext}`, or uses an unknown placeholder
    /// - An output directory is combined with in-place mode
    pub fn validate(&self) -> Result<()> {
        if self.target_styling.trim().is_empty() {
            return Err(Error::config("target_styling cannot be empty"));
        }

        for required in ["{stem}", "{ext}"] {
            if !self.output_pattern.contains(required) {
                return Err(Error::config(format!(
                    "output pattern '{}' must contain the {required} placeholder",
                    self.output_pattern
                )));
            }
        }

        for placeholder in placeholders(&self.output_pattern) {
            if !PATTERN_PLACEHOLDERS.contains(&placeholder) {
                return Err(Error::config(format!(
                    "output pattern '{}' has unknown placeholder {{{placeholder}}}",
                    self.output_pattern
                )));
            }
        }

        if self.output_mode == OutputMode::InPlace && self.output_dir.is_some() {
            return Err(Error::config(
                "output_dir cannot be combined with in-place output",
            ));
        }

        if self.output_mode == OutputMode::InPlace {
            tracing::warn!(
                "In-place mode rewrites input files; the output pattern is ignored"
            );
        }

        Ok(())
    }
}

/// Names between `{` and `}` in a pattern.
fn placeholders(pattern: &str) -> impl Iterator<Item = &str> {
    pattern.split('{').skip(1).filter_map(|part| part.split_once('}').map(|(name, _)| name))
}

/// Builder for creating a [`ConversionConfig`].
#[derive(Debug, Default)]
pub struct ConversionConfigBuilder {
    target_styling: Option<String>,
    target_format: Option<FormatKind>,
    output_mode: Option<OutputMode>,
    output_dir: Option<PathBuf>,
    output_pattern: Option<String>,
    transformations: Vec<TransformStep>,
    strict: bool,
    dry_run: bool,
    backup_existing: Option<bool>,
    report_path: Option<PathBuf>,
}

impl ConversionConfigBuilder {
    /// Sets the output styling.
    #[must_use]
    pub fn target_styling(mut self, styling: impl Into<String>) -> Self {
        self.target_styling = Some(styling.into());
        self
    }

    /// Sets the output format (default `jsonl`).
    #[must_use]
    pub const fn target_format(mut self, format: FormatKind) -> Self {
        self.target_format = Some(format);
        self
    }

    /// Sets the output mode.
    #[must_use]
    pub const fn output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = Some(mode);
        self
    }

    /// Sets the output directory for new files.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the output filename pattern.
    ///
    /// Pattern must contain `{stem}` and `{ext}` placeholders.
    #[must_use]
    pub fn output_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.output_pattern = Some(pattern.into());
        self
    }

    /// Appends one transformation step.
    #[must_use]
    pub fn transformation(mut self, step: TransformStep) -> Self {
        self.transformations.push(step);
        self
    }

    /// Replaces the transformation list.
    #[must_use]
    pub fn transformations(mut self, steps: Vec<TransformStep>) -> Self {
        self.transformations = steps;
        self
    }

    /// Enables strict mode.
    #[must_use]
    pub const fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables or disables backup creation.
    #[must_use]
    pub const fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = Some(enabled);
        self
    }

    /// Sets the path of the JSON report.
    #[must_use]
    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no target styling was set or validation fails.
    pub fn build(self) -> Result<ConversionConfig> {
        let target_styling = self
            .target_styling
            .ok_or_else(|| Error::config("target_styling is required"))?;

        let config = ConversionConfig {
            target_styling,
            target_format: self.target_format.unwrap_or(FormatKind::Jsonl),
            output_mode: self.output_mode.unwrap_or_default(),
            output_dir: self.output_dir,
            output_pattern: self
                .output_pattern
                .unwrap_or_else(|| DEFAULT_OUTPUT_PATTERN.to_string()),
            transformations: self.transformations,
            strict: self.strict,
            dry_run: self.dry_run,
            backup_existing: self.backup_existing.unwrap_or(true),
            report_path: self.report_path,
        };

        config.validate()?;
        Ok(config)
    }
}
