use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The three kinds of pluggable components held by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Format parser/writer
    Parser,
    /// Styling converter
    Styling,
    /// IR transformer
    Transformer,
}

impl ComponentKind {
    /// Returns the lowercase name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Styling => "styling",
            Self::Transformer => "transformer",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comprehensive error types for the data-formatter library.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Data or conversion configuration failed validation.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// No format detector accepted the content.
    #[error("Could not detect the file format of '{source_name}': {reason}")]
    UnknownFormat {
        /// File path or other description of the content
        source_name: String,
        /// Why detection gave up
        reason: String,
    },

    /// No registered styling signature matched the sampled records.
    #[error("Could not detect the styling of '{source_name}': no registered styling matches the record shape")]
    UnknownStyling {
        /// File path or other description of the records
        source_name: String,
    },

    /// A record does not fit a styling, or a sample cannot be expressed by it.
    #[error("Malformed sample for styling '{styling}': {message}")]
    MalformedSample {
        /// Styling that rejected the sample
        styling: String,
        /// Error message
        message: String,
    },

    /// Registry lookup for a name that was never registered.
    #[error("Unknown {kind} '{name}'")]
    UnknownComponent {
        /// Component kind that was searched
        kind: ComponentKind,
        /// Requested name
        name: String,
    },

    /// Registering a name twice for the same kind.
    #[error("{kind} '{name}' is already registered")]
    DuplicateRegistration {
        /// Component kind
        kind: ComponentKind,
        /// Conflicting name
        name: String,
    },

    /// Registration attempted after the registries were frozen.
    #[error("Registries are frozen: components can only be registered before the first conversion")]
    RegistryFrozen,

    /// A transformer rejected its configuration or its input sample.
    #[error("Transformer '{transformer}' failed: {message}")]
    Transform {
        /// Transformer type name
        transformer: String,
        /// Error message
        message: String,
    },

    /// Content could not be parsed as the given format.
    #[error("Failed to parse {format} content: {message}")]
    Parse {
        /// Format name
        format: String,
        /// Error message
        message: String,
    },

    /// Serialization error while rendering output.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// System time error.
    #[error("System time error: {message}")]
    SystemTime {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a format detection error.
    #[must_use]
    pub fn unknown_format(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnknownFormat {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a styling detection error.
    #[must_use]
    pub fn unknown_styling(source_name: impl Into<String>) -> Self {
        Self::UnknownStyling {
            source_name: source_name.into(),
        }
    }

    /// Creates a malformed sample error.
    #[must_use]
    pub fn malformed(styling: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedSample {
            styling: styling.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown component error.
    #[must_use]
    pub fn unknown_component(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self::UnknownComponent {
            kind,
            name: name.into(),
        }
    }

    /// Creates a duplicate registration error.
    #[must_use]
    pub fn duplicate(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self::DuplicateRegistration {
            kind,
            name: name.into(),
        }
    }

    /// Creates a transformer error.
    #[must_use]
    pub fn transform(transformer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            transformer: transformer.into(),
            message: message.into(),
        }
    }

    /// Creates a format parse error.
    #[must_use]
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    ///
    /// Registry misuse and transformer construction failures count as
    /// configuration errors: they are detected before any record is read.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::UnknownComponent { .. }
                | Self::DuplicateRegistration { .. }
                | Self::RegistryFrozen
        )
    }

    /// Returns true if this is a malformed sample error.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedSample { .. })
    }
}

// Conversion implementations for convenient error handling
impl From<std::time::SystemTimeError> for Error {
    fn from(e: std::time::SystemTimeError) -> Self {
        Self::SystemTime {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/tmp/test.jsonl", io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("/tmp/test.jsonl"));
    }

    #[test]
    fn test_registry_errors_count_as_config() {
        assert!(Error::unknown_component(ComponentKind::Styling, "nope").is_config());
        assert!(Error::duplicate(ComponentKind::Parser, "json").is_config());
        assert!(Error::RegistryFrozen.is_config());
        assert!(!Error::malformed("alpaca", "missing output").is_config());
    }

    #[test]
    fn test_component_messages() {
        let err = Error::unknown_component(ComponentKind::Transformer, "shuffle");
        assert_eq!(err.to_string(), "Unknown transformer 'shuffle'");

        let err = Error::duplicate(ComponentKind::Styling, "alpaca");
        assert_eq!(err.to_string(), "styling 'alpaca' is already registered");
    }

    #[test]
    fn test_malformed_message() {
        let err = Error::malformed("alpaca", "missing required key 'output'");
        assert!(err.is_malformed());
        assert!(err.to_string().contains("alpaca"));
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn test_error_clone() {
        let err = Error::transform("context_prompt", "empty marker");
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }
}
