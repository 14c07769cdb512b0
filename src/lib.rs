//! # data-formatter
//!
//! Converts LLM training datasets between file formats and chat stylings.
//!
//! ## Features
//!
//! - Formats: CSV (sniffed delimiter), JSON, JSONL, YAML
//! - Stylings: `openai_chat`, `sharegpt`, `alpaca`, `chatml`, `text_label`
//! - Automatic format and styling detection
//! - Transformers applied to every sample, such as context prompt injection
//! - Atomic file operations with automatic backups
//!
//! ## Quick Start
//!
//! ```no_run
//! use data_formatter::{ConversionConfig, DataConfig, FormatKind, convert};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let data = DataConfig::load(Path::new("data_config.json"))?;
//! let conversion = ConversionConfig::builder()
//!     .target_styling("sharegpt")
//!     .target_format(FormatKind::Jsonl)
//!     .build()?;
//!
//! let summary = convert(data, conversion)?;
//! summary.print_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Every conversion goes through one intermediate representation:
//! 1. **Format**: file content to raw records
//! 2. **Styling**: raw records to IR samples (`to_ir`)
//! 3. **Transformers**: IR samples to IR samples
//! 4. **Styling**: IR samples to raw records of the target styling (`from_ir`)
//! 5. **Writer**: raw records to the target format on disk

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod formatter;
mod writer;

pub mod detect;
pub mod format;
pub mod ir;
pub mod registry;
pub mod styling;
pub mod template;
pub mod transform;

pub use config::{ConversionConfig, ConversionConfigBuilder, DataConfig, DataEntry, OutputMode};
pub use detect::{detect_format, detect_format_for_path, detect_styling};
pub use error::{ComponentKind, Error, Result};
pub use format::{Format, FormatKind, Record};
pub use formatter::{ConversionSummary, DataFormatter, EntrySummary, RecordError};
pub use ir::{Dataset, MARKER_KEY, Provenance, Role, Sample, Turn};
pub use registry::{Registries, RegistryBuilder};
pub use styling::Styling;
pub use transform::{
    ContextPromptConfig, TransformPipeline, TransformStep, Transformer, TransformerFactory,
};

/// Converts every entry of `data_config` using the process-wide registries.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Either configuration is invalid
/// - A styling, format or transformer name is not registered
/// - The report file cannot be written
///
/// Record and entry failures do not return an error; they are listed in
/// the returned summary.
///
/// # Examples
///
/// ```no_run
/// use data_formatter::{ConversionConfig, DataConfig, DataEntry, convert};
///
/// # fn main() -> anyhow::Result<()> {
/// let data = DataConfig::new(vec![DataEntry::new("train.json")]);
/// let conversion = ConversionConfig::builder()
///     .target_styling("alpaca")
///     .build()?;
///
/// let summary = convert(data, conversion)?;
/// assert!(!summary.has_errors());
/// # Ok(())
/// # }
/// ```
pub fn convert(data_config: DataConfig, conversion: ConversionConfig) -> Result<ConversionSummary> {
    DataFormatter::new(data_config, conversion)?.convert()
}
