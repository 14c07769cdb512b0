//! Format and styling auto-detection.
//!
//! Both detectors run a fixed priority list, so results never depend on
//! anything but the content and the registration order. Format detection
//! takes the first probe that accepts the content; styling detection takes
//! the styling matching the most sampled records.

use crate::error::{Error, Result};
use crate::format::{FormatKind, Record, sniff_delimiter};
use crate::registry::Registries;
use crate::styling::Styling;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Number of non-blank lines checked by the JSONL probe.
const JSONL_PROBE_LINES: usize = 5;

/// Number of records checked by the styling detector.
pub const STYLING_SAMPLE_SIZE: usize = 5;

/// Detects the format of `content`.
///
/// Tries strict JSON, then JSONL, then YAML, then a delimited header.
///
/// # Errors
///
/// Returns [`Error::UnknownFormat`] if no probe accepts the content.
pub fn detect_format(content: &str) -> Result<FormatKind> {
    detect_content(content, "<content>")
}

/// Detects the format of a file, trusting a known extension first.
///
/// # Errors
///
/// Returns [`Error::UnknownFormat`] if the extension is unknown and no
/// content probe accepts the content.
pub fn detect_format_for_path(path: &Path, content: &str) -> Result<FormatKind> {
    if let Some(kind) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(FormatKind::from_extension)
    {
        debug!(path = %path.display(), format = %kind, "Format chosen by extension");
        return Ok(kind);
    }

    detect_content(content, &path.display().to_string())
}

fn detect_content(content: &str, source_name: &str) -> Result<FormatKind> {
    if content.trim().is_empty() {
        return Err(Error::unknown_format(source_name, "content is empty"));
    }

    let probes: [(FormatKind, fn(&str) -> bool); 4] = [
        (FormatKind::Json, looks_like_json),
        (FormatKind::Jsonl, looks_like_jsonl),
        (FormatKind::Yaml, looks_like_yaml),
        (FormatKind::Csv, looks_like_csv),
    ];

    let kind = probes
        .into_iter()
        .find(|(_, probe)| probe(content))
        .map(|(kind, _)| kind)
        .ok_or_else(|| {
            Error::unknown_format(
                source_name,
                "content is not JSON, JSONL, YAML or delimited text",
            )
        })?;

    debug!(source = source_name, format = %kind, "Format detected from content");
    Ok(kind)
}

fn looks_like_json(content: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(content),
        Ok(Value::Array(_) | Value::Object(_))
    )
}

fn looks_like_jsonl(content: &str) -> bool {
    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(JSONL_PROBE_LINES)
        .peekable();

    lines.peek().is_some()
        && lines.all(|line| matches!(serde_json::from_str::<Value>(line), Ok(Value::Object(_))))
}

fn looks_like_yaml(content: &str) -> bool {
    let mut documents = 0;
    for document in serde_yaml::Deserializer::from_str(content) {
        match Value::deserialize(document) {
            Ok(Value::Array(_) | Value::Object(_)) => documents += 1,
            Ok(Value::Null) => {}
            _ => return false,
        }
    }
    documents > 0
}

fn looks_like_csv(content: &str) -> bool {
    sniff_delimiter(content).is_some()
}

/// Detects the styling of `records` from the first few of them.
///
/// The styling matching the most sampled records wins; ties go to the
/// earlier styling in priority order. Sampled records the winner does not
/// match are left for `to_ir` to reject one by one.
///
/// # Errors
///
/// Returns [`Error::UnknownStyling`] if the slice is empty or no styling
/// matches any sampled record.
pub fn detect_styling(records: &[Record], registries: &Registries) -> Result<String> {
    detect_styling_for(records, registries, "<records>")
}

pub(crate) fn detect_styling_for(
    records: &[Record],
    registries: &Registries,
    source_name: &str,
) -> Result<String> {
    let sample = &records[..records.len().min(STYLING_SAMPLE_SIZE)];
    if sample.is_empty() {
        return Err(Error::unknown_styling(source_name));
    }

    let mut best: Option<(&dyn Styling, usize)> = None;
    for styling in registries.stylings() {
        let hits = sample.iter().filter(|record| styling.matches(record)).count();
        if hits > best.map_or(0, |(_, top)| top) {
            best = Some((styling, hits));
        }
    }
    let (styling, hits) = best.ok_or_else(|| Error::unknown_styling(source_name))?;

    debug!(
        source = source_name,
        styling = styling.name(),
        sampled = sample.len(),
        matched = hits,
        "Styling detected"
    );
    Ok(styling.name().to_string())
}
