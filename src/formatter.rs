use crate::{
    config::{ConversionConfig, DataConfig, DataEntry},
    detect,
    error::{Error, Result},
    format::{FormatKind, Record},
    ir::{Dataset, Provenance, Sample},
    registry::{self, Registries},
    styling::Styling,
    transform::TransformPipeline,
    writer::Writer,
};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

fn serialize_error<S: Serializer>(error: &Error, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

fn serialize_failure<S: Serializer>(
    error: &Option<Error>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.collect_str(error),
        None => serializer.serialize_none(),
    }
}

/// A record that could not be converted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    /// Input file of the record
    pub source_path: PathBuf,

    /// Zero-based position of the record in its file
    pub index: usize,

    /// What went wrong
    #[serde(serialize_with = "serialize_error")]
    pub error: Error,
}

impl RecordError {
    fn new(source_path: &Path, index: usize, error: Error) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            index,
            error,
        }
    }
}

/// Outcome of one data-config entry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntrySummary {
    /// Entry name, or its path when unnamed
    pub name: String,

    /// Input file
    pub source_path: PathBuf,

    /// Format used to parse the input
    pub source_format: Option<FormatKind>,

    /// Styling used to read the input
    pub source_styling: Option<String>,

    /// Where the output goes
    pub output_path: Option<PathBuf>,

    /// Records parsed from the input
    pub records_read: usize,

    /// Records written to the output
    pub records_converted: usize,

    /// Whether the output file was written
    pub written: bool,

    /// Per-record failures
    pub record_errors: Vec<RecordError>,

    /// File-level failure that aborted the entry
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<Error>,
}

impl EntrySummary {
    fn new(entry: &DataEntry) -> Self {
        Self {
            name: entry.label(),
            source_path: entry.data_path.clone(),
            ..Self::default()
        }
    }

    /// Returns true if the entry converted every record.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failure.is_none() && self.record_errors.is_empty()
    }
}

/// Results of a whole conversion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionSummary {
    /// One summary per data-config entry, in order
    pub entries: Vec<EntrySummary>,

    /// Total execution time in seconds
    pub duration_secs: f64,
}

impl ConversionSummary {
    /// Records parsed across all entries.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.entries.iter().map(|e| e.records_read).sum()
    }

    /// Records written across all entries.
    #[must_use]
    pub fn records_converted(&self) -> usize {
        self.entries.iter().map(|e| e.records_converted).sum()
    }

    /// Every per-record failure.
    pub fn record_errors(&self) -> impl Iterator<Item = &RecordError> {
        self.entries.iter().flat_map(|e| e.record_errors.iter())
    }

    /// Entries aborted by a file-level failure.
    pub fn failed_entries(&self) -> impl Iterator<Item = &EntrySummary> {
        self.entries.iter().filter(|e| e.failure.is_some())
    }

    /// Number of output files written.
    #[must_use]
    pub fn files_written(&self) -> usize {
        self.entries.iter().filter(|e| e.written).count()
    }

    /// Returns true if any record or entry failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| !e.is_clean())
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            Conversion Summary                         ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Entries:              {:>8}                        ║",
            self.entries.len()
        );
        println!(
            "║   - Failed:           {:>8}                        ║",
            self.failed_entries().count()
        );
        println!("║                                                       ║");
        println!(
            "║ Records Read:         {:>8}                        ║",
            self.records_read()
        );
        println!(
            "║ Records Converted:    {:>8}                        ║",
            self.records_converted()
        );
        println!(
            "║ Record Errors:        {:>8}                        ║",
            self.record_errors().count()
        );
        println!("║                                                       ║");
        println!(
            "║ Files Written:        {:>8}                        ║",
            self.files_written()
        );
        println!(
            "║ Total Time:           {:>8.2}s                       ║",
            self.duration_secs
        );
        println!("╚═══════════════════════════════════════════════════════╝");

        for entry in &self.entries {
            let status = if entry.is_clean() { "✓" } else { "✗" };
            let target = entry
                .output_path
                .as_ref()
                .map_or_else(|| "-".to_string(), |p| p.display().to_string());
            println!(
                "  {status} {} ({}/{}) -> {target}",
                entry.name, entry.records_converted, entry.records_read
            );
            if let Some(failure) = &entry.failure {
                println!("      {failure}");
            }
            for error in &entry.record_errors {
                println!("      record {}: {}", error.index, error.error);
            }
        }
        println!();
    }
}

/// Samples of one entry, each with its record index.
struct EntryRead {
    provenance: Provenance,
    records_read: usize,
    samples: Vec<(usize, Sample)>,
}

/// Converts every dataset of a data configuration.
///
/// Each entry goes through: read, format detection, parse, styling
/// detection, `to_ir`, the transformer pipeline, the target styling's
/// `from_ir`, render and write. Failures are collected per record and per
/// entry; an entry never aborts the others.
pub struct DataFormatter<'r> {
    data_config: DataConfig,
    conversion: ConversionConfig,
    registries: &'r Registries,
    pipeline: TransformPipeline,
    writer: Writer,
}

impl std::fmt::Debug for DataFormatter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFormatter")
            .field("data_config", &self.data_config)
            .field("conversion", &self.conversion)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl DataFormatter<'static> {
    /// Creates a formatter backed by the process-wide registries.
    ///
    /// # Errors
    ///
    /// See [`DataFormatter::with_registries`].
    pub fn new(data_config: DataConfig, conversion: ConversionConfig) -> Result<Self> {
        Self::with_registries(data_config, conversion, registry::global())
    }
}

impl<'r> DataFormatter<'r> {
    /// Creates a formatter backed by explicit registries.
    ///
    /// Every name used by the configuration is resolved here, so an unknown
    /// styling, format or transformer fails before any file is read.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either configuration fails validation
    /// - A styling, format or transformer is not registered
    /// - A transformer rejects its configuration
    pub fn with_registries(
        data_config: DataConfig,
        conversion: ConversionConfig,
        registries: &'r Registries,
    ) -> Result<Self> {
        data_config.validate()?;
        conversion.validate()?;

        registries.styling(&conversion.target_styling)?;
        registries.format(conversion.target_format)?;
        for entry in &data_config.data {
            if let Some(styling) = &entry.styling {
                registries.styling(styling)?;
            }
            if let Some(format) = entry.format {
                registries.format(format)?;
            }
        }

        let pipeline = TransformPipeline::from_steps(&conversion.transformations, registries)?;
        let writer = Writer::new(&conversion);

        Ok(Self {
            data_config,
            conversion,
            registries,
            pipeline,
            writer,
        })
    }

    /// The data configuration being converted.
    #[must_use]
    pub const fn data_config(&self) -> &DataConfig {
        &self.data_config
    }

    /// Reads one entry into IR samples without transforming or writing.
    ///
    /// Returns the dataset together with the records that failed `to_ir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, its format or styling
    /// cannot be determined, it cannot be parsed, or (in strict mode) a
    /// record is malformed.
    pub fn load(&self, entry: &DataEntry) -> Result<(Dataset, Vec<RecordError>)> {
        let mut errors = Vec::new();
        let read = self.read_entry(entry, &mut errors)?;

        let dataset = Dataset {
            samples: read.samples.into_iter().map(|(_, sample)| sample).collect(),
            provenance: read.provenance,
        };
        Ok((dataset, errors))
    }

    /// Converts every entry and writes the outputs.
    ///
    /// # Errors
    ///
    /// Entry and record failures are reported in the summary; an error is
    /// returned only if the report file cannot be written.
    #[instrument(skip(self), fields(
        target_styling = %self.conversion.target_styling,
        target_format = %self.conversion.target_format
    ))]
    pub fn convert(&self) -> Result<ConversionSummary> {
        let start_time = Instant::now();

        info!(
            "Converting {} entries with {} transformer(s)",
            self.data_config.data.len(),
            self.pipeline.len()
        );
        if self.conversion.dry_run {
            warn!("Dry run mode enabled - skipping file writes");
        }

        let entries = self
            .data_config
            .data
            .iter()
            .map(|entry| self.convert_entry(entry))
            .collect();

        let summary = ConversionSummary {
            entries,
            duration_secs: start_time.elapsed().as_secs_f64(),
        };

        if let Some(report_path) = &self.conversion.report_path {
            self.writer.write_report(report_path, &summary)?;
        }

        log_outcome(&summary, start_time.elapsed());
        Ok(summary)
    }

    #[instrument(skip_all, fields(entry = %entry.label()))]
    fn convert_entry(&self, entry: &DataEntry) -> EntrySummary {
        let mut summary = EntrySummary::new(entry);

        if let Err(error) = self.try_convert_entry(entry, &mut summary) {
            warn!("Entry failed: {error}");
            summary.failure = Some(error);
        }

        summary
    }

    fn try_convert_entry(&self, entry: &DataEntry, summary: &mut EntrySummary) -> Result<()> {
        let read = self.read_entry(entry, &mut summary.record_errors)?;
        summary.records_read = read.records_read;
        summary.source_format = Some(read.provenance.detected_format);
        summary.source_styling = Some(read.provenance.detected_styling.clone());

        let target = self.registries.styling(&self.conversion.target_styling)?;
        let records = self.convert_samples(entry, target, read.samples, &mut summary.record_errors)?;
        summary.records_converted = records.len();

        let content = self
            .registries
            .format(self.conversion.target_format)?
            .render(&records)?;

        let output_path = self.writer.output_path(entry)?;
        summary.written = self.writer.write(&output_path, &content)?;
        summary.output_path = Some(output_path);

        info!(
            "✓ Converted {}/{} records",
            summary.records_converted, summary.records_read
        );
        Ok(())
    }

    fn convert_samples(
        &self,
        entry: &DataEntry,
        target: &dyn Styling,
        samples: Vec<(usize, Sample)>,
        errors: &mut Vec<RecordError>,
    ) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(samples.len());

        for (index, sample) in samples {
            let converted = self
                .pipeline
                .apply(&sample)
                .and_then(|sample| target.from_ir(&sample));

            match converted {
                Ok(record) => records.push(record),
                Err(error) => self.collect(entry, index, error, errors)?,
            }
        }

        Ok(records)
    }

    fn read_entry(&self, entry: &DataEntry, errors: &mut Vec<RecordError>) -> Result<EntryRead> {
        let path = &entry.data_path;
        let content = read_content(path)?;

        let format = match entry.format {
            Some(format) => format,
            None => detect::detect_format_for_path(path, &content)?,
        };
        let raw = self.registries.format(format)?.parse(&content)?;
        debug!(format = %format, records = raw.len(), "Parsed input");

        let styling_name = match (&entry.styling, raw.is_empty()) {
            (Some(name), _) => name.clone(),
            (None, true) => String::new(),
            (None, false) => {
                detect::detect_styling_for(&raw, self.registries, &path.display().to_string())?
            }
        };

        let mut samples = Vec::with_capacity(raw.len());
        if !raw.is_empty() {
            let styling = self.registries.styling(&styling_name)?;
            for (index, record) in raw.iter().enumerate() {
                match styling.to_ir(record) {
                    Ok(sample) => samples.push((index, sample)),
                    Err(error) => self.collect(entry, index, error, errors)?,
                }
            }
        }

        Ok(EntryRead {
            provenance: Provenance {
                source_path: path.clone(),
                detected_format: format,
                detected_styling: styling_name,
            },
            records_read: raw.len(),
            samples,
        })
    }

    /// Stores a record failure; in strict mode it also aborts the entry.
    fn collect(
        &self,
        entry: &DataEntry,
        index: usize,
        error: Error,
        errors: &mut Vec<RecordError>,
    ) -> Result<()> {
        warn!(record = index, "Record skipped: {error}");
        errors.push(RecordError::new(&entry.data_path, index, error.clone()));

        if self.conversion.strict {
            return Err(error);
        }
        Ok(())
    }
}

fn read_content(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(match content.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}

fn log_outcome(summary: &ConversionSummary, duration: Duration) {
    let record_errors = summary.record_errors().count();
    let failed = summary.failed_entries().count();

    if record_errors == 0 && failed == 0 {
        info!(
            "✓ Conversion completed successfully in {:.2}s",
            duration.as_secs_f64()
        );
    } else {
        warn!(
            "Conversion finished with {} record error(s) and {} failed entr{} in {:.2}s",
            record_errors,
            failed,
            if failed == 1 { "y" } else { "ies" },
            duration.as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputMode;
    use crate::registry::RegistryBuilder;
    use crate::transform::TransformStep;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use serde_json::json;

    fn registries() -> Registries {
        RegistryBuilder::builtin().freeze()
    }

    fn conversion(styling: &str) -> crate::config::ConversionConfigBuilder {
        ConversionConfig::builder().target_styling(styling)
    }

    #[test]
    fn test_openai_to_sharegpt_with_context_prompt() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("chat.jsonl");
        input
            .write_str(
                r#"{"messages":[{"role":"user","content":"Hello"},{"role":"assistant","content":"Hi there"}]}"#,
            )
            .unwrap();

        let step = TransformStep::new(
            "context_prompt",
            json!({
                "prompt_text": "You are a helpful assistant.",
                "position": "prepend",
                "role": "system",
                "replace_existing": true,
                "marker": "m1"
            }),
        );
        let config = conversion("sharegpt").transformation(step).build().unwrap();
        let registries = registries();
        let formatter = DataFormatter::with_registries(
            DataConfig::new(vec![DataEntry::new(input.path())]),
            config,
            &registries,
        )
        .unwrap();

        let summary = formatter.convert().unwrap();
        assert!(!summary.has_errors());

        let entry = &summary.entries[0];
        assert_eq!(entry.source_format, Some(FormatKind::Jsonl));
        assert_eq!(entry.source_styling.as_deref(), Some("openai_chat"));

        let output = temp.child("chat_sharegpt.jsonl");
        let content = fs::read_to_string(output.path()).unwrap();
        let record: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(
            record,
            json!({"conversations": [
                {"from": "system", "value": "You are a helpful assistant."},
                {"from": "human", "value": "Hello"},
                {"from": "gpt", "value": "Hi there"}
            ]})
        );
    }

    #[test]
    fn test_malformed_record_does_not_abort_file() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("alpaca.jsonl");
        input
            .write_str(concat!(
                "{\"instruction\": \"a\", \"output\": \"b\"}\n",
                "{\"instruction\": \"x\"}\n",
                "{\"instruction\": \"c\", \"output\": \"d\"}\n",
            ))
            .unwrap();

        let registries = registries();
        let entry = DataEntry::new(input.path()).with_styling("alpaca");
        let formatter = DataFormatter::with_registries(
            DataConfig::new(vec![entry]),
            conversion("openai_chat").build().unwrap(),
            &registries,
        )
        .unwrap();

        let summary = formatter.convert().unwrap();
        let entry = &summary.entries[0];
        assert_eq!(entry.records_read, 3);
        assert_eq!(entry.records_converted, 2);
        assert_eq!(entry.record_errors.len(), 1);
        assert_eq!(entry.record_errors[0].index, 1);
        assert!(entry.record_errors[0].error.is_malformed());
        assert!(entry.failure.is_none());
        assert!(summary.has_errors());

        let output = fs::read_to_string(temp.child("alpaca_openai_chat.jsonl").path()).unwrap();
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_malformed_record_with_detected_styling() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("mixed.jsonl");
        input
            .write_str(concat!(
                "{\"instruction\": \"a\", \"output\": \"b\"}\n",
                "{\"instruction\": \"x\"}\n",
                "{\"instruction\": \"c\", \"output\": \"d\"}\n",
            ))
            .unwrap();

        let registries = registries();
        let formatter = DataFormatter::with_registries(
            DataConfig::new(vec![DataEntry::new(input.path())]),
            conversion("openai_chat").build().unwrap(),
            &registries,
        )
        .unwrap();

        let summary = formatter.convert().unwrap();
        let entry = &summary.entries[0];
        assert!(entry.failure.is_none());
        assert_eq!(entry.source_styling.as_deref(), Some("alpaca"));
        assert_eq!(entry.records_converted, 2);
        assert_eq!(entry.record_errors.len(), 1);
        assert_eq!(entry.record_errors[0].index, 1);
        assert!(entry.record_errors[0].error.is_malformed());
    }

    #[test]
    fn test_rerun_replaces_injected_prompt() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("chat.jsonl");
        input
            .write_str("{\"messages\":[{\"role\":\"user\",\"content\":\"Hello\"}]}\n")
            .unwrap();

        let registries = registries();
        let step = TransformStep::new(
            "context_prompt",
            json!({"prompt_text": "SYS", "replace_existing": true, "marker": "m1"}),
        );
        let formatter = DataFormatter::with_registries(
            DataConfig::new(vec![DataEntry::new(input.path())]),
            conversion("openai_chat")
                .output_mode(OutputMode::InPlace)
                .backup_existing(false)
                .transformation(step)
                .build()
                .unwrap(),
            &registries,
        )
        .unwrap();

        for _ in 0..2 {
            assert!(!formatter.convert().unwrap().has_errors());
        }

        let content = fs::read_to_string(input.path()).unwrap();
        let record: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(
            record,
            json!({"messages": [
                {"role": "system", "content": "SYS", "_marker": "m1"},
                {"role": "user", "content": "Hello"}
            ]})
        );
    }

    #[test]
    fn test_strict_mode_aborts_entry() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("alpaca.jsonl");
        input
            .write_str("{\"instruction\": \"x\"}\n{\"instruction\": \"c\", \"output\": \"d\"}\n")
            .unwrap();

        let registries = registries();
        let formatter = DataFormatter::with_registries(
            DataConfig::new(vec![DataEntry::new(input.path()).with_styling("alpaca")]),
            conversion("sharegpt").strict(true).build().unwrap(),
            &registries,
        )
        .unwrap();

        let summary = formatter.convert().unwrap();
        let entry = &summary.entries[0];
        assert!(entry.failure.as_ref().is_some_and(Error::is_malformed));
        assert!(!entry.written);
        assert!(!temp.child("alpaca_sharegpt.jsonl").exists());
    }

    #[test]
    fn test_failed_entry_does_not_stop_others() {
        let temp = TempDir::new().unwrap();
        let good = temp.child("good.json");
        good.write_str(r#"[{"text": "great", "label": "pos"}]"#).unwrap();

        let registries = registries();
        let formatter = DataFormatter::with_registries(
            DataConfig::new(vec![
                DataEntry::new(temp.child("missing.json").path()),
                DataEntry::new(good.path()),
            ]),
            conversion("alpaca").target_format(FormatKind::Json).build().unwrap(),
            &registries,
        )
        .unwrap();

        let summary = formatter.convert().unwrap();
        assert!(summary.entries[0].failure.as_ref().is_some_and(Error::is_io));
        assert!(summary.entries[1].is_clean());

        let output = fs::read_to_string(temp.child("good_alpaca.json").path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, json!([{"instruction": "great", "output": "pos"}]));
    }

    #[test]
    fn test_dry_run_and_in_place() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("data.jsonl");
        let original = "{\"text\": \"t\", \"label\": \"l\"}\n";
        input.write_str(original).unwrap();

        let registries = registries();
        let data = DataConfig::new(vec![DataEntry::new(input.path())]);

        let dry = DataFormatter::with_registries(
            data.clone(),
            conversion("alpaca")
                .output_mode(OutputMode::InPlace)
                .dry_run(true)
                .build()
                .unwrap(),
            &registries,
        )
        .unwrap();
        let summary = dry.convert().unwrap();
        assert_eq!(summary.files_written(), 0);
        input.assert(original);

        let real = DataFormatter::with_registries(
            data,
            conversion("alpaca")
                .output_mode(OutputMode::InPlace)
                .backup_existing(false)
                .build()
                .unwrap(),
            &registries,
        )
        .unwrap();
        let summary = real.convert().unwrap();
        assert_eq!(summary.files_written(), 1);
        input.assert("{\"instruction\":\"t\",\"output\":\"l\"}\n");
    }

    #[test]
    fn test_csv_input_autodetected() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("labels.txt");
        input.write_str("text;label\ngood;1\nbad;0\n").unwrap();

        let registries = registries();
        let formatter = DataFormatter::with_registries(
            DataConfig::new(vec![DataEntry::new(input.path())]),
            conversion("text_label").build().unwrap(),
            &registries,
        )
        .unwrap();

        let (dataset, errors) = formatter.load(&formatter.data_config().data[0]).unwrap();
        assert!(errors.is_empty());
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.provenance.detected_format, FormatKind::Csv);
        assert_eq!(dataset.provenance.detected_styling, "text_label");
    }

    #[test]
    fn test_unknown_names_rejected_up_front() {
        let registries = registries();
        let data = DataConfig::new(vec![DataEntry::new("x.jsonl").with_styling("vicuna")]);

        let err = DataFormatter::with_registries(
            data,
            conversion("alpaca").build().unwrap(),
            &registries,
        )
        .unwrap_err();
        assert!(err.is_config());

        let err = DataFormatter::with_registries(
            DataConfig::new(vec![]),
            conversion("nope").build().unwrap(),
            &registries,
        )
        .unwrap_err();
        assert!(err.is_config());

        let err = DataFormatter::with_registries(
            DataConfig::new(vec![]),
            conversion("alpaca")
                .transformation(TransformStep::new("context_prompt", json!({"prompt_text": ""})))
                .build()
                .unwrap(),
            &registries,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Transform { .. }));
    }

    #[test]
    fn test_report_written() {
        let temp = TempDir::new().unwrap();
        let input = temp.child("in.json");
        input.write_str(r#"[{"instruction": "x"}]"#).unwrap();
        let report = temp.child("report.json");

        let registries = registries();
        let formatter = DataFormatter::with_registries(
            DataConfig::new(vec![DataEntry::new(input.path()).with_styling("alpaca")]),
            conversion("sharegpt").report_path(report.path()).build().unwrap(),
            &registries,
        )
        .unwrap();
        formatter.convert().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(report.path()).unwrap()).unwrap();
        let errors = value["entries"][0]["record_errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0]["error"].as_str().unwrap().contains("output"));
    }
}
