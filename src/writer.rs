use crate::{
    config::{ConversionConfig, DataEntry, OutputMode},
    error::{Error, Result},
    format::FormatKind,
    formatter::ConversionSummary,
};
use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info, warn};

/// Report written to `report_path` after a run.
#[derive(Debug, Serialize)]
struct Report<'a> {
    /// Generation timestamp
    generated_at: String,

    /// Styling of the output records
    target_styling: &'a str,

    /// Format of the output files
    target_format: FormatKind,

    /// Whether files were actually written
    dry_run: bool,

    /// Per-entry results
    #[serde(flatten)]
    summary: &'a ConversionSummary,
}

/// Places converted datasets on disk with atomic operations.
#[derive(Debug, Clone)]
pub(crate) struct Writer {
    output_mode: OutputMode,
    output_dir: Option<PathBuf>,
    output_pattern: String,
    target_styling: String,
    target_format: FormatKind,
    backup_existing: bool,
    dry_run: bool,
}

impl Writer {
    /// Creates a new writer from configuration.
    pub(crate) fn new(config: &ConversionConfig) -> Self {
        Self {
            output_mode: config.output_mode,
            output_dir: config.output_dir.clone(),
            output_pattern: config.output_pattern.clone(),
            target_styling: config.target_styling.clone(),
            target_format: config.target_format,
            backup_existing: config.backup_existing,
            dry_run: config.dry_run,
        }
    }

    /// Generates the output file path for an entry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the input path has no file name.
    pub(crate) fn output_path(&self, entry: &DataEntry) -> Result<PathBuf> {
        let input = &entry.data_path;
        if self.output_mode == OutputMode::InPlace {
            return Ok(input.clone());
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| {
                Error::config(format!("Input path has no file name: {}", input.display()))
            })?
            .to_string_lossy();

        let filename = self
            .output_pattern
            .replace("{stem}", &stem)
            .replace("{styling}", &self.target_styling)
            .replace("{format}", self.target_format.as_str())
            .replace("{name}", entry.name.as_deref().unwrap_or(&stem))
            .replace("{ext}", self.target_format.extension());

        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        };

        Ok(dir.join(filename))
    }

    /// Writes rendered content, returning false in dry run mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the backup
    /// fails, or the file cannot be written.
    pub(crate) fn write(&self, path: &Path, content: &str) -> Result<bool> {
        if self.dry_run {
            info!(
                "Dry run: would write {} bytes to {}",
                content.len(),
                path.display()
            );
            return Ok(false);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        self.write_file_atomic(path, content)?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(true)
    }

    /// Writes a file atomically with optional backup.
    ///
    /// # Process
    ///
    /// 1. Creates backup if file exists and backup is enabled
    /// 2. Writes content to a temporary file beside the target
    /// 3. Syncs temporary file to disk
    /// 4. Atomically renames temporary file to target path
    ///
    /// The temporary file is removed if any step after its creation fails.
    fn write_file_atomic(&self, path: &Path, content: &str) -> Result<()> {
        if path.exists() && self.backup_existing {
            backup_file(path)?;
        }

        let temp_path = sibling(path, "tmp")?;
        let result = write_synced(&temp_path, content)
            .and_then(|()| fs::rename(&temp_path, path).map_err(|e| Error::io(path, e)));

        if result.is_err() && temp_path.exists() {
            if let Err(e) = fs::remove_file(&temp_path) {
                warn!("Failed to remove {}: {e}", temp_path.display());
            }
        }

        result
    }

    /// Writes the JSON run report.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized or written.
    pub(crate) fn write_report(&self, path: &Path, summary: &ConversionSummary) -> Result<()> {
        if self.dry_run {
            warn!("Dry run mode enabled - skipping report {}", path.display());
            return Ok(());
        }

        let report = Report {
            generated_at: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            target_styling: &self.target_styling,
            target_format: self.target_format,
            dry_run: self.dry_run,
            summary,
        };

        let mut content = serde_json::to_string_pretty(&report)?;
        content.push('\n');

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        self.write_file_atomic(path, &content)?;

        info!("Wrote report to {}", path.display());
        Ok(())
    }
}

/// `<dir>/<file name>.<suffix>`
fn sibling(path: &Path, suffix: &str) -> Result<PathBuf> {
    let filename = path
        .file_name()
        .ok_or_else(|| Error::config(format!("Invalid file path: {}", path.display())))?
        .to_string_lossy();

    Ok(path.with_file_name(format!("{filename}.{suffix}")))
}

fn write_synced(path: &Path, content: &str) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| Error::io(path, e))?;
    file.write_all(content.as_bytes()).map_err(|e| Error::io(path, e))?;
    file.sync_all().map_err(|e| Error::io(path, e))
}

/// Creates a timestamped backup of an existing file.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)?
        .as_nanos();

    let backup_path = sibling(path, &format!("backup.{timestamp}"))?;

    fs::copy(path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;

    debug!("Created backup: {}", backup_path.display());
    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfigBuilder;
    use assert_fs::prelude::*;

    fn writer(build: impl FnOnce(ConversionConfigBuilder) -> ConversionConfigBuilder) -> Writer {
        let config = build(ConversionConfig::builder().target_styling("sharegpt"))
            .build()
            .unwrap();
        Writer::new(&config)
    }

    fn backups(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.contains(".backup."))
            .collect()
    }

    #[test]
    fn test_default_output_path() {
        let w = writer(|b| b);
        let path = w.output_path(&DataEntry::new("data/train.json")).unwrap();
        assert_eq!(path, PathBuf::from("data/train_sharegpt.jsonl"));
    }

    #[test]
    fn test_output_dir_and_pattern() {
        let w = writer(|b| {
            b.output_dir("out")
                .output_pattern("{name}.{stem}.{format}.{ext}")
                .target_format(FormatKind::Yaml)
        });
        let entry = DataEntry::new("in/chat.csv").with_name("chats");
        assert_eq!(
            w.output_path(&entry).unwrap(),
            PathBuf::from("out/chats.chat.yaml.yaml")
        );

        let unnamed = DataEntry::new("chat.csv");
        assert_eq!(
            w.output_path(&unnamed).unwrap(),
            PathBuf::from("out/chat.chat.yaml.yaml")
        );
    }

    #[test]
    fn test_in_place_output_path() {
        let w = writer(|b| b.output_mode(OutputMode::InPlace));
        let path = w.output_path(&DataEntry::new("data/train.jsonl")).unwrap();
        assert_eq!(path, PathBuf::from("data/train.jsonl"));
    }

    #[test]
    fn test_write_creates_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("nested/dir/out.jsonl");

        let written = writer(|b| b).write(target.path(), "{}\n").unwrap();

        assert!(written);
        target.assert("{}\n");
        assert!(!temp.child("nested/dir/out.jsonl.tmp").exists());
    }

    #[test]
    fn test_write_creates_backup() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("out.jsonl");
        target.write_str("old content").unwrap();

        writer(|b| b).write(target.path(), "new").unwrap();

        target.assert("new");
        let found = backups(temp.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("out.jsonl.backup."));
    }

    #[test]
    fn test_write_without_backup() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("out.jsonl");
        target.write_str("old content").unwrap();

        writer(|b| b.backup_existing(false))
            .write(target.path(), "new")
            .unwrap();

        target.assert("new");
        assert!(backups(temp.path()).is_empty());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("out.jsonl");
        target.child("occupied").write_str("x").unwrap();

        let result = writer(|b| b.backup_existing(false)).write(target.path(), "data");

        assert!(result.unwrap_err().is_io());
        assert!(!temp.child("out.jsonl.tmp").exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("out.jsonl");

        let written = writer(|b| b.dry_run(true))
            .write(target.path(), "data")
            .unwrap();

        assert!(!written);
        assert!(!target.exists());
    }

    #[test]
    fn test_write_report() {
        let temp = assert_fs::TempDir::new().unwrap();
        let report = temp.child("reports/run.json");

        writer(|b| b)
            .write_report(report.path(), &ConversionSummary::default())
            .unwrap();

        let content = fs::read_to_string(report.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["target_styling"], "sharegpt");
        assert_eq!(value["target_format"], "jsonl");
        assert!(value["generated_at"].is_string());
        assert!(value["entries"].as_array().unwrap().is_empty());
    }
}
