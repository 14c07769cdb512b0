use anyhow::Context;
use clap::Parser;
use data_formatter::transform::{CONTEXT_PROMPT, DEFAULT_MARKER, Position};
use data_formatter::{
    ContextPromptConfig, ConversionConfig, DataConfig, DataFormatter, FormatKind, OutputMode,
    Role, TransformStep,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Conversion finished but some records or entries failed.
const EXIT_CONVERSION_ERRORS: u8 = 2;

/// Configuration, argument or registry error.
const EXIT_CONFIG_ERROR: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "convert-data",
    version,
    author,
    about = "Convert LLM training datasets between formats and chat stylings",
    long_about = "Convert LLM training datasets between file formats and chat stylings.\n\n\
    Every file listed in the data configuration is parsed, converted to a shared \
    intermediate representation, optionally transformed, and written in the target \
    styling and format. Formats and stylings are detected when the configuration \
    does not name them.\n\n\
    STYLINGS: openai_chat, sharegpt, alpaca, chatml, text_label\n\n\
    USAGE EXAMPLES:\n  \
      # Convert to ShareGPT JSONL next to each input\n  \
      convert-data data_config.json sharegpt\n\n  \
      # Convert to Alpaca JSON in another directory\n  \
      convert-data data_config.json alpaca json --output-dir ./converted\n\n  \
      # Inject a system prompt, replacing one added by an earlier run\n  \
      convert-data data_config.json openai_chat --context-prompt \"Be concise.\" --replace-existing"
)]
struct Cli {
    /// Data configuration file listing the input datasets
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Styling of the output records
    #[arg(value_name = "TARGET_STYLING")]
    target_styling: String,

    /// Format of the output files
    #[arg(value_enum, default_value = "jsonl", value_name = "TARGET_FORMAT")]
    target_format: CliFormat,

    /// Directory for output files (default: next to each input)
    #[arg(short, long, value_name = "PATH", conflicts_with = "in_place")]
    output_dir: Option<PathBuf>,

    /// Overwrite the input files instead of creating new ones
    #[arg(long)]
    in_place: bool,

    /// Output filename pattern ({stem}, {ext}, {styling}, {format}, {name})
    #[arg(long, default_value = "{stem}_{styling}.{ext}")]
    pattern: String,

    /// JSON file with a list of {"type", "config"} transformations
    #[arg(long, value_name = "FILE")]
    transforms: Option<PathBuf>,

    /// Inject a context prompt into every sample (applied after --transforms)
    #[arg(long, value_name = "TEXT")]
    context_prompt: Option<String>,

    /// Role of the injected prompt
    #[arg(long, default_value = "system", requires = "context_prompt")]
    prompt_role: String,

    /// Where the injected prompt goes
    #[arg(long, value_enum, default_value = "prepend", requires = "context_prompt")]
    prompt_position: CliPosition,

    /// Replace a prompt injected earlier with the same marker (openai_chat
    /// output keeps markers across runs)
    #[arg(long, requires = "context_prompt")]
    replace_existing: bool,

    /// Marker identifying injected prompts
    #[arg(long, default_value = DEFAULT_MARKER, requires = "context_prompt")]
    marker: String,

    /// Abort an input file on its first bad record
    #[arg(long)]
    strict: bool,

    /// Dry run (don't write files)
    #[arg(long)]
    dry_run: bool,

    /// Don't back up files that are overwritten
    #[arg(long)]
    no_backup: bool,

    /// Write a JSON report of the run
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFormat {
    Csv,
    Json,
    Jsonl,
    Yaml,
}

impl From<CliFormat> for FormatKind {
    fn from(f: CliFormat) -> Self {
        match f {
            CliFormat::Csv => Self::Csv,
            CliFormat::Json => Self::Json,
            CliFormat::Jsonl => Self::Jsonl,
            CliFormat::Yaml => Self::Yaml,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliPosition {
    /// Before the first turn
    Prepend,
    /// After the last turn
    Append,
}

impl From<CliPosition> for Position {
    fn from(p: CliPosition) -> Self {
        match p {
            CliPosition::Prepend => Self::Prepend,
            CliPosition::Append => Self::Append,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_CONFIG_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    setup_tracing(cli.verbose);

    let formatter = match build_formatter(cli) {
        Ok(formatter) => formatter,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match formatter.convert() {
        Ok(summary) => {
            summary.print_summary();
            if summary.has_errors() {
                ExitCode::from(EXIT_CONVERSION_ERRORS)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", anyhow::Error::new(e).context("Conversion failed"));
            ExitCode::from(EXIT_CONVERSION_ERRORS)
        }
    }
}

fn build_formatter(cli: Cli) -> anyhow::Result<DataFormatter<'static>> {
    let data_config = DataConfig::load(&cli.config)
        .with_context(|| format!("Failed to load data config {}", cli.config.display()))?;

    let mut transformations = match &cli.transforms {
        Some(path) => TransformStep::load_all(path).context("Failed to load transformations")?,
        None => Vec::new(),
    };

    if let Some(prompt_text) = cli.context_prompt {
        let prompt = ContextPromptConfig::new(prompt_text)
            .position(cli.prompt_position.into())
            .role(Role::parse(&cli.prompt_role))
            .replace_existing(cli.replace_existing)
            .marker(cli.marker);
        let config = serde_json::to_value(&prompt).context("Failed to encode context prompt")?;
        transformations.push(TransformStep::new(CONTEXT_PROMPT, config));
    }

    let output_mode = if cli.in_place {
        OutputMode::InPlace
    } else {
        OutputMode::NewFile
    };

    let mut builder = ConversionConfig::builder()
        .target_styling(cli.target_styling)
        .target_format(cli.target_format.into())
        .output_mode(output_mode)
        .output_pattern(cli.pattern)
        .transformations(transformations)
        .strict(cli.strict)
        .dry_run(cli.dry_run)
        .backup_existing(!cli.no_backup);

    if let Some(output_dir) = cli.output_dir {
        builder = builder.output_dir(output_dir);
    }

    if let Some(report) = cli.report {
        builder = builder.report_path(report);
    }

    let conversion = builder.build().context("Failed to build configuration")?;

    DataFormatter::new(data_config, conversion).context("Failed to create formatter")
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("data_formatter=info"),
        1 => EnvFilter::new("data_formatter=debug"),
        _ => EnvFilter::new("data_formatter=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();
}
