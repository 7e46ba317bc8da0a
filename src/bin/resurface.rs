//! Resurface CLI - Command-line interface for the Resurface engine
//!
//! Commands:
//! - ingest: Classify captures into stored items (batch mode)
//! - suggest: Pick the item to resurface per stack from a store snapshot
//! - classify: Show features and classification for an ad-hoc capture
//! - config: Print the default configuration or validate a config file
//! - doctor: Diagnose configuration and store health

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use resurface::{
    CaptureEvent, InMemoryItemStore, ItemStore, ResurfaceConfig, ResurfaceProcessor, Stack,
    StoredItem, TriggerKind, PRODUCER_NAME, RESURFACE_VERSION,
};

/// Resurface - classify captures and pick what to show next
#[derive(Parser)]
#[command(name = "resurface")]
#[command(version = RESURFACE_VERSION)]
#[command(about = "Classify saved captures and choose which one to resurface", long_about = None)]
struct Cli {
    /// Log pipeline decisions to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify captures into stored items (batch mode)
    Ingest {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Store snapshot to upsert the new items into (created if missing)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Creation time for the items (RFC 3339, defaults to now)
        #[arg(long)]
        now: Option<String>,
    },

    /// Pick the item to resurface from a store snapshot
    Suggest {
        /// Store snapshot file
        #[arg(long)]
        store: PathBuf,

        /// Stack to suggest for (all stacks when omitted)
        #[arg(long)]
        stack: Option<String>,

        /// Reference time (RFC 3339, defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Print every candidate's score breakdown
        #[arg(long)]
        explain: bool,

        /// Record the winners as shown and save the store
        #[arg(long)]
        mark_shown: bool,

        /// Config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show features and classification for an ad-hoc capture
    Classify {
        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        text: Option<String>,

        /// Source application bundle identifier
        #[arg(long)]
        source_app: Option<String>,

        /// Capture time (RFC 3339 with offset, defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration, or validate a config file
    Config {
        /// Config file to validate
        #[arg(long)]
        validate: Option<PathBuf>,
    },

    /// Diagnose configuration and store health
    Doctor {
        /// Check a store snapshot
        #[arg(long)]
        store: Option<PathBuf>,

        /// Check a config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one capture per line)
    Ndjson,
    /// JSON array of captures
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one item per line)
    Ndjson,
    /// JSON array of items
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), ResurfaceCliError> {
    match cli.command {
        Commands::Ingest {
            input,
            output,
            input_format,
            output_format,
            store,
            config,
            now,
        } => cmd_ingest(
            &input,
            &output,
            input_format,
            output_format,
            store.as_deref(),
            config.as_deref(),
            now.as_deref(),
        ),

        Commands::Suggest {
            store,
            stack,
            at,
            explain,
            mark_shown,
            config,
        } => cmd_suggest(
            &store,
            stack.as_deref(),
            at.as_deref(),
            explain,
            mark_shown,
            config.as_deref(),
        ),

        Commands::Classify {
            url,
            text,
            source_app,
            at,
            config,
        } => cmd_classify(url, text, source_app, at.as_deref(), config.as_deref()),

        Commands::Config { validate } => cmd_config(validate.as_deref()),

        Commands::Doctor {
            store,
            config,
            json,
        } => cmd_doctor(store.as_deref(), config.as_deref(), json),
    }
}

fn cmd_ingest(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    store_path: Option<&Path>,
    config_path: Option<&Path>,
    now: Option<&str>,
) -> Result<(), ResurfaceCliError> {
    let processor = load_processor(config_path)?;
    let now = parse_utc(now)?;

    let input_data = read_input(input)?;
    let captures: Vec<CaptureEvent> = match input_format {
        InputFormat::Ndjson => input_data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(serde_json::from_str::<CaptureEvent>)
            .collect::<Result<_, _>>()?,
        InputFormat::Json => serde_json::from_str(&input_data)?,
    };

    if captures.is_empty() {
        return Err(ResurfaceCliError::NoCaptures);
    }

    let mut store = match store_path {
        Some(path) if path.exists() => InMemoryItemStore::from_json(&fs::read_to_string(path)?)?,
        _ => InMemoryItemStore::new(),
    };

    let items: Vec<StoredItem> = captures
        .iter()
        .map(|capture| processor.ingest(&mut store, capture, now))
        .collect();

    tracing::info!(captures = items.len(), stored = store.len(), "ingested captures");

    if let Some(path) = store_path {
        fs::write(path, store.to_json()?)?;
    }

    write_output(output, &format_output(&items, &output_format)?)
}

fn cmd_suggest(
    store_path: &Path,
    stack: Option<&str>,
    at: Option<&str>,
    explain: bool,
    mark_shown: bool,
    config_path: Option<&Path>,
) -> Result<(), ResurfaceCliError> {
    let processor = load_processor(config_path)?;
    let at = parse_utc(at)?;
    let mut store = InMemoryItemStore::from_json(&fs::read_to_string(store_path)?)?;

    let stacks: Vec<Stack> = match stack {
        Some(name) => vec![name.parse()?],
        None => Stack::ALL.to_vec(),
    };

    let snapshot = store.fetch_all();
    let mut report = Vec::new();
    let mut shown = Vec::new();

    for stack in stacks {
        let winner = processor.suggest(stack, at, &snapshot);
        let candidates = if explain {
            Some(
                processor
                    .scorer()
                    .rank(stack, at, &snapshot)
                    .into_iter()
                    .map(|(_, breakdown)| breakdown)
                    .collect::<Vec<_>>(),
            )
        } else {
            None
        };

        if let Some(item) = winner {
            shown.push(item.clone().record_shown(at));
        }

        report.push(serde_json::json!({
            "stack": stack.as_str(),
            "item": winner,
            "candidates": candidates,
        }));
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if mark_shown && !shown.is_empty() {
        for item in shown {
            store.upsert(item);
        }
        fs::write(store_path, store.to_json()?)?;
    }

    Ok(())
}

fn cmd_classify(
    url: Option<String>,
    text: Option<String>,
    source_app: Option<String>,
    at: Option<&str>,
    config_path: Option<&Path>,
) -> Result<(), ResurfaceCliError> {
    let processor = load_processor(config_path)?;
    let timestamp = match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|e| ResurfaceCliError::Time(format!("{raw}: {e}")))?,
        None => Utc::now().fixed_offset(),
    };

    let mut capture = CaptureEvent::new(timestamp, TriggerKind::QuickSave);
    capture.url = url;
    capture.text = text;
    capture.source_app = source_app;

    let (features, classification) = processor.classify(&capture);
    let report = serde_json::json!({
        "features": features,
        "classification": classification,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_config(validate: Option<&Path>) -> Result<(), ResurfaceCliError> {
    match validate {
        Some(path) => {
            ResurfaceConfig::from_json(&fs::read_to_string(path)?)?;
            println!("Config OK: {}", path.display());
        }
        None => println!("{}", ResurfaceConfig::default().to_json()?),
    }
    Ok(())
}

fn cmd_doctor(
    store_path: Option<&Path>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), ResurfaceCliError> {
    let mut checks: Vec<DoctorCheck> = vec![DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Resurface version {}", RESURFACE_VERSION),
    }];

    if let Some(path) = config_path {
        checks.push(match fs::read_to_string(path) {
            Ok(content) => match ResurfaceConfig::from_json(&content) {
                Ok(_) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: "Config file valid".to_string(),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            },
        });
    }

    if let Some(path) = store_path {
        let check = if !path.exists() {
            DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Warning,
                message: "Store file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(path)
                .map_err(ResurfaceCliError::from)
                .and_then(|content| {
                    InMemoryItemStore::from_json(&content).map_err(ResurfaceCliError::from)
                })
            {
                Ok(store) => DoctorCheck {
                    name: "store".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Store snapshot valid ({} items)", store.len()),
                },
                Err(e) => DoctorCheck {
                    name: "store".to_string(),
                    status: CheckStatus::Error,
                    message: CliError::from(e).message,
                },
            }
        };
        checks.push(check);
    }

    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass captures with --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for `ingest --input -`)".to_string(),
        }
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: RESURFACE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Resurface Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(ResurfaceCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_processor(config_path: Option<&Path>) -> Result<ResurfaceProcessor, ResurfaceCliError> {
    match config_path {
        Some(path) => {
            let config = ResurfaceConfig::from_json(&fs::read_to_string(path)?)?;
            Ok(ResurfaceProcessor::with_config(config)?)
        }
        None => Ok(ResurfaceProcessor::new()),
    }
}

fn parse_utc(raw: Option<&str>) -> Result<DateTime<Utc>, ResurfaceCliError> {
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ResurfaceCliError::Time(format!("{raw}: {e}"))),
        None => Ok(Utc::now()),
    }
}

fn read_input(input: &Path) -> Result<String, ResurfaceCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), ResurfaceCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output(items: &[StoredItem], format: &OutputFormat) -> Result<String, ResurfaceCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(items)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(items)?),
    }
}

// Error types

#[derive(Debug)]
enum ResurfaceCliError {
    Io(io::Error),
    Core(resurface::ResurfaceError),
    Json(serde_json::Error),
    Time(String),
    NoCaptures,
    DoctorFailed,
}

impl From<io::Error> for ResurfaceCliError {
    fn from(e: io::Error) -> Self {
        ResurfaceCliError::Io(e)
    }
}

impl From<resurface::ResurfaceError> for ResurfaceCliError {
    fn from(e: resurface::ResurfaceError) -> Self {
        ResurfaceCliError::Core(e)
    }
}

impl From<serde_json::Error> for ResurfaceCliError {
    fn from(e: serde_json::Error) -> Self {
        ResurfaceCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ResurfaceCliError> for CliError {
    fn from(e: ResurfaceCliError) -> Self {
        match e {
            ResurfaceCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ResurfaceCliError::Core(e) => CliError {
                code: "RESURFACE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'resurface doctor' to check config and store files".to_string()),
            },
            ResurfaceCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ResurfaceCliError::Time(message) => CliError {
                code: "TIME_ERROR".to_string(),
                message,
                hint: Some("Use RFC 3339 timestamps, e.g. 2024-07-01T09:00:00+02:00".to_string()),
            },
            ResurfaceCliError::NoCaptures => CliError {
                code: "NO_CAPTURES".to_string(),
                message: "No captures found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ResurfaceCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: None,
            },
        }
    }
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
