//! LIPA 360 - aging and region analytics for pending deliveries
//!
//! A CLI tool that reads a LIPA export workbook, classifies records by
//! region and aging, and produces a report workbook, an analytics
//! summary and, optionally, an email carrying the workbook.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Run failure (unreadable workbook, missing columns, config, I/O)
//!   2 - Outputs written but the email could not be sent

mod analysis;
mod cli;
mod config;
mod error;
mod ingest;
mod models;
mod notify;
mod report;

use analysis::{PipelineOptions, PipelineOutput};
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::{AnalyticsReport, RawRow, RunMetadata};
use notify::{EmailAttachment, Mailer, OutgoingEmail};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration; `[general] verbose` feeds the log level
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error loading configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("LIPA 360 v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error processing file: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .lipa360.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  .lipa360.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .lipa360.toml")?;

    println!("✅ Created .lipa360.toml with default settings.");
    println!("   Edit it to set SMTP details, thresholds and file names.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one full pass. Returns the exit code (0 or 2).
fn run(args: Args, config: Config) -> Result<i32> {
    let input = args
        .input
        .clone()
        .context("No input file given (use --input)")?;
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());

    // Step 1: Read and process the workbook
    let spinner = processing_spinner(args.quiet);
    let rows = read_rows(&input, config.pipeline.sheet.as_deref(), &spinner)?;

    let options = PipelineOptions {
        as_of,
        min_age_days: config.pipeline.min_age_days,
        aggregate: config.pipeline.aggregate_options(),
    };
    let output = analysis::run_pipeline(&rows, &options);
    spinner.finish_and_clear();

    if !args.quiet {
        println!("✅ File processed successfully!");
    }

    // Step 2: Write workbooks
    let workbook = report::assemble_workbook(output.partitions.iter())?;
    match &workbook {
        Some(bytes) => {
            let path = PathBuf::from(&config.general.output);
            write_file(&path, bytes)?;
            if !args.quiet {
                println!("📁 Report workbook saved to: {}", path.display());
            }
        }
        None => warn!("No records passed the aging filter; no workbook written"),
    }

    if args.split_regions {
        write_region_workbooks(&output, &config, args.quiet)?;
    }

    // Step 3: Render the analytics summary
    let analytics = AnalyticsReport {
        metadata: RunMetadata {
            source_file: input.display().to_string(),
            generated_at: Utc::now(),
            as_of,
            rows_read: output.rows_read,
            rows_retained: output.rows_retained(),
            row_issues: output.issues.len(),
        },
        regions: output.outcomes.clone(),
    };

    let rendered = match args.format {
        OutputFormat::Json => report::generate_json_report(&analytics)?,
        OutputFormat::Markdown => report::generate_markdown_report(&analytics),
    };

    match &args.summary {
        Some(path) => {
            write_file(path, rendered.as_bytes())?;
            if !args.quiet {
                println!("📊 Analytics summary saved to: {}", path.display());
            }
        }
        None => println!("{}", rendered),
    }

    if !args.quiet {
        print_region_counts(&output);
    }

    // Step 4: Optional email
    if let Some(ref to) = args.email_to {
        let attachment = if args.no_attachment {
            None
        } else {
            workbook.map(|bytes| EmailAttachment {
                filename: config.report.attachment_name.clone(),
                bytes,
            })
        };

        let email = OutgoingEmail {
            to: to.clone(),
            subject: config.email.subject.clone(),
            body: config.email.body.clone(),
            attachment,
        };

        let mailer = Mailer::new(config.smtp.settings());
        if let Err(e) = mailer.send(&email) {
            error!("{}", e);
            eprintln!("\n⛔ Failed to send email: {}", e);
            return Ok(2);
        }
        if !args.quiet {
            println!("📧 Email sent successfully!");
        }
    }

    Ok(0)
}

/// Read the input sheet. The spinner is cleared when reading fails.
fn read_rows(input: &Path, sheet: Option<&str>, spinner: &ProgressBar) -> Result<Vec<RawRow>> {
    let rows = ingest::read_table_from_path(input, sheet)
        .with_context(|| format!("Failed to load {}", input.display()))
        .and_then(|table| Ok(table.to_raw_rows()?));

    if rows.is_err() {
        spinner.finish_and_clear();
    }
    rows
}

/// Write one single-sheet workbook per non-empty region.
fn write_region_workbooks(output: &PipelineOutput, config: &Config, quiet: bool) -> Result<()> {
    let out_dir = Path::new(&config.general.output)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    for partition in output.partitions.iter() {
        match report::assemble_region_workbook(partition)? {
            Some(bytes) => {
                let path = out_dir.join(config.report.region_file_name(partition.region));
                write_file(&path, &bytes)?;
                if !quiet {
                    println!("📁 {} data saved to: {}", partition.region, path.display());
                }
            }
            None => warn!("No {} data found in the uploaded file.", partition.region),
        }
    }

    Ok(())
}

fn print_region_counts(output: &PipelineOutput) {
    println!("\n📊 Processing Summary:");
    println!("   Rows read: {}", output.rows_read);
    for partition in output.partitions.iter() {
        println!("   {}: {} records", partition.region, partition.len());
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn processing_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Processing your file...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Where the active configuration came from.
enum ConfigSource {
    File(PathBuf),
    DefaultFile,
    BuiltIn,
    Fallback(String),
}

impl ConfigSource {
    /// Logged once the subscriber is up.
    fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from .lipa360.toml"),
            ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(reason) => warn!("Failed to load config: {}", reason),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::BuiltIn)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(format!("{:#}", e)))),
    }
}
