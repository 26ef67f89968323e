//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// LIPA 360 - aging and region analytics for pending deliveries
///
/// Reads a LIPA export workbook, keeps records older than the aging
/// threshold, splits them into USA and Germany, and writes a report
/// workbook plus an analytics summary. Optionally emails the workbook.
///
/// Examples:
///   lipa360 --input export.xlsx
///   lipa360 --input export.xlsx --summary summary.md --split-regions
///   lipa360 --input export.xlsx --summary summary.json --format json
///   lipa360 --input export.xlsx --email-to ops@example.com
///   lipa360 --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Input workbook (xlsx, xlsm, xlsb, xls or ods)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Sheet to read; defaults to the first sheet
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Output path for the combined USA/Germany workbook
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write one single-sheet workbook per region
    #[arg(long)]
    pub split_regions: bool,

    /// Write the analytics summary to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Summary format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Compute ages against this date instead of today (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Email the report workbook to this address
    #[arg(long, value_name = "ADDR")]
    pub email_to: Option<String>,

    /// Email subject
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Email body
    #[arg(long, value_name = "TEXT")]
    pub body: Option<String>,

    /// Send the email without the workbook attached
    #[arg(long, requires = "email_to")]
    pub no_attachment: bool,

    /// SMTP login / sender address
    #[arg(long, env = "LIPA360_SMTP_USER", value_name = "ADDR")]
    pub smtp_user: Option<String>,

    /// SMTP password
    #[arg(long, env = "LIPA360_SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .lipa360.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .lipa360.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the analytics summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref to) = self.email_to {
            if to.trim().is_empty() {
                return Err("Please enter a recipient email address".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins over a `verbose = true` config file.
    pub fn log_level(&self, verbose_by_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_by_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
