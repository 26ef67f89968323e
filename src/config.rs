//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.lipa360.toml` files.

use crate::analysis::AggregateOptions;
use crate::models::Region;
use crate::notify::SmtpSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".lipa360.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Classification and aggregation settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Output file settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// SMTP transport settings.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Notification message settings.
    #[serde(default)]
    pub email: EmailConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Combined workbook output path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "LIPA_NotDispatched_Report.xlsx".to_string()
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Records must be strictly older than this many days.
    #[serde(default = "default_min_age_days")]
    pub min_age_days: i64,

    /// Rows in the top-aging table.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Leading characters of the material number used as model key.
    #[serde(default = "default_model_prefix_len")]
    pub model_prefix_len: usize,

    /// Input sheet name; first sheet when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_age_days: default_min_age_days(),
            top_n: default_top_n(),
            model_prefix_len: default_model_prefix_len(),
            sheet: None,
        }
    }
}

fn default_min_age_days() -> i64 {
    10
}

fn default_top_n() -> usize {
    10
}

fn default_model_prefix_len() -> usize {
    4
}

impl PipelineConfig {
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            top_n: self.top_n,
            model_prefix_len: self.model_prefix_len,
        }
    }
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Per-region workbook name; `{region}` is replaced by the region name.
    #[serde(default = "default_region_file_pattern")]
    pub region_file_pattern: String,

    /// File name of the emailed attachment.
    #[serde(default = "default_attachment_name")]
    pub attachment_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            region_file_pattern: default_region_file_pattern(),
            attachment_name: default_attachment_name(),
        }
    }
}

fn default_region_file_pattern() -> String {
    "{region}_NotDispatched.xlsx".to_string()
}

fn default_attachment_name() -> String {
    "LIPA_NotDispatched_Report.xlsx".to_string()
}

impl ReportConfig {
    /// File name for one region's workbook.
    pub fn region_file_name(&self, region: Region) -> String {
        self.region_file_pattern
            .replace("{region}", &region.to_string())
    }
}

/// SMTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_server")]
    pub server: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Sender address, also the SMTP login.
    #[serde(default = "default_sender")]
    pub sender: String,

    /// SMTP password. Prefer `LIPA360_SMTP_PASSWORD` over storing it here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            sender: default_sender(),
            password: None,
        }
    }
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_sender() -> String {
    "your-email@example.com".to_string()
}

impl SmtpConfig {
    pub fn settings(&self) -> SmtpSettings {
        SmtpSettings {
            server: self.server.clone(),
            port: self.port,
            sender: self.sender.clone(),
            password: self.password.clone(),
        }
    }
}

/// Notification message defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default = "default_subject")]
    pub subject: String,

    #[serde(default = "default_body")]
    pub body: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            body: default_body(),
        }
    }
}

fn default_subject() -> String {
    "LIPA Data Report".to_string()
}

fn default_body() -> String {
    "Please find attached the LIPA data report.".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.lipa360.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the CLI actually provides override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(ref sheet) = args.sheet {
            self.pipeline.sheet = Some(sheet.clone());
        }
        if let Some(ref subject) = args.subject {
            self.email.subject = subject.clone();
        }
        if let Some(ref body) = args.body {
            self.email.body = body.clone();
        }
        if let Some(ref user) = args.smtp_user {
            self.smtp.sender = user.clone();
        }
        if let Some(ref password) = args.smtp_password {
            self.smtp.password = Some(password.clone());
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.min_age_days, 10);
        assert_eq!(config.pipeline.top_n, 10);
        assert_eq!(config.pipeline.model_prefix_len, 4);
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.general.output, "LIPA_NotDispatched_Report.xlsx");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "out/report.xlsx"
verbose = true

[pipeline]
top_n = 5
sheet = "Export"

[smtp]
server = "mail.example.com"
port = 2525
sender = "lipa@example.com"

[email]
subject = "Weekly LIPA aging"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "out/report.xlsx");
        assert!(config.general.verbose);
        assert_eq!(config.pipeline.top_n, 5);
        assert_eq!(config.pipeline.min_age_days, 10);
        assert_eq!(config.pipeline.sheet.as_deref(), Some("Export"));
        assert_eq!(config.smtp.server, "mail.example.com");
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.smtp.sender, "lipa@example.com");
        assert_eq!(config.smtp.password, None);
        assert_eq!(config.email.subject, "Weekly LIPA aging");
        assert_eq!(
            config.email.body,
            "Please find attached the LIPA data report."
        );
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[pipeline]"));
        assert!(toml_str.contains("[smtp]"));
        assert!(toml_str.contains("[email]"));
        assert!(!toml_str.contains("password"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.smtp.server, "smtp.gmail.com");
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[mail]\nserver = \"mail.corp\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result: Result<Config, _> =
            toml::from_str("[smtp]\nsmtp_server = \"mail.corp\"\nport = 2525\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_from_file_survives_merge() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = crate::cli::Args::try_parse_from(["lipa360", "--input", "export.xlsx"]).unwrap();

        config.merge_with_args(&args);

        assert!(config.general.verbose);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);
    }

    #[test]
    fn test_region_file_name() {
        let report = ReportConfig::default();
        assert_eq!(report.region_file_name(Region::Usa), "USA_NotDispatched.xlsx");
        assert_eq!(
            report.region_file_name(Region::Germany),
            "Germany_NotDispatched.xlsx"
        );
    }

    #[test]
    fn test_load_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).unwrap().is_none());

        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[pipeline]\nmin_age_days = 14\n",
        )
        .unwrap();

        let config = Config::load_from_dir(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.pipeline.min_age_days, 14);
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[pipeline\n").unwrap();

        assert!(Config::load_from_dir(temp_dir.path()).is_err());
    }
}
