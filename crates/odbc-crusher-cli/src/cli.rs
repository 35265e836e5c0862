//! Command line arguments

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use odbc_crusher_core::RunConfig;

#[derive(Debug, Parser)]
#[command(
    name = "odbc-crusher",
    version,
    about = "ODBC Crusher - test and debug ODBC drivers",
    after_help = "Examples:\n  \
        odbc-crusher \"DSN=PostgreSQL\"\n  \
        odbc-crusher \"DRIVER={SQL Server};SERVER=localhost;DATABASE=test;UID=sa;PWD=pass\"\n  \
        odbc-crusher \"DSN=mydb\" --output json"
)]
pub struct App {
    /// ODBC connection string, e.g. "DSN=mydb;UID=user;PWD=pass"
    pub connection_string: String,

    /// Output format for the test report
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, ignore_case = true)]
    pub output: OutputFormat,

    /// Debug logging and driver identity in phase 1
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to stderr as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// TOML run configuration
    #[arg(long, env = "ODBC_CRUSHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suites to report, comma separated (default: all)
    #[arg(long = "suite", value_delimiter = ',')]
    pub suites: Vec<String>,

    /// Print the driver capability report instead of running the battery
    #[arg(long)]
    pub driver_info: bool,

    /// Login timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Connect attempts before giving up
    #[arg(long)]
    pub connect_attempts: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl App {
    /// Configuration file first, then command line overrides.
    pub fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => RunConfig::default(),
        };
        if !self.suites.is_empty() {
            config.select_suites(&self.suites)?;
        }
        if let Some(timeout) = self.timeout {
            config.connection_timeout_secs = timeout;
        }
        if let Some(attempts) = self.connect_attempts {
            config.connect_attempts = attempts;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odbc_crusher_core::Suite;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    #[test]
    fn test_defaults() {
        let app = App::try_parse_from(["odbc-crusher", "DSN=pg"]).unwrap();
        assert_eq!(app.connection_string, "DSN=pg");
        assert_eq!(app.output, OutputFormat::Text);
        assert!(!app.verbose);
        assert_eq!(app.run_config().unwrap(), RunConfig::default());
    }

    #[test]
    fn test_overrides() {
        let app = App::try_parse_from([
            "odbc-crusher",
            "DSN=pg",
            "-o",
            "JSON",
            "--suite",
            "datatype,handle",
            "--timeout",
            "3",
            "--connect-attempts",
            "2",
        ])
        .unwrap();
        let config = app.run_config().unwrap();

        assert_eq!(app.output, OutputFormat::Json);
        assert_eq!(config.suites, [Suite::Datatype, Suite::Handle]);
        assert_eq!(config.connection_timeout_secs, 3);
        assert_eq!(config.connect_attempts, 2);
    }

    #[test]
    fn test_unknown_suite_is_rejected() {
        let app = App::try_parse_from(["odbc-crusher", "DSN=pg", "--suite", "performance"]).unwrap();
        let error = app.run_config().unwrap_err();
        assert!(error.to_string().contains("performance"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let app = App::try_parse_from(["odbc-crusher", "DSN=pg", "--timeout", "0"]).unwrap();
        assert!(app.run_config().is_err());
    }

    #[test]
    fn test_command_line_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connection_timeout_secs = 30\nconnect_attempts = 4").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let app =
            App::try_parse_from(["odbc-crusher", "DSN=pg", "--config", &path, "--timeout", "5"])
                .unwrap();
        let config = app.run_config().unwrap();

        assert_eq!(config.connection_timeout_secs, 5);
        assert_eq!(config.connect_attempts, 4);
    }

    #[test]
    fn test_missing_connection_string_is_usage_error() {
        let error = App::try_parse_from(["odbc-crusher"]).unwrap_err();
        assert_eq!(error.exit_code(), 2);
    }
}
