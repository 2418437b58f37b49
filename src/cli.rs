//! CLI argument parsing for slowtest

use crate::regression::{
    FeatureParameters, MIN_DURATION_PARAM, TEST_NAMES_PATTERNS_PARAM, THRESHOLD_PARAM,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the detection report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "slowtest")]
#[command(version)]
#[command(about = "Detect tests that became slower than in earlier builds", long_about = None)]
pub struct Cli {
    /// Build history file (JSON)
    #[arg(long = "history", value_name = "FILE")]
    pub history: PathBuf,

    /// Id of the build to check
    #[arg(short = 'b', long = "build", value_name = "ID")]
    pub build: u64,

    /// Configuration file (default: ./slowtest.toml when present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Regular expression a test name must fully match to be compared
    #[arg(long = "pattern", value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Tests faster than this are never reported
    #[arg(long = "min-duration", value_name = "MS")]
    pub min_duration: Option<String>,

    /// Slowdown, in percent, above which a test is reported
    #[arg(long = "threshold", value_name = "PERCENT")]
    pub threshold: Option<String>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Report a test only against the first slower earlier execution
    #[arg(long = "first-match")]
    pub first_match: bool,

    /// Exit with status 0 even when slow tests are found
    #[arg(long = "no-fail")]
    pub no_fail: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Feature parameters given on the command line
    pub fn overrides(&self) -> FeatureParameters {
        let mut params = FeatureParameters::new();
        if let Some(pattern) = &self.pattern {
            params.set(TEST_NAMES_PATTERNS_PARAM, pattern.clone());
        }
        if let Some(min) = &self.min_duration {
            params.set(MIN_DURATION_PARAM, min.clone());
        }
        if let Some(threshold) = &self.threshold {
            params.set(THRESHOLD_PARAM, threshold.clone());
        }
        params
    }
}
