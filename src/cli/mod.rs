//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `dnsweep scan <cidr-file>` - Sweep ranges for usable resolvers
//! - `dnsweep export <scan-id>` - Export saved scan results
//! - `dnsweep history` - View scan history

mod export;
mod history;
mod scan;

pub use export::ExportCommand;
pub use history::HistoryCommand;
pub use scan::ScanCommand;

use clap::{Parser, Subcommand};

/// dnsweep - a DNS resolver discovery scanner.
///
/// Sweeps CIDR ranges for hosts that answer as usable DNS resolvers for a
/// given domain and record type, reporting responsive addresses with their
/// latency.
#[derive(Parser, Debug)]
#[command(name = "dnsweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A fast DNS resolver discovery scanner", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep CIDR ranges for usable DNS resolvers
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Export saved scan results
    #[command(alias = "e")]
    Export(ExportCommand),

    /// View scan history
    #[command(alias = "h")]
    History(HistoryCommand),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
    /// Address list with a commented header
    Txt,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Plain
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Txt => write!(f, "txt"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "txt" | "text" => Ok(Self::Txt),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
