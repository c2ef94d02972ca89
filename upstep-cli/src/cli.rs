//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Move a database schema between versions", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Database URL, overriding the configuration
    #[arg(long, value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Migrations directory, overriding the configuration
    #[arg(long, value_name = "DIR", global = true)]
    pub migrations: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate the database to a version, asking when no target is given
    Migrate {
        /// Target version (MAJOR.MINOR.PATCH) or "highest"
        #[arg(value_name = "TARGET")]
        target: Option<String>,
    },

    /// Show the steps a migration would apply without applying them
    Plan {
        /// Target version (MAJOR.MINOR.PATCH) or "highest"
        #[arg(value_name = "TARGET", default_value = "highest")]
        target: String,
    },

    /// Show the current and highest known versions
    Status,

    /// Show the steps applied so far
    History,

    /// List registered migrations
    List,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output file path
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
