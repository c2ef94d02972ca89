mod cli;
mod commands;
mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{debug, info, warn};

use cli::{Cli, Commands, ConfigCommands};
use commands::Outcome;
use upstep_config::{ConfigLoader, LogLevel, UpstepConfig};
use upstep_logging::{init_logging_from_config, init_simple_tracing, LoggingGuard};

/// Load configuration from file or environment, then apply command-line overrides
fn load_config(cli: &Cli) -> Result<UpstepConfig> {
    let loader = ConfigLoader::new();

    let mut config = match cli.config.as_deref() {
        Some(path) if path.exists() => loader
            .from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        Some(path) => {
            eprintln!("Configuration file not found: {:?}. Using defaults.", path);
            loader
                .from_env()
                .context("Failed to load configuration from environment")?
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment")?,
    };

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    if let Some(dir) = &cli.migrations {
        config.migrations.directory = dir.display().to_string();
    }
    config
        .validate_all()
        .context("Invalid configuration after command-line overrides")?;

    Ok(config)
}

/// Initialize logging from config, letting `--log-level` win over the configured level
fn init_logging(config: &UpstepConfig, log_level: Option<&str>) -> Result<LoggingGuard> {
    let mut logging = config.logging.clone();
    if let Some(level) = log_level {
        match LogLevel::from_str(level) {
            Ok(level) => logging.level = level,
            Err(e) => eprintln!("{}, keeping '{}'", e, logging.level.as_str()),
        }
    }

    match init_logging_from_config(&logging) {
        Ok(guard) => Ok(guard),
        Err(e) => {
            eprintln!(
                "Failed to initialize logging: {}, falling back to simple tracing",
                e
            );
            init_simple_tracing(logging.level.as_str())?;
            Ok(LoggingGuard::default())
        }
    }
}

fn run_config_command(config_cmd: &ConfigCommands) -> Result<Outcome> {
    match config_cmd {
        ConfigCommands::Validate { file } => commands::config::validate(file),
        ConfigCommands::Generate { output, force } => commands::config::generate(output, *force),
    }
}

/// Loaded configuration plus the logging it set up, held for one engine command
struct Session {
    config: UpstepConfig,
    _guard: LoggingGuard,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let config = load_config(cli)?;
        let guard = init_logging(&config, cli.log_level.as_deref())?;

        info!("upstep starting");
        debug!(
            database = %config.database.url,
            migrations = %config.migrations.directory,
            "Configuration loaded"
        );
        if !Path::new(&config.migrations.directory).is_dir() {
            warn!("Migrations directory {} does not exist", config.migrations.directory);
        }

        Ok(Self {
            config,
            _guard: guard,
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let outcome = match &cli.command {
        // Config commands work on files only and must not require a valid configuration
        Commands::Config { config_cmd } => {
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;
            run_config_command(config_cmd)?
        }
        Commands::Migrate { target } => {
            let session = Session::open(&cli)?;
            let mut editor = rustyline::DefaultEditor::new().context("Failed to open terminal")?;
            commands::migrate::run(&session.config, target.as_deref(), &mut editor).await?
        }
        Commands::Plan { target } => {
            let session = Session::open(&cli)?;
            commands::inspect::plan(&session.config, target).await?
        }
        Commands::Status => {
            let session = Session::open(&cli)?;
            commands::inspect::status(&session.config).await?
        }
        Commands::History => {
            let session = Session::open(&cli)?;
            commands::inspect::history(&session.config).await?
        }
        Commands::List => {
            let session = Session::open(&cli)?;
            commands::inspect::list(&session.config)?
        }
    };

    Ok(outcome.exit_code())
}
