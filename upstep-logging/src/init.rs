use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use upstep_config::{LogFormat, LogLevel, LogTarget, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps background log writers alive; dropping it flushes file targets
#[must_use = "dropping the guard stops file logging"]
#[derive(Default)]
pub struct LoggingGuard {
    _workers: Vec<WorkerGuard>,
}

/// Initialize logging from configuration
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<LoggingGuard> {
    let (layers, workers) = build_layers(config)?;

    // Use try_init to avoid panic if global subscriber already set
    if tracing_subscriber::registry().with(layers).try_init().is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(LoggingGuard { _workers: workers })
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = build_env_filter(log_level);

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// `RUST_LOG` when set, otherwise `log_level`, otherwise `info`
pub fn build_env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn build_layers(config: &LoggingConfig) -> Result<(Vec<BoxedLayer>, Vec<WorkerGuard>)> {
    let mut layers = Vec::with_capacity(config.targets.len());
    let mut workers = Vec::new();

    for target in &config.targets {
        match target {
            LogTarget::Console { level } => {
                let layer = format_layer(config.format, config.include_location, std::io::stderr, true);
                layers.push(filtered(layer, level.unwrap_or(config.level)));
            }
            LogTarget::File { path, level } => {
                let (writer, guard) = file_writer(Path::new(path))?;
                let layer = format_layer(config.format, config.include_location, writer, false);
                layers.push(filtered(layer, level.unwrap_or(config.level)));
                workers.push(guard);
            }
        }
    }

    Ok((layers, workers))
}

fn format_layer<W>(format: LogFormat, include_location: bool, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(include_location)
        .with_line_number(include_location);

    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Text => layer.boxed(),
    }
}

fn filtered(layer: BoxedLayer, level: LogLevel) -> BoxedLayer {
    layer.with_filter(build_env_filter(level.as_str())).boxed()
}

/// Daily-rotated, non-blocking writer for `path`
fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("log path {:?} has no file name", path))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {:?}", directory))?;

    let appender = tracing_appender::rolling::daily(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_per_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LoggingConfig {
            format: LogFormat::Json,
            targets: vec![
                LogTarget::Console { level: None },
                LogTarget::File {
                    path: dir.path().join("logs").join("upstep.log").display().to_string(),
                    level: Some(LogLevel::Debug),
                },
            ],
            ..LoggingConfig::default()
        };

        let (layers, workers) = build_layers(&config).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(workers.len(), 1);
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_file_target_needs_file_name() {
        assert!(file_writer(Path::new("/")).is_err());
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_simple_tracing("debug").unwrap();
        init_simple_tracing("info").unwrap();
        let _guard = init_logging_from_config(&LoggingConfig::default()).unwrap();
    }

    #[test]
    fn test_env_filter_falls_back() {
        let filter = build_env_filter("this is not a directive ===");
        assert!(!filter.to_string().is_empty());
    }
}
