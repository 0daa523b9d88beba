use anyhow::{Context, Result, anyhow};
use core_types::config::{LogFormat, LoggingConfig};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Install a stderr subscriber with default settings.
pub fn init_tracing() -> Result<()> {
    init_tracing_with_config(&LoggingConfig::default()).map(|_| ())
}

/// Install the global subscriber described by `cfg`.
///
/// `RUST_LOG` takes precedence over `cfg.level`. When `cfg.file` is set, output
/// goes through a non-blocking file writer; keep the returned guard alive until
/// exit or buffered lines are lost.
pub fn init_tracing_with_config(cfg: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .with_context(|| format!("invalid log level {:?}", cfg.level))?;

    let (writer, guard) = match cfg.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("log file {file:?} has no file name"))?;
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false);
    let installed = match cfg.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_sink_creates_log_directory() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("logs").join("kindred.log");
        let cfg = LoggingConfig {
            level: "debug".into(),
            format: LogFormat::Json,
            file: Some(file.to_string_lossy().into_owned()),
        };

        let guard = init_tracing_with_config(&cfg).expect("install subscriber");
        assert!(guard.is_some());
        tracing::info!("hello from the test");
        drop(guard);

        assert!(file.parent().is_some_and(Path::exists));
    }
}
