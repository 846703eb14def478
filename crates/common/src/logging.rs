//! Logging and tracing initialization.

use std::path::Path;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// Console output always; a plain-text copy goes to `config.file` when set.
/// Calling this more than once is harmless: later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = build_filter(config);

    let (file_writer, file_error) = match config.file.as_deref() {
        Some(path) => match open_log_file(path) {
            Ok(writer) => (Some(writer), None),
            Err(e) => (None, Some(format!("{}: {e}", path.display()))),
        },
        None => (None, None),
    };

    let json_layer = config.json.then(|| fmt::layer().json());
    let text_layer = (!config.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .ok();

    if let Some(err) = file_error {
        tracing::warn!(error = %err, "Log file unavailable, logging to console only");
    }
}

fn build_filter(config: &LoggingConfig) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    for target in &config.quiet_targets {
        match format!("{target}=error").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("ignoring invalid quiet log target {target:?}: {e}"),
        }
    }
    filter
}

fn open_log_file(
    path: &Path,
) -> Result<tracing_appender::rolling::RollingFileAppender, tracing_appender::rolling::InitError> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reelstitch.log".to_string());

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_targets_become_error_directives() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            quiet_targets: vec!["png".to_string()],
            ..LoggingConfig::default()
        };
        let rendered = build_filter(&config).to_string();
        assert!(rendered.contains("png=error"), "filter was {rendered}");
    }

    #[test]
    fn log_file_is_created_under_requested_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let appender = open_log_file(&path);
        assert!(appender.is_ok());
        assert!(path.exists());
    }
}
