//! Process logging setup.
//!
//! Logging is configured twice. A bootstrap dispatcher built from the CLI
//! flags alone covers settings resolution; once the settings are frozen the
//! global subscriber is installed from their logging section (console level,
//! JSON or text output). `RUST_LOG` overrides the level in both phases.

use crate::config::{LogLevel, LoggingSettings};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt};

/// Where log lines go: `0/off`, `1/stdout`, `2/stderr` or a file (appended).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl FromStr for LogTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("log target cannot be empty".to_string()),
            "0" | "off" => Ok(LogTarget::Off),
            "1" | "stdout" => Ok(LogTarget::Stdout),
            "2" | "stderr" => Ok(LogTarget::Stderr),
            filename => Ok(LogTarget::File(PathBuf::from(filename))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn for_settings(logging: &LoggingSettings) -> Self {
        if logging.console_is_json() {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Map a configured level onto tracing's.
pub fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warning => Level::WARN,
        LogLevel::Error | LogLevel::Critical => Level::ERROR,
    }
}

/// Console level from the logging section; `--verbose` forces DEBUG.
pub fn console_level(verbose: bool, logging: &LoggingSettings) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    let level = logging
        .handlers
        .get("console")
        .map(|handler| handler.level)
        .unwrap_or(logging.root.level);
    tracing_level(level)
}

/// Build a dispatcher, or `None` when logging is off.
pub fn build_dispatch(target: &LogTarget, format: LogFormat, level: Level) -> Result<Option<Dispatch>> {
    let (writer, ansi) = match target {
        LogTarget::Off => return Ok(None),
        LogTarget::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);

    let dispatch = match format {
        LogFormat::Json => Dispatch::new(registry.with(layer.json())),
        LogFormat::Text => Dispatch::new(registry.with(layer)),
    };
    Ok(Some(dispatch))
}

/// Dispatcher used while settings are being resolved.
pub fn bootstrap(target: &LogTarget, verbose: bool) -> Result<Option<Dispatch>> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    build_dispatch(target, LogFormat::Text, level)
}

/// Install the global subscriber for the rest of the process.
pub fn init(target: &LogTarget, verbose: bool, logging: &LoggingSettings) -> Result<()> {
    let level = console_level(verbose, logging);
    if let Some(dispatch) = build_dispatch(target, LogFormat::for_settings(logging), level)? {
        tracing::dispatcher::set_global_default(dispatch)
            .context("Failed to install global log subscriber")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bindings, base_settings};
    use std::path::Path;

    #[test]
    fn test_log_target_parse() {
        assert_eq!("0".parse::<LogTarget>().unwrap(), LogTarget::Off);
        assert_eq!("stdout".parse::<LogTarget>().unwrap(), LogTarget::Stdout);
        assert_eq!("2".parse::<LogTarget>().unwrap(), LogTarget::Stderr);
        assert_eq!(
            "primepass.log".parse::<LogTarget>().unwrap(),
            LogTarget::File(PathBuf::from("primepass.log"))
        );
        assert!("".parse::<LogTarget>().is_err());
    }

    #[test]
    fn test_tracing_level_mapping() {
        assert_eq!(tracing_level(LogLevel::Warning), Level::WARN);
        assert_eq!(tracing_level(LogLevel::Critical), Level::ERROR);
    }

    #[test]
    fn test_base_logging_is_text_at_info() {
        let base = base_settings(&Bindings::empty(), Path::new(".")).unwrap();
        assert_eq!(LogFormat::for_settings(&base.logging), LogFormat::Text);
        assert_eq!(console_level(false, &base.logging), Level::INFO);
        assert_eq!(console_level(true, &base.logging), Level::DEBUG);
    }

    #[test]
    fn test_off_builds_nothing() {
        assert!(build_dispatch(&LogTarget::Off, LogFormat::Text, Level::INFO)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_file_target_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.log");
        let target = LogTarget::File(path.clone());
        let dispatch = build_dispatch(&target, LogFormat::Json, Level::INFO)
            .unwrap()
            .unwrap();
        tracing::dispatcher::with_default(&dispatch, || tracing::info!(profile = "production", "resolved"));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("\"profile\":\"production\""));
    }
}
