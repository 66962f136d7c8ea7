//! Logging bootstrap.
//!
//! Installs a `tracing` subscriber with two sinks: a rolling file under the
//! application data directory and a console layer on stderr. The hosting
//! process calls [`init`] once at startup; repeated calls hand back the
//! handle installed first.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Environment variables consulted for a filter directive, first hit wins.
const ENV_FILTER_VARS: [&str; 2] = ["COMIC_SHELF_LOG", "RUST_LOG"];

static INSTALLED: OnceLock<LogHandle> = OnceLock::new();

/// Level alias so callers do not import `tracing-subscriber` themselves.
pub use tracing_subscriber::filter::LevelFilter as LogLevel;

/// Sink configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub directory: PathBuf,
    /// Log files are named `<prefix>[.<date>].log`.
    pub file_prefix: String,
    /// Rolled files kept on disk; older ones are pruned at startup.
    /// `None` keeps everything.
    pub max_files: Option<usize>,
    pub file_level: LevelFilter,
    pub console_level: LevelFilter,
    /// Also capture records emitted through the `log` crate.
    pub forward_log_crate: bool,
    /// Explicit filter directive; falls back to the environment, then to a
    /// build-dependent default.
    pub filter: Option<String>,
    /// Roll the file daily; `false` appends to a single file forever.
    pub roll_daily: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: "shelf".to_string(),
            max_files: Some(10),
            file_level: LevelFilter::DEBUG,
            console_level: if cfg!(debug_assertions) {
                LevelFilter::INFO
            } else {
                LevelFilter::WARN
            },
            forward_log_crate: true,
            filter: env_directive(),
            roll_daily: true,
        }
    }
}

impl LogConfig {
    pub fn with_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.directory = path.into();
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }
}

/// Keeps the non-blocking writer thread alive for the process lifetime.
#[derive(Debug)]
pub struct LogHandle {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    directory: PathBuf,
    file_prefix: String,
}

impl LogHandle {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }
}

/// Install the global subscriber. First caller wins; later configurations
/// are ignored.
pub fn init(config: LogConfig) -> Result<&'static LogHandle> {
    if let Some(existing) = INSTALLED.get() {
        return Ok(existing);
    }

    let handle = install(config)?;
    let _ = INSTALLED.set(handle);
    Ok(INSTALLED.get().expect("log handle installed"))
}

fn install(config: LogConfig) -> Result<LogHandle> {
    if config.forward_log_crate {
        forward_log_records(config.file_level.max(config.console_level));
    }

    fs::create_dir_all(&config.directory)
        .with_context(|| format!("creating log directory {}", config.directory.display()))?;
    if let Some(keep) = config.max_files.filter(|keep| *keep > 0) {
        enforce_retention(&config.directory, &config.file_prefix, keep)?;
    }

    let rotation = if config.roll_daily {
        tracing_appender::rolling::Rotation::DAILY
    } else {
        tracing_appender::rolling::Rotation::NEVER
    };
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(rotation)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(config.directory.clone())
        .context("creating rolling log appender")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let directive = config
        .filter
        .or_else(env_directive)
        .unwrap_or_else(|| if cfg!(debug_assertions) { "debug" } else { "info" }.to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(directive).context("parsing log filter directive")?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_file(true)
                .with_line_number(true)
                .with_filter(config.file_level),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(config.console_level),
        )
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;

    Ok(LogHandle { _guard: guard, directory: config.directory, file_prefix: config.file_prefix })
}

fn env_directive() -> Option<String> {
    ENV_FILTER_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .filter(|directive| !directive.trim().is_empty())
}

fn forward_log_records(level: LevelFilter) {
    let max = match level {
        LevelFilter::OFF => log::LevelFilter::Off,
        LevelFilter::ERROR => log::LevelFilter::Error,
        LevelFilter::WARN => log::LevelFilter::Warn,
        LevelFilter::INFO => log::LevelFilter::Info,
        LevelFilter::DEBUG => log::LevelFilter::Debug,
        LevelFilter::TRACE => log::LevelFilter::Trace,
    };
    let _ = tracing_log::LogTracer::builder().with_max_level(max).init();
}

/// Delete the oldest matching log files until at most `keep` remain.
fn enforce_retention(directory: &Path, prefix: &str, keep: usize) -> Result<()> {
    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    let listing = fs::read_dir(directory)
        .with_context(|| format!("reading log directory {}", directory.display()))?;

    for entry in listing.flatten() {
        let path = entry.path();
        let stem_matches = path
            .file_stem()
            .and_then(OsStr::to_str)
            .map(|stem| stem.starts_with(prefix))
            .unwrap_or(false);
        if !stem_matches {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        logs.push((meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), path));
    }

    if logs.len() > keep {
        logs.sort_by_key(|(modified, _)| *modified);
        for (_, path) in logs.iter().take(logs.len() - keep) {
            let _ = fs::remove_file(path);
        }
    }
    Ok(())
}

fn default_log_directory() -> PathBuf {
    directories::ProjectDirs::from("com", "ComicShelf", "comic-shelf")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("comic-shelf-logs"))
}
