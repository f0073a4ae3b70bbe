//! Structured JSON logging for a run of the application.
//!
//! Every run writes to its own file, `quire-<run_id>.json`, inside the
//! configured directory. The run id is a UUID v7, so file names sort in
//! chronological order and retention can simply drop the first ones.
//!
//! The filter comes from `RUST_LOG` when set, from [`LoggingSettings::level`]
//! otherwise:
//!
//! ```bash
//! RUST_LOG=quire_core::view=trace,info ./app
//! ```
//!
//! # Example
//!
//! ```no_run
//! use quire_core::logging::{get_run_id, init_logging, shutdown_logging};
//! use quire_core::settings::LoggingSettings;
//!
//! init_logging(&LoggingSettings::default())?;
//! tracing::info!(run_id = get_run_id(), "started");
//!
//! // ...
//!
//! shutdown_logging();
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::settings::LoggingSettings;
use anyhow::{Context, Error};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_FILE_PREFIX: &str = "quire-";
const LOG_FILE_EXTENSION: &str = "json";
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

static LOG_GUARD: OnceLock<Mutex<Option<WorkerGuard>>> = OnceLock::new();
static RUN_ID: OnceLock<String> = OnceLock::new();

/// Unique id of this process run, generated on first access.
pub fn get_run_id() -> &'static str {
    RUN_ID.get_or_init(|| Uuid::now_v7().to_string()).as_str()
}

/// The directory receiving one log file per run.
#[derive(Debug)]
struct RunLogDir {
    path: PathBuf,
}

impl RunLogDir {
    /// Resolves `directory` against the working directory and creates it.
    fn create(directory: &Path) -> Result<RunLogDir, Error> {
        let path = std::env::current_dir()
            .context("can't get current working directory")?
            .join(directory);
        fs::create_dir_all(&path)
            .with_context(|| format!("can't create log directory {}", path.display()))?;

        Ok(RunLogDir { path })
    }

    /// Run logs found in the directory, oldest first.
    fn run_logs(&self) -> Result<Vec<PathBuf>, Error> {
        let mut logs = fs::read_dir(&self.path)
            .with_context(|| format!("can't read log directory {}", self.path.display()))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()
            .context("can't read log directory entry")?;

        logs.retain(|path| is_run_log(path));
        logs.sort();

        Ok(logs)
    }

    /// Deletes the oldest run logs until at most `keep` remain and returns
    /// how many went away. `0` keeps everything.
    fn prune(&self, keep: usize) -> Result<usize, Error> {
        if keep == 0 {
            return Ok(0);
        }

        let logs = self.run_logs()?;
        let stale = logs.len().saturating_sub(keep);
        for path in &logs[..stale] {
            fs::remove_file(path)
                .with_context(|| format!("can't remove old log file {}", path.display()))?;
        }

        Ok(stale)
    }

    /// Non-blocking writer to this run's log file.
    fn writer(&self) -> Result<(NonBlocking, WorkerGuard), Error> {
        let appender = Builder::new()
            .rotation(Rotation::NEVER)
            .filename_prefix(format!("{LOG_FILE_PREFIX}{}", get_run_id()))
            .filename_suffix(LOG_FILE_EXTENSION)
            .build(&self.path)
            .context("can't initialize log file appender")?;

        Ok(tracing_appender::non_blocking(appender))
    }
}

fn is_run_log(path: &Path) -> bool {
    let stem_matches = path
        .file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));

    stem_matches && path.extension() == Some(OsStr::new(LOG_FILE_EXTENSION))
}

/// Installs the global JSON subscriber.
///
/// Does nothing when logging is disabled. Must be called at most once per
/// process: a second call fails because a global subscriber is already set.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), Error> {
    if !settings.enabled {
        return Ok(());
    }

    let dir = RunLogDir::create(&settings.directory)?;
    let pruned = dir.prune(settings.max_files)?;
    let (writer, guard) = dir.writer()?;
    let _ = LOG_GUARD.set(Mutex::new(Some(guard)));

    let json = fmt::layer()
        .json()
        .with_ansi(false)
        .with_current_span(true)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(build_filter(settings)?)
        .with(json)
        .try_init()
        .context("can't initialize tracing subscriber")?;

    tracing::info!(
        run_id = get_run_id(),
        version = VERSION,
        directory = %dir.path.display(),
        pruned,
        "logging started"
    );

    Ok(())
}

/// Flushes pending log lines, waiting at most a few seconds.
pub fn shutdown_logging() {
    let guard = LOG_GUARD
        .get()
        .and_then(|slot| slot.lock().ok())
        .and_then(|mut slot| slot.take());
    let Some(guard) = guard else {
        return;
    };

    let (done, flushed) = mpsc::channel();
    thread::spawn(move || {
        drop(guard);
        done.send(()).ok();
    });

    if flushed.recv_timeout(FLUSH_TIMEOUT).is_err() {
        eprintln!("Log flush timed out.");
    }
}

/// `RUST_LOG` wins over the configured level; an empty level means `info`.
fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter, Error> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    match settings.level.trim() {
        "" => Ok(EnvFilter::new("info")),
        level => EnvFilter::builder()
            .parse(level)
            .with_context(|| format!("invalid logging level {level:?}")),
    }
}
