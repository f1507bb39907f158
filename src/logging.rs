//! Logging setup: a size-capped rotating log file mirrored to the console.
//!
//! [init] builds a [Dispatch] once per process; the CLI installs it for the duration of the run
//! with [tracing::dispatcher::with_default]. Nothing else configures logging.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Dispatch, Subscriber};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Registry};

pub const LOG_FILE_NAME: &str = "parser.log";
pub const DEFAULT_MAX_BYTES: u64 = 1_000_000;
pub const DEFAULT_BACKUPS: usize = 5;
const TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
const DEFAULT_FILTER: &str = "info";

/// Append-only file that rolls over to `<name>.1` … `<name>.<backups>` when a write would
/// push it past `max_bytes`.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            max_bytes,
            backups,
            file,
            written,
        })
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.backups > 0 {
            for n in (1..self.backups).rev() {
                let from = self.backup_path(n);
                if from.exists() {
                    fs::rename(&from, self.backup_path(n + 1))?;
                }
            }
            fs::rename(&self.path, self.backup_path(1))?;
        }
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_bytes > 0 && self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub max_bytes: u64,
    pub backups: usize,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_writer(io::stderr)
}

/// Build the process logger: console plus rotating file under `settings.dir`.
///
/// If the log directory or file cannot be opened, logging falls back to the console only and
/// the failure is reported through it.
pub fn init(settings: &LogSettings) -> Dispatch {
    let file = fs::create_dir_all(&settings.dir).and_then(|()| {
        RotatingFile::open(
            &settings.dir.join(LOG_FILE_NAME),
            settings.max_bytes,
            settings.backups,
        )
    });
    match file {
        Ok(file) => {
            let subscriber = Registry::default()
                .with(env_filter())
                .with(console_layer())
                .with(
                    fmt::layer()
                        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                );
            Dispatch::new(subscriber)
        }
        Err(e) => {
            let dispatch = Dispatch::new(Registry::default().with(env_filter()).with(console_layer()));
            tracing::dispatcher::with_default(&dispatch, || {
                tracing::error!(
                    dir = %settings.dir.display(),
                    error = %e,
                    "CRITICAL: could not open log file, logging to console only"
                );
            });
            dispatch
        }
    }
}
