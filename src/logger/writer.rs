//! Log writer module
//!
//! Provides thread-safe log writing to files or stdout/stderr. When a log
//! directory is configured, each process writes a dated file named after its
//! role (e.g. `api-2026-08-07.log`), one file per calendar day.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::Local;

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    /// Write to stdout
    Stdout,
    /// Write to stderr
    Stderr,
    /// Write to file
    File(Mutex<File>),
}

/// Thread-safe log writer
pub struct LogWriter {
    /// Info/access log target
    info: LogTarget,
    /// Error log target
    error: LogTarget,
}

impl LogWriter {
    /// Create a new log writer, optionally writing both streams to a dated
    /// file under `log_dir`
    fn new(log_dir: Option<&str>, prefix: &str) -> io::Result<Self> {
        match log_dir {
            Some(dir) => {
                let path = dated_log_path(dir, prefix);
                let info = LogTarget::File(Mutex::new(open_log_file(&path)?));
                let error = LogTarget::File(Mutex::new(open_log_file(&path)?));

                Ok(Self { info, error })
            }
            None => Ok(Self {
                info: LogTarget::Stdout,
                error: LogTarget::Stderr,
            }),
        }
    }

    /// Write to info/access log
    pub fn write_info(&self, message: &str) {
        write_to_target(&self.info, message);
    }

    /// Write to error log
    pub fn write_error(&self, message: &str) {
        write_to_target(&self.error, message);
    }
}

/// Build the dated log file path for a process role
pub fn dated_log_path(dir: &str, prefix: &str) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d");
    Path::new(dir).join(format!("{prefix}-{date}.log"))
}

/// Open a log file in append mode, creating parent directories if needed
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Write a message to the given target
fn write_to_target(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => println!("{message}"),
        LogTarget::Stderr => eprintln!("{message}"),
        LogTarget::File(file) => {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Initialize the global writer; `prefix` names the dated file for this
/// process (`api`, `usermgr`, `passwd`)
pub fn init(log_dir: Option<&str>, prefix: &str) -> io::Result<()> {
    let writer = LogWriter::new(log_dir, prefix)?;
    let _ = LOG_WRITER.set(writer);

    Ok(())
}

/// Whether the global writer has been initialized
pub fn is_initialized() -> bool {
    LOG_WRITER.get().is_some()
}

/// Get the global writer
///
/// # Panics
/// Panics if called before `init`; check `is_initialized` first.
pub fn get() -> &'static LogWriter {
    LOG_WRITER.get().expect("log writer not initialized")
}
