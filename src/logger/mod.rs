//! Logger module
//!
//! Provides logging utilities for the API daemon and CLI tools including:
//! - Server lifecycle logging
//! - Access logging for dispatched API requests
//! - Error and warning logging
//! - Dated per-process log files

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// `prefix` names the dated log file for this process (`api` for the server,
/// the script name for CLI tools). Should be called once at startup.
pub fn init(config: &Config, prefix: &str) -> std::io::Result<()> {
    writer::init(config.logging.log_dir.as_deref(), prefix)
}

/// Write to info/access log
fn write_info(message: &str) {
    if writer::is_initialized() {
        writer::get().write_info(message);
    } else {
        println!("{message}");
    }
}

/// Write to error log
fn write_error(message: &str) {
    if writer::is_initialized() {
        writer::get().write_error(message);
    } else {
        eprintln!("{message}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Account API server started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    write_info(&format!("Directory store: {}", config.store.path));
    if let Some(ref dir) = config.logging.log_dir {
        write_info(&format!("Log directory: {dir}"));
    }
    write_info("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_info(message: &str) {
    write_info(message);
}

/// Log a dispatched API request outcome
pub fn log_api_request(method: &str, endpoint: &str, status: u16) {
    write_info(&format!("[API] {method} {endpoint} - {status}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}
