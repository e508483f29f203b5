//! Access log format module
//!
//! Supports two log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `json` (JSON structured logging)

use chrono::Local;

/// Access log entry containing request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Logical endpoint path extracted from the URL parameter
    pub endpoint: String,
    /// Response status code
    pub status: u16,
    /// Response body size in bytes
    pub body_bytes: usize,
    /// User-Agent header
    pub user_agent: Option<String>,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, endpoint: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            endpoint,
            status: 200,
            body_bytes: 0,
            user_agent: None,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "json" => self.format_json(),
            _ => self.format_combined(),
        }
    }

    /// Apache/Nginx combined log format
    fn format_combined(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/1.1\" {} {} \"-\" \"{}\"",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.endpoint,
            self.status,
            self.body_bytes,
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    /// JSON structured log format
    fn format_json(&self) -> String {
        serde_json::json!({
            "time": self.time.to_rfc3339(),
            "remote_addr": self.remote_addr,
            "method": self.method,
            "endpoint": self.endpoint,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "user_agent": self.user_agent,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_combined() {
        let mut entry = AccessLogEntry::new(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "account".to_string(),
        );
        entry.status = 403;
        entry.body_bytes = 52;

        let line = entry.format("combined");
        assert!(line.starts_with("127.0.0.1 - - ["));
        assert!(line.contains("\"GET account HTTP/1.1\" 403 52"));
    }

    #[test]
    fn test_format_json() {
        let entry = AccessLogEntry::new(
            "10.0.0.9".to_string(),
            "POST".to_string(),
            "authenticate".to_string(),
        );

        let line = entry.format("json");
        let value: serde_json::Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(value["remote_addr"], "10.0.0.9");
        assert_eq!(value["method"], "POST");
        assert_eq!(value["status"], 200);
    }

    #[test]
    fn test_unknown_format_falls_back_to_combined() {
        let entry = AccessLogEntry::new(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "ping".to_string(),
        );
        assert!(entry.format("custom").contains("\"GET ping HTTP/1.1\""));
    }
}
