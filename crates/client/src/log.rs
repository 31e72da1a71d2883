// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Structured log entries and the sink they are written to.
//!
//! The engine writes one [`LogEntry`] per physical attempt; the
//! coordinator, token manager and cache write entries for their own
//! events. Sinks are fire-and-forget.

use std::fmt;
use uuid::Uuid;

use pt_core::Verb;

use crate::headers;
use crate::http::{HttpRequest, HttpResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Request,
    Deferral,
    Recovery,
    Token,
    Cache,
    Mode,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Request => "request",
            LogCategory::Deferral => "deferral",
            LogCategory::Recovery => "recovery",
            LogCategory::Token => "token",
            LogCategory::Cache => "cache",
            LogCategory::Mode => "mode",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    Information,
    Warning,
    Error,
    Critical,
}

impl LogSeverity {
    /// Severity of an attempt that produced an HTTP response.
    pub fn for_status(status: u16) -> LogSeverity {
        match status {
            200..=299 => LogSeverity::Information,
            403 | 404 | 409 | 422 | 401 | 408 | 429 | 500 | 502 | 503 | 504 => {
                LogSeverity::Warning
            }
            _ => LogSeverity::Error,
        }
    }
}

/// What was sent, with credentials removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub verb: Verb,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl From<&HttpRequest> for RequestSnapshot {
    fn from(request: &HttpRequest) -> Self {
        RequestSnapshot {
            verb: request.verb,
            uri: request.uri.clone(),
            headers: headers::redact(&request.headers),
            body: request.body.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl From<&HttpResponse> for ResponseSnapshot {
    fn from(response: &HttpResponse) -> Self {
        ResponseSnapshot {
            status: response.status,
            reason: response.reason.clone(),
            body: response.body.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub category: LogCategory,
    pub severity: LogSeverity,
    /// Shared by every entry of one logical call.
    pub correlation_id: Uuid,
    pub request: Option<RequestSnapshot>,
    pub response: Option<ResponseSnapshot>,
    pub message: String,
}

impl LogEntry {
    pub fn new(
        category: LogCategory,
        severity: LogSeverity,
        correlation_id: Uuid,
        message: impl Into<String>,
    ) -> Self {
        LogEntry {
            category,
            severity,
            correlation_id,
            request: None,
            response: None,
            message: message.into(),
        }
    }

    pub fn with_request(mut self, request: &HttpRequest) -> Self {
        self.request = Some(request.into());
        self
    }

    pub fn with_response(mut self, response: &HttpResponse) -> Self {
        self.response = Some(response.into());
        self
    }
}

/// Destination for log entries.
pub trait LogSink: Send + Sync {
    fn log(&self, entry: LogEntry);
}

/// Forwards entries to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, entry: LogEntry) {
        let category = entry.category.as_str();
        let id = entry.correlation_id.to_string();
        let uri = entry.request.as_ref().map(|r| r.uri.as_str()).unwrap_or("");
        let status = entry.response.as_ref().map(|r| r.status).unwrap_or(0);
        match entry.severity {
            LogSeverity::Information => {
                tracing::info!(category, correlation_id = %id, uri, status, "{}", entry.message)
            }
            LogSeverity::Warning => {
                tracing::warn!(category, correlation_id = %id, uri, status, "{}", entry.message)
            }
            LogSeverity::Error => {
                tracing::error!(category, correlation_id = %id, uri, status, "{}", entry.message)
            }
            LogSeverity::Critical => tracing::error!(
                category,
                critical = true,
                correlation_id = %id,
                uri,
                status,
                "{}",
                entry.message
            ),
        }
    }
}

/// Installs a `tracing` fmt subscriber for host applications.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over `info`.
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
