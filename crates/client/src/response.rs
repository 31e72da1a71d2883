// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Building call results from remote responses.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use pt_core::codes;
use pt_core::{CallResult, PackOutcome, PackResult, PackState};

use crate::http::HttpResponse;

pub const LOCATION: &str = "Location";
pub const RETRY_AFTER: &str = "Retry-After";
pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    #[serde(default)]
    operation_code: i32,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    information: Option<String>,
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    uprc: Option<String>,
    #[serde(default)]
    eta: Option<DateTime<Utc>>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    packs: Vec<PackOutcome>,
}

/// Result of a response the remote meant as an answer
/// (200, 202, 403, 404, 409, 422).
///
/// A body that is empty or not a result document still yields a result:
/// success for 2xx, a remote rejection otherwise.
pub fn terminal(response: &HttpResponse) -> CallResult {
    let success = (200..300).contains(&response.status);
    let wire = if response.body.trim().is_empty() {
        Some(WireResult::default())
    } else {
        serde_json::from_str::<WireResult>(&response.body).ok()
    };

    let mut result = match wire {
        Some(wire) => {
            let operation_code = if success || wire.operation_code != codes::SUCCESS {
                wire.operation_code
            } else {
                // an error status must never read as success
                codes::REMOTE_REJECTION
            };
            let warning = wire.warning.or_else(|| {
                (!success && operation_code == codes::REMOTE_REJECTION)
                    .then(|| format!("remote rejected the request: {}", response.status_line()))
            });
            CallResult {
                status: Some(response.status),
                result: PackResult {
                    operation_code,
                    state: wire.state.as_deref().and_then(|s| s.parse::<PackState>().ok()),
                    information: wire.information,
                    warning,
                    uprc: wire.uprc,
                },
                location: None,
                eta: wire.eta,
                expiry: wire.expiry,
                packs: wire.packs,
            }
        }
        None if success => CallResult {
            status: Some(response.status),
            result: PackResult {
                warning: Some("response body could not be read".to_string()),
                ..PackResult::default()
            },
            ..CallResult::default()
        },
        None => failure(response, codes::REMOTE_REJECTION, "remote rejected the request"),
    };

    result.location = response.header(LOCATION).map(str::to_string);
    if result.eta.is_none() {
        result.eta = retry_after(response);
    }
    result
}

/// Result for a response the client gave up on, carrying the status line.
pub fn failure(response: &HttpResponse, operation_code: i32, message: &str) -> CallResult {
    CallResult {
        status: Some(response.status),
        result: PackResult::failure(
            operation_code,
            format!("{message}: {}", response.status_line()),
        ),
        location: response.header(LOCATION).map(str::to_string),
        eta: retry_after(response),
        ..CallResult::default()
    }
}

/// Result for a 401 that survived every token refresh.
pub fn unauthorized(response: &HttpResponse) -> CallResult {
    let challenges = response.header_values(WWW_AUTHENTICATE);
    let message = if challenges.is_empty() {
        "unauthorized".to_string()
    } else {
        format!("unauthorized: {}", challenges.join("; "))
    };
    CallResult {
        status: Some(response.status),
        result: PackResult::failure(codes::UNAUTHORIZED, message),
        ..CallResult::default()
    }
}

/// Result for a throttled or unavailable remote after the retry budget ran out.
pub fn service_unavailable(response: &HttpResponse) -> CallResult {
    let mut result = failure(
        response,
        codes::SERVICE_UNAVAILABLE,
        "service temporarily unavailable",
    );
    if let Ok(wire) = serde_json::from_str::<WireResult>(&response.body) {
        result.eta = wire.eta.or(result.eta);
        result.expiry = wire.expiry;
    }
    result
}

/// `Retry-After` as an absolute time; only the delay-seconds form is read.
fn retry_after(response: &HttpResponse) -> Option<DateTime<Utc>> {
    let seconds: i64 = response.header(RETRY_AFTER)?.trim().parse().ok()?;
    Some(Utc::now() + chrono::Duration::seconds(seconds.max(0)))
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
