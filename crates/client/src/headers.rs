// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-call header sets.
//!
//! Every call builds its own list from the base headers plus its overrides,
//! so concurrent calls never observe each other's manual flag or language.

pub const ACCEPT: &str = "Accept";
pub const ACCEPT_LANGUAGE: &str = "Accept-Language";
pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CORRELATION_ID: &str = "X-Correlation-Id";

const JSON: &str = "application/json";
const REDACTED: &str = "Bearer ***";

/// Inputs that vary per call.
#[derive(Debug, Clone, Copy)]
pub struct CallHeaders<'a> {
    pub manual_entry_header: &'a str,
    pub is_manual: bool,
    pub language: &'a str,
    pub has_body: bool,
    pub correlation_id: &'a str,
    pub bearer: Option<&'a str>,
}

/// Builds the header list for one physical call.
pub fn build(call: CallHeaders<'_>) -> Vec<(String, String)> {
    let mut headers = vec![
        (ACCEPT.to_string(), JSON.to_string()),
        (ACCEPT_LANGUAGE.to_string(), call.language.to_string()),
        (
            call.manual_entry_header.to_string(),
            call.is_manual.to_string(),
        ),
        (CORRELATION_ID.to_string(), call.correlation_id.to_string()),
    ];
    if call.has_body {
        headers.push((CONTENT_TYPE.to_string(), JSON.to_string()));
    }
    if let Some(token) = call.bearer {
        headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
    }
    headers
}

/// Copy of `headers` safe to write to a log.
pub fn redact(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case(AUTHORIZATION) {
                (name.clone(), REDACTED.to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "headers_tests.rs"]
mod tests;
