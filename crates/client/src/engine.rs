// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request execution engine.
//!
//! Runs one logical call through validation, dispatch, retry and response
//! classification. Network failures never escape as errors: the caller
//! always gets a [`CallResult`]. `Err` is reserved for a deferral that
//! could not be persisted.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use pt_core::codes;
use pt_core::{CallResult, RequestType};

use crate::cache::BoundedCache;
use crate::config::ClientConfig;
use crate::deferral::{DeferralState, StoreAndForward};
use crate::error::Result;
use crate::headers::{self, CallHeaders};
use crate::http::{HttpExecutor, HttpRequest, HttpResponse};
use crate::log::{LogCategory, LogEntry, LogSeverity, LogSink};
use crate::mode::ClientMode;
use crate::outbound::Outbound;
use crate::response;
use crate::token::TokenManager;

/// Token refreshes after a 401 before giving up.
const AUTH_RETRIES: u32 = 3;

/// Extra attempts when a recovery result is not found yet.
const NOT_FOUND_RETRIES: u32 = 3;

/// Results of repeated state changes, keyed by request digest.
pub type ResultCache = BoundedCache<String, CallResult>;

/// Per-call state carried through the retry loop.
#[derive(Debug)]
pub(crate) struct RequestContext {
    pub request_type: RequestType,
    pub correlation_id: Uuid,
    pub deferral: DeferralState,
    /// Latest response, if any attempt got one.
    pub response: Option<HttpResponse>,
    /// Explanation of the latest failure.
    pub message: String,
    /// True when the latest attempt got no response at all.
    pub unreachable: bool,
}

impl RequestContext {
    pub fn new(request_type: RequestType) -> Self {
        RequestContext {
            request_type,
            correlation_id: Uuid::new_v4(),
            deferral: DeferralState::NotRaised,
            response: None,
            message: String::new(),
            unreachable: false,
        }
    }
}

pub struct Engine {
    config: Arc<ClientConfig>,
    executor: Arc<dyn HttpExecutor>,
    // One physical call in flight per client.
    http_lock: tokio::sync::Mutex<()>,
    tokens: Arc<TokenManager>,
    mode: Arc<ClientMode>,
    forwarder: StoreAndForward,
    cache: Option<Arc<ResultCache>>,
    sink: Arc<dyn LogSink>,
    started: AtomicBool,
}

impl Engine {
    pub fn new(
        config: Arc<ClientConfig>,
        executor: Arc<dyn HttpExecutor>,
        tokens: Arc<TokenManager>,
        mode: Arc<ClientMode>,
        forwarder: StoreAndForward,
        cache: Option<Arc<ResultCache>>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Engine {
            config,
            executor,
            http_lock: tokio::sync::Mutex::new(()),
            tokens,
            mode,
            forwarder,
            cache,
            sink,
            started: AtomicBool::new(false),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn set_started(&self, started: bool) {
        self.started.store(started, Ordering::Release);
    }

    pub fn forwarder(&self) -> &StoreAndForward {
        &self.forwarder
    }

    pub fn mode(&self) -> &ClientMode {
        &self.mode
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Executes one logical call.
    pub async fn execute(&self, outbound: &Outbound) -> Result<CallResult> {
        let mut ctx = RequestContext::new(outbound.request_type);

        if !outbound.validation.is_ok() {
            let warning = outbound.validation.warning.clone().unwrap_or_default();
            self.log(
                LogEntry::new(
                    LogCategory::Request,
                    LogSeverity::Warning,
                    ctx.correlation_id,
                    format!("{} rejected locally: {warning}", outbound.request_type),
                ),
            );
            return Ok(CallResult::local(
                outbound.validation.operation_code,
                warning,
            ));
        }
        if !self.is_started() {
            return Ok(CallResult::local(
                codes::CLIENT_NOT_STARTED,
                "client not started",
            ));
        }

        let cache_key = self.cache_key(outbound);
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(hit) = cache.get(key) {
                self.log(LogEntry::new(
                    LogCategory::Cache,
                    LogSeverity::Information,
                    ctx.correlation_id,
                    format!("repeated {} served from cache", outbound.request_type),
                ));
                return Ok(hit);
            }
        }

        self.dispatch(outbound, &mut ctx, cache_key).await
    }

    async fn dispatch(
        &self,
        outbound: &Outbound,
        ctx: &mut RequestContext,
        cache_key: Option<String>,
    ) -> Result<CallResult> {
        let mut budget = self.config.attempts();
        let mut attempt = 0u32;
        let mut auth_retries = 0u32;
        let mut not_found_retries = 0u32;

        while attempt < budget {
            attempt += 1;

            if self.mode.is_offline()
                && !outbound.request_type.is_recovery()
                && self.forwarder.short_circuits()
            {
                ctx.message = "client is offline".to_string();
                ctx.unreachable = true;
                self.forwarder
                    .defer(&mut ctx.deferral, outbound, ctx.correlation_id, &ctx.message)?;
                self.log(LogEntry::new(
                    LogCategory::Request,
                    LogSeverity::Warning,
                    ctx.correlation_id,
                    format!("{} not sent: client is offline", ctx.request_type),
                ));
                return Ok(offline_result(ctx));
            }

            let request = self.request(outbound, ctx).await;
            let outcome = {
                let _guard = self.http_lock.lock().await;
                self.executor.execute(request.clone()).await
            };

            let response = match outcome {
                Ok(response) => response,
                Err(err) => {
                    ctx.message = err.to_string();
                    ctx.unreachable = true;
                    self.log(
                        LogEntry::new(
                            LogCategory::Request,
                            LogSeverity::Error,
                            ctx.correlation_id,
                            format!("{} attempt {attempt}: {err}", ctx.request_type),
                        )
                        .with_request(&request),
                    );
                    self.forwarder
                        .defer(&mut ctx.deferral, outbound, ctx.correlation_id, &ctx.message)?;
                    if attempt < budget {
                        tokio::time::sleep(self.config.retry_interval()).await;
                    }
                    continue;
                }
            };

            ctx.unreachable = false;
            ctx.message = response.status_line();
            self.log(
                LogEntry::new(
                    LogCategory::Request,
                    LogSeverity::for_status(response.status),
                    ctx.correlation_id,
                    format!("{} attempt {attempt}: {}", ctx.request_type, ctx.message),
                )
                .with_request(&request)
                .with_response(&response),
            );

            match response.status {
                404 if ctx.request_type == RequestType::GetRecoveryResult
                    && not_found_retries < NOT_FOUND_RETRIES =>
                {
                    // results may not be published yet after an outage
                    not_found_retries += 1;
                    budget += 1;
                    ctx.response = Some(response);
                    tokio::time::sleep(self.config.not_found_retry_delay()).await;
                }
                200 | 202 | 403 | 404 | 409 | 422 => {
                    return Ok(self.finish(&response, cache_key));
                }
                401 => {
                    if !self.tokens.has_provider() || auth_retries >= AUTH_RETRIES {
                        return Ok(response::unauthorized(&response));
                    }
                    if auth_retries > 0 {
                        tokio::time::sleep(self.config.auth_retry_delay()).await;
                    }
                    auth_retries += 1;
                    budget += 1;
                    ctx.response = Some(response);
                    if !self.tokens.refresh().await {
                        self.log(LogEntry::new(
                            LogCategory::Token,
                            LogSeverity::Warning,
                            ctx.correlation_id,
                            "token refresh failed",
                        ));
                    }
                }
                408 | 429 | 500 | 502 | 503 | 504 => {
                    if attempt >= budget {
                        return Ok(response::service_unavailable(&response));
                    }
                    ctx.response = Some(response);
                    tokio::time::sleep(self.config.retry_interval()).await;
                }
                _ => {
                    self.forwarder
                        .defer(&mut ctx.deferral, outbound, ctx.correlation_id, &ctx.message)?;
                    return Ok(response::failure(
                        &response,
                        codes::UNRECOVERABLE_STATUS,
                        "unrecoverable status",
                    ));
                }
            }
        }

        Ok(exhausted(ctx))
    }

    async fn request(&self, outbound: &Outbound, ctx: &RequestContext) -> HttpRequest {
        let bearer = self.tokens.bearer().await;
        let correlation_id = ctx.correlation_id.to_string();
        let headers = headers::build(CallHeaders {
            manual_entry_header: &self.config.manual_entry_header,
            is_manual: outbound.is_manual,
            language: &outbound.language,
            has_body: outbound.body.is_some(),
            correlation_id: &correlation_id,
            bearer: bearer.as_deref(),
        });
        HttpRequest {
            verb: outbound.verb,
            uri: outbound.uri.clone(),
            headers,
            body: outbound.body.clone(),
        }
    }

    /// The remote answered: go online and remember a successful result.
    fn finish(&self, response: &HttpResponse, cache_key: Option<String>) -> CallResult {
        let result = response::terminal(response);
        self.mode.go_online();
        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            if result.is_success() {
                cache.put(key, result.clone());
            }
        }
        result
    }

    /// Digest identifying a repeated state change, if caching applies.
    fn cache_key(&self, outbound: &Outbound) -> Option<String> {
        if self.cache.is_none()
            || !self.config.detect_repeated_requests
            || !outbound.request_type.is_state_change()
        {
            return None;
        }
        let mut hasher = Sha256::new();
        for part in [
            outbound.verb.as_str(),
            outbound.uri.as_str(),
            outbound.body.as_deref().unwrap_or(""),
            outbound.requested_state.map(|s| s.as_str()).unwrap_or(""),
            if outbound.is_manual { "manual" } else { "scanned" },
            outbound.language.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        Some(hex::encode(hasher.finalize()))
    }

    fn log(&self, entry: LogEntry) {
        self.sink.log(entry);
    }
}

fn offline_result(ctx: &RequestContext) -> CallResult {
    let warning = if ctx.deferral.is_deferred() {
        "remote system unreachable; request deferred"
    } else {
        "remote system unreachable; request not sent"
    };
    CallResult::local(codes::OFFLINE, warning)
}

/// Result once every attempt was used without a terminal answer.
fn exhausted(ctx: &RequestContext) -> CallResult {
    if ctx.deferral.is_deferred() || ctx.unreachable {
        return offline_result(ctx);
    }
    match &ctx.response {
        Some(response) => response::failure(response, codes::UNKNOWN_FAILURE, "request failed"),
        None => CallResult::local(codes::UNKNOWN_FAILURE, "request failed"),
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
