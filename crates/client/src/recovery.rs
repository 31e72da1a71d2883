// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery coordinator.
//!
//! A background loop, one per client with a store, that drains deferred
//! requests through the recovery endpoint and moves the authoritative
//! results into the Responses table.
//!
//! Requests are drained oldest first and results are paired with them by
//! position. Nothing else correlates a result with its request, so every
//! path that could reorder or skip a request (stale acknowledgements,
//! unconvertible records, abandoned batches) is handled before pairing.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use pt_core::codes;
use pt_core::{
    BulkRequest, CallResult, DeferredRequest, PackCommand, PackOutcome, PackResult,
    RecoveryRequest, RecoverySinglePackResponse, Registry, Severity,
};
use pt_store::{Store, Transaction};

use crate::config::ClientConfig;
use crate::endpoints::{parse_pack_uri, Endpoints};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::events::{Listeners, Statistics};
use crate::log::{LogCategory, LogEntry, LogSeverity};
use crate::outbound::Outbound;

/// Pending and completed counts of a store.
pub fn statistics(store: &dyn Store) -> Result<Statistics> {
    Ok(Statistics {
        pending: store.requests().list()?.len(),
        completed: store.responses().list()?.len(),
    })
}

/// A deferred request turned back into the commands it stands for.
#[derive(Debug, Clone)]
struct Drained {
    request: DeferredRequest,
    commands: Vec<PackCommand>,
}

/// How a submitted batch ended.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Reconciled(usize),
    Abandoned,
    Cancelled,
}

pub struct Coordinator {
    engine: Arc<Engine>,
    store: Arc<dyn Store>,
    registry: Arc<Registry>,
    endpoints: Endpoints,
    config: Arc<ClientConfig>,
    listeners: Listeners<Statistics>,
    latest: Mutex<Statistics>,
    leading: AtomicBool,
}

impl Coordinator {
    pub fn new(
        engine: Arc<Engine>,
        store: Arc<dyn Store>,
            registry: Arc<Registry>,
        endpoints: Endpoints,
        config: Arc<ClientConfig>,
    ) -> Self {
        Coordinator {
            engine,
            store,
            registry,
            endpoints,
            config,
            listeners: Listeners::new(),
            latest: Mutex::new(Statistics::default()),
            leading: AtomicBool::new(false),
        }
    }

    pub fn listeners(&self) -> &Listeners<Statistics> {
        &self.listeners
    }

    /// Statistics emitted by the most recent drain cycle.
    pub fn latest(&self) -> Statistics {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_leader(&self) -> bool {
        self.leading.load(Ordering::Acquire)
    }

    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.run(cancel).await })
    }

    /// Drains until cancelled, then gives up leadership.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::debug!(store = self.store.name(), "recovery coordinator started");
        let interval = self.config.recovery_poll_interval();
        while !cancel.is_cancelled() {
            let wait = if self.acquire() {
                match self.cycle(&cancel).await {
                    Ok(wait) => wait,
                    Err(err) => {
                        self.log(LogSeverity::Critical, format!("recovery cycle failed: {err}"));
                        // whatever the failed batch left acknowledged is drained again
                        if let Err(err) = self.release_stale() {
                            self.log(LogSeverity::Error, format!("release failed: {err}"));
                        }
                        interval
                    }
                }
            } else {
                interval
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        self.resign();
        tracing::debug!(store = self.store.name(), "recovery coordinator stopped");
    }

    /// Claims drain leadership if this instance does not hold it yet.
    fn acquire(&self) -> bool {
        if self.is_leader() {
            return true;
        }
        if !self.store.per_instance() && !self.registry.try_acquire(self.store.name()) {
            return false;
        }
        self.leading.store(true, Ordering::Release);
        tracing::info!(store = self.store.name(), "drain leadership acquired");
        if let Err(err) = self.release_stale() {
            self.log(
                LogSeverity::Error,
                format!("could not release stale acknowledgements: {err}"),
            );
        }
        true
    }

    fn resign(&self) {
        if self.leading.swap(false, Ordering::AcqRel) && !self.store.per_instance() {
            self.registry.release(self.store.name());
            tracing::info!(store = self.store.name(), "drain leadership released");
        }
    }

    /// Requests acknowledged by a batch that never reconciled go back to
    /// the head of the queue.
    fn release_stale(&self) -> Result<()> {
        let stale: Vec<DeferredRequest> = self
            .store
            .requests()
            .list()?
            .into_iter()
            .filter(|r| r.acknowledged)
            .collect();
        if !stale.is_empty() {
            self.store.release_requests(&stale)?;
            tracing::info!(count = stale.len(), "released stale acknowledgements");
        }
        Ok(())
    }

    /// One drain cycle; returns how long to wait before the next.
    async fn cycle(&self, cancel: &CancellationToken) -> Result<Duration> {
        let interval = self.config.recovery_poll_interval();
        // statistics go out even when the drain itself failed
        let drained = self.drain();
        let emitted = self.emit_statistics();
        let batch = drained?;
        emitted?;
        if batch.is_empty() {
            return Ok(interval);
        }

        let recovery = RecoveryRequest {
            packs: batch.iter().flat_map(|d| d.commands.clone()).collect(),
        };
        tracing::info!(
            requests = batch.len(),
            packs = recovery.packs.len(),
            "submitting recovery batch"
        );
        let outbound = Outbound::recovery(&self.endpoints, &recovery, &self.config.language)?;
        let submitted = self.engine.execute(&outbound).await?;

        match submitted.status {
            Some(202) => {
                let Some(location) = submitted.location.clone() else {
                    self.log(LogSeverity::Error, "recovery accepted without a location");
                    return Ok(interval);
                };
                let requests: Vec<DeferredRequest> =
                    batch.iter().map(|d| d.request.clone()).collect();
                self.store.acknowledge_requests(&requests)?;
                let outcome = self.poll(&batch, &location, &submitted, cancel).await?;
                if let Outcome::Reconciled(count) = outcome {
                    tracing::debug!(count, "recovery batch finished");
                    self.emit_statistics()?;
                }
                Ok(interval)
            }
            Some(200) => {
                self.reconcile(&batch, submitted.packs)?;
                self.emit_statistics()?;
                Ok(interval)
            }
            Some(429) => {
                tracing::info!(eta = ?submitted.eta, "recovery throttled");
                Ok(self.wait_for(submitted.eta))
            }
            _ => {
                self.log(
                    LogSeverity::Warning,
                    format!(
                        "recovery submission not accepted ({}): {}",
                        submitted.operation_code(),
                        submitted.result.warning.as_deref().unwrap_or("no detail")
                    ),
                );
                Ok(interval)
            }
        }
    }

    /// The oldest unacknowledged requests that fit in one batch.
    ///
    /// Requests that cannot be converted back into commands are
    /// quarantined first so they never take a place in the pairing.
    fn drain(&self) -> Result<Vec<Drained>> {
        let pending: Vec<DeferredRequest> = self
            .store
            .requests()
            .list()?
            .into_iter()
            .filter(|r| !r.acknowledged)
            .collect();

        let mut convertible = Vec::with_capacity(pending.len());
        let mut unconvertible = Vec::new();
        for request in pending {
            match self.convert(&request) {
                Some(commands) => convertible.push(Drained { request, commands }),
                None => unconvertible.push(request),
            }
        }
        if !unconvertible.is_empty() {
            self.quarantine(&unconvertible)?;
        }

        let max = self.config.max_bulk_pack_count;
        let mut total = 0;
        let mut batch = Vec::new();
        for drained in convertible {
            let count = drained.commands.len();
            if !batch.is_empty() && total + count > max {
                break;
            }
            total += count;
            batch.push(drained);
        }
        Ok(batch)
    }

    fn convert(&self, request: &DeferredRequest) -> Option<Vec<PackCommand>> {
        if self.endpoints.is_bulk(&request.uri) {
            let bulk: BulkRequest = serde_json::from_str(request.body.as_deref()?).ok()?;
            let commands = bulk.commands();
            return (!commands.is_empty()).then_some(commands);
        }
        let pack = parse_pack_uri(&request.uri)?;
        Some(vec![PackCommand {
            pack,
            requested_state: request.requested_pack_state(),
            is_manual: request.is_manual,
        }])
    }

    /// Moves unconvertible requests into Responses as failures.
    fn quarantine(&self, requests: &[DeferredRequest]) -> Result<()> {
        let mut responses = self.store.responses().begin();
        let mut removals = self.store.requests().begin();
        for request in requests {
            let result = PackResult::failure(
                codes::UNCONVERTIBLE_DEFERRED_REQUEST,
                format!("deferred request could not be converted: {} {}", request.verb, request.uri),
            );
            responses.add(RecoverySinglePackResponse {
                timestamp: self.store.responses().current_timestamp()?,
                requested_state: request.requested_pack_state(),
                is_manual: request.is_manual,
                pack: parse_pack_uri(&request.uri).unwrap_or_default(),
                severity: Severity::Failure,
                result,
            });
            removals.remove(request);
        }
        self.commit_pair("quarantine", requests.len(), &mut responses, &mut removals)?;
        self.log(
            LogSeverity::Warning,
            format!("quarantined {} unconvertible deferred request(s)", requests.len()),
        );
        Ok(())
    }

    /// Polls the result location until the batch reconciles or is abandoned.
    async fn poll(
        &self,
        batch: &[Drained],
        location: &str,
        submitted: &CallResult,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let outbound = Outbound::recovery_result(location, &self.config.language);
        let mut eta = submitted.eta;
        let mut expiry = submitted.expiry;

        loop {
            let wait = self.wait_for(eta);
            tokio::select! {
                _ = cancel.cancelled() => return Ok(Outcome::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
            if expiry.is_some_and(|at| Utc::now() > at) {
                self.log(LogSeverity::Error, format!("recovery results at {location} expired"));
                self.abandon(batch)?;
                return Ok(Outcome::Abandoned);
            }

            let polled = self.engine.execute(&outbound).await?;
            match polled.status {
                Some(200) => {
                    let count = self.reconcile(batch, polled.packs)?;
                    return Ok(Outcome::Reconciled(count));
                }
                Some(404) | Some(401) => {
                    self.log(
                        LogSeverity::Error,
                        format!(
                            "recovery results at {location} unavailable ({}); batch released",
                            polled.operation_code()
                        ),
                    );
                    self.abandon(batch)?;
                    return Ok(Outcome::Abandoned);
                }
                status => {
                    tracing::debug!(?status, eta = ?polled.eta, "recovery results not ready");
                    eta = polled.eta;
                    expiry = polled.expiry.or(expiry);
                }
            }
        }
    }

    fn abandon(&self, batch: &[Drained]) -> Result<()> {
        let present: Vec<i64> = self
            .store
            .requests()
            .list()?
            .iter()
            .map(|r| r.timestamp)
            .collect();
        let requests: Vec<DeferredRequest> = batch
            .iter()
            .filter(|d| present.contains(&d.request.timestamp))
            .map(|d| d.request.clone())
            .collect();
        self.store.release_requests(&requests)?;
        Ok(())
    }

    /// Pairs results with the batch and moves them into Responses.
    ///
    /// Responses are committed first, then the removal of the requests.
    /// The two commits are not atomic: if the second fails, the committed
    /// responses are removed again on a best-effort basis and the failure
    /// is reported as critical.
    fn reconcile(&self, batch: &[Drained], results: Vec<PackOutcome>) -> Result<usize> {
        let expected: usize = batch.iter().map(|d| d.commands.len()).sum();
        if results.len() != expected {
            return Err(Error::ReconciliationMismatch {
                results: results.len(),
                packs: expected,
            });
        }

        let present: Vec<i64> = self
            .store
            .requests()
            .list()?
            .iter()
            .map(|r| r.timestamp)
            .collect();
        if let Some(gone) = batch
            .iter()
            .find(|d| !present.contains(&d.request.timestamp))
        {
            return Err(Error::Reconciliation(format!(
                "deferred request {} was removed before its result arrived",
                gone.request.timestamp
            )));
        }

        let mut responses = self.store.responses().begin();
        let mut requests = self.store.requests().begin();
        let added = match self.stage_pairs(batch, results, &mut responses, &mut requests) {
            Ok(added) => added,
            Err(err) => {
                self.rollback_both(&mut responses, &mut requests);
                return Err(err);
            }
        };

        if let Err(err) = responses.commit() {
            self.rollback_both(&mut responses, &mut requests);
            return Err(Error::Reconciliation(format!("responses commit failed: {err}")));
        }
        if let Err(err) = requests.commit() {
            // known limitation: the responses are already committed
            self.rollback_both(&mut responses, &mut requests);
            let mut withdraw = self.store.responses().begin();
            for response in &added {
                withdraw.remove(response);
            }
            let message = match withdraw.commit() {
                Ok(()) => format!("requests commit failed: {err}; responses withdrawn"),
                Err(undo) => {
                    if let Err(rollback) = withdraw.rollback() {
                        self.log(
                            LogSeverity::Critical,
                            format!("responses withdrawal rollback failed: {rollback}"),
                        );
                    }
                    format!("requests commit failed: {err}; responses left in place: {undo}")
                }
            };
            return Err(Error::Reconciliation(message));
        }

        tracing::info!(count = added.len(), "recovery batch reconciled");
        Ok(added.len())
    }

    /// Stages one response per result and the removal of each request.
    fn stage_pairs(
        &self,
        batch: &[Drained],
        results: Vec<PackOutcome>,
        responses: &mut Transaction<'_, RecoverySinglePackResponse>,
        requests: &mut Transaction<'_, DeferredRequest>,
    ) -> Result<Vec<RecoverySinglePackResponse>> {
        let mut added = Vec::with_capacity(results.len());
        let mut results = results.into_iter();
        for drained in batch {
            for outcome in results.by_ref().take(drained.commands.len()) {
                let response = RecoverySinglePackResponse::pair(
                    self.store.responses().current_timestamp()?,
                    &drained.request,
                    outcome,
                );
                responses.add(response.clone());
                added.push(response);
            }
            requests.remove(&drained.request);
        }
        Ok(added)
    }

    /// Commits Responses then Requests for a maintenance move.
    fn commit_pair(
        &self,
        what: &str,
        count: usize,
        responses: &mut Transaction<'_, RecoverySinglePackResponse>,
        requests: &mut Transaction<'_, DeferredRequest>,
    ) -> Result<()> {
        if let Err(err) = responses.commit() {
            self.rollback_both(responses, requests);
            return Err(Error::Reconciliation(format!("{what} of {count}: {err}")));
        }
        if let Err(err) = requests.commit() {
            self.rollback_both(responses, requests);
            return Err(Error::Reconciliation(format!(
                "{what} of {count}: responses committed but requests kept: {err}"
            )));
        }
        Ok(())
    }

    fn rollback_both(
        &self,
        responses: &mut Transaction<'_, RecoverySinglePackResponse>,
        requests: &mut Transaction<'_, DeferredRequest>,
    ) {
        if let Err(err) = responses.rollback() {
            self.log(LogSeverity::Critical, format!("responses rollback failed: {err}"));
        }
        if let Err(err) = requests.rollback() {
            self.log(LogSeverity::Critical, format!("requests rollback failed: {err}"));
        }
    }

    fn emit_statistics(&self) -> Result<()> {
        let mut stats = statistics(self.store.as_ref())?;
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = stats;
        self.listeners.emit(&mut stats);
        Ok(())
    }

    /// The poll interval, or longer when the remote named a later time.
    fn wait_for(&self, eta: Option<DateTime<Utc>>) -> Duration {
        let interval = self.config.recovery_poll_interval();
        let until_eta = eta
            .and_then(|at| (at - Utc::now()).to_std().ok())
            .map(|d| {
                // whole seconds, rounded up
                let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
                Duration::from_secs(secs)
            })
            .unwrap_or(Duration::ZERO);
        interval.max(until_eta)
    }

    fn log(&self, severity: LogSeverity, message: impl Into<String>) {
        self.engine.sink().log(LogEntry::new(
            LogCategory::Recovery,
            severity,
            Uuid::new_v4(),
            message,
        ));
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
