// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Store-and-forward: deferring calls that could not reach the remote.

use std::sync::Arc;
use uuid::Uuid;

use pt_core::{BulkRequest, DeferredRequest, RequestType, SequenceClock, Verb};
use pt_store::Store;

use crate::config::StoreAndForwardMode;
use crate::endpoints::{state_body, Endpoints};
use crate::error::{Error, Result};
use crate::events::{DeferringRequest, Listeners};
use crate::log::{LogCategory, LogEntry, LogSeverity, LogSink};
use crate::mode::ClientMode;
use crate::outbound::Outbound;

/// What happened to the deferral of one logical call.
///
/// A call is deferred at most once however many attempts fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeferralState {
    #[default]
    NotRaised,
    /// Not deferrable, or store-and-forward is off.
    Skipped,
    /// A listener cancelled the deferral.
    Cancelled,
    /// Manual mode: handed to the application through the event.
    Delegated,
    /// Stored as this many deferred requests.
    Persisted(usize),
}

impl DeferralState {
    pub fn is_deferred(&self) -> bool {
        matches!(self, DeferralState::Delegated | DeferralState::Persisted(_))
    }
}

pub struct StoreAndForward {
    mode: StoreAndForwardMode,
    bulk_as_single_packs: bool,
    store: Option<Arc<dyn Store>>,
    clock: SequenceClock,
    endpoints: Endpoints,
    client_mode: Arc<ClientMode>,
    listeners: Listeners<DeferringRequest>,
    sink: Arc<dyn LogSink>,
}

impl StoreAndForward {
    pub fn new(
        mode: StoreAndForwardMode,
        bulk_as_single_packs: bool,
        store: Option<Arc<dyn Store>>,
        endpoints: Endpoints,
        client_mode: Arc<ClientMode>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        StoreAndForward {
            mode,
            bulk_as_single_packs,
            store,
            clock: SequenceClock::new(),
            endpoints,
            client_mode,
            listeners: Listeners::new(),
            sink,
        }
    }

    pub fn mode(&self) -> StoreAndForwardMode {
        self.mode
    }

    pub fn listeners(&self) -> &Listeners<DeferringRequest> {
        &self.listeners
    }

    /// True when an offline client should skip the network and hand the
    /// call to [`StoreAndForward::defer`] straight away.
    ///
    /// Only a client with a store runs a coordinator that can bring it back
    /// online, so without one every call still tries the network.
    pub fn short_circuits(&self) -> bool {
        self.store.is_some()
    }

    /// Takes the client offline and, where eligible, defers the call.
    ///
    /// Does nothing once `state` has left `NotRaised`. A failed commit is
    /// rolled back and reported as [`Error::DeferralFailed`]; a failed
    /// rollback as [`Error::Interchange`].
    pub fn defer(
        &self,
        state: &mut DeferralState,
        outbound: &Outbound,
        correlation_id: Uuid,
        reason: &str,
    ) -> Result<()> {
        if *state != DeferralState::NotRaised {
            return Ok(());
        }
        if self.client_mode.go_offline() {
            self.log(
                LogCategory::Mode,
                LogSeverity::Warning,
                correlation_id,
                format!("client offline: {reason}"),
            );
        }
        if !outbound.request_type.is_deferrable() || self.mode == StoreAndForwardMode::None {
            *state = DeferralState::Skipped;
            return Ok(());
        }

        let draft = self.draft(outbound)?;
        let mut event = DeferringRequest {
            request_type: outbound.request_type,
            request: draft,
            reason: reason.to_string(),
            cancel: false,
        };
        self.listeners.emit(&mut event);
        if event.cancel {
            self.log(
                LogCategory::Deferral,
                LogSeverity::Information,
                correlation_id,
                format!("deferral of {} cancelled by listener", outbound.request_type),
            );
            *state = DeferralState::Cancelled;
            return Ok(());
        }
        if self.mode == StoreAndForwardMode::Manual {
            *state = DeferralState::Delegated;
            return Ok(());
        }

        let Some(store) = self.store.as_deref() else {
            self.log(
                LogCategory::Deferral,
                LogSeverity::Error,
                correlation_id,
                format!("no store configured; {} was not deferred", outbound.request_type),
            );
            *state = DeferralState::Skipped;
            return Ok(());
        };

        let records = if outbound.request_type == RequestType::SubmitBulkRequest
            && self.bulk_as_single_packs
        {
            self.explode(&event.request, store)?
        } else {
            vec![event.request]
        };
        let count = records.len();
        self.persist(store, records, correlation_id)?;

        self.log(
            LogCategory::Deferral,
            LogSeverity::Warning,
            correlation_id,
            format!("{} deferred as {count} request(s): {reason}", outbound.request_type),
        );
        *state = DeferralState::Persisted(count);
        Ok(())
    }

    fn next_timestamp(&self) -> Result<i64> {
        match &self.store {
            Some(store) => Ok(store.requests().current_timestamp()?),
            None => Ok(self.clock.next()),
        }
    }

    fn draft(&self, outbound: &Outbound) -> Result<DeferredRequest> {
        Ok(DeferredRequest {
            timestamp: self.next_timestamp()?,
            verb: outbound.verb,
            uri: outbound.uri.clone(),
            body: outbound.body.clone(),
            requested_state: outbound.requested_state.map(|s| s.to_string()),
            is_manual: outbound.is_manual,
            language: outbound.language.clone(),
            acknowledged: false,
        })
    }

    /// One single-pack request per pack of a deferred bulk submission.
    fn explode(&self, draft: &DeferredRequest, store: &dyn Store) -> Result<Vec<DeferredRequest>> {
        let bulk = match draft.body.as_deref().map(serde_json::from_str::<BulkRequest>) {
            Some(Ok(bulk)) => bulk,
            _ => {
                tracing::warn!(uri = %draft.uri, "bulk body unreadable; deferring as one request");
                return Ok(vec![draft.clone()]);
            }
        };
        bulk.commands()
            .into_iter()
            .map(|command| -> Result<DeferredRequest> {
                Ok(DeferredRequest {
                    timestamp: store.requests().current_timestamp()?,
                    verb: if command.requested_state.is_some() {
                        Verb::Patch
                    } else {
                        Verb::Get
                    },
                    uri: self.endpoints.pack(&command.pack),
                    body: command.requested_state.map(state_body),
                    requested_state: command.requested_state.map(|s| s.to_string()),
                    is_manual: command.is_manual,
                    language: draft.language.clone(),
                    acknowledged: false,
                })
            })
            .collect()
    }

    fn persist(
        &self,
        store: &dyn Store,
        records: Vec<DeferredRequest>,
        correlation_id: Uuid,
    ) -> Result<()> {
        let mut tx = store.requests().begin();
        for record in records {
            tx.add(record);
        }
        let Err(err) = tx.commit() else {
            return Ok(());
        };

        self.log(
            LogCategory::Deferral,
            LogSeverity::Error,
            correlation_id,
            format!("deferred request commit failed: {err}"),
        );
        match tx.rollback() {
            Ok(()) => Err(Error::DeferralFailed(err.to_string())),
            Err(rollback) => {
                let message = format!("commit failed: {err}; rollback failed: {rollback}");
                self.log(
                    LogCategory::Deferral,
                    LogSeverity::Critical,
                    correlation_id,
                    message.clone(),
                );
                Err(Error::Interchange(message))
            }
        }
    }

    fn log(&self, category: LogCategory, severity: LogSeverity, id: Uuid, message: String) {
        self.sink.log(LogEntry::new(category, severity, id, message));
    }
}

#[cfg(test)]
#[path = "deferral_tests.rs"]
mod tests;
