// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for the client's unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use pt_core::{
    DeferredRequest, Pack, PackCommand, PackState, RecoverySinglePackResponse, Registry,
    SequenceClock, Verb,
};
use pt_store::{Change, MemoryTable, Record, Store, StoreError, StoreResult, Table};

use crate::config::{ClientConfig, StoreAndForwardMode};
use crate::deferral::StoreAndForward;
use crate::endpoints::Endpoints;
use crate::engine::{Engine, ResultCache};
use crate::http::{HttpError, HttpExecutor, HttpRequest, HttpResponse, HttpResult};
use crate::log::{LogCategory, LogEntry, LogSeverity, LogSink};
use crate::mode::ClientMode;
use crate::recovery::Coordinator;
use crate::token::{TokenManager, TokenProvider};

pub const BASE: &str = "https://nmvs.test/api";

pub fn pack(serial: &str) -> Pack {
    Pack::new("05012345678900", serial, "B1", "261231")
}

pub fn decommission(serial: &str) -> PackCommand {
    PackCommand::transition(pack(serial), PackState::Destroyed)
}

pub fn deferred(timestamp: i64, serial: &str, state: Option<PackState>) -> DeferredRequest {
    let endpoints = Endpoints::new(BASE).unwrap();
    DeferredRequest {
        timestamp,
        verb: if state.is_some() { Verb::Patch } else { Verb::Get },
        uri: endpoints.pack(&pack(serial)),
        body: state.map(crate::endpoints::state_body),
        requested_state: state.map(|s| s.to_string()),
        is_manual: false,
        language: "en".to_string(),
        acknowledged: false,
    }
}

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResult<HttpResponse> + Send + Sync>;

/// Replays scripted replies in order, then falls back to a handler.
///
/// Without a handler an exhausted script answers with a transport error.
#[derive(Default)]
pub struct MockExecutor {
    script: Mutex<VecDeque<HttpResult<HttpResponse>>>,
    handler: Mutex<Option<Handler>>,
    requests: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl MockExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.push(Ok(HttpResponse::new(status, body)));
    }

    pub fn fail(&self) {
        self.push(Err(HttpError::Transport("connection refused".to_string())));
    }

    pub fn push(&self, reply: HttpResult<HttpResponse>) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn handle(
        &self,
        handler: impl Fn(&HttpRequest) -> HttpResult<HttpResponse> + Send + Sync + 'static,
    ) {
        *self.handler.lock().unwrap() = Some(Box::new(handler));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpExecutor for MockExecutor {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = HttpResult<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            let reply = self.script.lock().unwrap().pop_front();
            let reply = match reply {
                Some(reply) => reply,
                None => match self.handler.lock().unwrap().as_ref() {
                    Some(handler) => handler(&request),
                    None => Err(HttpError::Transport("no scripted reply".to_string())),
                },
            };
            self.requests
                .lock()
                .unwrap()
                .push((Instant::now(), request));
            reply
        })
    }
}

/// Keeps every entry for inspection.
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, category: LogCategory, severity: LogSeverity) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.category == category && e.severity == severity)
            .count()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, entry: LogEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

/// A table whose commit or rollback can be made to fail on demand.
pub struct FlakyTable<R: Record> {
    inner: MemoryTable<R>,
    pub fail_commit: AtomicBool,
    pub fail_rollback: AtomicBool,
    pub fail_list: AtomicBool,
    /// Commits that succeed before every further commit is refused.
    pub commits_allowed: AtomicUsize,
    commits: AtomicUsize,
}

impl<R: Record> FlakyTable<R> {
    fn new(clock: Arc<SequenceClock>) -> Self {
        FlakyTable {
            inner: MemoryTable::new(clock),
            fail_commit: AtomicBool::new(false),
            fail_rollback: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            commits_allowed: AtomicUsize::new(usize::MAX),
            commits: AtomicUsize::new(0),
        }
    }
}

impl<R: Record> Table<R> for FlakyTable<R> {
    fn list(&self) -> StoreResult<Vec<R>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("list refused".to_string()));
        }
        self.inner.list()
    }

    fn current_timestamp(&self) -> StoreResult<i64> {
        self.inner.current_timestamp()
    }

    fn commit(&self, changes: &[Change<R>]) -> StoreResult<()> {
        if self.fail_commit.load(Ordering::SeqCst)
            || self.commits.load(Ordering::SeqCst) >= self.commits_allowed.load(Ordering::SeqCst)
        {
            return Err(StoreError::Unavailable("commit refused".to_string()));
        }
        self.inner.commit(changes)?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self, changes: &[Change<R>]) -> StoreResult<()> {
        if self.fail_rollback.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("rollback refused".to_string()));
        }
        self.inner.rollback(changes)
    }
}

/// A per-instance store built from [`FlakyTable`]s.
pub struct FlakyStore {
    pub requests: FlakyTable<DeferredRequest>,
    pub responses: FlakyTable<RecoverySinglePackResponse>,
    pub acknowledged: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        let clock = Arc::new(SequenceClock::new());
        Arc::new(FlakyStore {
            requests: FlakyTable::new(Arc::clone(&clock)),
            responses: FlakyTable::new(clock),
            acknowledged: AtomicUsize::new(0),
        })
    }
}

impl Store for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn per_instance(&self) -> bool {
        true
    }

    fn requests(&self) -> &dyn Table<DeferredRequest> {
        &self.requests
    }

    fn responses(&self) -> &dyn Table<RecoverySinglePackResponse> {
        &self.responses
    }

    fn acknowledge_requests(&self, requests: &[DeferredRequest]) -> StoreResult<()> {
        let stamps: Vec<i64> = requests.iter().map(|r| r.timestamp).collect();
        self.requests.inner.update(&stamps, |r| r.acknowledged = true)?;
        self.acknowledged
            .fetch_add(requests.len(), Ordering::SeqCst);
        Ok(())
    }

    fn release_requests(&self, requests: &[DeferredRequest]) -> StoreResult<()> {
        let stamps: Vec<i64> = requests.iter().map(|r| r.timestamp).collect();
        self.requests.inner.update(&stamps, |r| r.acknowledged = false)
    }
}

/// A provider handing out `token-1`, `token-2`, ...
#[derive(Default)]
pub struct StaticProvider {
    issued: AtomicUsize,
}

impl TokenProvider for StaticProvider {
    fn request_client_credentials_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = crate::token::Token> + Send + '_>> {
        Box::pin(async move { self.next() })
    }

    fn request_refresh_token(
        &self,
        _refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = crate::token::Token> + Send + '_>> {
        Box::pin(async move { self.next() })
    }
}

impl StaticProvider {
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    fn next(&self) -> crate::token::Token {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        crate::token::Token {
            access_token: format!("token-{n}"),
            refresh_token: None,
            expires_in: 3600,
            is_error: false,
            error: None,
        }
    }
}

impl Harness {
    /// A coordinator draining the harness store.
    pub fn coordinator(&self, registry: Arc<Registry>) -> Arc<Coordinator> {
        Arc::new(Coordinator::new(
            Arc::clone(&self.engine),
            self.store.clone().unwrap(),
            registry,
            Endpoints::new(BASE).unwrap(),
            Arc::clone(&self.config),
        ))
    }
}

/// Everything an engine under test is wired to.
pub struct Harness {
    pub engine: Arc<Engine>,
    pub config: Arc<ClientConfig>,
    pub store: Option<Arc<dyn Store>>,
    pub executor: Arc<MockExecutor>,
    pub sink: Arc<RecordingSink>,
    pub mode: Arc<ClientMode>,
    pub cache: Option<Arc<ResultCache>>,
}

pub struct HarnessBuilder {
    pub config: ClientConfig,
    pub store: Option<Arc<dyn Store>>,
    pub provider: Option<Arc<dyn TokenProvider>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        let mut config = ClientConfig::new(BASE);
        config.retry_count = 2;
        HarnessBuilder {
            config,
            store: None,
            provider: None,
        }
    }

    pub fn mode(mut self, mode: StoreAndForwardMode) -> Self {
        self.config.store_and_forward = mode;
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut ClientConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> Harness {
        let config = Arc::new(self.config);
        let executor = MockExecutor::new();
        let sink = RecordingSink::new();
        let mode = Arc::new(ClientMode::new());
        let endpoints = Endpoints::new(&config.base_url).unwrap();
        let forwarder = StoreAndForward::new(
            config.store_and_forward,
            config.bulk_as_single_packs,
            self.store.clone(),
            endpoints,
            Arc::clone(&mode),
            sink.clone(),
        );
        let cache = config.detect_repeated_requests.then(|| {
            Arc::new(ResultCache::new(
                config.cache_max_size,
                config.repeated_request_window(),
            ))
        });
        let tokens = Arc::new(TokenManager::new(self.provider, std::time::Duration::ZERO));
        let engine = Arc::new(Engine::new(
            Arc::clone(&config),
            executor.clone(),
            tokens,
            Arc::clone(&mode),
            forwarder,
            cache.clone(),
            sink.clone(),
        ));
        engine.set_started(true);
        Harness {
            engine,
            config,
            store: self.store,
            executor,
            sink,
            mode,
            cache,
        }
    }
}
