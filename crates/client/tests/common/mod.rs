// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for client scenario tests.

#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub use packtrace::*;
pub use std::time::Duration;

pub const BASE: &str = "https://nmvs.test/api/v1";

pub fn pack(serial: &str) -> Pack {
    Pack::new("05012345678900", serial, "B1", "261231")
}

/// A configuration with short intervals suited to paused-time tests.
pub fn config() -> ClientConfig {
    let mut config = ClientConfig::new(BASE);
    config.retry_count = 3;
    config.recovery_poll_interval_ms = 1000;
    config
}

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResult<HttpResponse> + Send + Sync>;

/// Scripted executor: queued replies first, then the handler, then
/// transport errors.
#[derive(Default)]
pub struct MockExecutor {
    script: Mutex<VecDeque<HttpResult<HttpResponse>>>,
    handler: Mutex<Option<Handler>>,
    log: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl MockExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.push(Ok(HttpResponse::new(status, body)));
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

    pub fn requests(&self) -> Vec<(Instant, HttpRequest)> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn count_to(&self, uri_part: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.uri.contains(uri_part))
            .count()
    }
}

impl HttpExecutor for MockExecutor {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = HttpResult<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            let scripted = self.script.lock().unwrap().pop_front();
            let reply = match scripted {
                Some(reply) => reply,
                None => match self.handler.lock().unwrap().as_ref() {
                    Some(handler) => handler(&request),
                    None => Err(HttpError::Transport("connection refused".to_string())),
                },
            };
            self.log.lock().unwrap().push((Instant::now(), request));
            reply
        })
    }
}

/// Collects every event a listener receives.
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Recorder {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sink(&self) -> Arc<Mutex<Vec<T>>> {
        Arc::clone(&self.seen)
    }

    pub fn seen(&self) -> Vec<T> {
        self.seen.lock().unwrap().clone()
    }
}

/// Records `offline` for every mode change of `client`.
pub fn record_modes(client: &Client) -> Recorder<bool> {
    let recorder = Recorder::new();
    let sink = recorder.sink();
    client.on_mode_changed(move |event| sink.lock().unwrap().push(event.offline));
    recorder
}

/// A client over `executor`, quiet and isolated from other tests.
pub fn client(
    config: ClientConfig,
    executor: &Arc<MockExecutor>,
    store: Option<Arc<dyn Store>>,
    registry: &Arc<Registry>,
) -> Client {
    let mut builder = Client::builder(config)
        .executor(executor.clone())
        .registry(Arc::clone(registry))
        .log_sink(Arc::new(TracingSink));
    if let Some(store) = store {
        builder = builder.store(store);
    }
    builder.build().unwrap()
}
