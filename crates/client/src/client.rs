// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The client facade.
//!
//! Wires configuration, transport, tokens, store-and-forward and the
//! recovery coordinator together and exposes the public verbs. Every verb
//! returns a [`CallResult`]; `Err` only reports a deferral that could not
//! be persisted or a lifecycle mistake.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pt_core::{
    BulkRequest, CallResult, DeferredRequest, Pack, PackCommand, PackState,
    RecoveryRequest, RecoverySinglePackResponse, Registry, RequestType,
};
use pt_store::Store;

use crate::cache::BoundedCache;
use crate::config::ClientConfig;
use crate::deferral::StoreAndForward;
use crate::endpoints::Endpoints;
use crate::engine::{Engine, ResultCache};
use crate::error::{Error, Result};
use crate::events::{DeferringRequest, ModeChanged, Statistics};
use crate::http::{HttpExecutor, ReqwestExecutor};
use crate::log::{LogSink, TracingSink};
use crate::mode::ClientMode;
use crate::outbound::Outbound;
use crate::recovery::{self, Coordinator};
use crate::token::{OAuthTokenProvider, TokenManager, TokenProvider};

/// Used when no `[auth]` section names one.
const DEFAULT_RENEW_MARGIN: Duration = Duration::from_secs(60);

/// Builds a [`Client`], with optional replacements for its collaborators.
pub struct ClientBuilder {
    config: ClientConfig,
    executor: Option<Arc<dyn HttpExecutor>>,
    store: Option<Arc<dyn Store>>,
    registry: Option<Arc<Registry>>,
    log_sink: Option<Arc<dyn LogSink>>,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl ClientBuilder {
    pub fn executor(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// The store deferred requests are kept in. Without one nothing is
    /// persisted and no coordinator runs.
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Leadership registry; defaults to [`Registry::global`].
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Token source; defaults to OAuth when the configuration has `[auth]`.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<Client> {
        self.config.validate()?;
        let config = Arc::new(self.config);
        let endpoints = Endpoints::new(&config.base_url)?;

        let executor: Arc<dyn HttpExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(ReqwestExecutor::new(config.request_timeout())?),
        };
        let provider: Option<Arc<dyn TokenProvider>> = match (self.token_provider, &config.auth)
        {
            (Some(provider), _) => Some(provider),
            (None, Some(auth)) => Some(Arc::new(OAuthTokenProvider::new(
                auth.clone(),
                config.request_timeout(),
            )?)),
            (None, None) => None,
        };
        let renew_margin = config
            .auth
            .as_ref()
            .map(|auth| auth.renew_margin())
            .unwrap_or(DEFAULT_RENEW_MARGIN);
        let tokens = Arc::new(TokenManager::new(provider, renew_margin));
        let sink: Arc<dyn LogSink> = self.log_sink.unwrap_or_else(|| Arc::new(TracingSink));
        let registry = self.registry.unwrap_or_else(Registry::global);

        let mode = Arc::new(ClientMode::new());
        let forwarder = StoreAndForward::new(
            config.store_and_forward,
            config.bulk_as_single_packs,
            self.store.clone(),
            endpoints.clone(),
            Arc::clone(&mode),
            Arc::clone(&sink),
        );
        let cache = config.detect_repeated_requests.then(|| {
            Arc::new(BoundedCache::new(
                config.cache_max_size,
                config.repeated_request_window(),
            ))
        });
        let engine = Arc::new(Engine::new(
            Arc::clone(&config),
            executor,
            Arc::clone(&tokens),
            mode,
            forwarder,
            cache.clone(),
            sink,
        ));
        let coordinator = self.store.as_ref().map(|store| {
            Arc::new(Coordinator::new(
                Arc::clone(&engine),
                Arc::clone(store),
                registry,
                endpoints.clone(),
                Arc::clone(&config),
            ))
        });

        Ok(Client {
            config,
            endpoints,
            engine,
            tokens,
            cache,
            store: self.store,
            coordinator,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }
}

/// A resilient client for one remote track-and-trace system.
pub struct Client {
    config: Arc<ClientConfig>,
    endpoints: Endpoints,
    engine: Arc<Engine>,
    tokens: Arc<TokenManager>,
    cache: Option<Arc<ResultCache>>,
    store: Option<Arc<dyn Store>>,
    coordinator: Option<Arc<Coordinator>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Client {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            executor: None,
            store: None,
            registry: None,
            log_sink: None,
            token_provider: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts the background tasks. Must be called inside a tokio runtime.
    ///
    /// Calls made before `start` are refused with a "client not started"
    /// result.
    pub fn start(&self) -> Result<()> {
        if self.engine.is_started() || self.cancel.is_cancelled() {
            return Err(Error::AlreadyStarted);
        }
        self.engine.set_started(true);

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(coordinator) = &self.coordinator {
            tasks.push(coordinator.spawn(self.cancel.child_token()));
        }
        if let Some(cache) = &self.cache {
            tasks.extend(
                cache.spawn_sweeper(self.config.cache_sweep_interval(), self.cancel.child_token()),
            );
        }
        tasks.extend(self.tokens.spawn_renewal(self.cancel.child_token()));
        tracing::info!(
            base_url = %self.endpoints.base(),
            store_and_forward = %self.config.store_and_forward,
            tasks = tasks.len(),
            "client started"
        );
        Ok(())
    }

    /// Stops the background tasks and waits for them to finish.
    ///
    /// Drain leadership held by this client is released on the way out.
    pub async fn close(&self) {
        self.cancel.cancel();
        self.engine.set_started(false);
        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain(..).collect()
        };
        for task in tasks {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "background task ended abnormally");
            }
        }
        tracing::info!("client closed");
    }

    pub fn is_offline(&self) -> bool {
        self.engine.mode().is_offline()
    }

    pub async fn verify(&self, pack: Pack) -> Result<CallResult> {
        self.execute_command(RequestType::VerifyPack, &PackCommand::verify(pack), None)
            .await
    }

    pub async fn supply(&self, pack: Pack) -> Result<CallResult> {
        let command = PackCommand::transition(pack, PackState::Supplied);
        self.execute_command(RequestType::SupplyPack, &command, None)
            .await
    }

    /// Decommissions a pack into `state`, which must be a decommission state.
    pub async fn decommission(&self, pack: Pack, state: PackState) -> Result<CallResult> {
        let command = PackCommand::transition(pack, state);
        self.execute_command(RequestType::DecommissionPack, &command, None)
            .await
    }

    pub async fn reactivate(&self, pack: Pack) -> Result<CallResult> {
        let command = PackCommand::transition(pack, PackState::Active);
        self.execute_command(RequestType::ReactivatePack, &command, None)
            .await
    }

    /// Runs a single-pack command, with an optional language override.
    ///
    /// This is the form to use for manually entered packs.
    pub async fn execute_command(
        &self,
        request_type: RequestType,
        command: &PackCommand,
        language: Option<&str>,
    ) -> Result<CallResult> {
        let language = language.unwrap_or(&self.config.language);
        let outbound = Outbound::single(&self.endpoints, command, request_type, language);
        self.engine.execute(&outbound).await
    }

    pub async fn submit_bulk_request(&self, bulk: &BulkRequest) -> Result<CallResult> {
        let outbound = Outbound::bulk(
            &self.endpoints,
            bulk,
            self.config.max_bulk_pack_count,
            &self.config.language,
        )?;
        self.engine.execute(&outbound).await
    }

    /// Fetches bulk results from the location a submission returned.
    pub async fn get_bulk_result(&self, location: &str) -> Result<CallResult> {
        let outbound = Outbound::bulk_result(location, &self.config.language);
        self.engine.execute(&outbound).await
    }

    pub async fn submit_recovery_request(&self, recovery: &RecoveryRequest) -> Result<CallResult> {
        let outbound = Outbound::recovery(&self.endpoints, recovery, &self.config.language)?;
        self.engine.execute(&outbound).await
    }

    pub async fn get_recovery_result(&self, location: &str) -> Result<CallResult> {
        let outbound = Outbound::recovery_result(location, &self.config.language);
        self.engine.execute(&outbound).await
    }

    /// Subscribes to online/offline transitions.
    pub fn on_mode_changed(&self, listener: impl Fn(&mut ModeChanged) + Send + Sync + 'static) {
        self.engine.mode().listeners().subscribe(listener);
    }

    /// Subscribes to deferrals; setting `cancel` keeps the request out of
    /// the store.
    pub fn on_deferring_request(
        &self,
        listener: impl Fn(&mut DeferringRequest) + Send + Sync + 'static,
    ) {
        self.engine.forwarder().listeners().subscribe(listener);
    }

    /// Subscribes to the counters emitted every drain cycle. Without a
    /// store there is no drain cycle and the listener is never called.
    pub fn on_statistics(&self, listener: impl Fn(&mut Statistics) + Send + Sync + 'static) {
        match &self.coordinator {
            Some(coordinator) => coordinator.listeners().subscribe(listener),
            None => tracing::debug!("no store configured; statistics listener ignored"),
        }
    }

    /// Requests still waiting for recovery, oldest first.
    pub fn deferred_requests(&self) -> Result<Vec<DeferredRequest>> {
        match &self.store {
            Some(store) => Ok(store.requests().list()?),
            None => Ok(Vec::new()),
        }
    }

    /// Recovered results not yet collected, oldest first.
    pub fn recovery_responses(&self) -> Result<Vec<RecoverySinglePackResponse>> {
        match &self.store {
            Some(store) => Ok(store.responses().list()?),
            None => Ok(Vec::new()),
        }
    }

    /// Drops every deferred request. Returns how many were removed.
    pub fn clear_deferred_requests(&self) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let requests = store.requests().list()?;
        let mut tx = store.requests().begin();
        for request in &requests {
            tx.remove(request);
        }
        if let Err(err) = tx.commit() {
            tx.rollback()?;
            return Err(err.into());
        }
        tracing::warn!(count = requests.len(), "deferred requests cleared");
        Ok(requests.len())
    }

    /// Removes a recovered result once the application has processed it.
    pub fn remove_recovery_response(&self, response: &RecoverySinglePackResponse) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let mut tx = store.responses().begin();
        tx.remove(response);
        if let Err(err) = tx.commit() {
            tx.rollback()?;
            return Err(err.into());
        }
        Ok(())
    }

    /// Current pending and completed counts.
    pub fn statistics(&self) -> Result<Statistics> {
        match &self.store {
            Some(store) => recovery::statistics(store.as_ref()),
            None => Ok(Statistics::default()),
        }
    }

    /// True while this client's coordinator holds drain leadership.
    pub fn is_draining(&self) -> bool {
        self.coordinator
            .as_ref()
            .is_some_and(|coordinator| coordinator.is_leader())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
