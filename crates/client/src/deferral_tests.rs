// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::{decommission, pack, FlakyStore, RecordingSink, BASE};
use pt_core::{BulkRequest, PackState, RequestType};
use pt_store::MemoryStore;
use std::sync::atomic::Ordering;

struct Fixture {
    forwarder: StoreAndForward,
    client_mode: Arc<ClientMode>,
    sink: Arc<RecordingSink>,
}

fn fixture(mode: StoreAndForwardMode, store: Option<Arc<dyn Store>>, explode: bool) -> Fixture {
    let client_mode = Arc::new(ClientMode::new());
    let sink = RecordingSink::new();
    let forwarder = StoreAndForward::new(
        mode,
        explode,
        store,
        Endpoints::new(BASE).unwrap(),
        Arc::clone(&client_mode),
        sink.clone(),
    );
    Fixture {
        forwarder,
        client_mode,
        sink,
    }
}

fn endpoints() -> Endpoints {
    Endpoints::new(BASE).unwrap()
}

fn decommission_call() -> Outbound {
    Outbound::single(
        &endpoints(),
        &decommission("SN1"),
        RequestType::DecommissionPack,
        "en",
    )
}

fn defer(fixture: &Fixture, outbound: &Outbound) -> (DeferralState, Result<()>) {
    let mut state = DeferralState::NotRaised;
    let result = fixture
        .forwarder
        .defer(&mut state, outbound, Uuid::new_v4(), "connection refused");
    (state, result)
}

#[test]
fn automatic_mode_persists_one_request() {
    let store = Arc::new(MemoryStore::new());
    let fixture = fixture(StoreAndForwardMode::Automatic, Some(store.clone()), false);

    let (state, result) = defer(&fixture, &decommission_call());
    result.unwrap();

    assert_eq!(state, DeferralState::Persisted(1));
    assert!(fixture.client_mode.is_offline());
    let stored = store.requests().list().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].verb, Verb::Patch);
    assert_eq!(stored[0].requested_pack_state(), Some(PackState::Destroyed));
    assert!(!stored[0].acknowledged);
}

#[test]
fn non_deferrable_types_only_go_offline() {
    for request_type in [
        RequestType::GetBulkResult,
        RequestType::SubmitRecoveryRequest,
        RequestType::GetRecoveryResult,
    ] {
        let store = Arc::new(MemoryStore::new());
        let fixture = fixture(StoreAndForwardMode::Automatic, Some(store.clone()), false);
        let mut outbound = decommission_call();
        outbound.request_type = request_type;

        let (state, result) = defer(&fixture, &outbound);
        result.unwrap();

        assert_eq!(state, DeferralState::Skipped, "{request_type}");
        assert!(fixture.client_mode.is_offline());
        assert!(store.requests().list().unwrap().is_empty());
    }
}

#[test]
fn mode_none_skips_persistence() {
    let store = Arc::new(MemoryStore::new());
    let fixture = fixture(StoreAndForwardMode::None, Some(store.clone()), false);

    let (state, _) = defer(&fixture, &decommission_call());

    assert_eq!(state, DeferralState::Skipped);
    assert!(fixture.client_mode.is_offline());
    assert!(store.requests().list().unwrap().is_empty());
}

#[test]
fn listener_can_cancel() {
    let store = Arc::new(MemoryStore::new());
    let fixture = fixture(StoreAndForwardMode::Automatic, Some(store.clone()), false);
    fixture.forwarder.listeners().subscribe(|event| {
        assert_eq!(event.request_type, RequestType::DecommissionPack);
        event.cancel = true;
    });

    let (state, _) = defer(&fixture, &decommission_call());

    assert_eq!(state, DeferralState::Cancelled);
    assert!(store.requests().list().unwrap().is_empty());
}

#[test]
fn manual_mode_delegates_to_listeners() {
    let store = Arc::new(MemoryStore::new());
    let fixture = fixture(StoreAndForwardMode::Manual, Some(store.clone()), false);
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let captured = Arc::clone(&seen);
    fixture.forwarder.listeners().subscribe(move |event| {
        captured.lock().unwrap().push(event.request.clone());
    });

    let (state, _) = defer(&fixture, &decommission_call());

    assert_eq!(state, DeferralState::Delegated);
    assert!(state.is_deferred());
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(store.requests().list().unwrap().is_empty());
}

#[test]
fn deferral_happens_at_most_once_per_call() {
    let store = Arc::new(MemoryStore::new());
    let fixture = fixture(StoreAndForwardMode::Automatic, Some(store.clone()), false);
    let outbound = decommission_call();
    let mut state = DeferralState::NotRaised;

    for _ in 0..3 {
        fixture
            .forwarder
            .defer(&mut state, &outbound, Uuid::new_v4(), "timeout")
            .unwrap();
    }

    assert_eq!(state, DeferralState::Persisted(1));
    assert_eq!(store.requests().list().unwrap().len(), 1);
}

#[test]
fn bulk_is_exploded_into_single_packs() {
    let store = Arc::new(MemoryStore::new());
    let fixture = fixture(StoreAndForwardMode::Automatic, Some(store.clone()), true);
    let bulk = BulkRequest::transition(
        vec![pack("SN1"), pack("SN2"), pack("SN3")],
        PackState::Supplied,
    );
    let outbound = Outbound::bulk(&endpoints(), &bulk, 100, "en").unwrap();

    let (state, result) = defer(&fixture, &outbound);
    result.unwrap();

    assert_eq!(state, DeferralState::Persisted(3));
    let stored = store.requests().list().unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert!(stored.iter().all(|r| r.verb == Verb::Patch && !endpoints().is_bulk(&r.uri)));
    assert_eq!(stored[2].uri, endpoints().pack(&pack("SN3")));
}

#[test]
fn bulk_is_kept_whole_by_default() {
    let store = Arc::new(MemoryStore::new());
    let fixture = fixture(StoreAndForwardMode::Automatic, Some(store.clone()), false);
    let bulk = BulkRequest::verify(vec![pack("SN1"), pack("SN2")]);
    let outbound = Outbound::bulk(&endpoints(), &bulk, 100, "en").unwrap();

    let (state, _) = defer(&fixture, &outbound);

    assert_eq!(state, DeferralState::Persisted(1));
    let stored = store.requests().list().unwrap();
    assert!(endpoints().is_bulk(&stored[0].uri));
}

#[test]
fn failed_commit_is_rolled_back() {
    let store = FlakyStore::new();
    store.requests.fail_commit.store(true, Ordering::SeqCst);
    let fixture = fixture(StoreAndForwardMode::Automatic, Some(store.clone()), false);

    let (_, result) = defer(&fixture, &decommission_call());

    assert!(matches!(result, Err(Error::DeferralFailed(_))));
    assert!(store.requests().list().unwrap().is_empty());
    assert_eq!(
        fixture.sink.count(LogCategory::Deferral, LogSeverity::Critical),
        0
    );
}

#[test]
fn failed_rollback_is_an_interchange_failure() {
    let store = FlakyStore::new();
    store.requests.fail_commit.store(true, Ordering::SeqCst);
    store.requests.fail_rollback.store(true, Ordering::SeqCst);
    let fixture = fixture(StoreAndForwardMode::Automatic, Some(store.clone()), false);

    let (_, result) = defer(&fixture, &decommission_call());

    assert!(matches!(result, Err(Error::Interchange(_))));
    assert_eq!(
        fixture
            .sink
            .count(LogCategory::Deferral, LogSeverity::Critical),
        1
    );
}

#[test]
fn missing_store_skips_with_an_error_entry() {
    let fixture = fixture(StoreAndForwardMode::Automatic, None, false);

    let (state, result) = defer(&fixture, &decommission_call());
    result.unwrap();

    assert_eq!(state, DeferralState::Skipped);
    assert_eq!(fixture.sink.count(LogCategory::Deferral, LogSeverity::Error), 1);
}

#[test]
fn short_circuit_needs_a_store() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    for mode in [
        StoreAndForwardMode::Automatic,
        StoreAndForwardMode::Manual,
        StoreAndForwardMode::None,
    ] {
        assert!(fixture(mode, Some(Arc::clone(&store)), false)
            .forwarder
            .short_circuits());
        assert!(!fixture(mode, None, false).forwarder.short_circuits());
    }
}
