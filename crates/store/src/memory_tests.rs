// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::StoreError;
use pt_core::Verb;

fn request(store: &MemoryStore) -> DeferredRequest {
    DeferredRequest {
        timestamp: store.requests().current_timestamp().unwrap(),
        verb: Verb::Patch,
        uri: "https://example.test/product/05012345678900/pack/SN1".to_string(),
        body: Some(r#"{"state":"Destroyed"}"#.to_string()),
        requested_state: Some("Destroyed".to_string()),
        is_manual: false,
        language: "en".to_string(),
        acknowledged: false,
    }
}

#[test]
fn private_stores_have_distinct_names() {
    let a = MemoryStore::new();
    let b = MemoryStore::new();
    assert!(a.per_instance());
    assert_ne!(a.name(), b.name());
}

#[test]
fn shared_store_uses_registry_clock() {
    let registry = Registry::new();
    let a = MemoryStore::shared("pharmacy", &registry);
    let b = MemoryStore::shared("pharmacy", &registry);
    assert!(!a.per_instance());
    assert_eq!(a.name(), "pharmacy");

    // both draw from one sequence, so timestamps never collide
    let t1 = a.requests().current_timestamp().unwrap();
    let t2 = b.responses().current_timestamp().unwrap();
    let t3 = a.responses().current_timestamp().unwrap();
    assert!(t1 < t2 && t2 < t3);
}

#[test]
fn acknowledge_and_release() {
    let store = MemoryStore::new();
    let first = request(&store);
    let second = request(&store);
    let mut tx = store.requests().begin();
    tx.add(first.clone());
    tx.add(second.clone());
    tx.commit().unwrap();

    store.acknowledge_requests(&[first.clone()]).unwrap();
    let listed = store.requests().list().unwrap();
    assert!(listed[0].acknowledged);
    assert!(!listed[1].acknowledged);

    store.release_requests(&[first]).unwrap();
    assert!(store.requests().list().unwrap().iter().all(|r| !r.acknowledged));
}

#[test]
fn acknowledge_unknown_request_changes_nothing() {
    let store = MemoryStore::new();
    let known = request(&store);
    let mut tx = store.requests().begin();
    tx.add(known.clone());
    tx.commit().unwrap();

    let unknown = request(&store);
    let err = store
        .acknowledge_requests(&[known, unknown.clone()])
        .unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound(ts) if ts == unknown.timestamp));
    assert!(!store.requests().list().unwrap()[0].acknowledged);
}

#[test]
fn clients_sharing_a_store_stage_separately() {
    let registry = Registry::new();
    let store = MemoryStore::shared("pharmacy", &registry);

    let mut deferral = store.requests().begin();
    deferral.add(request(&store));

    // another client abandons its own batch in the meantime
    let mut other = store.requests().begin();
    other.add(request(&store));
    other.rollback().unwrap();

    deferral.commit().unwrap();
    assert_eq!(store.requests().list().unwrap().len(), 1);
}
