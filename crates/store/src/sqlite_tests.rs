// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use pt_core::{Pack, PackResult, PackState, Severity, Verb};
use tempfile::TempDir;

fn request(timestamp: i64) -> DeferredRequest {
    DeferredRequest {
        timestamp,
        verb: Verb::Patch,
        uri: "https://example.test/product/05012345678900/pack/SN1?batch=B1".to_string(),
        body: Some(r#"{"state":"Destroyed"}"#.to_string()),
        requested_state: Some("Destroyed".to_string()),
        is_manual: true,
        language: "en".to_string(),
        acknowledged: false,
    }
}

fn response(timestamp: i64) -> RecoverySinglePackResponse {
    RecoverySinglePackResponse {
        timestamp,
        requested_state: Some(PackState::Destroyed),
        is_manual: false,
        pack: Pack::new("05012345678900", "SN1", "B1", "261231"),
        result: PackResult {
            state: Some(PackState::Destroyed),
            ..PackResult::default()
        },
        severity: Severity::Success,
    }
}

#[test]
fn add_commit_and_list() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut tx = store.requests().begin();
    tx.add(request(2));
    tx.add(request(1));
    assert!(store.requests().list().unwrap().is_empty());

    tx.commit().unwrap();
    let listed = store.requests().list().unwrap();
    assert_eq!(listed, vec![request(1), request(2)]);
}

#[test]
fn tables_are_independent() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut requests = store.requests().begin();
    requests.add(request(1));
    let mut responses = store.responses().begin();
    responses.add(response(1));
    responses.commit().unwrap();

    assert!(store.requests().list().unwrap().is_empty());
    assert_eq!(store.responses().list().unwrap(), vec![response(1)]);
    requests.rollback().unwrap();
}

#[test]
fn failed_commit_writes_nothing() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut tx = store.requests().begin();
    tx.add(request(1));
    tx.commit().unwrap();

    tx.add(request(2));
    tx.add(request(1));
    assert!(matches!(
        tx.commit().unwrap_err(),
        StoreError::DuplicateTimestamp(1)
    ));
    tx.rollback().unwrap();

    assert_eq!(store.requests().list().unwrap(), vec![request(1)]);
}

#[test]
fn remove_missing_record_fails() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut tx = store.responses().begin();
    tx.remove(&response(4));
    assert!(matches!(
        tx.commit().unwrap_err(),
        StoreError::RecordNotFound(4)
    ));
}

#[test]
fn interleaved_transactions_keep_their_own_changes() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut first = store.requests().begin();
    let mut second = store.requests().begin();
    first.add(request(1));
    second.add(request(2));
    second.rollback().unwrap();
    first.commit().unwrap();

    assert_eq!(store.requests().list().unwrap(), vec![request(1)]);
}

#[test]
fn acknowledge_and_release_round_trip() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut tx = store.requests().begin();
    tx.add(request(1));
    tx.add(request(2));
    tx.commit().unwrap();

    store.acknowledge_requests(&[request(2)]).unwrap();
    let flags: Vec<bool> = store
        .requests()
        .list()
        .unwrap()
        .iter()
        .map(|r| r.acknowledged)
        .collect();
    assert_eq!(flags, vec![false, true]);

    store.release_requests(&[request(2)]).unwrap();
    assert!(store.requests().list().unwrap().iter().all(|r| !r.acknowledged));
}

#[test]
fn acknowledge_is_atomic() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut tx = store.requests().begin();
    tx.add(request(1));
    tx.commit().unwrap();

    let err = store
        .acknowledge_requests(&[request(1), request(9)])
        .unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound(9)));
    assert!(!store.requests().list().unwrap()[0].acknowledged);
}

#[test]
fn reopen_keeps_records_and_resumes_clock() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("store.db");
    let far_future = i64::MAX / 2;

    {
        let registry = Registry::new();
        let store = SqliteStore::open(&path, "pharmacy", &registry).unwrap();
        assert!(!store.per_instance());
        let mut tx = store.requests().begin();
        tx.add(request(far_future));
        tx.commit().unwrap();
    }

    let registry = Registry::new();
    let store = SqliteStore::open(&path, "pharmacy", &registry).unwrap();
    assert_eq!(store.requests().list().unwrap().len(), 1);
    assert!(store.requests().current_timestamp().unwrap() > far_future);
}

#[test]
fn in_memory_store_is_per_instance() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert!(store.per_instance());
}
