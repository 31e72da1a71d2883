// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn listeners_run_in_registration_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let listeners: Listeners<ModeChanged> = Listeners::new();
    for id in 0..3 {
        let seen = Arc::clone(&seen);
        listeners.subscribe(move |event: &mut ModeChanged| {
            seen.lock().unwrap().push((id, event.offline));
        });
    }

    listeners.emit(&mut ModeChanged { offline: true });
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(0, true), (1, true), (2, true)]
    );
}

#[test]
fn listeners_can_cancel_deferral() {
    let listeners: Listeners<DeferringRequest> = Listeners::new();
    listeners.subscribe(|event: &mut DeferringRequest| event.cancel = true);

    let mut event = DeferringRequest {
        request_type: RequestType::DecommissionPack,
        request: DeferredRequest {
            timestamp: 1,
            verb: pt_core::Verb::Patch,
            uri: "https://api.example/v1/product/p/pack/s".to_string(),
            body: None,
            requested_state: None,
            is_manual: false,
            language: "en".to_string(),
            acknowledged: false,
        },
        reason: "offline".to_string(),
        cancel: false,
    };
    listeners.emit(&mut event);
    assert!(event.cancel);
}

#[test]
fn listener_may_subscribe_during_emit() {
    let listeners: Arc<Listeners<Statistics>> = Arc::new(Listeners::new());
    let inner = Arc::clone(&listeners);
    listeners.subscribe(move |_: &mut Statistics| inner.subscribe(|_: &mut Statistics| {}));

    listeners.emit(&mut Statistics::default());
    assert_eq!(listeners.len(), 2);
}

#[test]
fn empty_list_emits_nothing() {
    let listeners: Listeners<Statistics> = Listeners::new();
    assert!(listeners.is_empty());
    listeners.emit(&mut Statistics::default());
}
