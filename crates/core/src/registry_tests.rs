// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn first_claim_wins() {
    let registry = Registry::new();

    assert!(registry.try_acquire("shared"));
    assert!(!registry.try_acquire("shared"));
    assert!(registry.is_draining("shared"));
}

#[test]
fn release_allows_a_new_leader() {
    let registry = Registry::new();

    assert!(registry.try_acquire("shared"));
    registry.release("shared");
    assert!(!registry.is_draining("shared"));
    assert!(registry.try_acquire("shared"));
}

#[test]
fn store_names_are_independent() {
    let registry = Registry::new();

    assert!(registry.try_acquire("a"));
    assert!(registry.try_acquire("b"));
}

#[test]
fn at_most_one_thread_acquires() {
    let registry = Arc::new(Registry::new());
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let winners = Arc::clone(&winners);
            std::thread::spawn(move || {
                if registry.try_acquire("contended") {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
}

#[test]
fn clocks_are_shared_per_store() {
    let registry = Registry::new();

    let a = registry.clock("s");
    let b = registry.clock("s");
    let first = a.next();
    let second = b.next();

    assert!(second > first);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn global_registry_is_a_singleton() {
    assert!(Arc::ptr_eq(&Registry::global(), &Registry::global()));
}
