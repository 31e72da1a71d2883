// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;

use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn at_most_one_client_drains_a_shared_store() {
    let registry = Arc::new(Registry::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::shared("site-a", &registry));
    let clients: Vec<Client> = (0..3)
        .map(|_| client(config(), &MockExecutor::new(), Some(Arc::clone(&store)), &registry))
        .collect();
    for client in &clients {
        client.start().unwrap();
    }

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(700)).await;
        let leaders = clients.iter().filter(|c| c.is_draining()).count();
        assert_eq!(leaders, 1);
        assert!(registry.is_draining("site-a"));
    }

    let leader = clients.iter().position(|c| c.is_draining()).unwrap();
    clients[leader].close().await;
    assert!(!registry.is_draining("site-a"));

    tokio::time::sleep(Duration::from_secs(2)).await;
    let leaders: Vec<usize> = (0..clients.len())
        .filter(|&i| clients[i].is_draining())
        .collect();
    assert_eq!(leaders.len(), 1);
    assert_ne!(leaders[0], leader);

    for client in &clients {
        client.close().await;
    }
    assert!(!registry.is_draining("site-a"));
}

#[tokio::test(start_paused = true)]
async fn separate_stores_have_separate_leaders() {
    let registry = Arc::new(Registry::new());
    let a: Arc<dyn Store> = Arc::new(MemoryStore::shared("site-a", &registry));
    let b: Arc<dyn Store> = Arc::new(MemoryStore::shared("site-b", &registry));
    let first = client(config(), &MockExecutor::new(), Some(a), &registry);
    let second = client(config(), &MockExecutor::new(), Some(b), &registry);
    first.start().unwrap();
    second.start().unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(first.is_draining());
    assert!(second.is_draining());
    first.close().await;
    second.close().await;
}
