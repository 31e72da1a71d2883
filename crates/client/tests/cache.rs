// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;

use std::sync::Arc;

const DESTROYED: &str = r#"{"operationCode":0,"state":"Destroyed"}"#;

#[tokio::test(start_paused = true)]
async fn repeated_decommission_is_answered_from_cache_within_the_window() {
    let executor = MockExecutor::new();
    executor.handle(|_| Ok(HttpResponse::new(200, DESTROYED)));
    let mut config = config();
    config.repeated_request_window_secs = 60;
    let client = client(config, &executor, None, &Arc::new(Registry::new()));
    client.start().unwrap();

    let first = client
        .decommission(pack("SN1"), PackState::Destroyed)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    let second = client
        .decommission(pack("SN1"), PackState::Destroyed)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(executor.count(), 1);

    // the second read refreshed the entry; let it lapse
    tokio::time::sleep(Duration::from_secs(61)).await;
    client
        .decommission(pack("SN1"), PackState::Destroyed)
        .await
        .unwrap();
    assert_eq!(executor.count(), 2);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn detection_can_be_disabled() {
    let executor = MockExecutor::new();
    executor.handle(|_| Ok(HttpResponse::new(200, DESTROYED)));
    let mut config = config();
    config.detect_repeated_requests = false;
    let client = client(config, &executor, None, &Arc::new(Registry::new()));
    client.start().unwrap();

    for _ in 0..2 {
        client
            .decommission(pack("SN1"), PackState::Destroyed)
            .await
            .unwrap();
    }

    assert_eq!(executor.count(), 2);
    client.close().await;
}
