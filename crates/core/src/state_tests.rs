// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    active = { "Active", PackState::Active },
    lower = { "destroyed", PackState::Destroyed },
    free_sample = { "FreeSample", PackState::FreeSample },
    free_sample_snake = { "free_sample", PackState::FreeSample },
    checked_out = { "CheckedOut", PackState::CheckedOut },
    padded = { "  Supplied ", PackState::Supplied },
)]
fn parse_state(input: &str, expected: PackState) {
    assert_eq!(input.parse::<PackState>().unwrap(), expected);
}

#[test]
fn display_round_trips_through_parse() {
    let state = PackState::CheckedOut;
    assert_eq!(state.to_string().parse::<PackState>().unwrap(), state);
}

#[test]
fn malformed_state_is_an_error() {
    assert!(matches!(
        "Burnt".parse::<PackState>(),
        Err(Error::InvalidPackState(_))
    ));
}

#[test]
fn lenient_parse_degrades_to_none() {
    assert_eq!(PackState::parse_lenient(Some("Burnt")), None);
    assert_eq!(PackState::parse_lenient(None), None);
    assert_eq!(
        PackState::parse_lenient(Some("Stolen")),
        Some(PackState::Stolen)
    );
}

#[parameterized(
    supplied = { PackState::Supplied, true },
    destroyed = { PackState::Destroyed, true },
    locked = { PackState::Locked, true },
    active = { PackState::Active, false },
    expired = { PackState::Expired, false },
    recalled = { PackState::Recalled, false },
)]
fn decommission_states(state: PackState, expected: bool) {
    assert_eq!(state.is_decommission_state(), expected);
}

#[test]
fn serializes_as_pascal_case() {
    let json = serde_json::to_string(&PackState::FreeSample).unwrap();
    assert_eq!(json, "\"FreeSample\"");
}
