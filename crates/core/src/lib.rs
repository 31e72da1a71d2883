// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pt-core: Shared library for the packtrace client.
//!
//! This crate provides the pack data model, request and result records,
//! local validation, and the process-wide primitives (monotonic sequence
//! clock, drain registry) used by both the store implementations and the
//! client.

pub mod bulk;
pub mod codes;
pub mod error;
pub mod pack;
pub mod registry;
pub mod request;
pub mod result;
pub mod sequence;
pub mod state;
pub mod validate;

pub use bulk::{BulkRequest, PackOutcome, RecoveryRequest};
pub use error::{Error, Result};
pub use pack::{Pack, PackCommand, ProductCodeScheme};
pub use registry::Registry;
pub use request::{DeferredRequest, RecoverySinglePackResponse, RequestType, Verb};
pub use result::{CallResult, PackResult, Severity};
pub use sequence::{ClockSource, SequenceClock, SystemClock};
pub use state::PackState;
pub use validate::{validate_bulk, validate_command, validate_pack, Validation};
