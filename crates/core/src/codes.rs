// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operation codes carried by every result.
//!
//! Zero is success. Codes below 9000 are local validation rejections;
//! codes from 9000 are synthesized by the client when the remote system
//! did not produce an authoritative answer. Remote codes pass through
//! unchanged.

pub const SUCCESS: i32 = 0;

pub const INVALID_PRODUCT_CODE: i32 = 1001;
pub const INVALID_SCHEME: i32 = 1002;
pub const INVALID_SERIAL_NUMBER: i32 = 1003;
pub const INVALID_BATCH: i32 = 1004;
pub const INVALID_EXPIRY: i32 = 1005;
pub const INVALID_REQUESTED_STATE: i32 = 1006;
pub const EMPTY_BULK: i32 = 1007;
pub const BULK_TOO_LARGE: i32 = 1008;
pub const MISSING_LOCATION: i32 = 1009;

pub const CLIENT_NOT_STARTED: i32 = 9001;
pub const OFFLINE: i32 = 9002;
pub const SERVICE_UNAVAILABLE: i32 = 9003;
pub const UNAUTHORIZED: i32 = 9004;
pub const UNKNOWN_FAILURE: i32 = 9005;
pub const REMOTE_REJECTION: i32 = 9006;
pub const UNRECOVERABLE_STATUS: i32 = 9007;
pub const UNCONVERTIBLE_DEFERRED_REQUEST: i32 = 9008;

