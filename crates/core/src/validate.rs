// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local pre-flight validation of packs and bulk payloads.
//!
//! A non-zero operation code is an authoritative rejection: the call is
//! never sent and never deferred.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use crate::bulk::BulkRequest;
use crate::codes;
use crate::pack::{Pack, PackCommand, ProductCodeScheme};
use crate::request::RequestType;
use crate::state::PackState;

// GS1 application identifier 82 character set, 1 to 20 characters.
static GS1_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(
        || match Regex::new(r#"^[!"%&'()*+,\-./0-9:;<=>?A-Z_a-z]{1,20}$"#) {
            Ok(re) => re,
            Err(_) => unreachable!("static regex pattern"),
        },
    );
static GTIN_RE: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"^[0-9]{14}$") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});
static PPN_RE: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"^11[0-9A-Z]{8}[0-9]{2}$") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});
static EXPIRY_RE: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"^[0-9]{6}$") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});

/// Outcome of a local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub operation_code: i32,
    pub warning: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Validation {
            operation_code: codes::SUCCESS,
            warning: None,
        }
    }

    pub fn reject(operation_code: i32, warning: impl Into<String>) -> Self {
        Validation {
            operation_code,
            warning: Some(warning.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.operation_code == codes::SUCCESS
    }
}

/// Validates the identifying fields of a pack.
pub fn validate_pack(pack: &Pack) -> Validation {
    let product_ok = match pack.scheme {
        ProductCodeScheme::Gtin => is_valid_gtin(&pack.product_code),
        ProductCodeScheme::Ppn => is_valid_ppn(&pack.product_code),
    };
    if !product_ok {
        return Validation::reject(
            codes::INVALID_PRODUCT_CODE,
            format!(
                "invalid {} product code '{}'",
                pack.scheme, pack.product_code
            ),
        );
    }
    if !GS1_TEXT_RE.is_match(&pack.serial_number) {
        return Validation::reject(
            codes::INVALID_SERIAL_NUMBER,
            format!("invalid serial number '{}'", pack.serial_number),
        );
    }
    if !GS1_TEXT_RE.is_match(&pack.batch) {
        return Validation::reject(
            codes::INVALID_BATCH,
            format!("invalid batch '{}'", pack.batch),
        );
    }
    if !is_valid_expiry(&pack.expiry) {
        return Validation::reject(
            codes::INVALID_EXPIRY,
            format!("invalid expiry '{}': expected YYMMDD", pack.expiry),
        );
    }
    Validation::ok()
}

/// Validates a single-pack command for the given request type.
pub fn validate_command(command: &PackCommand, request_type: RequestType) -> Validation {
    let validation = validate_pack(&command.pack);
    if !validation.is_ok() {
        return validation;
    }

    let state_ok = match request_type {
        RequestType::SupplyPack => command.requested_state == Some(PackState::Supplied),
        RequestType::DecommissionPack => command
            .requested_state
            .is_some_and(|s| s.is_decommission_state()),
        RequestType::ReactivatePack => command.requested_state == Some(PackState::Active),
        _ => true,
    };
    if !state_ok {
        let requested = command
            .requested_state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        return Validation::reject(
            codes::INVALID_REQUESTED_STATE,
            format!("state '{requested}' is not valid for {request_type}"),
        );
    }
    Validation::ok()
}

/// Validates a bulk payload against the configured maximum size.
pub fn validate_bulk(bulk: &BulkRequest, max_packs: usize) -> Validation {
    if bulk.packs.is_empty() {
        return Validation::reject(codes::EMPTY_BULK, "bulk request contains no packs");
    }
    if bulk.packs.len() > max_packs {
        return Validation::reject(
            codes::BULK_TOO_LARGE,
            format!(
                "bulk request contains {} packs, max {}",
                bulk.packs.len(),
                max_packs
            ),
        );
    }
    if let Some(state) = bulk.requested_state {
        if !state.is_decommission_state() && state != PackState::Active {
            return Validation::reject(
                codes::INVALID_REQUESTED_STATE,
                format!("state '{state}' cannot be requested in bulk"),
            );
        }
    }
    for (index, pack) in bulk.packs.iter().enumerate() {
        let validation = validate_pack(pack);
        if !validation.is_ok() {
            let warning = validation.warning.unwrap_or_default();
            return Validation::reject(
                validation.operation_code,
                format!("pack {index}: {warning}"),
            );
        }
    }
    Validation::ok()
}

/// GTIN-14 with a GS1 mod-10 check digit.
fn is_valid_gtin(code: &str) -> bool {
    if !GTIN_RE.is_match(code) {
        return false;
    }
    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    let (body, check) = digits.split_at(13);
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();
    (10 - sum % 10) % 10 == check[0]
}

/// PPN: `11` prefix, eight product characters, two mod-97 check digits
/// computed over the ASCII codes with weights starting at 2.
fn is_valid_ppn(code: &str) -> bool {
    if !PPN_RE.is_match(code) {
        return false;
    }
    let (body, check) = code.split_at(10);
    let sum: u32 = body
        .bytes()
        .zip(2u32..)
        .map(|(b, weight)| u32::from(b) * weight)
        .sum();
    check.parse::<u32>().is_ok_and(|c| c == sum % 97)
}

/// `YYMMDD`; a day of `00` means the end of the month.
fn is_valid_expiry(expiry: &str) -> bool {
    if !EXPIRY_RE.is_match(expiry) {
        return false;
    }
    let field = |range: std::ops::Range<usize>| expiry[range].parse::<u32>().ok();
    let (Some(year), Some(month), Some(day)) = (field(0..2), field(2..4), field(4..6)) else {
        return false;
    };
    // CORRECTNESS: two-digit year fits in i32
    #[allow(clippy::cast_possible_wrap)]
    let year = 2000 + year as i32;
    if day == 0 {
        return (1..=12).contains(&month);
    }
    NaiveDate::from_ymd_opt(year, month, day).is_some()
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
