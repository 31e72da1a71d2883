// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pack identifiers and pack commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::state::PackState;

/// Coding scheme of a product code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCodeScheme {
    /// GS1 Global Trade Item Number (14 digits).
    #[default]
    Gtin,
    /// IFA Pharmacy Product Number (12 characters).
    Ppn,
}

impl ProductCodeScheme {
    /// Returns the string representation used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCodeScheme::Gtin => "gtin",
            ProductCodeScheme::Ppn => "ppn",
        }
    }
}

impl fmt::Display for ProductCodeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProductCodeScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gtin" => Ok(ProductCodeScheme::Gtin),
            "ppn" => Ok(ProductCodeScheme::Ppn),
            _ => Err(Error::InvalidScheme(s.to_string())),
        }
    }
}

/// A uniquely identified unit of product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub product_code: String,
    #[serde(default)]
    pub scheme: ProductCodeScheme,
    pub serial_number: String,
    pub batch: String,
    /// Expiry date as `YYMMDD`; `DD` may be `00` for end of month.
    pub expiry: String,
}

impl Pack {
    /// Creates a GTIN-coded pack.
    pub fn new(
        product_code: impl Into<String>,
        serial_number: impl Into<String>,
        batch: impl Into<String>,
        expiry: impl Into<String>,
    ) -> Self {
        Pack {
            product_code: product_code.into(),
            scheme: ProductCodeScheme::Gtin,
            serial_number: serial_number.into(),
            batch: batch.into(),
            expiry: expiry.into(),
        }
    }

    /// Returns the same pack with a different product code scheme.
    pub fn with_scheme(mut self, scheme: ProductCodeScheme) -> Self {
        self.scheme = scheme;
        self
    }
}

impl fmt::Display for Pack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} (batch {}, expiry {})",
            self.product_code, self.serial_number, self.batch, self.expiry
        )
    }
}

/// A pack together with the transition requested for it.
///
/// This is the unit carried in recovery batches: a deferred request is
/// converted back into a `PackCommand` before being resubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackCommand {
    pub pack: Pack,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_state: Option<PackState>,
    #[serde(default)]
    pub is_manual: bool,
}

impl PackCommand {
    /// Creates a command with no requested transition (a verification).
    pub fn verify(pack: Pack) -> Self {
        PackCommand {
            pack,
            requested_state: None,
            is_manual: false,
        }
    }

    /// Creates a command requesting a transition into `state`.
    pub fn transition(pack: Pack, state: PackState) -> Self {
        PackCommand {
            pack,
            requested_state: Some(state),
            is_manual: false,
        }
    }

    /// Marks the command as manually entered rather than scanned.
    pub fn manual(mut self, is_manual: bool) -> Self {
        self.is_manual = is_manual;
        self
    }
}
