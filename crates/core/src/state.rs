// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pack states tracked by the remote authority.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lifecycle state of a pack.
///
/// The wire and storage form is the PascalCase variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackState {
    /// Available for supply.
    Active,
    /// Dispensed to a patient.
    Supplied,
    /// Destroyed.
    Destroyed,
    /// Exported outside the market.
    Exported,
    /// Reported stolen.
    Stolen,
    /// Taken as a sample by an authority.
    Sample,
    /// Handed out as a free sample.
    FreeSample,
    /// Locked pending investigation.
    Locked,
    /// Checked out for later supply.
    CheckedOut,
    /// Past its expiry date.
    Expired,
    /// Batch recalled by the manufacturer.
    Recalled,
    /// Product withdrawn from the market.
    Withdrawn,
}

impl PackState {
    /// Returns the string representation used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PackState::Active => "Active",
            PackState::Supplied => "Supplied",
            PackState::Destroyed => "Destroyed",
            PackState::Exported => "Exported",
            PackState::Stolen => "Stolen",
            PackState::Sample => "Sample",
            PackState::FreeSample => "FreeSample",
            PackState::Locked => "Locked",
            PackState::CheckedOut => "CheckedOut",
            PackState::Expired => "Expired",
            PackState::Recalled => "Recalled",
            PackState::Withdrawn => "Withdrawn",
        }
    }

    /// Returns true if a client may request a transition into this state
    /// when decommissioning a pack.
    pub fn is_decommission_state(&self) -> bool {
        matches!(
            self,
            PackState::Supplied
                | PackState::Destroyed
                | PackState::Exported
                | PackState::Stolen
                | PackState::Sample
                | PackState::FreeSample
                | PackState::Locked
                | PackState::CheckedOut
        )
    }

    /// Parses an optional stored state, degrading malformed text to `None`.
    pub fn parse_lenient(value: Option<&str>) -> Option<PackState> {
        value.and_then(|s| s.parse().ok())
    }
}

impl fmt::Display for PackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PackState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(PackState::Active),
            "supplied" => Ok(PackState::Supplied),
            "destroyed" => Ok(PackState::Destroyed),
            "exported" => Ok(PackState::Exported),
            "stolen" => Ok(PackState::Stolen),
            "sample" => Ok(PackState::Sample),
            "freesample" | "free_sample" => Ok(PackState::FreeSample),
            "locked" => Ok(PackState::Locked),
            "checkedout" | "checked_out" => Ok(PackState::CheckedOut),
            "expired" => Ok(PackState::Expired),
            "recalled" => Ok(PackState::Recalled),
            "withdrawn" => Ok(PackState::Withdrawn),
            _ => Err(Error::InvalidPackState(s.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
