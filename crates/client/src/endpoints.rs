// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote endpoint URIs and request bodies.
//!
//! Single-pack calls address `{base}/product/{code}/pack/{serial}` with the
//! batch, expiry and scheme in the query string. Path segments are
//! form-encoded so that any GS1 character survives a round trip through a
//! stored URI.

use serde_json::json;
use url::{form_urlencoded, Url};

use pt_core::{Pack, PackState, ProductCodeScheme};

use crate::error::{Error, Result};

/// URI builder for one remote API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base_url '{base_url}': {e}")))?;
        Ok(Endpoints {
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn pack(&self, pack: &Pack) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("batch", &pack.batch)
            .append_pair("expiry", &pack.expiry)
            .append_pair("scheme", pack.scheme.as_str())
            .finish();
        format!(
            "{}/product/{}/pack/{}?{}",
            self.base,
            encode_segment(&pack.product_code),
            encode_segment(&pack.serial_number),
            query
        )
    }

    pub fn bulk(&self) -> String {
        format!("{}/bulk", self.base)
    }

    pub fn recovery(&self) -> String {
        format!("{}/recovery", self.base)
    }

    /// True if `uri` is this API's bulk submission endpoint.
    pub fn is_bulk(&self, uri: &str) -> bool {
        let uri = uri.split('?').next().unwrap_or(uri);
        uri.trim_end_matches('/') == self.bulk()
    }
}

/// Body of a single-pack state transition.
pub fn state_body(state: PackState) -> String {
    json!({ "state": state }).to_string()
}

/// Recovers the pack addressed by a single-pack URI.
///
/// Returns `None` for anything that is not a well-formed pack URI.
pub fn parse_pack_uri(uri: &str) -> Option<Pack> {
    let url = Url::parse(uri).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let n = segments.len();
    if n < 4 || segments[n - 4] != "product" || segments[n - 2] != "pack" {
        return None;
    }
    let product_code = decode_segment(segments[n - 3])?;
    let serial_number = decode_segment(segments[n - 1])?;

    let mut pack = Pack {
        product_code,
        serial_number,
        ..Pack::default()
    };
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "batch" => pack.batch = value.into_owned(),
            "expiry" => pack.expiry = value.into_owned(),
            "scheme" => pack.scheme = value.parse::<ProductCodeScheme>().ok()?,
            _ => {}
        }
    }
    Some(pack)
}

fn encode_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn decode_segment(segment: &str) -> Option<String> {
    // Encoded segments never contain '=' or '&', so the whole segment
    // decodes as a single key.
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
#[path = "endpoints_tests.rs"]
mod tests;
