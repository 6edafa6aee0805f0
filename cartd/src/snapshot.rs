//! Snapshot codec.
//!
//! A snapshot is the JSON array of line item records stored under the cart
//! key. Decoding goes through [`CartState::normalize`], so whatever comes out
//! of the store satisfies the cart invariants.
//!
//! Records are read one at a time. A record that does not parse (blank id,
//! price outside the decimal range, wrong shape) is rejected on its own and
//! the rest of the cart survives. Only a payload that is not a JSON array
//! (or `null`) fails the whole decode.

use cart_domain::{CartState, LineItem, Normalized};
use serde_json::Value;
use tracing::warn;

use crate::error::{CartError, CartResult};

/// Serialize the full cart.
pub fn encode(state: &CartState) -> CartResult<String> {
    serde_json::to_string(state).map_err(|e| CartError::Snapshot(e.to_string()))
}

/// Parse a stored snapshot. A JSON `null` reads as an empty cart.
pub fn decode(raw: &str) -> CartResult<Normalized> {
    let values: Option<Vec<Value>> =
        serde_json::from_str(raw).map_err(|e| CartError::Snapshot(e.to_string()))?;

    let mut records = Vec::new();
    let mut rejected = 0;
    for (index, value) in values.unwrap_or_default().into_iter().enumerate() {
        match serde_json::from_value::<LineItem>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(index, error = %e, "Rejected unreadable snapshot record");
                rejected += 1;
            }
        }
    }

    Ok(Normalized {
        rejected,
        ..CartState::normalize(records)
    })
}
