//! Shared rounding helpers for values that end up in JSON responses.
//!
//! Rounding goes through `Decimal` so that e.g. `5.39957` becomes exactly
//! `5.4` rather than the nearest binary float to a scaled-and-divided value.
//! Non-finite inputs pass through unchanged.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Round an f64 to `dp` decimal places.
pub(crate) fn round_dp(v: f64, dp: u32) -> f64 {
    if !v.is_finite() {
        return v;
    }
    Decimal::from_f64(v)
        .map(|d| d.round_dp(dp))
        .and_then(|d| d.to_f64())
        .unwrap_or(v)
}

/// Round an optional f64, returning None if input is None.
pub(crate) fn opt_round_dp(v: Option<f64>, dp: u32) -> Option<f64> {
    v.map(|x| round_dp(x, dp))
}
