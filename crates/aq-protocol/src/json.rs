//! Serde helpers for JSON encoding quirks.
//!
//! The dataset carries NaN for missing measurements; `serde_json` refuses
//! to encode non-finite floats. These helpers turn NaN and infinities into
//! JSON `null` at the field level so responses never fail to serialize.

use serde::Serializer;

/// Serialize an `f64`, mapping NaN and infinities to `null`.
pub fn nullable_float<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

/// Serialize an `Option<f64>`, mapping `None`, NaN and infinities to `null`.
pub fn nullable_opt_float<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) if v.is_finite() => serializer.serialize_f64(*v),
        _ => serializer.serialize_none(),
    }
}
