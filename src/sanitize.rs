//! Numeric sanitization applied to every value before it leaves the core.
//!
//! The transport layer cannot represent NaN or infinity, so non-finite
//! results become explicit absent values. Integer fields instead default to
//! zero; report consumers rely on that asymmetry.

/// Coerces an optional float into a transport-safe value.
///
/// Absent input stays absent; NaN and ±infinity become absent; finite values
/// pass through at full precision.
pub fn safe_float(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Coerces an optional float into an integer field, defaulting to zero.
///
/// Absent and non-finite inputs become 0 rather than absent. Finite values
/// truncate toward zero.
pub fn safe_int(value: Option<f64>) -> i64 {
    match value {
        Some(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    }
}
