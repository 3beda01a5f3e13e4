//! Fixed-width integer reinterpretation and host-side number formatting.
//!
//! The engine hands every guest integer to the host as a signed value, even
//! when the guest means it as unsigned. These routines reinterpret the exact
//! bit pattern at a fixed width; they never negate or widen arithmetically.

/// Reinterpret a 32-bit value's bits as unsigned (`-1` → `4294967295`).
pub fn as_unsigned_32(value: i32) -> u32 {
    value as u32
}

/// Reinterpret a 32-bit unsigned bit pattern as two's-complement signed.
pub fn as_signed_32(bits: u32) -> i32 {
    bits as i32
}

/// Reinterpret a 64-bit value's bits as unsigned (`-1` → `18446744073709551615`).
pub fn as_unsigned_64(value: i64) -> u64 {
    value as u64
}

/// Reinterpret a 64-bit unsigned bit pattern as two's-complement signed.
pub fn as_signed_64(bits: u64) -> i64 {
    bits as i64
}

const EXPONENT_BELOW: f64 = 1e-7;
const EXPONENT_FROM: f64 = 1e21;

/// Format a double the way the host console prints numbers.
///
/// Finite values use the shortest digits that round-trip, so `0.1` prints as
/// `0.1` and integral values print without a fraction. Magnitudes of `1e21`
/// and above, or below `1e-7`, switch to exponent form (`1e+21`, `5e-324`).
/// Non-finite values are spelled `NaN`, `Infinity` and `-Infinity`; negative
/// zero keeps its sign.
pub fn format_f64(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if value != 0.0 && !(EXPONENT_BELOW..EXPONENT_FROM).contains(&value.abs()) {
        let formatted = format!("{value:e}");
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        }
    } else {
        value.to_string()
    }
}

/// Format a single-precision value at its native precision.
///
/// The value is widened losslessly to `f64` first, so the digits show what a
/// single can actually hold: `3.14f32` prints as `3.140000104904175`.
pub fn format_f32(value: f32) -> String {
    format_f64(f64::from(value))
}
