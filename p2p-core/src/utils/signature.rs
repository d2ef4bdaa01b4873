//! Canonical request signing for the payment backend.
//!
//! The signing input is built from the *values* of the JSON payload only:
//! every leaf is rendered to a string, the request timestamp is added, the
//! list is sorted lexicographically and joined with `;`. The result is
//! authenticated with HMAC-SHA512 and hex-encoded.
//!
//! Because keys never enter the input, two payloads that differ only in key
//! order produce the same signature. Sorting is on strings, so `"10"` sorts
//! before `"9"`.

use hmac::{Hmac, Mac};
use serde_json::{Number, Value};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Separator between sorted leaf values in the signing input.
pub const SIGNING_SEPARATOR: &str = ";";

/// Collect the leaf values of `value` depth-first into `out`.
///
/// Objects and arrays are descended into; every scalar (string, number,
/// bool, null) becomes one entry.
pub fn flatten_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for child in map.values() {
                flatten_leaves(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                flatten_leaves(child, out);
            }
        }
        scalar => out.push(scalar_to_string(scalar)),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_to_string(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // flatten_leaves never hands containers here
        Value::Object(_) | Value::Array(_) => String::new(),
    }
}

/// Render a number the way a JavaScript backend stringifies it:
/// integral values carry no fractional part (`100.0` -> `"100"`).
pub fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
            format!("{}", f as i128)
        }
        Some(f) => format!("{}", f),
        None => n.to_string(),
    }
}

/// Build the exact string that gets signed for `payload` at `timestamp`.
pub fn signing_input(payload: &Value, timestamp: i64) -> String {
    let mut parts = Vec::new();
    flatten_leaves(payload, &mut parts);
    parts.push(timestamp.to_string());
    parts.sort();
    parts.join(SIGNING_SEPARATOR)
}

/// Generate the hex-encoded HMAC-SHA512 signature of `payload`.
pub fn generate_signature(
    secret: &str,
    payload: &Value,
    timestamp: i64,
) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    mac.update(signing_input(payload, timestamp).as_bytes());
    let result = mac.finalize();

    Ok(hex::encode(result.into_bytes()))
}

/// Verify a signature using constant-time comparison.
pub fn verify_signature(
    secret: &str,
    payload: &Value,
    timestamp: i64,
    signature: &str,
) -> Result<bool, anyhow::Error> {
    let expected_signature = generate_signature(secret, payload, timestamp)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}
