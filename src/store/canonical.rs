//! Canonical serialization used by the store's equality gate.
//!
//! Records are encoded with keys sorted at every nesting level, so two records
//! holding the same entries in a different insertion order encode identically.
//! Array order is significant. Integral floats encode like integers (`1.0` and
//! `1` are the same number on the wire).

use std::fmt::Write;

use serde_json::Number;
use serde_json::Value;

use crate::Record;

/// Largest magnitude at which every integer is exactly representable as `f64`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

pub fn record_to_canonical_string(record: &Record) -> String {
    let mut out = String::new();
    write_record(record, &mut out);
    out
}

/// Structural, key-order independent equality of two records.
pub fn records_equal(
    a: &Record,
    b: &Record,
) -> bool {
    a.len() == b.len() && record_to_canonical_string(a) == record_to_canonical_string(b)
}

fn write_value(
    value: &Value,
    out: &mut String,
) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(record) => write_record(record, out),
    }
}

fn write_record(
    record: &Record,
    out: &mut String,
) {
    let mut keys: Vec<&String> = record.keys().collect();
    keys.sort_unstable();

    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(key, out);
        out.push(':');
        if let Some(value) = record.get(key) {
            write_value(value, out);
        }
    }
    out.push('}');
}

fn write_number(
    n: &Number,
    out: &mut String,
) {
    if !n.is_i64() && !n.is_u64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
                let _ = write!(out, "{}", f as i64);
                return;
            }
        }
    }
    let _ = write!(out, "{}", n);
}

fn write_string(
    s: &str,
    out: &mut String,
) {
    // Display of a JSON string value is its escaped, quoted form
    let _ = write!(out, "{}", Value::String(s.to_owned()));
}
