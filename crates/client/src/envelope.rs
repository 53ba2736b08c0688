//! The `{ "result": <number>, "data": <any> }` response wrapper.
//!
//! `result == -1` (in any numeric spelling, `-1.0` included) means success.
//! Any other number is an application error code. Bodies without a numeric
//! `result` are not enveloped and pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

pub const SUCCESS_RESULT: i64 = -1;

/// Code reported for a failing `result` that is not an integer in `i64`
/// range, such as `1.5` or `18446744073709551615`.
pub const UNREPRESENTABLE_RESULT: i64 = i64::MIN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub result: i64,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            result: SUCCESS_RESULT,
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == SUCCESS_RESULT
    }
}

impl Envelope<Value> {
    pub fn failure(code: i64) -> Self {
        Self {
            result: code,
            data: Value::Null,
        }
    }
}

/// Outcome of classifying a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// Enveloped success; holds `data` (`null` when absent).
    Success(Value),
    /// Enveloped failure; holds the `result` code.
    Failure(i64),
    /// Not an envelope.
    Raw(Value),
}

impl Parsed {
    pub fn from_body(body: Value) -> Self {
        let mut map = match body {
            Value::Object(map) => map,
            other => return Parsed::Raw(other),
        };
        let code = match map.get("result") {
            Some(Value::Number(result)) => result_code(result),
            _ => return Parsed::Raw(Value::Object(map)),
        };
        if code == Some(SUCCESS_RESULT) {
            Parsed::Success(map.remove("data").unwrap_or(Value::Null))
        } else {
            Parsed::Failure(code.unwrap_or(UNREPRESENTABLE_RESULT))
        }
    }
}

/// The integer a numeric `result` denotes, if it denotes one in `i64` range.
fn result_code(result: &Number) -> Option<i64> {
    if let Some(code) = result.as_i64() {
        return Some(code);
    }
    // 2^63 as f64; the largest integral f64 below it fits in i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    result
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= -LIMIT && *f < LIMIT)
        .map(|f| f as i64)
}
