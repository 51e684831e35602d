//! Orderings over records.
//!
//! The default ordering compares the key field of two records with
//! [`compare_values`], a total order over JSON values. Custom comparators
//! must keep the same contract: two records compare `Equal` exactly when
//! their key-field values are equal, otherwise binary search misbehaves.

use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use store::Record;

/// Total comparison between two (possibly partial) records.
pub type Comparator = Arc<dyn Fn(&Record, &Record) -> Ordering + Send + Sync>;

/// Builds the default comparator for `field`.
///
/// A record without the field sorts as if it held `null`.
pub fn by_key(field: &str) -> Comparator {
    let field: Arc<str> = Arc::from(field);
    Arc::new(move |a: &Record, b: &Record| {
        compare_values(key_of(a, &field), key_of(b, &field))
    })
}

fn key_of<'a>(record: &'a Record, field: &str) -> &'a Value {
    record.get(field).unwrap_or(&Value::Null)
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values.
///
/// Values of different types order by type: `null < bool < number < string <
/// array < object`. Within a type: numbers numerically, strings by code
/// point, arrays and objects lexicographically (objects over their sorted
/// `(key, value)` pairs).
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare_values(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y)
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(lv, rv)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    match (as_integer(x), as_integer(y)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(a), None) => integer_vs_float(a, y.as_f64().unwrap_or_default()),
        (None, Some(b)) => integer_vs_float(b, x.as_f64().unwrap_or_default()).reverse(),
        // serde_json never stores NaN
        (None, None) => {
            let a = x.as_f64().unwrap_or_default();
            let b = y.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Exact comparison; casting the integer to `f64` loses precision above 2^53.
fn integer_vs_float(int: i128, float: f64) -> Ordering {
    const TWO_POW_127: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    if float >= TWO_POW_127 {
        return Ordering::Less;
    }
    if float < -TWO_POW_127 {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    int.cmp(&(whole as i128))
        .then_with(|| 0.0f64.partial_cmp(&(float - whole)).unwrap_or(Ordering::Equal))
}
