//! JSON interop (spec §6): the mapping a host uses to hand JSON-shaped
//! data to the evaluator and get JSON back out. Built on `serde_json`
//! with the `preserve_order` feature (workspace dependency, shared with
//! the teacher's own JSON usage) so object key order survives the round
//! trip the same way `CelMap`'s `IndexMap` backing does.

use std::rc::Rc;

use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::error::{CelResult, EvalError};
use crate::value::{CelMap, MapKey, Value};

/// Converts a `serde_json::Value` into a `cel::Value` per spec §6's
/// table: null -> Null, boolean -> Bool, string -> String, array -> List,
/// object -> Map (string keys only), number -> Double always (JSON has no
/// int/uint/double distinction, so this never tries to guess one).
pub fn from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Double(number_to_f64(n)),
        Json::String(s) => Value::String(s.as_str().into()),
        Json::Array(items) => Value::List(Rc::new(items.iter().map(from_json).collect())),
        Json::Object(fields) => {
            let mut map = CelMap::with_capacity(fields.len());
            for (k, v) in fields {
                map.insert(MapKey::String(k.as_str().into()), from_json(v));
            }
            Value::Map(Rc::new(map))
        }
    }
}

fn number_to_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

/// Converts a `cel::Value` back into a `serde_json::Value`. Fails for
/// kinds with no natural JSON representation (spec §6: bytes, timestamp,
/// duration, and message values are out of scope for this direction —
/// a host that needs them serializes through its own schema instead).
pub fn to_json(value: &Value) -> CelResult<Json> {
    match value.unfold() {
        Value::Null => Ok(Json::Null),
        Value::Bool(b) => Ok(Json::Bool(b)),
        Value::Int(i) => Ok(Json::Number(i.into())),
        Value::Uint(u) => Ok(Number::from_f64(u as f64).map(Json::Number).unwrap_or(Json::Null)),
        Value::Double(d) => Ok(Number::from_f64(d).map(Json::Number).unwrap_or(Json::Null)),
        Value::String(s) => Ok(Json::String(s.to_string())),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(to_json(item)?);
            }
            Ok(Json::Array(out))
        }
        Value::Map(map) => {
            let mut out = JsonMap::with_capacity(map.len());
            for (k, v) in map.iter() {
                let MapKey::String(key) = k else {
                    return Err(EvalError::conversion("JSON object keys must be strings"));
                };
                out.insert(key.to_string(), to_json(v)?);
            }
            Ok(Json::Object(out))
        }
        other => Err(EvalError::conversion(format!("{} has no JSON representation", other.kind()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_always_become_double() {
        assert!(matches!(from_json(&json!(5)), Value::Double(d) if d == 5.0));
    }

    #[test]
    fn object_round_trips_through_map() {
        // Numeric literals must already be floats here: `from_json` always
        // produces `Value::Double`, and `to_json` rebuilds a
        // `serde_json::Number` via `from_f64`, which is a different `N`
        // variant (and therefore not `==`) than the `PosInt` variant an
        // integer literal like `1` would produce in this macro.
        let input = json!({"a": 1.0, "b": [true, null]});
        let value = from_json(&input);
        let output = to_json(&value).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn bytes_have_no_json_representation() {
        let err = to_json(&Value::Bytes(vec![1, 2, 3].into()));
        assert!(err.is_err());
    }
}
