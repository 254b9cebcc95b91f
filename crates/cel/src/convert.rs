//! The explicit conversion functions (`int()`, `uint()`, `double()`,
//! `string()`, `bytes()`, `bool()`, `timestamp()`, `duration()`) from spec
//! §4.3. Each produces a *range*, *conversion*, or *no such overload* error
//! on failure, never a silent coercion.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::EvalError;
use crate::value::{CelDuration, Value};

/// Resolves the long-standing ambiguity the spec calls out in §9: truncate
/// toward zero, matching the newer CEL conformance tests (the
/// round-to-nearest behavior is legacy and not implemented here).
pub fn to_int(v: &Value) -> Result<Value, EvalError> {
    match v.unfold() {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Uint(u) => i64::try_from(u).map(Value::Int).map_err(|_| EvalError::range("uint out of int range")),
        Value::Double(d) => double_to_int(d).map(Value::Int),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EvalError::conversion(format!("invalid int literal: {s:?}"))),
        Value::Timestamp(ts) => Ok(Value::Int(ts.timestamp())),
        other => Err(EvalError::no_such_overload("int", other.kind())),
    }
}

fn double_to_int(d: f64) -> Result<i64, EvalError> {
    if d.is_nan() {
        return Err(EvalError::conversion("cannot convert NaN to int"));
    }
    let truncated = d.trunc();
    if !(-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&truncated) {
        return Err(EvalError::range(format!("double {d} out of int range")));
    }
    Ok(truncated as i64)
}

pub fn to_uint(v: &Value) -> Result<Value, EvalError> {
    match v.unfold() {
        Value::Uint(u) => Ok(Value::Uint(u)),
        Value::Int(i) => u64::try_from(i).map(Value::Uint).map_err(|_| EvalError::range("int out of uint range")),
        Value::Double(d) => double_to_uint(d).map(Value::Uint),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map(Value::Uint)
            .map_err(|_| EvalError::conversion(format!("invalid uint literal: {s:?}"))),
        other => Err(EvalError::no_such_overload("uint", other.kind())),
    }
}

fn double_to_uint(d: f64) -> Result<u64, EvalError> {
    if d.is_nan() {
        return Err(EvalError::conversion("cannot convert NaN to uint"));
    }
    let truncated = d.trunc();
    if !(0.0..18_446_744_073_709_551_616.0).contains(&truncated) {
        return Err(EvalError::range(format!("double {d} out of uint range")));
    }
    Ok(truncated as u64)
}

pub fn to_double(v: &Value) -> Result<Value, EvalError> {
    match v.unfold() {
        Value::Double(d) => Ok(Value::Double(d)),
        Value::Int(i) => Ok(Value::Double(i as f64)),
        Value::Uint(u) => Ok(Value::Double(u as f64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| EvalError::conversion(format!("invalid double literal: {s:?}"))),
        other => Err(EvalError::no_such_overload("double", other.kind())),
    }
}

pub fn to_string(v: &Value) -> Result<Value, EvalError> {
    match v.unfold() {
        Value::String(s) => Ok(Value::String(s)),
        Value::Int(i) => Ok(Value::String(i.to_string().into())),
        Value::Uint(u) => Ok(Value::String(u.to_string().into())),
        Value::Double(d) => Ok(Value::String(format_double(d).into())),
        Value::Bool(b) => Ok(Value::String(b.to_string().into())),
        Value::Bytes(b) => std::str::from_utf8(&b)
            .map(|s| Value::String(s.into()))
            .map_err(|_| EvalError::new(crate::error::ErrorKind::InvalidUtf8, "bytes are not valid UTF-8")),
        Value::Timestamp(ts) => Ok(Value::String(format_timestamp(ts).into())),
        Value::Duration(d) => Ok(Value::String(format_duration(d).into())),
        other => Err(EvalError::no_such_overload("string", other.kind())),
    }
}

/// Minimal round-trip double formatting (spec §4.3), via the same `ryu`
/// crate the teacher uses for Python float `repr`.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_owned();
    }
    if d.is_infinite() {
        return if d > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() };
    }
    let mut buf = ryu::Buffer::new();
    buf.format_finite(d).to_owned()
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn format_duration(d: CelDuration) -> String {
    let total_nanos = d.num_nanoseconds().unwrap_or(i64::MAX);
    let sign = if total_nanos < 0 { "-" } else { "" };
    let abs = total_nanos.unsigned_abs();
    let seconds = abs / 1_000_000_000;
    let nanos = abs % 1_000_000_000;
    if nanos == 0 {
        format!("{sign}{seconds}s")
    } else {
        let mut frac = format!("{nanos:09}");
        while frac.ends_with('0') {
            frac.pop();
        }
        format!("{sign}{seconds}.{frac}s")
    }
}

pub fn to_bytes(v: &Value) -> Result<Value, EvalError> {
    match v.unfold() {
        Value::Bytes(b) => Ok(Value::Bytes(b)),
        Value::String(s) => Ok(Value::Bytes(s.as_bytes().to_vec().into())),
        other => Err(EvalError::no_such_overload("bytes", other.kind())),
    }
}

pub fn to_bool(v: &Value) -> Result<Value, EvalError> {
    match v.unfold() {
        Value::Bool(b) => Ok(Value::Bool(b)),
        Value::String(s) => match s.as_ref() {
            "1" | "t" | "true" | "TRUE" | "True" => Ok(Value::Bool(true)),
            "0" | "f" | "false" | "FALSE" | "False" => Ok(Value::Bool(false)),
            other => Err(EvalError::conversion(format!("invalid bool literal: {other:?}"))),
        },
        other => Err(EvalError::no_such_overload("bool", other.kind())),
    }
}

pub fn to_timestamp(v: &Value) -> Result<Value, EvalError> {
    match v.unfold() {
        Value::Timestamp(ts) => Ok(Value::Timestamp(ts)),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
            .map_err(|e| EvalError::conversion(format!("invalid timestamp {s:?}: {e}"))),
        other => Err(EvalError::no_such_overload("timestamp", other.kind())),
    }
}

pub fn to_duration(v: &Value) -> Result<Value, EvalError> {
    match v.unfold() {
        Value::Duration(d) => Ok(Value::Duration(d)),
        Value::String(s) => parse_duration(&s).map(Value::Duration),
        other => Err(EvalError::no_such_overload("duration", other.kind())),
    }
}

/// Parses `{n}h{n}m{n}s{n}ms{n}us{n}ns`, any prefix subset, fractional
/// numbers allowed per unit (e.g. `"1.5s"`), per spec §4.3.
pub fn parse_duration(s: &str) -> Result<CelDuration, EvalError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(EvalError::conversion("empty duration"));
    }
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if rest.is_empty() {
        return Err(EvalError::conversion(format!("invalid duration: {s:?}")));
    }
    let mut total_nanos: i128 = 0;
    let mut chars = rest.char_indices().peekable();
    let mut consumed_any = false;
    while let Some(&(start, c)) = chars.peek() {
        if !(c.is_ascii_digit() || c == '.') {
            return Err(EvalError::conversion(format!("invalid duration: {s:?}")));
        }
        let mut end = start;
        while let Some(&(idx, c)) = chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                end = idx + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let number: f64 = rest[start..end]
            .parse()
            .map_err(|_| EvalError::conversion(format!("invalid duration number in {s:?}")))?;
        let unit_start = end;
        let mut unit_end = unit_start;
        while let Some(&(idx, c)) = chars.peek() {
            if c.is_ascii_alphabetic() || c == 'µ' {
                unit_end = idx + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let unit = &rest[unit_start..unit_end];
        let nanos_per_unit: f64 = match unit {
            "h" => 3_600_000_000_000.0,
            "m" => 60_000_000_000.0,
            "s" => 1_000_000_000.0,
            "ms" => 1_000_000.0,
            "us" | "µs" => 1_000.0,
            "ns" => 1.0,
            other => return Err(EvalError::conversion(format!("unknown duration unit {other:?} in {s:?}"))),
        };
        total_nanos += (number * nanos_per_unit).round() as i128;
        consumed_any = true;
    }
    if !consumed_any {
        return Err(EvalError::conversion(format!("invalid duration: {s:?}")));
    }
    if negative {
        total_nanos = -total_nanos;
    }
    if total_nanos > i64::MAX as i128 || total_nanos < i64::MIN as i128 {
        return Err(EvalError::range(format!("duration out of range: {s:?}")));
    }
    Ok(CelDuration::nanoseconds(total_nanos as i64))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn as_int(v: Result<Value, EvalError>) -> i64 {
        match v.unwrap() {
            Value::Int(i) => i,
            other => panic!("expected int, got {other:?}"),
        }
    }

    #[test]
    fn int_truncates_double_toward_zero() {
        assert_eq!(as_int(to_int(&Value::Double(4.9))), 4);
        assert_eq!(as_int(to_int(&Value::Double(-4.9))), -4);
    }

    #[test]
    fn int_from_double_out_of_range_is_range_error() {
        let err = to_int(&Value::Double(1e300)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Range);
    }

    #[test]
    fn int_from_infinite_double_is_range_error() {
        let err = to_int(&Value::Double(f64::INFINITY)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Range);
    }

    #[test]
    fn int_from_negative_uint_range_checked() {
        let err = to_int(&Value::Uint(u64::MAX)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Range);
    }

    #[test]
    fn int_from_string_parses_decimal() {
        assert_eq!(as_int(to_int(&Value::String("-42".into()))), -42);
    }

    #[test]
    fn int_from_malformed_string_is_conversion_error() {
        let err = to_int(&Value::String("abc".into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conversion);
    }

    #[test]
    fn uint_rejects_negative_int() {
        let err = to_uint(&Value::Int(-1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Range);
    }

    #[test]
    fn uint_from_double_truncates() {
        match to_uint(&Value::Double(3.9)).unwrap() {
            Value::Uint(3) => {}
            other => panic!("expected Uint(3), got {other:?}"),
        }
    }

    #[test]
    fn double_parses_scientific_notation_string() {
        match to_double(&Value::String("1.5e3".into())).unwrap() {
            Value::Double(d) => assert_eq!(d, 1500.0),
            other => panic!("expected double, got {other:?}"),
        }
    }

    #[test]
    fn string_of_bytes_requires_valid_utf8() {
        let err = to_string(&Value::Bytes(vec![0xFF, 0xFE].into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidUtf8);
    }

    #[test]
    fn string_of_valid_utf8_bytes_round_trips() {
        match to_string(&Value::Bytes(b"hello".to_vec().into())).unwrap() {
            Value::String(s) => assert_eq!(&*s, "hello"),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn bool_parses_accepted_string_tokens() {
        for token in ["1", "t", "true", "TRUE", "True"] {
            assert!(matches!(to_bool(&Value::String(token.into())).unwrap(), Value::Bool(true)));
        }
        for token in ["0", "f", "false", "FALSE", "False"] {
            assert!(matches!(to_bool(&Value::String(token.into())).unwrap(), Value::Bool(false)));
        }
    }

    #[test]
    fn bool_rejects_unrecognized_string() {
        let err = to_bool(&Value::String("yes".into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conversion);
    }

    #[test]
    fn timestamp_parses_offset_and_normalizes_to_utc() {
        match to_timestamp(&Value::String("2018-08-03T16:00:00-07:00".into())).unwrap() {
            Value::Timestamp(ts) => assert_eq!(ts.to_rfc3339(), "2018-08-03T23:00:00+00:00"),
            other => panic!("expected timestamp, got {other:?}"),
        }
    }

    #[test]
    fn duration_parses_combined_units() {
        let d = parse_duration("1h2m3s").unwrap();
        assert_eq!(d.num_seconds(), 3723);
    }

    #[test]
    fn duration_parses_fractional_seconds() {
        let d = parse_duration("1.5s").unwrap();
        assert_eq!(d.num_nanoseconds(), Some(1_500_000_000));
    }

    #[test]
    fn duration_parses_negative_sign() {
        let d = parse_duration("-5s").unwrap();
        assert_eq!(d.num_seconds(), -5);
    }

    #[test]
    fn duration_rejects_unknown_unit() {
        let err = parse_duration("5x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conversion);
    }

    #[test]
    fn duration_rejects_empty_string() {
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn format_duration_round_trips_through_parse() {
        let d = parse_duration("90s").unwrap();
        assert_eq!(format_duration(d), "90s");
    }

    #[test]
    fn format_double_uses_minimal_round_trip_form() {
        assert_eq!(format_double(42.0), "42.0");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::INFINITY), "Infinity");
    }
}
