//! Arithmetic and cross-type numeric comparison (spec §4.3).
//!
//! Kept as its own module per the spec's design note: "isolate cross-type
//! ordering in a dedicated module; ordinary arithmetic operators dispatch
//! only within a single kind." Every checked-arithmetic helper here returns
//! a *range* or *divide/modulus by zero* [`EvalError`]; nothing in this
//! module silently wraps or coerces between kinds.

use std::cmp::Ordering;

use crate::error::{EvalError, ErrorKind};
use crate::value::Value;

pub fn checked_add_int(a: i64, b: i64) -> Result<i64, EvalError> {
    a.checked_add(b).ok_or_else(overflow)
}
pub fn checked_sub_int(a: i64, b: i64) -> Result<i64, EvalError> {
    a.checked_sub(b).ok_or_else(overflow)
}
pub fn checked_mul_int(a: i64, b: i64) -> Result<i64, EvalError> {
    a.checked_mul(b).ok_or_else(overflow)
}
pub fn checked_div_int(a: i64, b: i64) -> Result<i64, EvalError> {
    if b == 0 {
        return Err(EvalError::new(ErrorKind::DivideByZero, "divide by zero"));
    }
    a.checked_div(b).ok_or_else(overflow)
}
/// `%` takes the sign of the dividend (spec §4.3), which is exactly
/// Rust's `%` on signed integers — no extra work needed beyond the
/// overflow/zero checks.
pub fn checked_rem_int(a: i64, b: i64) -> Result<i64, EvalError> {
    if b == 0 {
        return Err(EvalError::new(ErrorKind::ModulusByZero, "modulus by zero"));
    }
    a.checked_rem(b).ok_or_else(overflow)
}
pub fn checked_neg_int(a: i64) -> Result<i64, EvalError> {
    a.checked_neg().ok_or_else(overflow)
}

pub fn checked_add_uint(a: u64, b: u64) -> Result<u64, EvalError> {
    a.checked_add(b).ok_or_else(overflow)
}
pub fn checked_sub_uint(a: u64, b: u64) -> Result<u64, EvalError> {
    a.checked_sub(b).ok_or_else(overflow)
}
pub fn checked_mul_uint(a: u64, b: u64) -> Result<u64, EvalError> {
    a.checked_mul(b).ok_or_else(overflow)
}
pub fn checked_div_uint(a: u64, b: u64) -> Result<u64, EvalError> {
    if b == 0 {
        return Err(EvalError::new(ErrorKind::DivideByZero, "divide by zero"));
    }
    Ok(a / b)
}
pub fn checked_rem_uint(a: u64, b: u64) -> Result<u64, EvalError> {
    if b == 0 {
        return Err(EvalError::new(ErrorKind::ModulusByZero, "modulus by zero"));
    }
    Ok(a % b)
}

fn overflow() -> EvalError {
    EvalError::range("integer overflow")
}

/// Compares two already-[`Value::unfold`]ed numeric values (`Int`, `Uint`,
/// or `Double`) exactly, without going through a lossy `f64` round-trip.
/// `None` means one operand is `NaN`: no ordering relationship holds, but
/// it is not an error (spec §4.3, §8: `0.0/0.0 == 0.0/0.0` is false, not an
/// error).
pub fn cross_numeric_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Uint(x), Value::Uint(y)) => Some(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Uint(y)) => Some(cmp_int_uint(*x, *y)),
        (Value::Uint(x), Value::Int(y)) => Some(cmp_int_uint(*y, *x).reverse()),
        (Value::Int(x), Value::Double(y)) => cmp_int_double(*x, *y),
        (Value::Double(x), Value::Int(y)) => cmp_int_double(*y, *x).map(Ordering::reverse),
        (Value::Uint(x), Value::Double(y)) => cmp_uint_double(*x, *y),
        (Value::Double(x), Value::Uint(y)) => cmp_uint_double(*y, *x).map(Ordering::reverse),
        _ => None,
    }
}

fn cmp_int_uint(i: i64, u: u64) -> Ordering {
    if i < 0 {
        return Ordering::Less;
    }
    (i as u64).cmp(&u)
}

/// Exact comparison of an `i64` against an `f64`, without losing
/// precision for magnitudes beyond `f64`'s 52-bit mantissa: the integer
/// part is compared as an integer, and only the fractional remainder
/// (itself exact, since it's derived from `d`'s own bit pattern) breaks
/// ties.
fn cmp_int_double(i: i64, d: f64) -> Option<Ordering> {
    if d.is_nan() {
        return None;
    }
    if d == f64::INFINITY {
        return Some(Ordering::Less);
    }
    if d == f64::NEG_INFINITY {
        return Some(Ordering::Greater);
    }
    const I64_MAX_AS_F64: f64 = 9_223_372_036_854_775_808.0; // 2^63, one past i64::MAX
    let d_trunc = d.trunc();
    if d_trunc >= I64_MAX_AS_F64 {
        return Some(Ordering::Less);
    }
    if d_trunc < -I64_MAX_AS_F64 {
        return Some(Ordering::Greater);
    }
    let d_int = d_trunc as i64;
    Some(match i.cmp(&d_int) {
        Ordering::Equal => {
            let frac = d - d_trunc;
            if frac > 0.0 {
                Ordering::Less
            } else if frac < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        other => other,
    })
}

fn cmp_uint_double(u: u64, d: f64) -> Option<Ordering> {
    if d.is_nan() {
        return None;
    }
    if d < 0.0 {
        return Some(Ordering::Greater);
    }
    if d == f64::INFINITY {
        return Some(Ordering::Less);
    }
    const U64_MAX_AS_F64: f64 = 18_446_744_073_709_551_616.0; // 2^64, one past u64::MAX
    let d_trunc = d.trunc();
    if d_trunc >= U64_MAX_AS_F64 {
        return Some(Ordering::Less);
    }
    let d_int = d_trunc as u64;
    Some(match u.cmp(&d_int) {
        Ordering::Equal => {
            let frac = d - d_trunc;
            if frac > 0.0 {
                Ordering::Less
            } else if frac < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_uint_cross_compare() {
        assert_eq!(cross_numeric_cmp(&Value::Int(1), &Value::Uint(1)), Some(Ordering::Equal));
        assert_eq!(cross_numeric_cmp(&Value::Int(-1), &Value::Uint(0)), Some(Ordering::Less));
    }

    #[test]
    fn int_double_cross_compare_exact_on_large_values() {
        assert_eq!(
            cross_numeric_cmp(&Value::Int(i64::MAX), &Value::Double(f64::MAX)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn nan_is_incomparable_not_an_error() {
        assert_eq!(cross_numeric_cmp(&Value::Double(f64::NAN), &Value::Int(1)), None);
    }
}
