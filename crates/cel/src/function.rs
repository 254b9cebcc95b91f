//! Operators and the host-extensible function/method registry (spec §4.3,
//! §6).
//!
//! Arithmetic, concatenation, and membership operators are resolved here
//! by matching on the (already-[`Value::unfold`]ed) operand kinds — one
//! function per operator, not a generic dispatch table, since there are
//! few enough kind combinations per operator that a table would only
//! obscure them. `&&`/`||`/`?:` are deliberately NOT here: their
//! short-circuit and error-absorption behavior (spec §4.5) needs to see
//! the *unevaluated* operand expressions, so [`crate::eval`] implements
//! them directly.
//!
//! Named functions and receiver-style methods (`size(x)`, `x.size()`,
//! `x.contains(y)`, the conversion functions, timestamp accessors, ...) go
//! through [`Registry`], a small multi-dispatch overload table modeled
//! after the teacher's `function.rs`/`signature.rs` binder — generalized
//! from Python's positional/keyword argument binding down to CEL's
//! simpler "receiver kind + positional argument kinds" shape, since CEL
//! has no keyword arguments or defaults.

use std::rc::Rc;

use chrono::{Datelike, Timelike};

use crate::ast::{BinOp, UnOp};
use crate::convert;
use crate::error::{CelResult, ErrorKind, EvalError};
use crate::numeric;
use crate::value::{CelList, Kind, MapKey, Value};

/// Names reserved by the six comprehension macros (spec §4.2: "macro
/// names are reserved at parse time and may not be shadowed by a
/// host-registered function").
pub const MACRO_NAMES: &[&str] = &["has", "all", "exists", "exists_one", "filter", "map"];

pub fn binary_op(op: BinOp, lhs: &Value, rhs: &Value) -> CelResult<Value> {
    use BinOp::*;
    match op {
        Add => add(lhs, rhs),
        Sub => sub(lhs, rhs),
        Mul => mul(lhs, rhs),
        Div => div(lhs, rhs),
        Mod => rem(lhs, rhs),
        Lt | Le | Gt | Ge => relational(op, lhs, rhs),
        In => contains_membership(lhs, rhs),
        Eq | Ne | And | Or => {
            unreachable!("Eq/Ne/And/Or are handled directly by the evaluator")
        }
    }
}

pub fn unary_op(op: UnOp, operand: &Value) -> CelResult<Value> {
    match op {
        UnOp::Not => match operand.unfold() {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EvalError::no_such_overload("!", other.kind())),
        },
        UnOp::Neg => match operand.unfold() {
            Value::Int(i) => numeric::checked_neg_int(i).map(Value::Int),
            Value::Double(d) => Ok(Value::Double(-d)),
            other => Err(EvalError::no_such_overload("-", other.kind())),
        },
    }
}

fn add(lhs: &Value, rhs: &Value) -> CelResult<Value> {
    match (lhs.unfold(), rhs.unfold()) {
        (Value::Int(a), Value::Int(b)) => numeric::checked_add_int(a, b).map(Value::Int),
        (Value::Uint(a), Value::Uint(b)) => numeric::checked_add_uint(a, b).map(Value::Uint),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}").into())),
        (Value::Bytes(a), Value::Bytes(b)) => {
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend_from_slice(&a);
            out.extend_from_slice(&b);
            Ok(Value::Bytes(out.into()))
        }
        (Value::List(a), Value::List(b)) => {
            let mut out: CelList = Vec::with_capacity(a.len() + b.len());
            out.extend(a.iter().cloned());
            out.extend(b.iter().cloned());
            Ok(Value::List(Rc::new(out)))
        }
        (Value::Timestamp(ts), Value::Duration(d)) => Ok(Value::Timestamp(ts + d)),
        (Value::Duration(d), Value::Timestamp(ts)) => Ok(Value::Timestamp(ts + d)),
        (Value::Duration(a), Value::Duration(b)) => Ok(Value::Duration(a + b)),
        (a, b) => Err(EvalError::no_such_overload("+", format!("{}, {}", a.kind(), b.kind()))),
    }
}

fn sub(lhs: &Value, rhs: &Value) -> CelResult<Value> {
    match (lhs.unfold(), rhs.unfold()) {
        (Value::Int(a), Value::Int(b)) => numeric::checked_sub_int(a, b).map(Value::Int),
        (Value::Uint(a), Value::Uint(b)) => numeric::checked_sub_uint(a, b).map(Value::Uint),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a - b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Ok(Value::Duration(a - b)),
        (Value::Timestamp(ts), Value::Duration(d)) => Ok(Value::Timestamp(ts - d)),
        (Value::Duration(a), Value::Duration(b)) => Ok(Value::Duration(a - b)),
        (a, b) => Err(EvalError::no_such_overload("-", format!("{}, {}", a.kind(), b.kind()))),
    }
}

fn mul(lhs: &Value, rhs: &Value) -> CelResult<Value> {
    match (lhs.unfold(), rhs.unfold()) {
        (Value::Int(a), Value::Int(b)) => numeric::checked_mul_int(a, b).map(Value::Int),
        (Value::Uint(a), Value::Uint(b)) => numeric::checked_mul_uint(a, b).map(Value::Uint),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a * b)),
        (a, b) => Err(EvalError::no_such_overload("*", format!("{}, {}", a.kind(), b.kind()))),
    }
}

fn div(lhs: &Value, rhs: &Value) -> CelResult<Value> {
    match (lhs.unfold(), rhs.unfold()) {
        (Value::Int(a), Value::Int(b)) => numeric::checked_div_int(a, b).map(Value::Int),
        (Value::Uint(a), Value::Uint(b)) => numeric::checked_div_uint(a, b).map(Value::Uint),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a / b)),
        (a, b) => Err(EvalError::no_such_overload("/", format!("{}, {}", a.kind(), b.kind()))),
    }
}

fn rem(lhs: &Value, rhs: &Value) -> CelResult<Value> {
    match (lhs.unfold(), rhs.unfold()) {
        (Value::Int(a), Value::Int(b)) => numeric::checked_rem_int(a, b).map(Value::Int),
        (Value::Uint(a), Value::Uint(b)) => numeric::checked_rem_uint(a, b).map(Value::Uint),
        (a, b) => Err(EvalError::no_such_overload("%", format!("{}, {}", a.kind(), b.kind()))),
    }
}

fn relational(op: BinOp, lhs: &Value, rhs: &Value) -> CelResult<Value> {
    let ordering = crate::value::compare_values(lhs, rhs)?;
    let Some(ordering) = ordering else {
        // NaN operand: every relational operator is false, never an error
        // (spec §4.3, §8).
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

/// `e in x`: list membership (by value equality) or map key presence
/// (spec §4.3).
fn contains_membership(needle: &Value, haystack: &Value) -> CelResult<Value> {
    match haystack.unfold() {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|item| crate::value::values_equal(needle, item)))),
        Value::Map(map) => {
            let key = MapKey::from_value(needle)?;
            Ok(Value::Bool(map.contains_key(&key)))
        }
        other => Err(EvalError::no_such_overload("in", other.kind())),
    }
}

/// An overload candidate: `receiver_kind` is `None` for a free function,
/// `Some` for a receiver-style method; `arg_kinds` elements are `None` to
/// match any kind in that position.
struct Overload {
    receiver_kind: Option<Kind>,
    arg_kinds: Vec<Option<Kind>>,
    func: Rc<dyn Fn(Option<&Value>, &[Value]) -> CelResult<Value>>,
}

impl Overload {
    fn matches(&self, receiver: Option<&Value>, args: &[Value]) -> bool {
        let receiver_ok = match (self.receiver_kind, receiver) {
            (None, None) => true,
            (Some(expected), Some(actual)) => actual.kind() == expected,
            _ => false,
        };
        receiver_ok
            && self.arg_kinds.len() == args.len()
            && self
                .arg_kinds
                .iter()
                .zip(args)
                .all(|(expected, actual)| expected.map_or(true, |k| actual.kind() == k))
    }
}

/// The host-extensible function/method table (spec §6: "hosts may
/// register additional functions and receiver-style methods").
pub struct Registry {
    overloads: std::collections::HashMap<Rc<str>, Vec<Overload>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut reg = Self {
            overloads: std::collections::HashMap::new(),
        };
        register_builtins(&mut reg);
        reg
    }

    /// Registers a host function or method. Fails if `name` collides with
    /// one of the six macro names (spec §4.2): a host can never shadow
    /// `all`, `map`, and so on.
    pub fn register(
        &mut self,
        name: impl Into<Rc<str>>,
        receiver_kind: Option<Kind>,
        arg_kinds: Vec<Option<Kind>>,
        func: impl Fn(Option<&Value>, &[Value]) -> CelResult<Value> + 'static,
    ) -> Result<(), EvalError> {
        let name = name.into();
        if MACRO_NAMES.contains(&name.as_ref()) {
            return Err(EvalError::invalid_argument(format!("{name} is reserved for a macro and cannot be registered")));
        }
        self.overloads.entry(name).or_default().push(Overload {
            receiver_kind,
            arg_kinds,
            func: Rc::new(func),
        });
        Ok(())
    }

    pub fn call(&self, name: &str, receiver: Option<&Value>, args: &[Value]) -> CelResult<Value> {
        let Some(candidates) = self.overloads.get(name) else {
            return Err(EvalError::no_such_overload(name, describe_args(receiver, args)));
        };
        for overload in candidates {
            if overload.matches(receiver, args) {
                return (overload.func)(receiver, args);
            }
        }
        Err(EvalError::no_such_overload(name, describe_args(receiver, args)))
    }
}

fn describe_args(receiver: Option<&Value>, args: &[Value]) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(r) = receiver {
        parts.push(r.kind().to_string());
    }
    parts.extend(args.iter().map(|a| a.kind().to_string()));
    parts.join(", ")
}

fn one_arg(args: &[Value]) -> CelResult<&Value> {
    args.first().ok_or_else(|| EvalError::invalid_argument("expected one argument"))
}

fn register_builtins(reg: &mut Registry) {
    // size(x) / x.size(): one overload per supported kind, both as a free
    // function and a receiver method (spec §4.3).
    for kind in [Kind::String, Kind::Bytes, Kind::List, Kind::Map] {
        let _ = reg.register("size", None, vec![Some(kind)], |_, args| one_arg(args)?.size().map(Value::Int));
        let _ = reg.register("size", Some(kind), vec![], |recv, _| recv.expect("receiver checked by dispatch").size().map(Value::Int));
    }

    // Conversion functions (spec §4.3); `convert.rs` already returns a
    // structured error for any kind they don't accept.
    let conversions: &[(&str, fn(&Value) -> CelResult<Value>)] = &[
        ("int", convert::to_int),
        ("uint", convert::to_uint),
        ("double", convert::to_double),
        ("string", convert::to_string),
        ("bytes", convert::to_bytes),
        ("bool", convert::to_bool),
        ("timestamp", convert::to_timestamp),
        ("duration", convert::to_duration),
    ];
    for (name, f) in conversions {
        let f = *f;
        let _ = reg.register(*name, None, vec![None], move |_, args| f(one_arg(args)?));
    }

    // dyn(x): transparent wrapper, not a conversion (spec glossary).
    let _ = reg.register("dyn", None, vec![None], |_, args| Ok(one_arg(args)?.clone().dyn_wrap()));

    // type(x): the runtime type value of x.
    let _ = reg.register("type", None, vec![None], |_, args| Ok(one_arg(args)?.type_value()));

    // String receiver methods.
    let _ = reg.register("contains", Some(Kind::String), vec![Some(Kind::String)], |recv, args| {
        let haystack = as_str(recv.expect("receiver checked by dispatch"))?;
        let needle = as_str(&args[0])?;
        Ok(Value::Bool(haystack.contains(needle.as_ref())))
    });
    let _ = reg.register("startsWith", Some(Kind::String), vec![Some(Kind::String)], |recv, args| {
        let haystack = as_str(recv.expect("receiver checked by dispatch"))?;
        let needle = as_str(&args[0])?;
        Ok(Value::Bool(haystack.starts_with(needle.as_ref())))
    });
    let _ = reg.register("endsWith", Some(Kind::String), vec![Some(Kind::String)], |recv, args| {
        let haystack = as_str(recv.expect("receiver checked by dispatch"))?;
        let needle = as_str(&args[0])?;
        Ok(Value::Bool(haystack.ends_with(needle.as_ref())))
    });
    let _ = reg.register("matches", Some(Kind::String), vec![Some(Kind::String)], |recv, args| {
        let haystack = as_str(recv.expect("receiver checked by dispatch"))?;
        let pattern = as_str(&args[0])?;
        let re = regex::Regex::new(&pattern).map_err(|e| EvalError::invalid_argument(format!("invalid regex {pattern:?}: {e}")))?;
        Ok(Value::Bool(re.is_match(&haystack)))
    });
    let _ = reg.register("matches", None, vec![Some(Kind::String), Some(Kind::String)], |_, args| {
        let haystack = as_str(&args[0])?;
        let pattern = as_str(&args[1])?;
        let re = regex::Regex::new(&pattern).map_err(|e| EvalError::invalid_argument(format!("invalid regex {pattern:?}: {e}")))?;
        Ok(Value::Bool(re.is_match(&haystack)))
    });

    register_timestamp_accessors(reg);
}

fn as_str(v: &Value) -> CelResult<Rc<str>> {
    match v.unfold() {
        Value::String(s) => Ok(s),
        other => Err(EvalError::no_such_overload("<string receiver>", other.kind())),
    }
}

/// `getFullYear`, `getMonth`, ..., each either in UTC or in an IANA
/// timezone passed as an optional string argument (spec §4.3, enrichment
/// via `chrono-tz` beyond what the teacher's own `chrono` usage needed).
fn register_timestamp_accessors(reg: &mut Registry) {
    type Accessor = fn(chrono::DateTime<chrono_tz::Tz>) -> i64;
    let accessors: &[(&str, Accessor)] = &[
        ("getFullYear", |dt| i64::from(dt.year())),
        ("getMonth", |dt| i64::from(dt.month0())),
        ("getDayOfMonth", |dt| i64::from(dt.day0())),
        ("getDate", |dt| i64::from(dt.day())),
        ("getDayOfWeek", |dt| i64::from(dt.weekday().num_days_from_sunday())),
        ("getHours", |dt| i64::from(dt.hour())),
        ("getMinutes", |dt| i64::from(dt.minute())),
        ("getSeconds", |dt| i64::from(dt.second())),
        ("getMilliseconds", |dt| i64::from(dt.nanosecond() / 1_000_000)),
    ];
    for (name, accessor) in accessors {
        let accessor = *accessor;
        let _ = reg.register(*name, Some(Kind::Timestamp), vec![], move |recv, _| {
            let ts = as_timestamp(recv.expect("receiver checked by dispatch"))?;
            Ok(Value::Int(accessor(ts.with_timezone(&chrono_tz::UTC))))
        });
        let _ = reg.register(*name, Some(Kind::Timestamp), vec![Some(Kind::String)], move |recv, args| {
            let ts = as_timestamp(recv.expect("receiver checked by dispatch"))?;
            let tz_name = as_str(&args[0])?;
            let tz: chrono_tz::Tz = tz_name.parse().map_err(|_| EvalError::invalid_argument(format!("unknown timezone: {tz_name:?}")))?;
            Ok(Value::Int(accessor(ts.with_timezone(&tz))))
        });
    }
}

fn as_timestamp(v: &Value) -> CelResult<chrono::DateTime<chrono::Utc>> {
    match v.unfold() {
        Value::Timestamp(ts) => Ok(ts),
        other => Err(EvalError::no_such_overload("<timestamp receiver>", other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_concat() {
        let result = add(&Value::String("a".into()), &Value::String("b".into())).unwrap();
        match result {
            Value::String(s) => assert_eq!(&*s, "ab"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn int_overflow_is_a_range_error() {
        let err = add(&Value::Int(i64::MAX), &Value::Int(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Range);
    }

    #[test]
    fn registry_rejects_macro_names() {
        let mut reg = Registry::new();
        let err = reg.register("all", None, vec![], |_, _| Ok(Value::Null)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn size_dispatches_by_kind() {
        let reg = Registry::new();
        let result = reg.call("size", None, &[Value::String("hello".into())]).unwrap();
        match result {
            Value::Int(n) => assert_eq!(n, 5),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn contains_receiver_method() {
        let reg = Registry::new();
        let result = reg
            .call("contains", Some(&Value::String("hello world".into())), &[Value::String("world".into())])
            .unwrap();
        assert!(matches!(result, Value::Bool(true)));
    }
}
