//! End-to-end scenarios against the public API, one per representative
//! behavior called out in the specification: arithmetic, timestamp
//! comparison through a bound variable, Unicode-aware `size()`, nested
//! `all()`, map equality independent of key order, and `||`'s
//! commutative error absorption.

use cel::{Activation, Environment, ErrorKind, Value};

fn eval(src: &str, activation: &Activation) -> cel::CelResult<Value> {
    let env = Environment::new();
    let program = env.compile(src).expect("parse").program(&env).expect("bind");
    program.evaluate(activation)
}

fn eval_default(src: &str) -> cel::CelResult<Value> {
    eval(src, &Activation::new())
}

fn expect_int(v: cel::CelResult<Value>) -> i64 {
    match v.expect("evaluation should succeed") {
        Value::Int(i) => i,
        other => panic!("expected int, got {other:?}"),
    }
}

fn expect_bool(v: cel::CelResult<Value>) -> bool {
    match v.expect("evaluation should succeed") {
        Value::Bool(b) => b,
        other => panic!("expected bool, got {other:?}"),
    }
}

#[test]
fn basic_arithmetic() {
    assert_eq!(expect_int(eval_default("40 + 2")), 42);
}

#[test]
fn timestamp_comparison_through_bound_variable() {
    let ts = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc);
    let threshold = chrono::DateTime::parse_from_rfc3339("2023-06-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc);

    let mut activation = Activation::new();
    activation.bind("Resource", {
        let mut msg = cel::Message::new("example.Resource");
        msg.set_explicit("creationTimestamp", Value::Timestamp(ts));
        Value::Message(std::rc::Rc::new(msg))
    });
    activation.bind("threshold", Value::Timestamp(threshold));

    assert!(expect_bool(eval("Resource.creationTimestamp > threshold", &activation)));
}

#[test]
fn size_counts_unicode_code_points() {
    assert_eq!(expect_int(eval_default("size('\u{03c0}\u{03ad}\u{03bd}\u{03c4}\u{03b5}')")), 5);
}

#[test]
fn nested_all_macro() {
    assert!(expect_bool(eval_default("[[1, 2], [3, 4], [5]].all(row, row.all(x, x > 0))")));
    assert!(!expect_bool(eval_default("[[1, 2], [3, -4]].all(row, row.all(x, x > 0))")));
}

#[test]
fn map_equality_ignores_key_order() {
    assert!(expect_bool(eval_default(r#"{"a": 1, "b": 2, "c": 3} == {"c": 3, "a": 1, "b": 2}"#)));
}

#[test]
fn or_absorbs_error_from_unbound_operand() {
    assert!(expect_bool(eval_default("x || true")));
}

#[test]
fn and_absorbs_error_from_unbound_operand() {
    assert!(!expect_bool(eval_default("x && false")));
}

#[test]
fn integer_overflow_is_a_range_error() {
    let err = eval_default("9223372036854775807 + 1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Range);
}

#[test]
fn uint_underflow_is_a_range_error() {
    let err = eval_default("0u - 1u").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Range);
}

#[test]
fn int_min_literal_minus_one_is_a_range_error() {
    let err = eval_default("-9223372036854775808 - 1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Range);
}

#[test]
fn negating_int_min_is_a_range_error() {
    let err = eval_default("-(-9223372036854775808)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Range);
}

#[test]
fn duplicate_map_literal_key_is_invalid_argument() {
    let err = eval_default("{'a': 1, 'a': 2}").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}

#[test]
fn nan_is_never_equal_to_itself() {
    assert!(!expect_bool(eval_default("(0.0 / 0.0) == (0.0 / 0.0)")));
}

#[test]
fn dyn_enables_cross_type_numeric_equality() {
    assert!(expect_bool(eval_default("dyn(1) == 1u")));
    assert!(!expect_bool(eval_default("dyn(2.0) == 1u")));
}

#[test]
fn bare_cross_kind_numeric_equality_is_false_without_dyn() {
    // Per spec: without an explicit `dyn(...)` wrapper, numeric values of
    // differing kinds are simply unequal rather than compared
    // mathematically or rejected outright.
    assert!(!expect_bool(eval_default("1 == 1u")));
}

#[test]
fn list_index_out_of_range_is_invalid_argument() {
    let err = eval_default("[1, 2, 3][3]").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}

#[test]
fn has_macro_on_message_field() {
    let mut activation = Activation::new();
    let mut msg = cel::Message::new("example.Resource");
    msg.set_explicit("name", Value::String("widget".into()));
    msg.declare_unset("owner");
    activation.bind("r", Value::Message(std::rc::Rc::new(msg)));

    assert!(expect_bool(eval("has(r.name)", &activation)));
    assert!(!expect_bool(eval("has(r.owner)", &activation)));
}

#[test]
fn filter_and_map_macros() {
    assert_eq!(expect_int(eval_default("[1, 2, 3, 4].filter(x, x % 2 == 0).size()")), 2);
    let doubled = eval_default("[1, 2, 3].map(x, x * 2)").expect("evaluation should succeed");
    match doubled {
        Value::List(items) => {
            let values: Vec<i64> = items
                .iter()
                .map(|v| match v {
                    Value::Int(i) => *i,
                    other => panic!("unexpected: {other:?}"),
                })
                .collect();
            assert_eq!(values, vec![2, 4, 6]);
        }
        other => panic!("expected list, got {other:?}"),
    }
}
