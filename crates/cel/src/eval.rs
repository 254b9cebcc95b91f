//! The tree-walking evaluator (spec §4.5, §5).
//!
//! Mirrors the teacher's own interpreter loop in shape — one function per
//! AST node kind, recursing straight down the tree — but CEL's evaluation
//! order is much more constrained than a general-purpose language's: no
//! statements, no loops outside the six fixed macro shapes, and a
//! specific, spec-mandated short-circuit/error-absorption rule for
//! `&&`/`||`/`?:` (spec §4.5) that this module is the only place
//! responsible for getting right.

use std::rc::Rc;

use crate::activation::{Activation, Frame, Scope};
use crate::ast::{BinOp, Expr, ExprNode, HasKey, Literal, MacroCall, UnOp};
use crate::error::CelResult;
use crate::error::EvalError;
use crate::function::{self, Registry};
use crate::value::{narrow_float_wrapper_field, CelList, MapKey, Message, Value};

pub struct EvalContext<'a> {
    pub registry: &'a Registry,
    pub container: &'a str,
}

pub fn eval(expr: &ExprNode, activation: &Activation, ctx: &EvalContext) -> CelResult<Value> {
    eval_inner(expr, Scope::root(activation), ctx)
}

fn eval_inner(expr: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    match expr.expr.as_ref() {
        Expr::Literal(lit) => Ok(literal_value(lit)),
        Expr::Ident(_) | Expr::Select { .. } => eval_name_or_select(expr, scope, ctx),
        Expr::List(items) => eval_list(items, scope, ctx),
        Expr::Map(entries) => eval_map(entries, scope, ctx),
        Expr::MessageConstruct { type_name, fields } => eval_message_construct(type_name, fields, scope, ctx),
        Expr::Index { base, index } => {
            let base_val = eval_inner(base, scope, ctx)?;
            let index_val = eval_inner(index, scope, ctx)?;
            index_value(&base_val, &index_val)
        }
        Expr::Call { target, func, args } => eval_call(target.as_deref(), func, args, scope, ctx),
        Expr::Unary(op, operand) => {
            let v = eval_inner(operand, scope, ctx)?;
            function::unary_op(*op, &v)
        }
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, scope, ctx),
        Expr::Conditional(cond, then_branch, else_branch) => eval_conditional(cond, then_branch, else_branch, scope, ctx),
        Expr::Macro(m) => eval_macro(m, scope, ctx),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Uint(u) => Value::Uint(*u),
        Literal::Double(d) => Value::Double(*d),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bytes(b) => Value::Bytes(b.clone()),
    }
}

fn eval_list(items: &[ExprNode], scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let mut out: CelList = Vec::with_capacity(items.len());
    for item in items {
        out.push(eval_inner(item, scope, ctx)?);
    }
    Ok(Value::List(Rc::new(out)))
}

fn eval_map(entries: &[(ExprNode, ExprNode)], scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let mut map = crate::value::CelMap::with_capacity(entries.len());
    for (key_expr, value_expr) in entries {
        let key_val = eval_inner(key_expr, scope, ctx)?;
        let key = MapKey::from_value(&key_val)?;
        let value = eval_inner(value_expr, scope, ctx)?;
        // Spec §3.1: a repeated key during construction is an error, not a
        // silent overwrite.
        if map.contains_key(&key) {
            return Err(EvalError::invalid_argument(format!("duplicate map key: {key}")));
        }
        map.insert(key, value);
    }
    Ok(Value::Map(Rc::new(map)))
}

fn eval_message_construct(type_name: &str, fields: &[(Rc<str>, ExprNode)], scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let mut msg = Message::new(type_name);
    for (name, value_expr) in fields {
        let value = eval_inner(value_expr, scope, ctx)?;
        let value = narrow_float_wrapper_field(type_name, name, value);
        msg.set_explicit(name.clone(), value);
    }
    Ok(Value::Message(Rc::new(msg)))
}

/// Resolves a plain identifier or a chain of field selects over one. Tries,
/// in order: the macro-frame chain for the leading segment (covers
/// macro-bound loop variables, which are never part of a qualified name),
/// then container-qualified resolution of the whole dotted path against the
/// root activation (spec §4.2 — longest container prefix first, then
/// longest leading subpath, with the bare name as the final candidate). A
/// frame variable is checked first because it shadows everything, but a
/// bare activation binding must NOT win over a longer, container-qualified
/// one of the same leaf name, so the root activation's plain lookup is only
/// ever reached through `resolve_qualified`'s own fallback, never directly.
fn eval_name_or_select(expr: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let path = expr.qualified_path().expect("Ident/Select always yields a qualified_path");

    if let Some(v) = scope.resolve_frame_only(&path[0]) {
        if path.len() == 1 {
            return Ok(v);
        }
        return apply_selects(v, &path[1..]);
    }

    let activation = scope.root_activation();
    if let Some((value, rest)) = activation.resolve_qualified(ctx.container, &path) {
        return apply_selects(value, rest);
    }

    Err(EvalError::unknown_variable(path.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(".")))
}

fn apply_selects(mut value: Value, rest: &[Rc<str>]) -> CelResult<Value> {
    for field in rest {
        value = select_field(&value, field)?;
    }
    Ok(value)
}

fn select_field(value: &Value, field: &str) -> CelResult<Value> {
    match value.unfold() {
        Value::Map(map) => {
            let key = MapKey::String(field.into());
            map.get(&key).cloned().ok_or_else(|| EvalError::no_such_key(field))
        }
        Value::Message(msg) => msg.get_field(field),
        other => Err(EvalError::no_such_overload("select", other.kind())),
    }
}

fn index_value(base: &Value, index: &Value) -> CelResult<Value> {
    match base.unfold() {
        Value::List(items) => {
            let idx = list_index(index)?;
            items
                .get(idx)
                .cloned()
                .ok_or_else(|| EvalError::invalid_argument(format!("index {idx} out of range for list of length {}", items.len())))
        }
        Value::Map(map) => {
            let key = MapKey::from_value(index)?;
            map.get(&key).cloned().ok_or_else(|| EvalError::no_such_key(&key))
        }
        other => Err(EvalError::no_such_overload("index", other.kind())),
    }
}

fn list_index(index: &Value) -> CelResult<usize> {
    match index.unfold() {
        Value::Int(i) => usize::try_from(i).map_err(|_| EvalError::invalid_argument(format!("negative list index: {i}"))),
        Value::Uint(u) => Ok(u as usize),
        other => Err(EvalError::no_such_overload("index", other.kind())),
    }
}

fn eval_call(target: Option<&ExprNode>, func: &str, args: &[ExprNode], scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let receiver = target.map(|t| eval_inner(t, scope, ctx)).transpose()?;
    let mut arg_values = Vec::with_capacity(args.len());
    for arg in args {
        arg_values.push(eval_inner(arg, scope, ctx)?);
    }
    ctx.registry.call(func, receiver.as_ref(), &arg_values)
}

fn eval_binary(op: BinOp, lhs: &ExprNode, rhs: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    match op {
        BinOp::And => eval_and(lhs, rhs, scope, ctx),
        BinOp::Or => eval_or(lhs, rhs, scope, ctx),
        BinOp::Eq | BinOp::Ne => {
            let l = eval_inner(lhs, scope, ctx)?;
            let r = eval_inner(rhs, scope, ctx)?;
            let eq = crate::value::values_equal(&l, &r);
            Ok(Value::Bool(if op == BinOp::Eq { eq } else { !eq }))
        }
        _ => {
            let l = eval_inner(lhs, scope, ctx)?;
            let r = eval_inner(rhs, scope, ctx)?;
            function::binary_op(op, &l, &r)
        }
    }
}

/// `&&` short-circuits on a `false` operand and is commutative about it:
/// `false && errorExpr` and `errorExpr && false` both evaluate to `false`
/// (spec §4.5). Only when neither side determines the answer does an
/// operand's error (or non-bool value) propagate.
fn eval_and(lhs: &ExprNode, rhs: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let l = eval_inner(lhs, scope, ctx);
    if matches!(l, Ok(Value::Bool(false))) {
        return Ok(Value::Bool(false));
    }
    let r = eval_inner(rhs, scope, ctx);
    if matches!(r, Ok(Value::Bool(false))) {
        return Ok(Value::Bool(false));
    }
    let l = l?;
    let r = r?;
    match (&l, &r) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
        (a, _) if !matches!(a, Value::Bool(_)) => Err(EvalError::no_such_overload("&&", a.kind())),
        (_, b) => Err(EvalError::no_such_overload("&&", b.kind())),
    }
}

/// Mirror image of [`eval_and`]: `||` short-circuits on `true`, commutatively.
fn eval_or(lhs: &ExprNode, rhs: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let l = eval_inner(lhs, scope, ctx);
    if matches!(l, Ok(Value::Bool(true))) {
        return Ok(Value::Bool(true));
    }
    let r = eval_inner(rhs, scope, ctx);
    if matches!(r, Ok(Value::Bool(true))) {
        return Ok(Value::Bool(true));
    }
    let l = l?;
    let r = r?;
    match (&l, &r) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
        (a, _) if !matches!(a, Value::Bool(_)) => Err(EvalError::no_such_overload("||", a.kind())),
        (_, b) => Err(EvalError::no_such_overload("||", b.kind())),
    }
}

fn eval_conditional(cond: &ExprNode, then_branch: &ExprNode, else_branch: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    match eval_inner(cond, scope, ctx)? {
        Value::Bool(true) => eval_inner(then_branch, scope, ctx),
        Value::Bool(false) => eval_inner(else_branch, scope, ctx),
        other => Err(EvalError::no_such_overload("conditional", other.kind())),
    }
}

fn eval_macro(m: &MacroCall, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    match m {
        MacroCall::Has { base, key } => eval_has(base, key, scope, ctx),
        MacroCall::All { target, var, predicate } => eval_all(target, var, predicate, scope, ctx),
        MacroCall::Exists { target, var, predicate } => eval_exists(target, var, predicate, scope, ctx),
        MacroCall::ExistsOne { target, var, predicate } => eval_exists_one(target, var, predicate, scope, ctx),
        MacroCall::Filter { target, var, predicate } => eval_filter(target, var, predicate, scope, ctx),
        MacroCall::Map { target, var, predicate, transform } => eval_map_macro(target, var, predicate.as_deref(), transform, scope, ctx),
    }
}

fn eval_has(base: &ExprNode, key: &HasKey, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let base_val = eval_inner(base, scope, ctx)?;
    let present = match key {
        HasKey::Field(field) => has_field(&base_val, field)?,
        HasKey::Index(index_expr) => {
            let index_val = eval_inner(index_expr, scope, ctx)?;
            has_index(&base_val, &index_val)?
        }
    };
    Ok(Value::Bool(present))
}

fn has_field(value: &Value, field: &str) -> CelResult<bool> {
    match value.unfold() {
        Value::Message(msg) => msg.has_field(field),
        Value::Map(map) => Ok(map.contains_key(&MapKey::String(field.into()))),
        other => Err(EvalError::no_such_overload("has", other.kind())),
    }
}

fn has_index(value: &Value, index: &Value) -> CelResult<bool> {
    match value.unfold() {
        Value::Map(map) => {
            let key = MapKey::from_value(index)?;
            Ok(map.contains_key(&key))
        }
        other => Err(EvalError::no_such_overload("has", other.kind())),
    }
}

fn iter_values(target: &Value) -> CelResult<Vec<Value>> {
    match target.unfold() {
        Value::List(items) => Ok(items.iter().cloned().collect()),
        Value::Map(map) => Ok(map.keys().map(MapKey::to_value).collect()),
        other => Err(EvalError::no_such_overload("comprehension", other.kind())),
    }
}

/// `all`/`exists` both short-circuit (on the first `false`/`true`
/// respectively) and, per the same commutative-absorption rule as
/// `&&`/`||`, a short-circuiting element takes precedence over an error
/// raised by an earlier element's predicate.
fn eval_all(target: &ExprNode, var: &str, predicate: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let items = iter_values(&eval_inner(target, scope, ctx)?)?;
    let mut first_err = None;
    for item in items {
        let frame = Frame { name: var, value: item, parent: scope };
        match eval_inner(predicate, Scope::Frame(&frame), ctx) {
            Ok(Value::Bool(false)) => return Ok(Value::Bool(false)),
            Ok(Value::Bool(true)) => {}
            Ok(other) => return Err(EvalError::no_such_overload("all", other.kind())),
            Err(e) => {
                first_err.get_or_insert(e);
            }
        };
    }
    first_err.map_or(Ok(Value::Bool(true)), Err)
}

fn eval_exists(target: &ExprNode, var: &str, predicate: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let items = iter_values(&eval_inner(target, scope, ctx)?)?;
    let mut first_err = None;
    for item in items {
        let frame = Frame { name: var, value: item, parent: scope };
        match eval_inner(predicate, Scope::Frame(&frame), ctx) {
            Ok(Value::Bool(true)) => return Ok(Value::Bool(true)),
            Ok(Value::Bool(false)) => {}
            Ok(other) => return Err(EvalError::no_such_overload("exists", other.kind())),
            Err(e) => {
                first_err.get_or_insert(e);
            }
        };
    }
    first_err.map_or(Ok(Value::Bool(false)), Err)
}

/// `exists_one` needs an exact count, so (unlike `all`/`exists`) it cannot
/// stop early on a single element's outcome and must propagate the first
/// error immediately.
fn eval_exists_one(target: &ExprNode, var: &str, predicate: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let items = iter_values(&eval_inner(target, scope, ctx)?)?;
    let mut count = 0;
    for item in items {
        let frame = Frame { name: var, value: item, parent: scope };
        match eval_inner(predicate, Scope::Frame(&frame), ctx)? {
            Value::Bool(true) => count += 1,
            Value::Bool(false) => {}
            other => return Err(EvalError::no_such_overload("exists_one", other.kind())),
        }
    }
    Ok(Value::Bool(count == 1))
}

fn eval_filter(target: &ExprNode, var: &str, predicate: &ExprNode, scope: Scope, ctx: &EvalContext) -> CelResult<Value> {
    let items = iter_values(&eval_inner(target, scope, ctx)?)?;
    let mut out = Vec::new();
    for item in items {
        let frame = Frame { name: var, value: item.clone(), parent: scope };
        match eval_inner(predicate, Scope::Frame(&frame), ctx)? {
            Value::Bool(true) => out.push(item),
            Value::Bool(false) => {}
            other => return Err(EvalError::no_such_overload("filter", other.kind())),
        }
    }
    Ok(Value::List(Rc::new(out)))
}

fn eval_map_macro(
    target: &ExprNode,
    var: &str,
    predicate: Option<&ExprNode>,
    transform: &ExprNode,
    scope: Scope,
    ctx: &EvalContext,
) -> CelResult<Value> {
    let items = iter_values(&eval_inner(target, scope, ctx)?)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let frame = Frame { name: var, value: item, parent: scope };
        let inner = Scope::Frame(&frame);
        if let Some(pred) = predicate {
            match eval_inner(pred, inner, ctx)? {
                Value::Bool(true) => {}
                Value::Bool(false) => continue,
                other => return Err(EvalError::no_such_overload("map", other.kind())),
            }
        }
        out.push(eval_inner(transform, inner, ctx)?);
    }
    Ok(Value::List(Rc::new(out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(src: &str) -> CelResult<Value> {
        let ast = parse(src).unwrap_or_else(|e| panic!("parse error in {src:?}: {e}"));
        let activation = Activation::new();
        let registry = Registry::new();
        let ctx = EvalContext { registry: &registry, container: "" };
        eval(&ast, &activation, &ctx)
    }

    fn run_with(src: &str, activation: &Activation) -> CelResult<Value> {
        let ast = parse(src).unwrap_or_else(|e| panic!("parse error in {src:?}: {e}"));
        let registry = Registry::new();
        let ctx = EvalContext { registry: &registry, container: "" };
        eval(&ast, activation, &ctx)
    }

    fn run_in_container(src: &str, container: &str, activation: &Activation) -> CelResult<Value> {
        let ast = parse(src).unwrap_or_else(|e| panic!("parse error in {src:?}: {e}"));
        let registry = Registry::new();
        let ctx = EvalContext { registry: &registry, container };
        eval(&ast, activation, &ctx)
    }

    fn as_int(v: CelResult<Value>) -> i64 {
        match v.unwrap() {
            Value::Int(i) => i,
            other => panic!("expected int, got {other:?}"),
        }
    }

    fn as_bool(v: CelResult<Value>) -> bool {
        match v.unwrap() {
            Value::Bool(b) => b,
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic() {
        assert_eq!(as_int(run("40 + 2")), 42);
    }

    #[test]
    fn short_circuit_or_absorbs_unknown_variable_error() {
        assert!(as_bool(run("x || true")));
    }

    #[test]
    fn short_circuit_and_absorbs_unknown_variable_error() {
        assert!(!as_bool(run("x && false")));
    }

    #[test]
    fn unknown_variable_without_absorption_errors() {
        assert!(run("x && true").is_err());
    }

    #[test]
    fn string_size_counts_code_points_not_bytes() {
        assert_eq!(as_int(run("size('\u{03c0}\u{03ad}\u{03bd}\u{03c4}\u{03b5}')")), 5);
    }

    #[test]
    fn all_macro_over_nested_lists() {
        assert!(as_bool(run("[[1, 2], [3, 4]].all(row, row.all(x, x > 0))")));
    }

    #[test]
    fn map_equality_regardless_of_key_order() {
        assert!(as_bool(run(r#"{"a": 1, "b": 2} == {"b": 2, "a": 1}"#)));
    }

    #[test]
    fn index_out_of_range_is_invalid_argument() {
        let err = run("[1, 2, 3][3]").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn variable_binding() {
        let activation = Activation::from_vars([("x", Value::Int(10))]);
        assert_eq!(as_int(run_with("x + 1", &activation)), 11);
    }

    #[test]
    fn float_value_wrapper_narrows_double_to_binary32_precision() {
        // 0.1 isn't exactly representable in either binary32 or binary64,
        // but the two roundings differ — constructing a FloatValue from it
        // must narrow to the f32 rounding, not keep the f64 one.
        let narrowed = match run("google.protobuf.FloatValue{value: 0.1}") {
            Ok(Value::Message(m)) => m.get_field("value").unwrap(),
            other => panic!("unexpected: {other:?}"),
        };
        match narrowed {
            Value::Double(d) => assert_eq!(d, f64::from(0.1_f32)),
            other => panic!("expected double, got {other:?}"),
        }
    }

    #[test]
    fn container_qualified_binding_beats_equally_named_bare_binding() {
        // Both `Name` and `pkg.Name` are bound; referencing `Name` from
        // inside container `pkg` must resolve to the qualified one (spec
        // §4.2: longest container prefix wins over a bare binding).
        let mut activation = Activation::new();
        activation.bind("Name", Value::Int(1));
        activation.bind("pkg.Name", Value::Int(2));
        assert_eq!(as_int(run_in_container("Name", "pkg", &activation)), 2);
        assert_eq!(as_int(run_in_container("Name", "", &activation)), 1);
    }

    #[test]
    fn duplicate_map_key_errors_instead_of_overwriting() {
        let err = run("{'a': 1, 'a': 2}").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn dyn_wrapped_numeric_cross_equality() {
        assert!(as_bool(run("dyn(1) == 1u")));
    }

    #[test]
    fn exists_one_requires_exact_count() {
        assert!(as_bool(run("[1, 2, 3].exists_one(x, x == 2)")));
        assert!(!as_bool(run("[1, 2, 3].exists_one(x, x > 1)")));
    }

    #[test]
    fn map_macro_two_and_three_arg_forms() {
        let ast = parse("[1, 2, 3].map(x, x * 2)").unwrap();
        let activation = Activation::new();
        let registry = Registry::new();
        let ctx = EvalContext { registry: &registry, container: "" };
        let result = eval(&ast, &activation, &ctx).unwrap();
        match result {
            Value::List(items) => assert_eq!(items.len(), 3),
            other => panic!("expected list, got {other:?}"),
        }
    }
}
