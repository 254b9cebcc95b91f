//! The CEL value model: the closed set of value kinds (spec §3.1) and the
//! container types (List, Map, Message) built on top of them.
//!
//! Values are immutable once constructed (spec §3.3): heap-shaped variants
//! (`String`, `Bytes`, `List`, `Map`, `Message`) hold an `Rc` so cloning a
//! `Value` is always cheap and never mutates the underlying data, the same
//! guarantee the teacher's own value type documents for its heap-allocated
//! variants.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::error::{CelResult, ErrorKind, EvalError};
use crate::numeric;

/// A CEL duration: signed elapsed time at nanosecond resolution (spec §3.1).
pub type CelDuration = chrono::Duration;

/// The closed set of CEL value kinds. `type(x)` yields one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Kind {
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    List,
    Map,
    Timestamp,
    Duration,
    Type,
    Message,
}

/// A CEL value. See the module docs and spec §3.1 for the full semantics of
/// each variant.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(Rc<str>),
    Bytes(Rc<[u8]>),
    List(Rc<CelList>),
    Map(Rc<CelMap>),
    Timestamp(DateTime<Utc>),
    Duration(CelDuration),
    Type(Kind),
    Message(Rc<Message>),
    /// `dyn(x)`: a transparent marker that opts a value into cross-type
    /// numeric comparison (spec §4.3, glossary). Never itself a `Kind` —
    /// every operation other than `==`/`!=`/ordering peels it off via
    /// [`Value::peel`] before doing anything else.
    Dyn(Box<Value>),
}

/// An ordered list of values. A thin alias over `Vec` rather than a
/// newtype: CEL lists have no behavior beyond what `Vec` already gives us,
/// and the evaluator operates on `Rc<CelList>` everywhere so cloning a list
/// value never copies its elements.
pub type CelList = Vec<Value>;

/// Keys a CEL map may use (spec §3.1: "keys restricted to Bool, Int, Uint,
/// String"). Kept as a dedicated enum (rather than reusing `Value`) so the
/// compiler rules out Double/List/Map/etc. keys instead of us checking for
/// them at every call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(Rc<str>),
}

impl MapKey {
    pub fn from_value(value: &Value) -> CelResult<Self> {
        match value.peel() {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Int(i) => Ok(Self::Int(*i)),
            Value::Uint(u) => Ok(Self::Uint(*u)),
            Value::String(s) => Ok(Self::String(s.clone())),
            other => Err(EvalError::new(
                ErrorKind::NoSuchOverload,
                format!("invalid map key type: {}", other.kind()),
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Uint(u) => Value::Uint(*u),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_value().fmt(f)
    }
}

/// A CEL map. Backed by `IndexMap` so iteration order is the insertion
/// order and therefore deterministic for a given build (spec §3.2),
/// without us having to hand-roll that guarantee.
pub type CelMap = IndexMap<MapKey, Value>;

/// Whether a message field's presence is tracked explicitly (proto2
/// `optional`, singular message-typed fields, and all wrapper types) or
/// inferred from the value equaling its kind's default (proto3 primitive
/// fields). See spec §4.5's `has()` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Explicit,
    ImplicitDefault,
}

/// A named, structured record (spec §3.1). Dynamic protobuf message
/// handling beyond the well-known types is out of scope (spec §1); this
/// type models exactly what the core needs: named fields with presence
/// semantics, enough for a host to hand the evaluator structured data that
/// behaves like a protobuf message.
///
/// A message's `fields` map doubles as its schema: field names not present
/// in either `fields` or `unset_fields` are simply not part of this
/// message's shape, and produce a *no such field* error rather than a
/// default value. This is the documented simplification the core takes in
/// place of a full protobuf type registry (see DESIGN.md).
#[derive(Debug, Clone)]
pub struct Message {
    pub type_name: Rc<str>,
    fields: IndexMap<Rc<str>, (Value, Presence)>,
    unset_fields: HashSet<Rc<str>>,
}

impl Message {
    pub fn new(type_name: impl Into<Rc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            unset_fields: HashSet::new(),
        }
    }

    /// Sets a field with explicit presence tracking (wrapper types,
    /// singular message fields, proto2 `optional` fields).
    pub fn set_explicit(&mut self, name: impl Into<Rc<str>>, value: Value) -> &mut Self {
        let name = name.into();
        self.unset_fields.remove(&name);
        self.fields.insert(name, (value, Presence::Explicit));
        self
    }

    /// Sets a field whose presence is inferred from its value (proto3
    /// primitive fields: "unset" iff the value equals the kind's default).
    pub fn set_implicit(&mut self, name: impl Into<Rc<str>>, value: Value) -> &mut Self {
        let name = name.into();
        self.unset_fields.remove(&name);
        self.fields.insert(name, (value, Presence::ImplicitDefault));
        self
    }

    /// Declares a field as part of this message's shape without a value —
    /// an explicit-presence field that was never assigned.
    pub fn declare_unset(&mut self, name: impl Into<Rc<str>>) -> &mut Self {
        let name = name.into();
        self.fields.shift_remove(&name);
        self.unset_fields.insert(name);
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &Rc<str>> {
        self.fields.keys().chain(self.unset_fields.iter())
    }

    pub fn has_field(&self, name: &str) -> CelResult<bool> {
        if let Some((value, presence)) = self.fields.get(name) {
            return Ok(match presence {
                Presence::Explicit => true,
                Presence::ImplicitDefault => !is_kind_default(value),
            });
        }
        if self.unset_fields.contains(name) {
            return Ok(false);
        }
        Err(EvalError::no_such_field(name))
    }

    pub fn get_field(&self, name: &str) -> CelResult<Value> {
        if let Some((value, _)) = self.fields.get(name) {
            return Ok(value.clone());
        }
        if self.unset_fields.contains(name) {
            return Ok(Value::Null);
        }
        Err(EvalError::no_such_field(name))
    }
}

fn is_kind_default(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Int(i) => *i == 0,
        Value::Uint(u) => *u == 0,
        Value::Double(d) => *d == 0.0,
        Value::String(s) => s.is_empty(),
        Value::Bytes(b) => b.is_empty(),
        Value::List(l) => l.is_empty(),
        Value::Map(m) => m.is_empty(),
        _ => false,
    }
}

/// Names of protobuf well-known types the evaluator folds into native CEL
/// kinds "at the value-construction boundary" (spec §9 design note), so
/// every other part of the evaluator never has to know a wrapper message
/// exists.
mod wkt {
    pub const BOOL_VALUE: &str = "google.protobuf.BoolValue";
    pub const INT32_VALUE: &str = "google.protobuf.Int32Value";
    pub const INT64_VALUE: &str = "google.protobuf.Int64Value";
    pub const UINT32_VALUE: &str = "google.protobuf.UInt32Value";
    pub const UINT64_VALUE: &str = "google.protobuf.UInt64Value";
    pub const FLOAT_VALUE: &str = "google.protobuf.FloatValue";
    pub const DOUBLE_VALUE: &str = "google.protobuf.DoubleValue";
    pub const STRING_VALUE: &str = "google.protobuf.StringValue";
    pub const BYTES_VALUE: &str = "google.protobuf.BytesValue";
    pub const STRUCT: &str = "google.protobuf.Struct";
    pub const LIST_VALUE: &str = "google.protobuf.ListValue";
    pub const VALUE: &str = "google.protobuf.Value";
    pub const DURATION: &str = "google.protobuf.Duration";
    pub const TIMESTAMP: &str = "google.protobuf.Timestamp";

    pub const WRAPPERS: &[&str] = &[
        BOOL_VALUE,
        INT32_VALUE,
        INT64_VALUE,
        UINT32_VALUE,
        UINT64_VALUE,
        FLOAT_VALUE,
        DOUBLE_VALUE,
        STRING_VALUE,
        BYTES_VALUE,
    ];
}

/// Narrows a Double assigned to a `FloatValue` wrapper's `value` field to
/// binary32 precision on store (spec §4.5 "Numeric fidelity"). A value
/// outside `f32`'s range overflows to infinity rather than erroring: this
/// schema-less `Message` model has no proto2/proto3 field-type discipline to
/// toggle the stricter proto2 range-error behavior on, so singular-proto3's
/// accept-and-overflow rule is the one implemented (documented in
/// DESIGN.md).
pub fn narrow_float_wrapper_field(type_name: &str, field: &str, value: Value) -> Value {
    if type_name == wkt::FLOAT_VALUE && field == "value" {
        if let Value::Double(d) = value.peel() {
            return Value::Double(f64::from(*d as f32));
        }
    }
    value
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self.peel() {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Uint(_) => Kind::Uint,
            Value::Double(_) => Kind::Double,
            Value::String(_) => Kind::String,
            Value::Bytes(_) => Kind::Bytes,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Timestamp(_) => Kind::Timestamp,
            Value::Duration(_) => Kind::Duration,
            Value::Type(_) => Kind::Type,
            Value::Message(_) => Kind::Message,
            Value::Dyn(_) => unreachable!("peel() strips Dyn"),
        }
    }

    /// Strips a `dyn(...)` wrapper and folds well-known-type messages into
    /// their native kind. Every operation should look at `peel()`, never
    /// match on `self` directly, so a wrapper message never has to be
    /// special-cased more than once.
    pub fn peel(&self) -> &Value {
        match self {
            Value::Dyn(inner) => inner.peel(),
            other => other,
        }
    }

    /// Like [`peel`](Self::peel) but also resolves well-known-type
    /// messages, which requires producing a fresh (owned) value rather
    /// than a borrow.
    pub fn unfold(&self) -> Value {
        let v = self.peel();
        let Value::Message(msg) = v else {
            return v.clone();
        };
        let name: &str = &msg.type_name;
        if wkt::WRAPPERS.contains(&name) {
            return match msg.get_field("value") {
                Ok(inner) => inner,
                Err(_) => Value::Null,
            };
        }
        if name == wkt::STRUCT {
            return msg.get_field("fields").map(|v| v.unfold()).unwrap_or(Value::Null);
        }
        if name == wkt::LIST_VALUE {
            return msg.get_field("values").map(|v| v.unfold()).unwrap_or(Value::Null);
        }
        if name == wkt::VALUE {
            return msg
                .get_field("kind")
                .map(|v| v.unfold())
                .unwrap_or(Value::Null);
        }
        if name == wkt::DURATION || name == wkt::TIMESTAMP {
            // Hosts are expected to supply these already folded as native
            // Duration/Timestamp values; a bare message with this type
            // name is treated as already-unboxed data carried verbatim.
            return v.clone();
        }
        v.clone()
    }

    pub fn dyn_wrap(self) -> Value {
        Value::Dyn(Box::new(self))
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self, Value::Dyn(_))
    }

    pub fn type_value(&self) -> Value {
        Value::Type(self.kind())
    }

    pub fn size(&self) -> CelResult<i64> {
        match self.unfold() {
            Value::String(s) => Ok(s.chars().count() as i64),
            Value::Bytes(b) => Ok(b.len() as i64),
            Value::List(l) => Ok(l.len() as i64),
            Value::Map(m) => Ok(m.len() as i64),
            other => Err(EvalError::no_such_overload("size", other.kind())),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v.into())
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.into())
    }
}
impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v.into())
    }
}
impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(Rc::new(v))
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(x) => x.into(),
            None => Value::Null,
        }
    }
}

/// The inverse of the `From` impls above: lets a host pull a primitive back
/// out of a `Value` (e.g. a function's return value) without matching on
/// the enum itself. Unlike [`convert::to_int`](crate::convert::to_int) and
/// friends, these never coerce across kinds — `TryFrom<Value> for i64`
/// fails on `Value::Uint` or `Value::Double` rather than range-checking or
/// truncating, since a host pulling a value back out already knows its
/// expected kind and a silent coercion here would hide a real mismatch.
impl TryFrom<Value> for i64 {
    type Error = EvalError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v.unfold() {
            Value::Int(i) => Ok(i),
            other => Err(EvalError::no_such_overload("TryFrom<Value> for i64", other.kind())),
        }
    }
}
impl TryFrom<Value> for u64 {
    type Error = EvalError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v.unfold() {
            Value::Uint(u) => Ok(u),
            other => Err(EvalError::no_such_overload("TryFrom<Value> for u64", other.kind())),
        }
    }
}
impl TryFrom<Value> for f64 {
    type Error = EvalError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v.unfold() {
            Value::Double(d) => Ok(d),
            other => Err(EvalError::no_such_overload("TryFrom<Value> for f64", other.kind())),
        }
    }
}
impl TryFrom<Value> for bool {
    type Error = EvalError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v.unfold() {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::no_such_overload("TryFrom<Value> for bool", other.kind())),
        }
    }
}
impl TryFrom<Value> for String {
    type Error = EvalError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v.unfold() {
            Value::String(s) => Ok(s.to_string()),
            other => Err(EvalError::no_such_overload("TryFrom<Value> for String", other.kind())),
        }
    }
}

/// Equality per spec §4.3: never errors, "any other cross-kind `==` returns
/// false" unless at least one operand is `dyn`-wrapped, in which case
/// numeric kinds compare mathematically (spec glossary, §8 boundary
/// behaviors: `dyn(1) == 1u` is true, `dyn(2.0) == 1u` is false).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    let cross_numeric = a.is_dyn() || b.is_dyn();
    let (av, bv) = (a.unfold(), b.unfold());
    match (&av, &bv) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Uint(x), Value::Uint(y)) => x == y,
        (Value::Double(x), Value::Double(y)) => x == y, // NaN != NaN, per IEEE-754.
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Timestamp(x), Value::Timestamp(y)) => x == y,
        (Value::Duration(x), Value::Duration(y)) => x == y,
        (Value::Type(x), Value::Type(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(xi, yi)| values_equal(xi, yi))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|yv| values_equal(v, yv)))
        }
        (Value::Message(x), Value::Message(y)) => messages_equal(x, y),
        (Value::Int(_) | Value::Uint(_) | Value::Double(_), Value::Int(_) | Value::Uint(_) | Value::Double(_))
            if cross_numeric =>
        {
            numeric::cross_numeric_cmp(&av, &bv) == Some(Ordering::Equal)
        }
        _ => false,
    }
}

fn messages_equal(a: &Message, b: &Message) -> bool {
    if a.type_name != b.type_name {
        return false;
    }
    let names: HashSet<&Rc<str>> = a.field_names().chain(b.field_names()).collect();
    names.into_iter().all(|name| {
        let a_has = a.has_field(name).unwrap_or(false);
        let b_has = b.has_field(name).unwrap_or(false);
        if a_has != b_has {
            return false;
        }
        if !a_has {
            return true;
        }
        match (a.get_field(name), b.get_field(name)) {
            (Ok(av), Ok(bv)) => values_equal(&av, &bv),
            _ => false,
        }
    })
}

/// Ordering per spec §4.3. `Ok(None)` means the comparison is well-typed but
/// undecidable (a `NaN` operand) and every ordering operator should treat
/// that as `false`, not an error. `Err` is *no such overload*: differing
/// kinds without a `dyn` wrapper, or a kind with no total order at all.
pub fn compare_values(a: &Value, b: &Value) -> CelResult<Option<Ordering>> {
    let cross_numeric = a.is_dyn() || b.is_dyn();
    let (av, bv) = (a.unfold(), b.unfold());
    match (&av, &bv) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Some(x.cmp(y))),
        (Value::Int(x), Value::Int(y)) => Ok(Some(x.cmp(y))),
        (Value::Uint(x), Value::Uint(y)) => Ok(Some(x.cmp(y))),
        (Value::Double(x), Value::Double(y)) => Ok(x.partial_cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(Some(x.cmp(y))),
        (Value::Bytes(x), Value::Bytes(y)) => Ok(Some(x.cmp(y))),
        (Value::Timestamp(x), Value::Timestamp(y)) => Ok(Some(x.cmp(y))),
        (Value::Duration(x), Value::Duration(y)) => Ok(Some(x.cmp(y))),
        (Value::Int(_) | Value::Uint(_) | Value::Double(_), Value::Int(_) | Value::Uint(_) | Value::Double(_)) => {
            if cross_numeric {
                Ok(numeric::cross_numeric_cmp(&av, &bv))
            } else {
                Err(EvalError::no_such_overload("compare", format!("{}, {}", av.kind(), bv.kind())))
            }
        }
        _ => Err(EvalError::no_such_overload("compare", format!("{}, {}", av.kind(), bv.kind()))),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}u"),
            Value::Double(d) => write!(f, "{}", crate::convert::format_double(*d)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Timestamp(ts) => write!(f, "timestamp({:?})", ts.to_rfc3339()),
            Value::Duration(d) => write!(f, "duration({d})"),
            Value::Type(k) => write!(f, "{k}"),
            Value::Message(m) => write!(f, "{}{{...}}", m.type_name),
            Value::Dyn(inner) => inner.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn wrapper(type_name: &str, value: Value) -> Value {
        let mut msg = Message::new(type_name);
        msg.set_explicit("value", value);
        Value::Message(Rc::new(msg))
    }

    #[test]
    fn unfold_unboxes_wrapper_message_to_primitive() {
        let wrapped = wrapper(wkt::INT32_VALUE, Value::Int(5));
        match wrapped.unfold() {
            Value::Int(5) => {}
            other => panic!("expected Int(5), got {other:?}"),
        }
    }

    #[test]
    fn unfold_unset_wrapper_message_is_null() {
        // A wrapper message with no "value" field at all — an unset
        // proto3 wrapper field — unboxes to Null, not an error.
        let msg = Message::new(wkt::STRING_VALUE);
        let wrapped = Value::Message(Rc::new(msg));
        assert!(matches!(wrapped.unfold(), Value::Null));
    }

    #[test]
    fn wrapper_message_equals_underlying_primitive() {
        let wrapped = wrapper(wkt::INT64_VALUE, Value::Int(42));
        assert!(values_equal(&wrapped, &Value::Int(42)));
    }

    #[test]
    fn unset_wrapper_field_equals_null() {
        let msg = Message::new(wkt::BOOL_VALUE);
        let wrapped = Value::Message(Rc::new(msg));
        assert!(values_equal(&wrapped, &Value::Null));
    }

    #[test]
    fn struct_unboxes_to_map() {
        let mut inner = CelMap::new();
        inner.insert(MapKey::String("k".into()), Value::Int(1));
        let mut msg = Message::new(wkt::STRUCT);
        msg.set_explicit("fields", Value::Map(Rc::new(inner)));
        let wrapped = Value::Message(Rc::new(msg));
        match wrapped.unfold() {
            Value::Map(m) => match m.get(&MapKey::String("k".into())) {
                Some(Value::Int(1)) => {}
                other => panic!("expected Some(Int(1)), got {other:?}"),
            },
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn list_value_unboxes_to_list() {
        let mut msg = Message::new(wkt::LIST_VALUE);
        msg.set_explicit("values", Value::List(Rc::new(vec![Value::Int(1), Value::Int(2)])));
        let wrapped = Value::Message(Rc::new(msg));
        match wrapped.unfold() {
            Value::List(items) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn value_oneof_unboxes_to_its_kind() {
        let mut msg = Message::new(wkt::VALUE);
        msg.set_explicit("kind", Value::String("hi".into()));
        let wrapped = Value::Message(Rc::new(msg));
        match wrapped.unfold() {
            Value::String(s) => assert_eq!(&*s, "hi"),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn explicit_presence_field_is_set_even_at_default_value() {
        let mut msg = Message::new("example.Widget");
        msg.set_explicit("count", Value::Int(0));
        assert!(msg.has_field("count").unwrap());
    }

    #[test]
    fn implicit_presence_field_unset_at_default_value() {
        let mut msg = Message::new("example.Widget");
        msg.set_implicit("count", Value::Int(0));
        assert!(!msg.has_field("count").unwrap());
    }

    #[test]
    fn implicit_presence_field_set_at_non_default_value() {
        let mut msg = Message::new("example.Widget");
        msg.set_implicit("count", Value::Int(3));
        assert!(msg.has_field("count").unwrap());
    }

    #[test]
    fn declared_unset_field_has_field_false_but_no_error() {
        let mut msg = Message::new("example.Widget");
        msg.declare_unset("owner");
        assert!(!msg.has_field("owner").unwrap());
        assert!(matches!(msg.get_field("owner"), Ok(Value::Null)));
    }

    #[test]
    fn unknown_field_is_no_such_field_error() {
        let msg = Message::new("example.Widget");
        assert_eq!(msg.has_field("nope").unwrap_err().kind, ErrorKind::NoSuchField);
    }

    #[test]
    fn try_from_value_extracts_matching_kind() {
        assert_eq!(i64::try_from(Value::Int(5)).unwrap(), 5);
        assert_eq!(bool::try_from(Value::Bool(true)).unwrap(), true);
        assert_eq!(String::try_from(Value::String("hi".into())).unwrap(), "hi");
    }

    #[test]
    fn try_from_value_rejects_mismatched_kind() {
        assert!(i64::try_from(Value::Uint(5)).is_err());
        assert!(u64::try_from(Value::Int(5)).is_err());
    }

    #[test]
    fn map_key_rejects_non_primitive_kinds() {
        assert!(MapKey::from_value(&Value::Double(1.0)).is_err());
        assert!(MapKey::from_value(&Value::List(Rc::new(vec![]))).is_err());
    }

    #[test]
    fn lists_of_different_length_are_unequal() {
        let a = Value::List(Rc::new(vec![Value::Int(1)]));
        let b = Value::List(Rc::new(vec![Value::Int(1), Value::Int(2)]));
        assert!(!values_equal(&a, &b));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        assert_eq!(compare_values(&Value::String("a".into()), &Value::String("b".into())).unwrap(), Some(Ordering::Less));
    }

    #[test]
    fn nan_ordering_is_none_not_error() {
        assert_eq!(compare_values(&Value::Double(f64::NAN), &Value::Double(1.0)).unwrap(), None);
    }

    #[test]
    fn bare_cross_kind_ordering_without_dyn_is_no_such_overload() {
        let err = compare_values(&Value::Int(1), &Value::Uint(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchOverload);
    }
}
