//! Variable binding and name resolution (spec §4.2, §6).
//!
//! Two different chains do this job, at two different layers:
//!
//! - [`Activation`] is the host-facing API: a persistent, `Rc`-linked chain
//!   a caller can stack (`parent.child_with(...)`) across multiple
//!   `evaluate` calls, the way the teacher's `Runner` accepts a reusable
//!   execution context rather than rebuilding one per call.
//! - [`Scope`]/[`Frame`] is the evaluator-internal chain used while
//!   walking a macro (`all`, `map`, ...): one new binding per iteration,
//!   borrowed rather than `Rc`-counted, since macro scopes never outlive
//!   the expression that created them and a fresh heap allocation per
//!   list element would be wasteful. This mirrors `emdash-udashboard`'s
//!   `Env<T>` parent-chain lookup, generalized to two different storage
//!   strategies for the two different lifetimes involved.

use std::collections::HashMap;
use std::rc::Rc;

use ahash::RandomState;

use crate::value::Value;

/// A host-facing, stackable set of variable bindings.
#[derive(Debug, Default)]
pub struct Activation {
    vars: HashMap<Rc<str>, Value, RandomState>,
    parent: Option<Rc<Activation>>,
}

impl Activation {
    pub fn new() -> Self {
        Self {
            vars: HashMap::default(),
            parent: None,
        }
    }

    /// Builds an activation from an iterable of `(name, value)` pairs, with
    /// no parent.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Rc<str>>,
        V: Into<Value>,
    {
        let mut act = Self::new();
        for (k, v) in vars {
            act.bind(k, v);
        }
        act
    }

    /// Binds `name` to `value` in this activation, shadowing any binding of
    /// the same name in a parent activation.
    pub fn bind(&mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Stacks a fresh, empty activation on top of `self` (spec §6:
    /// "activations may be layered so a host can overlay request-scoped
    /// bindings on top of a shared base").
    pub fn child(self: &Rc<Self>) -> Self {
        Self {
            vars: HashMap::default(),
            parent: Some(Rc::clone(self)),
        }
    }

    /// Stacks a new activation already populated with `vars` on top of
    /// `self`.
    pub fn child_with<I, K, V>(self: &Rc<Self>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Rc<str>>,
        V: Into<Value>,
    {
        let mut child = self.child();
        for (k, v) in vars {
            child.bind(k, v);
        }
        child
    }

    /// Looks up `name` in this activation, then its parent chain.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.resolve(name))
    }

    /// Implements the container-qualified name resolution algorithm (spec
    /// §4.2): given the compile-time container (e.g. `"a.b"`) and a
    /// dotted-identifier path (e.g. `["c", "d"]`, from a reference to
    /// `c.d` in source), tries progressively shorter container prefixes
    /// (longest first), and within each, progressively shorter leading
    /// subpaths of `path` (longest first) as a single bound name. Returns
    /// the resolved value together with the unconsumed tail of `path`,
    /// which the caller applies as ordinary field/index selects.
    pub fn resolve_qualified<'p>(&self, container: &str, path: &'p [Rc<str>]) -> Option<(Value, &'p [Rc<str>])> {
        for prefix in container_prefixes(container) {
            for split in (1..=path.len()).rev() {
                let candidate = qualify(prefix, &path[..split]);
                if let Some(v) = self.resolve(&candidate) {
                    return Some((v, &path[split..]));
                }
            }
        }
        None
    }
}

/// Yields `container`, then each successively shorter dotted prefix of it,
/// down to and including the empty string — longest first, matching the
/// "prefer the most specific container" resolution rule.
fn container_prefixes(container: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(container);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.is_empty() {
            None
        } else {
            match current.rfind('.') {
                Some(idx) => Some(&current[..idx]),
                None => Some(""),
            }
        };
        Some(current)
    })
}

fn qualify(prefix: &str, path: &[Rc<str>]) -> String {
    let joined = path.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(".");
    if prefix.is_empty() {
        joined
    } else {
        format!("{prefix}.{joined}")
    }
}

/// The internal, borrowed name-resolution chain used while evaluating a
/// macro body: either the root [`Activation`], or one more binding layered
/// on top of an outer `Scope`.
#[derive(Clone, Copy)]
pub enum Scope<'a> {
    Root(&'a Activation),
    Frame(&'a Frame<'a>),
}

/// A single iteration-variable binding introduced by a comprehension macro
/// (spec §4.4). Never `Rc`-allocated: lives only as long as the macro
/// iteration evaluating it.
pub struct Frame<'a> {
    pub name: &'a str,
    pub value: Value,
    pub parent: Scope<'a>,
}

impl<'a> Scope<'a> {
    pub fn root(activation: &'a Activation) -> Self {
        Scope::Root(activation)
    }

    pub fn resolve(&self, name: &str) -> Option<Value> {
        match self {
            Scope::Root(activation) => activation.resolve(name),
            Scope::Frame(frame) => {
                if frame.name == name {
                    Some(frame.value.clone())
                } else {
                    frame.parent.resolve(name)
                }
            }
        }
    }

    /// Looks up `name` in the macro-frame chain only, stopping at the root
    /// rather than falling into the bare-name `Activation` lookup. Lets a
    /// caller give a macro loop variable precedence while still deferring to
    /// `Activation::resolve_qualified`'s container-prefix search for
    /// anything not bound by a frame (spec §4.2).
    pub fn resolve_frame_only(&self, name: &str) -> Option<Value> {
        match self {
            Scope::Root(_) => None,
            Scope::Frame(frame) => {
                if frame.name == name {
                    Some(frame.value.clone())
                } else {
                    frame.parent.resolve_frame_only(name)
                }
            }
        }
    }

    pub fn root_activation(&self) -> &'a Activation {
        match self {
            Scope::Root(activation) => activation,
            Scope::Frame(frame) => frame.parent.root_activation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_int(v: Option<Value>) -> Option<i64> {
        match v {
            Some(Value::Int(i)) => Some(i),
            _ => None,
        }
    }

    #[test]
    fn parent_chain_resolution() {
        let base = Rc::new(Activation::from_vars([("a", Value::Int(1))]));
        let child = base.child_with([("b", Value::Int(2))]);
        assert_eq!(as_int(child.resolve("a")), Some(1));
        assert_eq!(as_int(child.resolve("b")), Some(2));
        assert!(child.resolve("c").is_none());
    }

    #[test]
    fn child_shadows_parent() {
        let base = Rc::new(Activation::from_vars([("a", Value::Int(1))]));
        let child = base.child_with([("a", Value::Int(2))]);
        assert_eq!(as_int(child.resolve("a")), Some(2));
    }

    #[test]
    fn qualified_resolution_prefers_longest_container_then_longest_subpath() {
        let mut act = Activation::new();
        act.bind("pkg.sub.Name", Value::Int(42));
        let path: Vec<Rc<str>> = vec!["Name".into()];
        let (value, rest) = act.resolve_qualified("pkg.sub", &path).unwrap();
        assert_eq!(as_int(Some(value)), Some(42));
        assert!(rest.is_empty());
    }

    #[test]
    fn qualified_resolution_falls_back_to_bare_name() {
        let mut act = Activation::new();
        act.bind("x", Value::Int(7));
        let path: Vec<Rc<str>> = vec!["x".into()];
        let (value, rest) = act.resolve_qualified("pkg.sub", &path).unwrap();
        assert_eq!(as_int(Some(value)), Some(7));
        assert!(rest.is_empty());
    }

    #[test]
    fn qualified_resolution_leaves_unconsumed_tail_for_field_select() {
        let mut act = Activation::new();
        act.bind("pkg.Resource", Value::Int(1));
        let path: Vec<Rc<str>> = vec!["Resource".into(), "field".into()];
        let (value, rest) = act.resolve_qualified("pkg", &path).unwrap();
        assert_eq!(as_int(Some(value)), Some(1));
        assert_eq!(rest.len(), 1);
        assert_eq!(&*rest[0], "field");
    }
}
