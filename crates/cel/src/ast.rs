//! The CEL abstract syntax tree (spec §4.1).
//!
//! AST nodes are reference-counted (`Node<T> = Rc<T>`) rather than boxed,
//! following the teacher's own `ast.rs`/`expressions.rs` convention of
//! sharing subtrees cheaply instead of cloning them — useful here since a
//! compiled `Program` may be evaluated many times concurrently (spec §5)
//! and macros duplicate references to their target subtree.

use std::rc::Rc;

use crate::error::CodeLoc;

pub type Node<T> = Rc<T>;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(Rc<str>),
    Bytes(Rc<[u8]>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UnOp {
    Neg,
    Not,
}

/// The operand of a `has()` macro call: `has(e.f)` or `has(e['f'])`.
#[derive(Debug, Clone, PartialEq)]
pub enum HasKey {
    Field(Rc<str>),
    Index(ExprNode),
}

/// The four comprehension macros share the same shape: a target
/// expression, a bound iteration variable, and a predicate. `map` adds an
/// optional second (filter) predicate and a required transform.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroCall {
    Has {
        base: ExprNode,
        key: HasKey,
    },
    All {
        target: ExprNode,
        var: Rc<str>,
        predicate: ExprNode,
    },
    Exists {
        target: ExprNode,
        var: Rc<str>,
        predicate: ExprNode,
    },
    ExistsOne {
        target: ExprNode,
        var: Rc<str>,
        predicate: ExprNode,
    },
    Filter {
        target: ExprNode,
        var: Rc<str>,
        predicate: ExprNode,
    },
    Map {
        target: ExprNode,
        var: Rc<str>,
        predicate: Option<ExprNode>,
        transform: ExprNode,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(Rc<str>),
    List(Vec<ExprNode>),
    Map(Vec<(ExprNode, ExprNode)>),
    MessageConstruct {
        type_name: Rc<str>,
        fields: Vec<(Rc<str>, ExprNode)>,
    },
    /// `base.field`. Kept distinct from `Index` since a chain of `Select`
    /// nodes over an `Ident` base is what qualified-name resolution (spec
    /// §4.2) tries to flatten before falling back to plain field access.
    Select {
        base: ExprNode,
        field: Rc<str>,
    },
    Index {
        base: ExprNode,
        index: ExprNode,
    },
    /// A function or method call. `target` is `Some` for method syntax
    /// (`x.f(...)`), `None` for a free function call (`f(...)`).
    Call {
        target: Option<ExprNode>,
        func: Rc<str>,
        args: Vec<ExprNode>,
    },
    Unary(UnOp, ExprNode),
    Binary(BinOp, ExprNode, ExprNode),
    Conditional(ExprNode, ExprNode, ExprNode),
    Macro(Box<MacroCall>),
}

/// An expression node tagged with its source location, for error
/// reporting during evaluation (unresolved names, bad overloads, etc. all
/// want to say *where*).
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub expr: Node<Expr>,
    pub loc: CodeLoc,
}

impl ExprNode {
    pub fn new(expr: Expr, loc: CodeLoc) -> Self {
        Self {
            expr: Rc::new(expr),
            loc,
        }
    }

    /// If this expression is a simple dotted identifier chain (`Ident` or
    /// nested `Select` over one), returns the flattened path segments.
    /// Used by qualified-name resolution (spec §4.2); returns `None` for
    /// anything involving a call or index, which always resolves by plain
    /// value-at-a-time selection instead.
    pub fn qualified_path(&self) -> Option<Vec<Rc<str>>> {
        match self.expr.as_ref() {
            Expr::Ident(name) => Some(vec![name.clone()]),
            Expr::Select { base, field } => {
                let mut path = base.qualified_path()?;
                path.push(field.clone());
                Some(path)
            }
            _ => None,
        }
    }
}
