//! The host-facing compile/evaluate API (spec §6), mirroring the shape of
//! the teacher's own `Runner`: construct once, reuse across many
//! evaluations, with compilation and evaluation kept as separate steps so
//! a host can cache a compiled `Program` and run it repeatedly against
//! different activations.

use std::rc::Rc;

use crate::activation::Activation;
use crate::ast::ExprNode;
use crate::error::{CelResult, CompileError};
use crate::eval::{self, EvalContext};
use crate::function::Registry;
use crate::parser;
use crate::value::Value;

/// A compilation and function-registration context. Analogous to the
/// teacher's `Runner`: one long-lived `Environment` per host configuration,
/// producing any number of [`Program`]s.
pub struct Environment {
    registry: Registry,
    container: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            container: String::new(),
        }
    }

    /// Sets the compile-time container used for qualified-name resolution
    /// (spec §4.2), e.g. `"google.rpc.context"`.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Registers a host function or receiver method. See
    /// [`Registry::register`].
    pub fn register_function(
        &mut self,
        name: impl Into<Rc<str>>,
        receiver_kind: Option<crate::value::Kind>,
        arg_kinds: Vec<Option<crate::value::Kind>>,
        func: impl Fn(Option<&Value>, &[Value]) -> CelResult<Value> + 'static,
    ) -> Result<(), crate::error::EvalError> {
        self.registry.register(name, receiver_kind, arg_kinds, func)
    }

    /// Parses `source` into an [`Ast`], the first phase of spec §5's
    /// compile/evaluate split.
    pub fn compile(&self, source: &str) -> Result<Ast, CompileError> {
        let expr = parser::parse(source)?;
        Ok(Ast { expr })
    }

    fn eval_context(&self) -> EvalContext<'_> {
        EvalContext {
            registry: &self.registry,
            container: &self.container,
        }
    }
}

/// A parsed, not-yet-bound expression. Cheap to clone (the AST is
/// `Rc`-linked throughout, spec §4.1), so hosts can compile once and
/// derive many [`Program`]s from it if needed.
#[derive(Clone)]
pub struct Ast {
    expr: ExprNode,
}

impl Ast {
    /// Binds this `Ast` to `env`'s function registry and container,
    /// producing a [`Program`] ready to evaluate.
    pub fn program<'env>(&self, env: &'env Environment) -> Result<Program<'env>, CompileError> {
        Ok(Program {
            expr: self.expr.clone(),
            env,
        })
    }
}

/// A compiled expression bound to an [`Environment`]. Stateless beyond
/// that binding: the same `Program` may be evaluated concurrently against
/// different activations (spec §5), since evaluation never mutates the
/// AST or the registry.
pub struct Program<'env> {
    expr: ExprNode,
    env: &'env Environment,
}

impl Program<'_> {
    pub fn evaluate(&self, activation: &Activation) -> CelResult<Value> {
        let ctx = self.env.eval_context();
        eval::eval(&self.expr, activation, &ctx)
    }
}

/// One-shot convenience: parses, binds to a fresh default [`Environment`],
/// and evaluates `source` against `activation` in a single call (spec §6).
pub fn eval(source: &str, activation: &Activation) -> CelResult<Value> {
    let env = Environment::new();
    let ast = env.compile(source).map_err(|e| crate::error::EvalError::invalid_argument(e.to_string()))?;
    let program = ast
        .program(&env)
        .map_err(|e| crate::error::EvalError::invalid_argument(e.to_string()))?;
    program.evaluate(activation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_and_evaluate() {
        let env = Environment::new();
        let program = env.compile("40 + 2").unwrap().program(&env).unwrap();
        let activation = Activation::new();
        match program.evaluate(&activation).unwrap() {
            Value::Int(42) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn one_shot_eval() {
        let activation = Activation::new();
        match eval("1 + 1", &activation).unwrap() {
            Value::Int(2) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn container_qualified_lookup() {
        let env = Environment::new().with_container("pkg.sub");
        let mut activation = Activation::new();
        activation.bind("pkg.sub.Name", Value::Int(7));
        let program = env.compile("Name").unwrap().program(&env).unwrap();
        match program.evaluate(&activation).unwrap() {
            Value::Int(7) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }
}
