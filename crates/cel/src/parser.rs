//! Recursive-descent parser implementing the precedence chain from spec
//! §4.1:
//!
//! ```text
//! conditional < || < && < equality < relational < in < additive
//!   < multiplicative < unary < postfix(select/index/call) < primary
//! ```
//!
//! Macro calls (`has`, `all`, `exists`, `exists_one`, `filter`, `map`) are
//! recognized at parse time: a free-function call whose name matches one
//! of the six and whose argument shapes fit is rewritten directly into an
//! `Expr::Macro` node rather than staying a `Call`, so the evaluator never
//! has to special-case "is this identifier actually a macro".

use std::rc::Rc;

use crate::ast::{BinOp, Expr, ExprNode, HasKey, Literal, MacroCall, UnOp};
use crate::error::{CodeLoc, SyntaxError, SyntaxErrorKind};
use crate::lexer::{tokenize, SpannedTok, Tok, INT_MIN_MAGNITUDE};

pub fn parse(src: &str) -> Result<ExprNode, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_conditional()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<SpannedTok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos].tok
    }

    fn loc(&self) -> CodeLoc {
        self.tokens[self.pos].loc
    }

    fn bump(&mut self) -> SpannedTok {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), SyntaxError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {tok:?}")))
        }
    }

    fn expect_eof(&mut self) -> Result<(), SyntaxError> {
        if matches!(self.peek(), Tok::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("expected end of input"))
        }
    }

    fn unexpected(&self, message: &str) -> SyntaxError {
        SyntaxError {
            kind: SyntaxErrorKind::UnexpectedToken,
            message: message.to_owned(),
            location: self.loc(),
            token: self.peek().describe(),
        }
    }

    // conditional := or ('?' conditional ':' conditional)?
    fn parse_conditional(&mut self) -> Result<ExprNode, SyntaxError> {
        let cond = self.parse_or()?;
        if self.eat(&Tok::Question) {
            let loc = cond.loc;
            let then_branch = self.parse_conditional()?;
            self.expect(&Tok::Colon)?;
            let else_branch = self.parse_conditional()?;
            return Ok(ExprNode::new(Expr::Conditional(cond, then_branch, else_branch), loc));
        }
        Ok(cond)
    }

    // or := and ('||' and)*
    fn parse_or(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Tok::OrOr) {
            let loc = lhs.loc;
            let rhs = self.parse_and()?;
            lhs = ExprNode::new(Expr::Binary(BinOp::Or, lhs, rhs), loc);
        }
        Ok(lhs)
    }

    // and := equality ('&&' equality)*
    fn parse_and(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&Tok::AndAnd) {
            let loc = lhs.loc;
            let rhs = self.parse_equality()?;
            lhs = ExprNode::new(Expr::Binary(BinOp::And, lhs, rhs), loc);
        }
        Ok(lhs)
    }

    // equality := relational (('==' | '!=') relational)*
    fn parse_equality(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Tok::EqEq => BinOp::Eq,
                Tok::NotEq => BinOp::Ne,
                _ => break,
            };
            let loc = lhs.loc;
            self.bump();
            let rhs = self.parse_relational()?;
            lhs = ExprNode::new(Expr::Binary(op, lhs, rhs), loc);
        }
        Ok(lhs)
    }

    // relational := in (('<' | '<=' | '>' | '>=') in)*
    fn parse_relational(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut lhs = self.parse_in()?;
        loop {
            let op = match self.peek() {
                Tok::Lt => BinOp::Lt,
                Tok::Le => BinOp::Le,
                Tok::Gt => BinOp::Gt,
                Tok::Ge => BinOp::Ge,
                _ => break,
            };
            let loc = lhs.loc;
            self.bump();
            let rhs = self.parse_in()?;
            lhs = ExprNode::new(Expr::Binary(op, lhs, rhs), loc);
        }
        Ok(lhs)
    }

    // in := additive ('in' additive)*
    fn parse_in(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut lhs = self.parse_additive()?;
        while self.eat(&Tok::In) {
            let loc = lhs.loc;
            let rhs = self.parse_additive()?;
            lhs = ExprNode::new(Expr::Binary(BinOp::In, lhs, rhs), loc);
        }
        Ok(lhs)
    }

    // additive := multiplicative (('+' | '-') multiplicative)*
    fn parse_additive(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => break,
            };
            let loc = lhs.loc;
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = ExprNode::new(Expr::Binary(op, lhs, rhs), loc);
        }
        Ok(lhs)
    }

    // multiplicative := unary (('*' | '/' | '%') unary)*
    fn parse_multiplicative(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::Percent => BinOp::Mod,
                _ => break,
            };
            let loc = lhs.loc;
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = ExprNode::new(Expr::Binary(op, lhs, rhs), loc);
        }
        Ok(lhs)
    }

    // unary := ('!' | '-')* postfix
    //
    // CEL collapses repeated `!`/`-` rather than nesting them arbitrarily
    // deep; we just build the nested-unary AST and let constant folding be
    // the evaluator's problem, matching the grammar in spec §4.1 which
    // allows (and means) `!!true == true`, `--1 == 1`.
    fn parse_unary(&mut self) -> Result<ExprNode, SyntaxError> {
        let loc = self.loc();
        if self.eat(&Tok::Bang) {
            let operand = self.parse_unary()?;
            return Ok(ExprNode::new(Expr::Unary(UnOp::Not, operand), loc));
        }
        if self.eat(&Tok::Minus) {
            // `9223372036854775808` (2^63) doesn't fit i64 as a positive
            // literal, but it's the magnitude of i64::MIN — fold the sign
            // in here so `-9223372036854775808` evaluates to i64::MIN
            // instead of failing to parse (spec §8). A later negation or
            // subtraction against it then overflows normally, as a range
            // error rather than a syntax error.
            if let &Tok::IntOverflow(magnitude) = self.peek() {
                if magnitude == INT_MIN_MAGNITUDE {
                    self.bump();
                    let lit = ExprNode::new(Expr::Literal(Literal::Int(i64::MIN)), loc);
                    return self.apply_postfix(lit);
                }
            }
            let operand = self.parse_unary()?;
            return Ok(ExprNode::new(Expr::Unary(UnOp::Neg, operand), loc));
        }
        self.parse_postfix()
    }

    // postfix := primary ('.' ident ('(' args ')')? | '[' expr ']')*
    fn parse_postfix(&mut self) -> Result<ExprNode, SyntaxError> {
        let expr = self.parse_primary()?;
        self.apply_postfix(expr)
    }

    fn apply_postfix(&mut self, mut expr: ExprNode) -> Result<ExprNode, SyntaxError> {
        loop {
            match self.peek() {
                Tok::Dot => {
                    let loc = expr.loc;
                    self.bump();
                    let name = self.expect_ident()?;
                    if self.eat(&Tok::LParen) {
                        let args = self.parse_args(&Tok::RParen)?;
                        if let Some(macro_call) = try_build_receiver_macro(&name, expr.clone(), &args, loc)? {
                            expr = ExprNode::new(Expr::Macro(Box::new(macro_call)), loc);
                        } else {
                            expr = ExprNode::new(
                                Expr::Call {
                                    target: Some(expr),
                                    func: name,
                                    args,
                                },
                                loc,
                            );
                        }
                    } else {
                        expr = ExprNode::new(Expr::Select { base: expr, field: name }, loc);
                    }
                }
                Tok::LBracket => {
                    let loc = expr.loc;
                    self.bump();
                    let index = self.parse_conditional()?;
                    self.expect(&Tok::RBracket)?;
                    expr = ExprNode::new(Expr::Index { base: expr, index }, loc);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn expect_ident(&mut self) -> Result<Rc<str>, SyntaxError> {
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.bump();
                Ok(name)
            }
            _ => Err(self.unexpected("expected identifier")),
        }
    }

    fn parse_args(&mut self, closing: &Tok) -> Result<Vec<ExprNode>, SyntaxError> {
        let mut args = Vec::new();
        if self.peek() == closing {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.parse_conditional()?);
            if self.eat(&Tok::Comma) {
                if self.peek() == closing {
                    self.bump();
                    break;
                }
                continue;
            }
            self.expect(closing)?;
            break;
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<ExprNode, SyntaxError> {
        let loc = self.loc();
        let tok = self.bump();
        match tok.tok {
            Tok::Int(n) => Ok(ExprNode::new(Expr::Literal(Literal::Int(n)), loc)),
            Tok::IntOverflow(n) => Err(SyntaxError {
                kind: SyntaxErrorKind::InvalidNumber,
                message: "integer literal out of range".to_owned(),
                location: loc,
                token: n.to_string(),
            }),
            Tok::Uint(n) => Ok(ExprNode::new(Expr::Literal(Literal::Uint(n)), loc)),
            Tok::Double(n) => Ok(ExprNode::new(Expr::Literal(Literal::Double(n)), loc)),
            Tok::Str(s) => Ok(ExprNode::new(Expr::Literal(Literal::String(s)), loc)),
            Tok::Bytes(b) => Ok(ExprNode::new(Expr::Literal(Literal::Bytes(b)), loc)),
            Tok::True => Ok(ExprNode::new(Expr::Literal(Literal::Bool(true)), loc)),
            Tok::False => Ok(ExprNode::new(Expr::Literal(Literal::Bool(false)), loc)),
            Tok::Null => Ok(ExprNode::new(Expr::Literal(Literal::Null), loc)),
            Tok::LParen => {
                let inner = self.parse_conditional()?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Tok::LBracket => {
                let items = self.parse_args(&Tok::RBracket)?;
                Ok(ExprNode::new(Expr::List(items), loc))
            }
            Tok::LBrace => {
                let entries = self.parse_map_entries()?;
                Ok(ExprNode::new(Expr::Map(entries), loc))
            }
            Tok::Ident(name) => self.parse_ident_led(name, loc),
            other => Err(SyntaxError {
                kind: SyntaxErrorKind::UnexpectedToken,
                message: "expected an expression".to_owned(),
                location: loc,
                token: other.describe(),
            }),
        }
    }

    fn parse_map_entries(&mut self) -> Result<Vec<(ExprNode, ExprNode)>, SyntaxError> {
        let mut entries = Vec::new();
        if self.eat(&Tok::RBrace) {
            return Ok(entries);
        }
        loop {
            let key = self.parse_conditional()?;
            self.expect(&Tok::Colon)?;
            let value = self.parse_conditional()?;
            entries.push((key, value));
            if self.eat(&Tok::Comma) {
                if self.eat(&Tok::RBrace) {
                    break;
                }
                continue;
            }
            self.expect(&Tok::RBrace)?;
            break;
        }
        Ok(entries)
    }

    /// Handles everything that starts with a bare identifier: a qualified
    /// name (`a.b.c`, folded into nested `Select`s by `parse_postfix`), a
    /// free function call, a message-construction literal
    /// (`pkg.Type{field: value}`), or one of the six macros.
    fn parse_ident_led(&mut self, first: Rc<str>, loc: CodeLoc) -> Result<ExprNode, SyntaxError> {
        // Build up a dotted type-name/identifier path without committing
        // to Select nodes yet, so `pkg.Type{...}` can still become a
        // MessageConstruct instead of a Select chain.
        let mut path_segments = vec![first.clone()];
        let mut last_loc = loc;
        while matches!(self.peek(), Tok::Dot) {
            // Only consume the dot if it's followed by an identifier and
            // NOT itself followed by a call-parenthesis; method calls and
            // field access past this point are handled by parse_postfix.
            let save = self.pos;
            self.bump(); // '.'
            match self.peek().clone() {
                Tok::Ident(seg) => {
                    let after = self.pos + 1;
                    if matches!(self.tokens.get(after).map(|t| &t.tok), Some(Tok::LParen)) {
                        // method call target — stop here, let parse_postfix take over.
                        self.pos = save;
                        break;
                    }
                    last_loc = self.loc();
                    self.bump();
                    path_segments.push(seg);
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }

        let base_expr = if self.peek() == &Tok::LParen {
            // Free function call, e.g. `has(x.y)`, `size(list)`.
            self.bump();
            let args = self.parse_args(&Tok::RParen)?;
            if path_segments.len() == 1 {
                if let Some(macro_call) = try_build_macro(&path_segments[0], &args, loc)? {
                    return Ok(ExprNode::new(Expr::Macro(Box::new(macro_call)), loc));
                }
            }
            let func: Rc<str> = path_segments.join(".").into();
            ExprNode::new(Expr::Call { target: None, func, args }, loc)
        } else if self.peek() == &Tok::LBrace {
            self.bump();
            let fields = self.parse_message_fields()?;
            let type_name: Rc<str> = path_segments.join(".").into();
            ExprNode::new(Expr::MessageConstruct { type_name, fields }, loc)
        } else {
            let mut expr = ExprNode::new(Expr::Ident(path_segments[0].clone()), loc);
            for seg in &path_segments[1..] {
                expr = ExprNode::new(Expr::Select { base: expr, field: seg.clone() }, last_loc);
            }
            expr
        };
        Ok(base_expr)
    }

    fn parse_message_fields(&mut self) -> Result<Vec<(Rc<str>, ExprNode)>, SyntaxError> {
        let mut fields = Vec::new();
        if self.eat(&Tok::RBrace) {
            return Ok(fields);
        }
        loop {
            let name = self.expect_ident()?;
            self.expect(&Tok::Colon)?;
            let value = self.parse_conditional()?;
            fields.push((name, value));
            if self.eat(&Tok::Comma) {
                if self.eat(&Tok::RBrace) {
                    break;
                }
                continue;
            }
            self.expect(&Tok::RBrace)?;
            break;
        }
        Ok(fields)
    }
}

/// Recognizes the six macro shapes at parse time (spec §4.4). Returns
/// `Ok(None)` when `name` isn't a macro name at all (an ordinary free
/// function call), and `Err` when it IS a macro name but the argument
/// shape doesn't match — these calls are never allowed to fall through to
/// a regular function lookup, since a host-registered function named
/// `all` or `map` would silently shadow the macro otherwise (spec §4.2:
/// macro names are reserved at parse time).
fn try_build_macro(name: &str, args: &[ExprNode], loc: CodeLoc) -> Result<Option<MacroCall>, SyntaxError> {
    match name {
        "has" => {
            let [arg] = args else {
                return Err(malformed(loc, "has() takes exactly one argument"));
            };
            let (base, key) = match arg.expr.as_ref() {
                Expr::Select { base, field } => (base.clone(), HasKey::Field(field.clone())),
                Expr::Index { base, index } => (base.clone(), HasKey::Index(index.clone())),
                _ => return Err(malformed(loc, "has() argument must be a field selection or index expression")),
            };
            Ok(Some(MacroCall::Has { base, key }))
        }
        "all" | "exists" | "exists_one" | "filter" => {
            let [target, var_expr, predicate] = args else {
                return Err(malformed(loc, "expected target, iteration variable, and predicate"));
            };
            let var = ident_name(var_expr).ok_or_else(|| malformed(loc, "iteration variable must be a simple identifier"))?;
            let target = target.clone();
            let predicate = predicate.clone();
            Ok(Some(match name {
                "all" => MacroCall::All { target, var, predicate },
                "exists" => MacroCall::Exists { target, var, predicate },
                "exists_one" => MacroCall::ExistsOne { target, var, predicate },
                "filter" => MacroCall::Filter { target, var, predicate },
                _ => unreachable!(),
            }))
        }
        "map" => match args {
            [target, var_expr, transform] => {
                let var = ident_name(var_expr).ok_or_else(|| malformed(loc, "iteration variable must be a simple identifier"))?;
                Ok(Some(MacroCall::Map {
                    target: target.clone(),
                    var,
                    predicate: None,
                    transform: transform.clone(),
                }))
            }
            [target, var_expr, predicate, transform] => {
                let var = ident_name(var_expr).ok_or_else(|| malformed(loc, "iteration variable must be a simple identifier"))?;
                Ok(Some(MacroCall::Map {
                    target: target.clone(),
                    var,
                    predicate: Some(predicate.clone()),
                    transform: transform.clone(),
                }))
            }
            _ => Err(malformed(loc, "map() takes (target, var, transform) or (target, var, predicate, transform)")),
        },
        _ => Ok(None),
    }
}

/// Recognizes the five comprehension macros in their canonical
/// receiver-call form (`x.all(var, pred)`, spec §4.1), where `target` is
/// already parsed as the postfix chain's base expression and `args` holds
/// only the macro's own parameters. `has` has no receiver form — it is
/// always written `has(e.f)` — so it is not handled here.
fn try_build_receiver_macro(name: &str, target: ExprNode, args: &[ExprNode], loc: CodeLoc) -> Result<Option<MacroCall>, SyntaxError> {
    match name {
        "all" | "exists" | "exists_one" | "filter" => {
            let [var_expr, predicate] = args else {
                return Ok(None);
            };
            let Some(var) = ident_name(var_expr) else {
                return Ok(None);
            };
            let predicate = predicate.clone();
            Ok(Some(match name {
                "all" => MacroCall::All { target, var, predicate },
                "exists" => MacroCall::Exists { target, var, predicate },
                "exists_one" => MacroCall::ExistsOne { target, var, predicate },
                "filter" => MacroCall::Filter { target, var, predicate },
                _ => unreachable!(),
            }))
        }
        "map" => match args {
            [var_expr, transform] => {
                let Some(var) = ident_name(var_expr) else {
                    return Ok(None);
                };
                Ok(Some(MacroCall::Map {
                    target,
                    var,
                    predicate: None,
                    transform: transform.clone(),
                }))
            }
            [var_expr, predicate, transform] => {
                let Some(var) = ident_name(var_expr) else {
                    return Ok(None);
                };
                Ok(Some(MacroCall::Map {
                    target,
                    var,
                    predicate: Some(predicate.clone()),
                    transform: transform.clone(),
                }))
            }
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

fn ident_name(expr: &ExprNode) -> Option<Rc<str>> {
    match expr.expr.as_ref() {
        Expr::Ident(name) => Some(name.clone()),
        _ => None,
    }
}

fn malformed(loc: CodeLoc, message: &str) -> SyntaxError {
    SyntaxError {
        kind: SyntaxErrorKind::UnexpectedToken,
        message: message.to_owned(),
        location: loc,
        token: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> ExprNode {
        parse(src).unwrap_or_else(|e| panic!("failed to parse {src:?}: {e}"))
    }

    #[test]
    fn arithmetic_precedence() {
        let ast = parse_ok("1 + 2 * 3");
        match ast.expr.as_ref() {
            Expr::Binary(BinOp::Add, lhs, rhs) => {
                assert!(matches!(lhs.expr.as_ref(), Expr::Literal(Literal::Int(1))));
                assert!(matches!(rhs.expr.as_ref(), Expr::Binary(BinOp::Mul, _, _)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn conditional_ternary() {
        let ast = parse_ok("true ? 1 : 2");
        assert!(matches!(ast.expr.as_ref(), Expr::Conditional(_, _, _)));
    }

    #[test]
    fn qualified_name_chain() {
        let ast = parse_ok("a.b.c");
        assert_eq!(
            ast.qualified_path().unwrap(),
            vec![Rc::from("a"), Rc::from("b"), Rc::from("c")]
        );
    }

    #[test]
    fn method_call_vs_field_select() {
        let ast = parse_ok("a.b.f(1)");
        match ast.expr.as_ref() {
            Expr::Call { target: Some(t), func, args } => {
                assert_eq!(&**func, "f");
                assert_eq!(args.len(), 1);
                assert_eq!(t.qualified_path().unwrap(), vec![Rc::from("a"), Rc::from("b")]);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn has_macro() {
        let ast = parse_ok("has(a.b)");
        match ast.expr.as_ref() {
            Expr::Macro(m) => match m.as_ref() {
                MacroCall::Has { key: HasKey::Field(f), .. } => assert_eq!(&**f, "b"),
                other => panic!("unexpected macro: {other:?}"),
            },
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn all_macro() {
        let ast = parse_ok("[1, 2].all(x, x > 0)");
        assert!(matches!(ast.expr.as_ref(), Expr::Macro(m) if matches!(m.as_ref(), MacroCall::All { .. })));
    }

    #[test]
    fn map_macro_with_and_without_filter() {
        let two_arg = parse_ok("[1, 2].map(x, x * 2)");
        assert!(matches!(two_arg.expr.as_ref(), Expr::Macro(m) if matches!(m.as_ref(), MacroCall::Map { predicate: None, .. })));
        let three_arg = parse_ok("[1, 2].map(x, x > 0, x * 2)");
        assert!(matches!(three_arg.expr.as_ref(), Expr::Macro(m) if matches!(m.as_ref(), MacroCall::Map { predicate: Some(_), .. })));
    }

    #[test]
    fn message_construction() {
        let ast = parse_ok("pkg.Type{field: 1}");
        match ast.expr.as_ref() {
            Expr::MessageConstruct { type_name, fields } => {
                assert_eq!(&**type_name, "pkg.Type");
                assert_eq!(fields.len(), 1);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn map_literal() {
        let ast = parse_ok(r#"{"a": 1, "b": 2}"#);
        assert!(matches!(ast.expr.as_ref(), Expr::Map(entries) if entries.len() == 2));
    }

    #[test]
    fn index_expression() {
        let ast = parse_ok("a[0]");
        assert!(matches!(ast.expr.as_ref(), Expr::Index { .. }));
    }

    #[test]
    fn in_operator() {
        let ast = parse_ok("1 in [1, 2]");
        assert!(matches!(ast.expr.as_ref(), Expr::Binary(BinOp::In, _, _)));
    }

    #[test]
    fn double_negation_nests() {
        let ast = parse_ok("!!true");
        assert!(matches!(ast.expr.as_ref(), Expr::Unary(UnOp::Not, inner) if matches!(inner.expr.as_ref(), Expr::Unary(UnOp::Not, _))));
    }

    #[test]
    fn negated_int_min_magnitude_folds_into_a_single_literal() {
        let ast = parse_ok("-9223372036854775808");
        assert!(matches!(ast.expr.as_ref(), Expr::Literal(Literal::Int(i64::MIN))));
    }

    #[test]
    fn unnegated_int_min_magnitude_is_a_syntax_error() {
        assert!(parse("9223372036854775808").is_err());
    }

    #[test]
    fn double_negated_int_min_magnitude_stays_a_unary_neg() {
        let ast = parse_ok("-(-9223372036854775808)");
        match ast.expr.as_ref() {
            Expr::Unary(UnOp::Neg, inner) => assert!(matches!(inner.expr.as_ref(), Expr::Literal(Literal::Int(i64::MIN)))),
            other => panic!("unexpected shape: {other:?}"),
        }
    }
}
