//! Error taxonomy shared by the parser and evaluator.
//!
//! Mirrors the teacher's own hand-rolled `ParseError`/`ResourceError` style:
//! a plain enum with a `Display` impl, no `thiserror`. The core library
//! never forces a particular error-handling crate on the host.

use std::fmt;

/// A position in CEL source text used for diagnostics.
///
/// Lines are 1-indexed, columns are 0-indexed code-point offsets from the
/// start of the line, matching the convention most CLI tools use when
/// printing `file:line:col`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl CodeLoc {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The kind of a syntax error. Kept separate from the message so hosts can
/// branch on it without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnexpectedToken,
    UnexpectedEof,
    InvalidEscape,
    InvalidNumber,
    InvalidUtf8,
    ReservedIdentifier,
}

/// A parse-time syntax error: "the parser rejected the source" (spec §4.1,
/// §7). Carries enough information to reproduce the teacher's style of
/// diagnostic: file-less source, line, column, and the offending token.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    pub location: CodeLoc,
    pub token: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at {}: {} (near {:?})",
            self.location, self.message, self.token
        )
    }
}

impl std::error::Error for SyntaxError {}

/// The kind of an evaluation-time error, per spec §7's taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NoSuchOverload,
    NoSuchKey,
    NoSuchField,
    InvalidArgument,
    Range,
    DivideByZero,
    ModulusByZero,
    UnknownVariable,
    Conversion,
    InvalidUtf8,
}

/// An evaluation error: "a structured error value containing the kind and
/// a human-readable message" (spec §7).
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_such_overload(op: impl fmt::Display, operand_kinds: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::NoSuchOverload,
            format!("no such overload: {op}({operand_kinds})"),
        )
    }

    pub fn unknown_variable(name: impl fmt::Display) -> Self {
        Self::new(ErrorKind::UnknownVariable, format!("unknown variable: {name}"))
    }

    pub fn no_such_key(key: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NoSuchKey, format!("no such key: {key}"))
    }

    pub fn no_such_field(field: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NoSuchField, format!("no such field: {field}"))
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message.into())
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conversion, message.into())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EvalError {}

/// Errors a host may see when compiling source into a `Program`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Syntax(SyntaxError),
    /// A macro call was used with the wrong shape, e.g. `has(1, 2)`.
    MalformedMacro { message: String, location: CodeLoc },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(e) => e.fmt(f),
            Self::MalformedMacro { message, location } => {
                write!(f, "malformed macro at {location}: {message}")
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<SyntaxError> for CompileError {
    fn from(e: SyntaxError) -> Self {
        Self::Syntax(e)
    }
}

pub type CelResult<T> = Result<T, EvalError>;
