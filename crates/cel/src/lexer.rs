//! Hand-written lexer for CEL source text (spec §4.1).
//!
//! The teacher's own parser wraps an external, Python-specific grammar
//! (`ruff_python_parser`), and the one in-pack example of a custom
//! expression grammar (`emdash-udashboard`) generates its parser with
//! `lalrpop`. Neither transfers directly: CEL's grammar needs custom
//! string/byte-literal lexing (raw strings, numeric and Unicode escapes)
//! that a parser-generator's built-in tokenizer doesn't give you for free,
//! and a hand-authored `.lalrpop` grammar file can't be checked by a build
//! step in this exercise. A hand-written recursive-descent lexer and
//! parser (below, and in `parser.rs`) avoids that risk while keeping the
//! same shape the teacher's `parse.rs` uses: a `Parser`-like struct that
//! walks source positions and reports structured, located errors.

use std::rc::Rc;

use crate::error::{CodeLoc, SyntaxError, SyntaxErrorKind};

/// Magnitude of `i64::MIN`: the one positive integer literal that doesn't
/// fit `i64` but whose text is valid immediately after a unary `-` (spec
/// §8: `-9223372036854775808` must evaluate to `i64::MIN`, not fail to
/// lex).
pub const INT_MIN_MAGNITUDE: u64 = 9_223_372_036_854_775_808;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Int(i64),
    /// An integer literal whose digits overflow `i64` as a positive value.
    /// Only valid in the parser immediately after a unary `-` when the
    /// magnitude is exactly [`INT_MIN_MAGNITUDE`]; anywhere else it's a
    /// range error.
    IntOverflow(u64),
    Uint(u64),
    Double(f64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    Ident(Rc<str>),
    True,
    False,
    Null,
    In,
    Dot,
    Comma,
    Colon,
    Question,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Eof,
}

impl Tok {
    /// A short human name for error messages, e.g. `"'=='"`.
    pub fn describe(&self) -> String {
        match self {
            Tok::Int(n) => n.to_string(),
            Tok::IntOverflow(n) => n.to_string(),
            Tok::Uint(n) => format!("{n}u"),
            Tok::Double(n) => n.to_string(),
            Tok::Str(s) => format!("{s:?}"),
            Tok::Bytes(b) => format!("b{:?}", b),
            Tok::Ident(s) => s.to_string(),
            Tok::True => "true".into(),
            Tok::False => "false".into(),
            Tok::Null => "null".into(),
            Tok::In => "in".into(),
            Tok::Eof => "<eof>".into(),
            other => format!("{other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedTok {
    pub tok: Tok,
    pub loc: CodeLoc,
}

struct Cursor<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
            col: 0,
        }
    }

    fn loc(&self) -> CodeLoc {
        CodeLoc::new(self.line, self.col)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.byte_pos()..].chars().nth(offset)
    }

    fn byte_pos(&mut self) -> usize {
        self.chars.peek().map_or(self.src.len(), |&(i, _)| i)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }
}

pub fn tokenize(src: &str) -> Result<Vec<SpannedTok>, SyntaxError> {
    let mut cursor = Cursor::new(src);
    let mut out = Vec::new();
    loop {
        skip_trivia(&mut cursor);
        let loc = cursor.loc();
        let Some(c) = cursor.peek() else {
            out.push(SpannedTok { tok: Tok::Eof, loc });
            break;
        };
        let tok = if c.is_ascii_digit() {
            lex_number(&mut cursor)?
        } else if is_ident_start(c) {
            lex_ident_or_prefixed_string(&mut cursor)?
        } else if c == '"' || c == '\'' {
            let s = lex_string(&mut cursor, false, false)?;
            Tok::Str(s.into())
        } else {
            lex_operator(&mut cursor, loc)?
        };
        out.push(SpannedTok { tok, loc });
    }
    Ok(out)
}

fn skip_trivia(cursor: &mut Cursor<'_>) {
    loop {
        match cursor.peek() {
            Some(c) if c.is_whitespace() => {
                cursor.bump();
            }
            Some('/') if cursor.peek_at(1) == Some('/') => {
                while let Some(c) = cursor.peek() {
                    if c == '\n' {
                        break;
                    }
                    cursor.bump();
                }
            }
            _ => break,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}
fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn lex_ident_or_prefixed_string(cursor: &mut Cursor<'_>) -> Result<Tok, SyntaxError> {
    let start_loc = cursor.loc();
    let mut ident = String::new();
    while let Some(c) = cursor.peek() {
        if is_ident_continue(c) {
            ident.push(c);
            cursor.bump();
        } else {
            break;
        }
    }

    // String/byte literal prefixes: r"...", R"...", b"...", B"...",
    // br"...", rb"..." (any case/order combination of one `b` and one `r`).
    let lower = ident.to_ascii_lowercase();
    let is_prefix_candidate = matches!(lower.as_str(), "r" | "b" | "br" | "rb");
    if is_prefix_candidate {
        if let Some(quote) = cursor.peek() {
            if quote == '"' || quote == '\'' {
                let raw = lower.contains('r');
                let bytes = lower.contains('b');
                if bytes {
                    let data = lex_byte_string(cursor, raw)?;
                    return Ok(Tok::Bytes(data.into()));
                }
                let s = lex_string(cursor, raw, false)?;
                return Ok(Tok::Str(s.into()));
            }
        }
    }

    Ok(match ident.as_str() {
        "true" => Tok::True,
        "false" => Tok::False,
        "null" => Tok::Null,
        "in" => Tok::In,
        _ => {
            if ident.is_empty() {
                return Err(syntax_err(
                    SyntaxErrorKind::UnexpectedToken,
                    "unexpected character",
                    start_loc,
                    String::new(),
                ));
            }
            Tok::Ident(ident.into())
        }
    })
}

fn lex_number(cursor: &mut Cursor<'_>) -> Result<Tok, SyntaxError> {
    let loc = cursor.loc();
    let mut text = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
        text.push(cursor.bump().unwrap());
    }
    let mut is_double = false;
    if cursor.peek() == Some('.') && matches!(cursor.peek_at(1), Some(c) if c.is_ascii_digit()) {
        is_double = true;
        text.push(cursor.bump().unwrap());
        while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(cursor.bump().unwrap());
        }
    }
    if matches!(cursor.peek(), Some('e') | Some('E')) {
        let save_text_len = text.len();
        let mut exp = String::new();
        exp.push(cursor.bump().unwrap());
        if matches!(cursor.peek(), Some('+') | Some('-')) {
            exp.push(cursor.bump().unwrap());
        }
        if matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
            while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
                exp.push(cursor.bump().unwrap());
            }
            text.push_str(&exp);
            is_double = true;
        } else {
            // Not actually an exponent (e.g. `1e` followed by an
            // identifier); leave text as-is and let the `e`/`E` be
            // re-lexed as its own token next.
            debug_assert_eq!(text.len(), save_text_len);
        }
    }
    if is_double {
        let value: f64 = text
            .parse()
            .map_err(|_| syntax_err(SyntaxErrorKind::InvalidNumber, "invalid double literal", loc, text.clone()))?;
        Ok(Tok::Double(value))
    } else if cursor.peek() == Some('u') || cursor.peek() == Some('U') {
        cursor.bump();
        let value: u64 = text
            .parse()
            .map_err(|_| syntax_err(SyntaxErrorKind::InvalidNumber, "invalid uint literal", loc, text.clone()))?;
        Ok(Tok::Uint(value))
    } else if let Ok(value) = text.parse::<i64>() {
        Ok(Tok::Int(value))
    } else {
        // Doesn't fit i64 as a positive value. `9223372036854775808` (2^63)
        // is still a legal token text — it's the magnitude of i64::MIN,
        // valid once the parser folds a preceding unary `-` into it — so
        // hand it back as Tok::IntOverflow instead of failing here; any
        // other out-of-range digit string still errors below.
        let magnitude: u64 = text
            .parse()
            .map_err(|_| syntax_err(SyntaxErrorKind::InvalidNumber, "invalid int literal", loc, text.clone()))?;
        Ok(Tok::IntOverflow(magnitude))
    }
}

fn lex_string(cursor: &mut Cursor<'_>, raw: bool, _in_bytes: bool) -> Result<String, SyntaxError> {
    let loc = cursor.loc();
    let quote = cursor.bump().expect("caller checked quote present");
    let mut out = String::new();
    loop {
        let Some(c) = cursor.peek() else {
            return Err(syntax_err(
                SyntaxErrorKind::UnexpectedEof,
                "unterminated string literal",
                loc,
                out,
            ));
        };
        if c == quote {
            cursor.bump();
            break;
        }
        if c == '\\' && !raw {
            cursor.bump();
            out.push(lex_escape(cursor, loc)?);
            continue;
        }
        out.push(c);
        cursor.bump();
    }
    Ok(out)
}

fn lex_byte_string(cursor: &mut Cursor<'_>, raw: bool) -> Result<Vec<u8>, SyntaxError> {
    let loc = cursor.loc();
    let quote = cursor.bump().expect("caller checked quote present");
    let mut out = Vec::new();
    loop {
        let Some(c) = cursor.peek() else {
            return Err(syntax_err(
                SyntaxErrorKind::UnexpectedEof,
                "unterminated bytes literal",
                loc,
                String::from_utf8_lossy(&out).into_owned(),
            ));
        };
        if c == quote {
            cursor.bump();
            break;
        }
        if c == '\\' && !raw {
            cursor.bump();
            lex_byte_escape(cursor, loc, &mut out)?;
            continue;
        }
        let mut buf = [0u8; 4];
        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        cursor.bump();
    }
    Ok(out)
}

fn lex_escape(cursor: &mut Cursor<'_>, loc: CodeLoc) -> Result<char, SyntaxError> {
    let Some(c) = cursor.bump() else {
        return Err(syntax_err(SyntaxErrorKind::InvalidEscape, "dangling escape", loc, String::new()));
    };
    Ok(match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'a' => '\u{07}',
        'b' => '\u{08}',
        'f' => '\u{0C}',
        'v' => '\u{0B}',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        '?' => '?',
        '`' => '`',
        'x' | 'X' => {
            let hex = take_hex(cursor, 2, loc)?;
            char::from_u32(hex).ok_or_else(|| invalid_escape(loc))?
        }
        'u' => {
            let hex = take_hex(cursor, 4, loc)?;
            char::from_u32(hex).ok_or_else(|| invalid_escape(loc))?
        }
        'U' => {
            let hex = take_hex(cursor, 8, loc)?;
            char::from_u32(hex).ok_or_else(|| invalid_escape(loc))?
        }
        '0'..='7' => {
            let mut digits = String::new();
            digits.push(c);
            for _ in 0..2 {
                match cursor.peek() {
                    Some(d) if ('0'..='7').contains(&d) => {
                        digits.push(d);
                        cursor.bump();
                    }
                    _ => break,
                }
            }
            let code = u32::from_str_radix(&digits, 8).map_err(|_| invalid_escape(loc))?;
            char::from_u32(code).ok_or_else(|| invalid_escape(loc))?
        }
        other => return Err(syntax_err(SyntaxErrorKind::InvalidEscape, "unknown escape sequence", loc, other.to_string())),
    })
}

/// Byte-string escapes decode byte-wise; Unicode escapes are forbidden
/// (spec §4.1).
fn lex_byte_escape(cursor: &mut Cursor<'_>, loc: CodeLoc, out: &mut Vec<u8>) -> Result<(), SyntaxError> {
    let Some(c) = cursor.bump() else {
        return Err(syntax_err(SyntaxErrorKind::InvalidEscape, "dangling escape", loc, String::new()));
    };
    match c {
        'n' => out.push(b'\n'),
        'r' => out.push(b'\r'),
        't' => out.push(b'\t'),
        'a' => out.push(0x07),
        'b' => out.push(0x08),
        'f' => out.push(0x0C),
        'v' => out.push(0x0B),
        '\\' => out.push(b'\\'),
        '\'' => out.push(b'\''),
        '"' => out.push(b'"'),
        '?' => out.push(b'?'),
        '`' => out.push(b'`'),
        'x' | 'X' => out.push(take_hex(cursor, 2, loc)? as u8),
        '0'..='7' => {
            let mut digits = String::new();
            digits.push(c);
            for _ in 0..2 {
                match cursor.peek() {
                    Some(d) if ('0'..='7').contains(&d) => {
                        digits.push(d);
                        cursor.bump();
                    }
                    _ => break,
                }
            }
            let code = u32::from_str_radix(&digits, 8).map_err(|_| invalid_escape(loc))?;
            out.push(code as u8);
        }
        'u' | 'U' => {
            return Err(syntax_err(
                SyntaxErrorKind::InvalidEscape,
                "Unicode escapes are forbidden in byte literals",
                loc,
                c.to_string(),
            ));
        }
        other => {
            return Err(syntax_err(
                SyntaxErrorKind::InvalidEscape,
                "unknown escape sequence",
                loc,
                other.to_string(),
            ));
        }
    }
    Ok(())
}

fn take_hex(cursor: &mut Cursor<'_>, n: usize, loc: CodeLoc) -> Result<u32, SyntaxError> {
    let mut digits = String::new();
    for _ in 0..n {
        match cursor.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(c);
                cursor.bump();
            }
            _ => return Err(invalid_escape(loc)),
        }
    }
    u32::from_str_radix(&digits, 16).map_err(|_| invalid_escape(loc))
}

fn invalid_escape(loc: CodeLoc) -> SyntaxError {
    syntax_err(SyntaxErrorKind::InvalidEscape, "invalid escape sequence", loc, String::new())
}

fn lex_operator(cursor: &mut Cursor<'_>, loc: CodeLoc) -> Result<Tok, SyntaxError> {
    let c = cursor.bump().expect("caller checked a char is present");
    let tok = match c {
        '.' => Tok::Dot,
        ',' => Tok::Comma,
        ':' => Tok::Colon,
        '?' => Tok::Question,
        '(' => Tok::LParen,
        ')' => Tok::RParen,
        '[' => Tok::LBracket,
        ']' => Tok::RBracket,
        '{' => Tok::LBrace,
        '}' => Tok::RBrace,
        '+' => Tok::Plus,
        '-' => Tok::Minus,
        '*' => Tok::Star,
        '/' => Tok::Slash,
        '%' => Tok::Percent,
        '!' => {
            if cursor.peek() == Some('=') {
                cursor.bump();
                Tok::NotEq
            } else {
                Tok::Bang
            }
        }
        '<' => {
            if cursor.peek() == Some('=') {
                cursor.bump();
                Tok::Le
            } else {
                Tok::Lt
            }
        }
        '>' => {
            if cursor.peek() == Some('=') {
                cursor.bump();
                Tok::Ge
            } else {
                Tok::Gt
            }
        }
        '=' => {
            if cursor.peek() == Some('=') {
                cursor.bump();
                Tok::EqEq
            } else {
                return Err(syntax_err(SyntaxErrorKind::UnexpectedToken, "unexpected '='", loc, "=".into()));
            }
        }
        '&' => {
            if cursor.peek() == Some('&') {
                cursor.bump();
                Tok::AndAnd
            } else {
                return Err(syntax_err(SyntaxErrorKind::UnexpectedToken, "unexpected '&'", loc, "&".into()));
            }
        }
        '|' => {
            if cursor.peek() == Some('|') {
                cursor.bump();
                Tok::OrOr
            } else {
                return Err(syntax_err(SyntaxErrorKind::UnexpectedToken, "unexpected '|'", loc, "|".into()));
            }
        }
        other => {
            return Err(syntax_err(
                SyntaxErrorKind::UnexpectedToken,
                "unexpected character",
                loc,
                other.to_string(),
            ));
        }
    };
    Ok(tok)
}

fn syntax_err(kind: SyntaxErrorKind, message: &str, location: CodeLoc, token: String) -> SyntaxError {
    SyntaxError {
        kind,
        message: message.to_owned(),
        location,
        token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        tokenize(src).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn integers_and_uints() {
        assert_eq!(toks("1 2u 3"), vec![Tok::Int(1), Tok::Uint(2), Tok::Int(3), Tok::Eof]);
    }

    #[test]
    fn doubles() {
        assert_eq!(toks("1.5 2e10 3.0e-2"), vec![Tok::Double(1.5), Tok::Double(2e10), Tok::Double(3.0e-2), Tok::Eof]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(toks(r#""a\nb""#), vec![Tok::Str("a\nb".into()), Tok::Eof]);
    }

    #[test]
    fn raw_strings_skip_escapes() {
        assert_eq!(toks(r#"r"a\nb""#), vec![Tok::Str(r"a\nb".into()), Tok::Eof]);
    }

    #[test]
    fn byte_strings() {
        assert_eq!(toks(r#"b"ab""#), vec![Tok::Bytes(b"ab".to_vec().into()), Tok::Eof]);
    }

    #[test]
    fn byte_strings_reject_unicode_escapes() {
        assert!(tokenize("b\"\\u0041\"").is_err());
    }

    #[test]
    fn line_comments() {
        assert_eq!(toks("1 // comment\n+ 2"), vec![Tok::Int(1), Tok::Plus, Tok::Int(2), Tok::Eof]);
    }

    #[test]
    fn int_min_magnitude_lexes_as_overflow_marker() {
        assert_eq!(toks("9223372036854775808"), vec![Tok::IntOverflow(INT_MIN_MAGNITUDE), Tok::Eof]);
    }

    #[test]
    fn out_of_range_int_literal_still_errors() {
        assert!(tokenize("99999999999999999999999999999").is_err());
    }
}
