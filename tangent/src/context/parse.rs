//! Infix text parser for single-variable expressions
//!
//! The grammar is the usual calculator one: `+ - * / ^`, parentheses, unary
//! minus, the functions named by [`UnaryOpcode`], the constants `pi` and `e`,
//! and the variable `x`.  Juxtaposition is multiplication (`2x`, `3(x + 1)`,
//! `(x)(x)`), and `^` is right-associative and binds tighter than unary minus
//! (`-x^2` is `-(x^2)`).
use super::{BinaryOpcode, Context, Node, UnaryOpcode, NEG_PRECEDENCE};
use crate::Error;

use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LeftParen,
    RightParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Ident(s) => write!(f, "identifier `{s}`"),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Star => write!(f, "`*`"),
            Token::Slash => write!(f, "`/`"),
            Token::Caret => write!(f, "`^`"),
            Token::LeftParen => write!(f, "`(`"),
            Token::RightParen => write!(f, "`)`"),
        }
    }
}

/// Looks up a function name (case-insensitive), excluding prefix negation
fn function(name: &str) -> Option<UnaryOpcode> {
    UnaryOpcode::from_str(&name.to_ascii_lowercase())
        .ok()
        .filter(|op| *op != UnaryOpcode::Neg)
}

/// Checks whether the identifier names a value (the variable or a constant)
fn is_value_name(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "x" | "pi" | "e")
}

/// Splits the input into `(byte offset, token)` pairs
fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, Error> {
    let bytes = text.as_bytes();
    let mut out = vec![];
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let t = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'^' => Token::Caret,
            b'(' => Token::LeftParen,
            b')' => Token::RightParen,
            b'0'..=b'9' | b'.' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_digit() || bytes[i] == b'.')
                {
                    i += 1;
                }
                // Scientific notation, being careful not to swallow the
                // constant `e` in something like `2e` or `2exp(x)`
                if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        i = j;
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let s = &text[start..i];
                let v = s.parse().map_err(|_| Error::BadNumber(s.to_owned()))?;
                out.push((start, Token::Number(v)));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                out.push((start, Token::Ident(text[start..i].to_owned())));
                continue;
            }
            _ => {
                // Report the full (possibly multi-byte) character
                let found = text[start..].chars().next().unwrap_or_default();
                return Err(Error::UnexpectedToken {
                    pos: start,
                    found: format!("`{found}`"),
                });
            }
        };
        out.push((start, t));
        i += 1;
    }
    Ok(out)
}

/// Inserts explicit `*` tokens wherever juxtaposition implies multiplication
fn insert_implicit_mul(tokens: Vec<(usize, Token)>) -> Vec<(usize, Token)> {
    let mut out: Vec<(usize, Token)> = Vec::with_capacity(tokens.len());
    for (pos, t) in tokens {
        if let Some((_, prev)) = out.last() {
            let ends_value = match prev {
                Token::Number(..) | Token::RightParen => true,
                Token::Ident(name) => is_value_name(name),
                _ => false,
            };
            let starts_value =
                matches!(t, Token::Ident(..) | Token::LeftParen | Token::Number(..));
            // `2 3` is almost certainly a typo, so leave it for the parser to
            // reject rather than reading it as `2 * 3`
            let both_numbers = matches!(
                (prev, &t),
                (Token::Number(..), Token::Number(..))
            );
            if ends_value && starts_value && !both_numbers {
                out.push((pos, Token::Star));
            }
        }
        out.push((pos, t));
    }
    out
}

/// Maximum nesting of parentheses, function calls, and prefix operators, and
/// maximum height of the resulting tree
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    ctx: &'a mut Context,
    tokens: Vec<(usize, Token)>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Result<Token, Error> {
        let (_, t) = self.tokens.get(self.pos).ok_or(Error::UnexpectedEnd)?;
        self.pos += 1;
        Ok(t.clone())
    }

    fn unexpected(&self) -> Error {
        match self.tokens.get(self.pos) {
            Some((pos, t)) => Error::UnexpectedToken {
                pos: *pos,
                found: t.to_string(),
            },
            None => Error::UnexpectedEnd,
        }
    }

    fn expect(&mut self, t: Token) -> Result<(), Error> {
        if self.peek() == Some(&t) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_expr(&mut self, min_precedence: u8) -> Result<Node, Error> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let out = self.parse_infix(min_precedence);
        self.depth -= 1;
        out
    }

    /// Pratt loop: parses a prefix term, then folds in infix operators that
    /// bind at least as tightly as `min_precedence`
    fn parse_infix(&mut self, min_precedence: u8) -> Result<Node, Error> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOpcode::Add,
                Some(Token::Minus) => BinaryOpcode::Sub,
                Some(Token::Star) => BinaryOpcode::Mul,
                Some(Token::Slash) => BinaryOpcode::Div,
                Some(Token::Caret) => BinaryOpcode::Pow,
                _ => break,
            };
            let p = op.precedence();
            if p < min_precedence {
                break;
            }
            self.pos += 1;
            let next = if op == BinaryOpcode::Pow { p } else { p + 1 };
            let rhs = self.parse_expr(next)?;
            lhs = self.ctx.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Node, Error> {
        let start = self.pos;
        match self.next()? {
            Token::Number(v) => Ok(self.ctx.constant(v)),
            Token::Minus => {
                let a = self.parse_expr(NEG_PRECEDENCE)?;
                self.ctx.neg(a)
            }
            Token::Plus => self.parse_expr(NEG_PRECEDENCE),
            Token::LeftParen => {
                let a = self.parse_expr(0)?;
                self.expect(Token::RightParen)?;
                Ok(a)
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LeftParen) {
                    let op =
                        function(&name).ok_or(Error::UnknownFunction(name))?;
                    self.pos += 1;
                    let a = self.parse_expr(0)?;
                    self.expect(Token::RightParen)?;
                    return self.ctx.unary(op, a);
                }
                match name.to_ascii_lowercase().as_str() {
                    "x" => Ok(self.ctx.x()),
                    "pi" => Ok(self.ctx.constant(std::f64::consts::PI)),
                    "e" => Ok(self.ctx.constant(std::f64::consts::E)),
                    // A bare function name, e.g. `sin x`
                    _ if function(&name).is_some() => Err(self.unexpected()),
                    _ => Err(Error::UnknownVariable(name)),
                }
            }
            _ => {
                self.pos = start;
                Err(self.unexpected())
            }
        }
    }
}

impl Context {
    /// Parses an expression in `x` into this context
    ///
    /// ```
    /// # use tangent::context::Context;
    /// let mut ctx = Context::new();
    /// let f = ctx.parse("2x^2 - sin(pi x)").unwrap();
    /// assert_eq!(ctx.eval(f, 1.0).unwrap(), 2.0 - std::f64::consts::PI.sin());
    /// ```
    ///
    /// Deeply nested input, or a tree taller than an internal limit, is
    /// rejected with [`Error::TooDeep`].
    pub fn parse(&mut self, text: &str) -> Result<Node, Error> {
        let tokens = insert_implicit_mul(tokenize(text)?);
        let mut parser = Parser {
            ctx: self,
            tokens,
            pos: 0,
            depth: 0,
        };
        let out = parser.parse_expr(0)?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.unexpected());
        }
        if self.height(out)? > MAX_DEPTH {
            return Err(Error::TooDeep(MAX_DEPTH));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(text: &str, x: f64) -> f64 {
        let mut ctx = Context::new();
        let f = ctx.parse(text).unwrap();
        ctx.eval(f, x).unwrap()
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("1 + 2 * 3", 0.0), 7.0);
        assert_eq!(eval("(1 + 2) * 3", 0.0), 9.0);
        assert_eq!(eval("10 - 4 - 3", 0.0), 3.0);
        assert_eq!(eval("16 / 4 / 2", 0.0), 2.0);
        assert_eq!(eval("2^3^2", 0.0), 512.0);
        assert_eq!(eval("-x^2", 3.0), -9.0);
        assert_eq!(eval("-x * 2", 3.0), -6.0);
        assert_eq!(eval("2^-1", 0.0), 0.5);
        assert_eq!(eval("--x", 4.0), 4.0);
        assert_eq!(eval("+x", 4.0), 4.0);
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(eval("2x", 3.0), 6.0);
        assert_eq!(eval("2(x + 1)", 3.0), 8.0);
        assert_eq!(eval("(x)(x + 1)", 3.0), 12.0);
        assert_eq!(eval("3x^2", 2.0), 12.0);
        assert_eq!(eval("x sin(0)", 2.0), 0.0);
        assert_relative_eq!(eval("2pi", 0.0), 2.0 * std::f64::consts::PI);
    }

    #[test]
    fn numbers() {
        assert_eq!(eval("1.5", 0.0), 1.5);
        assert_eq!(eval(".5", 0.0), 0.5);
        assert_eq!(eval("2e3", 0.0), 2000.0);
        assert_eq!(eval("2e-1", 0.0), 0.2);
        assert_relative_eq!(eval("2e", 0.0), 2.0 * std::f64::consts::E);
        assert_relative_eq!(eval("2exp(x)", 0.0), 2.0);
    }

    #[test]
    fn functions() {
        assert_relative_eq!(eval("sin(x)", 1.0), 1f64.sin());
        assert_relative_eq!(eval("cos(x)", 1.0), 1f64.cos());
        assert_relative_eq!(eval("tan(x)", 1.0), 1f64.tan());
        assert_relative_eq!(eval("exp(x)", 1.0), 1f64.exp());
        assert_relative_eq!(eval("ln(x)", 2.0), 2f64.ln());
        assert_relative_eq!(eval("log(x)", 2.0), 2f64.ln());
        assert_relative_eq!(eval("sqrt(x)", 2.0), 2f64.sqrt());
        assert_eq!(eval("abs(x)", -2.0), 2.0);
        assert_eq!(eval("SIN(X)", 0.0), 0.0);
    }

    #[test]
    fn constants() {
        use std::f64::consts::{E, PI};
        for text in ["pi", "Pi", "PI"] {
            assert_relative_eq!(eval(text, 0.0), PI);
        }
        for text in ["e", "E"] {
            assert_relative_eq!(eval(text, 0.0), E);
        }
        assert_relative_eq!(eval("2E", 0.0), 2.0 * E);
        assert_relative_eq!(eval("2E1", 0.0), 20.0);
        assert_relative_eq!(eval("Pi X", 2.0), 2.0 * PI);
    }

    #[test]
    fn nesting_limit() {
        let mut ctx = Context::new();
        let n = 200_000;
        let text = format!("{}x{}", "(".repeat(n), ")".repeat(n));
        assert!(matches!(ctx.parse(&text), Err(Error::TooDeep(..))));

        let text = format!("{}x", "-".repeat(n));
        assert!(matches!(ctx.parse(&text), Err(Error::TooDeep(..))));

        let text = format!("{}x", "sin(".repeat(n)) + ")".repeat(n).as_str();
        assert!(matches!(ctx.parse(&text), Err(Error::TooDeep(..))));

        // A long chain never recurses in the parser, but builds a tall tree
        let text = vec!["x"; n].join(" + ");
        assert!(matches!(ctx.parse(&text), Err(Error::TooDeep(..))));

        // Moderate nesting is fine
        let text = format!("{}x{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(ctx.parse(&text).unwrap(), ctx.x());
        let text = vec!["sin(x)"; 100].join(" * ");
        assert!(ctx.parse(&text).is_ok());
    }

    #[test]
    fn errors() {
        let mut ctx = Context::new();
        assert!(matches!(ctx.parse(""), Err(Error::UnexpectedEnd)));
        assert!(matches!(ctx.parse("x +"), Err(Error::UnexpectedEnd)));
        assert!(matches!(ctx.parse("(x + 1"), Err(Error::UnexpectedEnd)));
        assert!(matches!(
            ctx.parse("x + 1)"),
            Err(Error::UnexpectedToken { pos: 5, .. })
        ));
        assert!(matches!(
            ctx.parse("x * * 2"),
            Err(Error::UnexpectedToken { pos: 4, .. })
        ));
        assert!(matches!(ctx.parse("2 3"), Err(Error::UnexpectedToken { .. })));
        assert!(matches!(ctx.parse("x $ 2"), Err(Error::UnexpectedToken { .. })));
        assert!(matches!(ctx.parse("sin x"), Err(Error::UnexpectedToken { .. })));
        assert!(matches!(ctx.parse("1..2"), Err(Error::BadNumber(..))));

        match ctx.parse("foo(x)") {
            Err(Error::UnknownFunction(s)) => assert_eq!(s, "foo"),
            e => panic!("unexpected result {e:?}"),
        }
        match ctx.parse("x + y") {
            Err(Error::UnknownVariable(s)) => assert_eq!(s, "y"),
            e => panic!("unexpected result {e:?}"),
        }
    }

    #[test]
    fn deduplication() {
        let mut ctx = Context::new();
        let a = ctx.parse("sin(x) + x^2").unwrap();
        let n = ctx.len();
        let b = ctx.parse("x * x + sin(x)").unwrap();
        assert_eq!(a, b);
        assert_eq!(ctx.len(), n);
    }
}
