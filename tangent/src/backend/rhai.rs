//! Rhai script backend
//!
//! Expressions are compiled as Rhai expressions and evaluated with `x` bound
//! to a float in scope.  To keep the grammar close to [`NativeBackend`]:
//!
//! - `^` is rewritten to `**` and means exponentiation (rather than XOR)
//! - integer division returns a float (`1/2 == 0.5`)
//! - `sin`, `cos`, `tan`, `exp`, `ln`, `log`, `sqrt`, and `abs` accept
//!   integers as well as floats, and `log` is the natural logarithm
//! - `pi` and `e` are defined as constants
//!
//! ```
//! use tangent::backend::{Backend, RhaiBackend};
//!
//! let rhai = RhaiBackend::new();
//! let f = rhai.parse("x^2 + sin(pi * x)")?;
//! assert_eq!(rhai.evaluate(&f, 3.0)?.round(), 9.0);
//! # Ok::<(), tangent::Error>(())
//! ```
//!
//! [`NativeBackend`]: super::NativeBackend
use crate::{backend::Backend, context::BinaryOpcode, Error};

/// Backend which evaluates expressions with a Rhai engine
///
/// There's no symbolic differentiation; [`Backend::differentiate`] always
/// returns [`Error::Unsupported`].
pub struct RhaiBackend {
    engine: rhai::Engine,
}

impl Default for RhaiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RhaiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RhaiBackend").finish_non_exhaustive()
    }
}

/// Compiled Rhai expression, plus its source text
#[derive(Clone, Debug)]
pub struct Script {
    text: String,
    ast: rhai::AST,
}

impl Script {
    /// Returns the expression text as supplied by the user
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl RhaiBackend {
    /// Builds a new engine with math bindings
    pub fn new() -> Self {
        let mut engine = rhai::Engine::new();

        macro_rules! register_binary_fns {
            ($op:literal, $f:expr, $engine:ident) => {
                $engine.register_fn($op, |a: f64, b: f64| -> f64 { $f(a, b) });
                $engine.register_fn($op, |a: f64, b: i64| -> f64 {
                    $f(a, b as f64)
                });
                $engine.register_fn($op, |a: i64, b: f64| -> f64 {
                    $f(a as f64, b)
                });
                $engine.register_fn($op, |a: i64, b: i64| -> f64 {
                    $f(a as f64, b as f64)
                });
            };
        }
        macro_rules! register_unary_fns {
            ($op:literal, $f:expr, $engine:ident) => {
                $engine.register_fn($op, |a: f64| -> f64 { $f(a) });
                $engine.register_fn($op, |a: i64| -> f64 { $f(a as f64) });
            };
        }

        register_binary_fns!(
            "**",
            |a: f64, b: f64| BinaryOpcode::Pow.apply(a, b),
            engine
        );
        register_binary_fns!("/", |a: f64, b: f64| a / b, engine);
        register_unary_fns!("sin", f64::sin, engine);
        register_unary_fns!("cos", f64::cos, engine);
        register_unary_fns!("tan", f64::tan, engine);
        register_unary_fns!("exp", f64::exp, engine);
        register_unary_fns!("ln", f64::ln, engine);
        register_unary_fns!("log", f64::ln, engine);
        register_unary_fns!("sqrt", f64::sqrt, engine);
        register_unary_fns!("abs", f64::abs, engine);

        // Registered operators must take priority over the built-in ones
        engine.set_fast_operators(false);
        engine.set_max_expr_depths(64, 32);

        Self { engine }
    }

    fn scope(x: f64) -> rhai::Scope<'static> {
        let mut scope = rhai::Scope::new();
        scope.push_constant("pi", std::f64::consts::PI);
        scope.push_constant("e", std::f64::consts::E);
        scope.push("x", x);
        scope
    }
}

impl Backend for RhaiBackend {
    type Expr = Script;

    fn parse(&self, text: &str) -> Result<Script, Error> {
        let ast = self.engine.compile_expression(text.replace('^', "**"))?;
        Ok(Script {
            text: text.to_owned(),
            ast,
        })
    }

    fn evaluate(&self, expr: &Script, x: f64) -> Result<f64, Error> {
        let mut scope = Self::scope(x);
        let out = self
            .engine
            .eval_ast_with_scope::<rhai::Dynamic>(&mut scope, &expr.ast)?;
        if let Ok(f) = out.as_float() {
            Ok(f)
        } else if let Ok(i) = out.as_int() {
            Ok(i as f64)
        } else {
            Err(Error::NotANumber(out.type_name()))
        }
    }

    fn differentiate(&self, _expr: &Script) -> Result<Script, Error> {
        Err(Error::Unsupported("symbolic differentiation"))
    }

    fn simplify(&self, expr: &Script) -> Result<String, Error> {
        Ok(expr.text.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rhai_arithmetic() {
        let b = RhaiBackend::new();
        let f = b.parse("2 * x^2 - 1/2").unwrap();
        assert_eq!(b.evaluate(&f, 3.0).unwrap(), 17.5);

        let f = b.parse("2^10").unwrap();
        assert_eq!(b.evaluate(&f, 0.0).unwrap(), 1024.0);
    }

    #[test]
    fn rhai_functions() {
        let b = RhaiBackend::new();
        let f = b.parse("sin(x) + cos(0) + log(e)").unwrap();
        assert_relative_eq!(b.evaluate(&f, 1.0).unwrap(), 1f64.sin() + 2.0);

        let f = b.parse("sqrt(x)").unwrap();
        assert!(b.evaluate(&f, -1.0).unwrap().is_nan());

        let f = b.parse("sqrt(x)^0").unwrap();
        assert!(b.evaluate(&f, -1.0).unwrap().is_nan());
        assert_eq!(b.evaluate(&f, 4.0).unwrap(), 1.0);

        let f = b.parse("1 / x").unwrap();
        assert!(b.evaluate(&f, 0.0).unwrap().is_infinite());
    }

    #[test]
    fn rhai_errors() {
        let b = RhaiBackend::new();
        assert!(matches!(b.parse("x +"), Err(Error::RhaiParseError(..))));

        let f = b.parse("y + 1").unwrap();
        assert!(matches!(b.evaluate(&f, 0.0), Err(Error::RhaiEvalError(..))));

        let f = b.parse("\"hello\"").unwrap();
        assert!(matches!(b.evaluate(&f, 0.0), Err(Error::NotANumber(..))));
    }

    #[test]
    fn rhai_no_derivative() {
        let b = RhaiBackend::new();
        let f = b.parse("x^2").unwrap();
        assert!(matches!(b.differentiate(&f), Err(Error::Unsupported(..))));
        assert_eq!(b.simplify(&f).unwrap(), "x^2");
    }
}
