//! Expression backends
//!
//! Everything else in this crate treats expressions as opaque handles, which
//! are produced and consumed by a [`Backend`].  Two backends are provided:
//!
//! - [`NativeBackend`] parses into a [`Context`] and supports symbolic
//!   differentiation and simplification
//! - [`RhaiBackend`] (with the `rhai` feature) evaluates expressions as Rhai
//!   scripts; it can't differentiate, so callers fall back to numerical
//!   derivatives
use crate::{
    context::{Context, Node},
    tape::Tape,
    Error,
};

#[cfg(feature = "rhai")]
mod rhai;

#[cfg(feature = "rhai")]
pub use self::rhai::{RhaiBackend, Script};

/// Capability to parse, evaluate, and transform single-variable expressions
///
/// Implementations must be pure: evaluating the same expression at the same
/// `x` must always return the same result.
pub trait Backend {
    /// Parsed expression handle
    type Expr: Clone + std::fmt::Debug;

    /// Parses expression text in the free variable `x`
    fn parse(&self, text: &str) -> Result<Self::Expr, Error>;

    /// Evaluates an expression at the given `x`
    ///
    /// Implementations may return non-finite values instead of errors; the
    /// caller treats both the same way.
    fn evaluate(&self, expr: &Self::Expr, x: f64) -> Result<f64, Error>;

    /// Returns the derivative of the expression with respect to `x`
    ///
    /// Backends without symbolic differentiation return
    /// [`Error::Unsupported`].
    fn differentiate(&self, expr: &Self::Expr) -> Result<Self::Expr, Error>;

    /// Returns a simplified, human-readable form of the expression
    fn simplify(&self, expr: &Self::Expr) -> Result<String, Error>;
}

////////////////////////////////////////////////////////////////////////////////

/// A parsed expression, owning its own [`Context`] and a [`Tape`] for
/// evaluation
///
/// ```
/// use tangent::backend::Formula;
///
/// let f: Formula = "x^3 - 2x".parse()?;
/// assert_eq!(f.eval(2.0), 4.0);
///
/// let df = f.deriv()?;
/// assert_eq!(df.to_string(), "3 * x^2 - 2");
/// assert_eq!(df.eval(2.0), 10.0);
/// # Ok::<(), tangent::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Formula {
    ctx: Context,
    root: Node,
    tape: Tape,
}

impl Formula {
    /// Builds a formula from a root node in the given context
    pub fn new(ctx: Context, root: Node) -> Result<Self, Error> {
        let tape = ctx.get_tape(root)?;
        Ok(Self { ctx, root, tape })
    }

    /// Parses formula text
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut ctx = Context::new();
        let root = ctx.parse(text)?;
        Self::new(ctx, root)
    }

    /// Evaluates the formula at a particular `x`
    pub fn eval(&self, x: f64) -> f64 {
        self.tape.eval(x)
    }

    /// Returns the symbolic derivative with respect to `x`
    pub fn deriv(&self) -> Result<Self, Error> {
        let mut ctx = self.ctx.clone();
        let root = ctx.deriv(self.root)?;
        Self::new(ctx, root)
    }

    /// Borrows the underlying context
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Returns the root node, which is valid in [`Formula::context`]
    pub fn root(&self) -> Node {
        self.root
    }
}

impl std::str::FromStr for Formula {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = self.ctx.display(self.root).map_err(|_| std::fmt::Error)?;
        write!(f, "{s}")
    }
}

/// Backend built on [`Context`] and [`Tape`]
#[derive(Copy, Clone, Debug, Default)]
pub struct NativeBackend;

impl Backend for NativeBackend {
    type Expr = Formula;

    fn parse(&self, text: &str) -> Result<Formula, Error> {
        Formula::parse(text)
    }

    fn evaluate(&self, expr: &Formula, x: f64) -> Result<f64, Error> {
        Ok(expr.eval(x))
    }

    fn differentiate(&self, expr: &Formula) -> Result<Formula, Error> {
        expr.deriv()
    }

    fn simplify(&self, expr: &Formula) -> Result<String, Error> {
        expr.ctx.display(expr.root)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn native_round_trip() {
        let b = NativeBackend;
        let f = b.parse("2 * x^2 + 0 * sin(x)").unwrap();
        assert_eq!(b.simplify(&f).unwrap(), "2 * x^2");
        assert_eq!(b.evaluate(&f, 3.0).unwrap(), 18.0);

        let df = b.differentiate(&f).unwrap();
        assert_eq!(b.evaluate(&df, 3.0).unwrap(), 12.0);
    }

    #[test]
    fn native_parse_error() {
        let b = NativeBackend;
        assert!(matches!(b.parse("x +"), Err(Error::UnexpectedEnd)));
        assert!(matches!(
            b.parse("sinh(x)"),
            Err(Error::UnknownFunction(..))
        ));
    }

    #[test]
    fn native_undefined_points() {
        let b = NativeBackend;
        let f = b.parse("ln(x)").unwrap();
        assert!(b.evaluate(&f, -1.0).unwrap().is_nan());
        assert!(b.evaluate(&f, 0.0).unwrap().is_infinite());
    }

    #[test]
    fn formula_display() {
        let f: Formula = "x*(x+1)".parse().unwrap();
        assert_eq!(f.to_string(), "x * (x + 1)");
        let g: Formula = f.to_string().parse().unwrap();
        assert_eq!(g.eval(2.5), f.eval(2.5));
    }
}
