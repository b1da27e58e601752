//! Infallible evaluation and numerical differentiation
//!
//! The [`Evaluator`] wraps a [`Backend`] and turns every failure (parse errors,
//! runtime errors, NaN, infinities) into [`Value::Invalid`], so callers never
//! have to handle errors from individual evaluations.
//!
//! ```
//! use tangent::{backend::NativeBackend, eval::{Evaluator, Value}};
//!
//! let eval = Evaluator::new(NativeBackend);
//! let f = eval.parse("1 / x")?;
//! assert_eq!(eval.evaluate(&f, 2.0), Value::Real(0.5));
//! assert_eq!(eval.evaluate(&f, 0.0), Value::Invalid);
//! # Ok::<(), tangent::Error>(())
//! ```
use crate::{backend::Backend, Error};
use log::trace;

/// Step size used by [`Evaluator::numerical_derivative`]
pub const NUMERIC_STEP: f64 = 1e-4;

/// Result of evaluating an expression at a single point
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    /// A finite real number
    Real(f64),
    /// The expression is undefined at this point
    Invalid,
}

impl Value {
    /// Wraps a raw float, mapping NaN and infinities to [`Value::Invalid`]
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            Value::Real(v)
        } else {
            Value::Invalid
        }
    }

    /// Returns the finite value, if present
    pub fn real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Invalid => None,
        }
    }

    /// Checks whether this is a finite value
    pub fn is_valid(&self) -> bool {
        matches!(self, Value::Real(..))
    }

    /// Returns the finite value, or `default` if it is invalid
    pub fn unwrap_or(&self, default: f64) -> f64 {
        self.real().unwrap_or(default)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::from_f64(v)
    }
}

/// Expression evaluator which never fails
///
/// Evaluation is side-effect free: the same expression at the same `x` always
/// produces the same [`Value`].
#[derive(Clone, Debug, Default)]
pub struct Evaluator<B> {
    backend: B,
}

impl<B: Backend> Evaluator<B> {
    /// Wraps the given backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Borrows the inner backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Parses expression text with the inner backend
    ///
    /// Unlike evaluation, parsing is fallible.
    pub fn parse(&self, text: &str) -> Result<B::Expr, Error> {
        self.backend.parse(text)
    }

    /// Evaluates an expression at a single point
    pub fn evaluate(&self, expr: &B::Expr, x: f64) -> Value {
        match self.backend.evaluate(expr, x) {
            Ok(v) => {
                let out = Value::from_f64(v);
                if !out.is_valid() {
                    trace!("non-finite value {v} at x = {x}");
                }
                out
            }
            Err(e) => {
                trace!("evaluation failed at x = {x}: {e}");
                Value::Invalid
            }
        }
    }

    /// Estimates the derivative with a central difference of step `h`
    ///
    /// Returns [`Value::Invalid`] if either side is invalid or the quotient is
    /// not finite.
    pub fn central_difference(&self, expr: &B::Expr, x: f64, h: f64) -> Value {
        let (Some(hi), Some(lo)) = (
            self.evaluate(expr, x + h).real(),
            self.evaluate(expr, x - h).real(),
        ) else {
            return Value::Invalid;
        };
        Value::from_f64((hi - lo) / (2.0 * h))
    }

    /// Estimates the derivative with a central difference of step
    /// [`NUMERIC_STEP`]
    ///
    /// The truncation error is `O(h²)`; results within `2h` of a singularity
    /// are unreliable.
    pub fn numerical_derivative(&self, expr: &B::Expr, x: f64) -> Value {
        self.central_difference(expr, x, NUMERIC_STEP)
    }

    /// Evaluates the derivative, preferring the explicit derivative expression
    /// if one is provided and falling back to a numerical estimate otherwise
    pub fn derivative(
        &self,
        expr: &B::Expr,
        deriv: Option<&B::Expr>,
        x: f64,
    ) -> Value {
        match deriv {
            Some(d) => self.evaluate(d, x),
            None => self.numerical_derivative(expr, x),
        }
    }
}
