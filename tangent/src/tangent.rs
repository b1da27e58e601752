//! Tangent lines
use crate::{
    backend::Backend,
    eval::Evaluator,
    sample::{Domain, Sample},
};
use nalgebra::Point2;

/// A tangent line `y = slope * x + intercept`, touching the curve at `point`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TangentSpec {
    /// Point of tangency
    pub point: Point2<f64>,
    /// Slope of the line
    pub slope: f64,
    /// Value of the line at `x = 0`
    pub intercept: f64,
    /// The derivative was undefined, so the slope fell back to 0
    pub degenerate: bool,
}

impl TangentSpec {
    fn new(x0: f64, y0: f64, slope: Option<f64>) -> Self {
        let degenerate = slope.is_none();
        let slope = slope.unwrap_or(0.0);
        Self {
            point: Point2::new(x0, y0),
            slope,
            intercept: y0 - slope * x0,
            degenerate,
        }
    }

    /// Computes the tangent to an expression at `x0`
    ///
    /// Returns `None` if the expression is undefined at `x0`.  If only the
    /// derivative is undefined, the tangent is horizontal and marked as
    /// [`degenerate`](Self::degenerate).
    ///
    /// ```
    /// # use tangent::{backend::NativeBackend, eval::Evaluator, tangent::TangentSpec};
    /// let eval = Evaluator::new(NativeBackend);
    /// let f = eval.parse("x^2")?;
    /// let df = eval.parse("2x")?;
    /// let t = TangentSpec::at(&eval, &f, Some(&df), 3.0).unwrap();
    /// assert_eq!((t.slope, t.intercept), (6.0, -9.0));
    /// # Ok::<(), tangent::Error>(())
    /// ```
    pub fn at<B: Backend>(
        eval: &Evaluator<B>,
        expr: &B::Expr,
        deriv: Option<&B::Expr>,
        x0: f64,
    ) -> Option<Self> {
        let y0 = eval.evaluate(expr, x0).real()?;
        let slope = eval.derivative(expr, deriv, x0).real();
        Some(Self::new(x0, y0, slope))
    }

    /// Builds the tangent at a previously computed sample
    pub fn from_sample(s: &Sample) -> Self {
        Self::new(s.x, s.y, s.dy_valid.then_some(s.dy))
    }

    /// Evaluates the line at a particular `x`
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Returns the endpoints of a segment extending `half_width` on either
    /// side of the point of tangency
    pub fn points_on_segment(&self, half_width: f64) -> (Point2<f64>, Point2<f64>) {
        self.points_between(self.point.x - half_width, self.point.x + half_width)
    }

    /// Returns the endpoints of the line across an entire range
    pub fn across(&self, range: Domain) -> (Point2<f64>, Point2<f64>) {
        self.points_between(range.min(), range.max())
    }

    fn points_between(&self, a: f64, b: f64) -> (Point2<f64>, Point2<f64>) {
        (
            Point2::new(a, self.value_at(a)),
            Point2::new(b, self.value_at(b)),
        )
    }
}
