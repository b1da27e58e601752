//! Sampling expressions over a domain
//!
//! ```
//! use tangent::{
//!     backend::NativeBackend,
//!     config::SampleConfig,
//!     eval::Evaluator,
//!     sample::{sample, Domain},
//! };
//!
//! let eval = Evaluator::new(NativeBackend);
//! let f = eval.parse("1 / x")?;
//! let domain = Domain::new(-1.0, 1.0)?;
//! let set = sample(&eval, &f, None, domain, &SampleConfig::default());
//!
//! // The singularity at x = 0 is dropped, along with anything above the
//! // display ceiling
//! assert!(set.iter().all(|s| s.x != 0.0 && s.y.is_finite()));
//! assert!(set.len() < 801);
//! # Ok::<(), tangent::Error>(())
//! ```
use crate::{backend::Backend, config::SampleConfig, eval::Evaluator, Error};
use log::debug;

/// Closed interval `[min, max]` over which an expression is sampled
///
/// Bounds are always finite with `min < max`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Domain {
    min: f64,
    max: f64,
}

impl Domain {
    /// Builds a new domain, checking its bounds
    ///
    /// ```
    /// # use tangent::sample::Domain;
    /// assert!(Domain::new(-1.0, 1.0).is_ok());
    /// assert!(Domain::new(1.0, 1.0).is_err());
    /// assert!(Domain::new(0.0, f64::INFINITY).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, Error> {
        if min.is_finite() && max.is_finite() && min < max {
            Ok(Self { min, max })
        } else {
            Err(Error::DegenerateDomain(min, max))
        }
    }

    /// Returns the lower bound
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the upper bound
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns `max - min`, which is always positive
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Returns the midpoint
    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Checks whether `x` is within the domain (inclusive)
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }

    /// Returns `n + 1` evenly spaced points, including both endpoints
    pub(crate) fn points(&self, n: usize) -> impl Iterator<Item = f64> + use<> {
        let Domain { min, max } = *self;
        let step = (max - min) / n as f64;
        (0..=n).map(move |i| if i == n { max } else { min + i as f64 * step })
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            min: -10.0,
            max: 10.0,
        }
    }
}

/// A single retained point
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    /// Position along the domain
    pub x: f64,
    /// Function value, always finite
    pub y: f64,
    /// Derivative value, or 0 if `dy_valid` is false
    pub dy: f64,
    /// Whether the derivative was defined at this point
    pub dy_valid: bool,
}

/// Results of a single sampling pass
///
/// Samples are in ascending `x` order.  The set is tied to the domain it was
/// computed over, and is never modified after it's built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleSet {
    domain: Domain,
    resolution: usize,
    samples: Vec<Sample>,
}

impl SampleSet {
    /// Returns the retained samples
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Returns the number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Checks whether every point was dropped
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterates over retained samples
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Returns the domain used to build this set
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Returns the number of intervals used to build this set
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Finds the retained sample with `x` closest to the given position
    pub fn nearest(&self, x: f64) -> Option<&Sample> {
        let i = self.samples.partition_point(|s| s.x < x);
        let after = self.samples.get(i);
        let before = i.checked_sub(1).and_then(|i| self.samples.get(i));
        match (before, after) {
            (Some(b), Some(a)) => {
                Some(if (x - b.x) <= (a.x - x) { b } else { a })
            }
            (b, a) => b.or(a),
        }
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Samples an expression (and its derivative) across a domain
///
/// Points where the function is undefined, or where `|y|` exceeds the display
/// ceiling, are dropped.  If `deriv` is `None`, the derivative is estimated
/// numerically; where the derivative is undefined, it's stored as 0 with
/// [`Sample::dy_valid`] cleared.
///
/// This is a pure function of its inputs.
pub fn sample<B: Backend>(
    eval: &Evaluator<B>,
    expr: &B::Expr,
    deriv: Option<&B::Expr>,
    domain: Domain,
    config: &SampleConfig,
) -> SampleSet {
    let resolution = config.resolution.get();
    let mut samples = Vec::with_capacity(resolution + 1);
    for x in domain.points(resolution) {
        let Some(y) = eval.evaluate(expr, x).real() else {
            continue;
        };
        if config.ceiling.is_some_and(|c| y.abs() > c) {
            continue;
        }
        let (dy, dy_valid) = match eval.derivative(expr, deriv, x).real() {
            Some(dy) => (dy, true),
            None => (0.0, false),
        };
        samples.push(Sample { x, y, dy, dy_valid });
    }
    debug!(
        "sampled [{}, {}]: kept {} of {} points",
        domain.min,
        domain.max,
        samples.len(),
        resolution + 1
    );
    SampleSet {
        domain,
        resolution,
        samples,
    }
}
