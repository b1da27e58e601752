//! Tunable settings for sampling, viewing, and animation
use crate::Error;
use std::{num::NonZeroUsize, time::Duration};

/// Settings for a single sampling pass
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleConfig {
    /// Number of intervals across the domain
    ///
    /// A pass evaluates `resolution + 1` points, including both endpoints.
    pub resolution: NonZeroUsize,

    /// Display ceiling
    ///
    /// Points with `|y|` above this value are dropped, so that curves near a
    /// vertical asymptote don't produce enormous segments.  `None` keeps
    /// every finite point.
    pub ceiling: Option<f64>,
}

impl SampleConfig {
    /// Default number of intervals
    pub const DEFAULT_RESOLUTION: NonZeroUsize = NonZeroUsize::new(800).unwrap();
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            resolution: Self::DEFAULT_RESOLUTION,
            ceiling: Some(100.0),
        }
    }
}

/// Settings for the viewport transform
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewConfig {
    /// Minimum and maximum zoom factors
    pub zoom_range: (f64, f64),

    /// Height of the visible band in math units at zoom 1
    ///
    /// The default of 20 shows `y` in `[-10, 10]`.
    pub vertical_span: f64,
}

impl ViewConfig {
    /// Checks that the zoom bounds and vertical span are in range
    pub fn validate(&self) -> Result<(), Error> {
        let (lo, hi) = self.zoom_range;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi) {
            return Err(Error::BadConfig(
                "zoom range must be finite, positive, and ascending",
            ));
        }
        if !(self.vertical_span.is_finite() && self.vertical_span > 0.0) {
            return Err(Error::BadConfig("vertical span must be positive"));
        }
        Ok(())
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom_range: (0.5, 5.0),
            vertical_span: 20.0,
        }
    }
}

/// Settings for the path-reveal animation
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnimationConfig {
    /// Time for one full reveal at speed 1
    pub period: Duration,

    /// Initial speed multiplier
    pub speed: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(4),
            speed: 1.0,
        }
    }
}

/// Settings for a [`Plot`](crate::plot::Plot)
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlotConfig {
    /// Sampling settings
    pub sample: SampleConfig,
    /// Viewport settings
    pub view: ViewConfig,
    /// Animation settings
    pub animation: AnimationConfig,
}

impl PlotConfig {
    /// Checks that every value is in range
    ///
    /// ```
    /// # use tangent::config::PlotConfig;
    /// let mut cfg = PlotConfig::default();
    /// assert!(cfg.validate().is_ok());
    /// cfg.view.zoom_range = (2.0, 1.0);
    /// assert!(cfg.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(c) = self.sample.ceiling {
            if !(c > 0.0) {
                return Err(Error::BadConfig("ceiling must be positive"));
            }
        }
        self.view.validate()?;
        if self.animation.period.is_zero() {
            return Err(Error::BadConfig("animation period must be nonzero"));
        }
        if !(self.animation.speed.is_finite() && self.animation.speed > 0.0) {
            return Err(Error::BadSpeed(self.animation.speed));
        }
        Ok(())
    }
}
