//! Interactive plot state
//!
//! A [`Plot`] owns everything that changes in response to user input: the
//! active expression and its derivative, the domain, the viewport, the
//! animation, and the current [`SampleSet`].  Mutators keep the sample set
//! consistent with the rest of the state, so queries never see a stale set.
//!
//! ```
//! use std::time::Duration;
//! use tangent::{backend::NativeBackend, config::PlotConfig, plot::Plot};
//!
//! let mut plot = Plot::new(NativeBackend, PlotConfig::default())?;
//! plot.set_expression("x^2", None)?;
//! plot.set_domain(-2.0, 2.0)?;
//! assert_eq!(plot.samples().len(), 801);
//!
//! plot.start();
//! plot.tick(Duration::from_secs(1));
//! assert_eq!(plot.visible_samples().len(), 201);
//!
//! let t = plot.tangent().unwrap();
//! assert!((t.slope - 2.0 * t.point.x).abs() < 1e-6);
//! # Ok::<(), tangent::Error>(())
//! ```
use crate::{
    animate::{visible_prefix, Animation},
    backend::Backend,
    config::PlotConfig,
    eval::Evaluator,
    sample::{sample, Domain, Sample, SampleSet},
    tangent::TangentSpec,
    view::{Screen, Viewport},
    Error,
};
use log::{debug, info, warn};
use nalgebra::{Point2, Vector2};
use std::time::Duration;

/// Number of intervals used when checking that a new expression is defined
/// somewhere in the domain
const PROBE_INTERVALS: usize = 16;

/// Where the derivative values come from
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DerivativeSource {
    /// Derivative text supplied alongside the expression
    Explicit,
    /// Symbolic derivative computed by the backend
    Symbolic,
    /// Central-difference estimate
    Numeric,
}

/// An expression which has been parsed and accepted
struct Active<B: Backend> {
    text: String,
    expr: B::Expr,
    deriv: Option<B::Expr>,
    source: DerivativeSource,
}

/// Pixel-space geometry for a single frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// Function curve, split into separate polylines at gaps
    pub function: Vec<Vec<Point2<f64>>>,
    /// Derivative curve, split at gaps and wherever it's undefined
    pub derivative: Vec<Vec<Point2<f64>>>,
    /// Tangent line across the visible range, if there is one
    pub tangent: Option<(Point2<f64>, Point2<f64>)>,
    /// Point of tangency
    pub point: Option<Point2<f64>>,
    /// Visible x range
    pub range: Domain,
}

/// Interactive plot of a single expression
pub struct Plot<B: Backend> {
    eval: Evaluator<B>,
    config: PlotConfig,
    active: Option<Active<B>>,
    domain: Domain,
    view: Viewport,
    anim: Animation,
    samples: SampleSet,
    highlight: Option<f64>,
}

impl<B: Backend> Plot<B> {
    /// Builds an empty plot over the default domain `[-10, 10]`
    pub fn new(backend: B, config: PlotConfig) -> Result<Self, Error> {
        config.validate()?;
        let domain = Domain::default();
        Ok(Self {
            eval: Evaluator::new(backend),
            config,
            active: None,
            domain,
            view: Viewport::new(domain, config.view)?,
            anim: Animation::new(config.animation),
            samples: SampleSet::default(),
            highlight: None,
        })
    }

    /// Borrows the evaluator
    pub fn evaluator(&self) -> &Evaluator<B> {
        &self.eval
    }

    /// Returns the configuration
    pub fn config(&self) -> &PlotConfig {
        &self.config
    }

    ////////////////////////////////////////////////////////////////////////////
    // Expression and domain

    /// Replaces the active expression
    ///
    /// If `deriv_text` is provided, it's used for derivative values; if it
    /// fails to parse, or isn't provided, the backend's symbolic derivative
    /// is used if available, with a numerical estimate as the last resort.
    ///
    /// If the expression doesn't parse, or is undefined everywhere in the
    /// domain, this returns [`Error::InvalidExpression`] and the previous
    /// expression stays active.
    pub fn set_expression(
        &mut self,
        text: &str,
        deriv_text: Option<&str>,
    ) -> Result<(), Error> {
        let expr = self.eval.parse(text).map_err(|e| {
            warn!("could not parse `{text}`: {e}");
            Error::InvalidExpression {
                text: text.to_owned(),
                reason: e.to_string(),
            }
        })?;

        let defined = self
            .domain
            .points(PROBE_INTERVALS)
            .any(|x| self.eval.evaluate(&expr, x).is_valid());
        if !defined {
            warn!("`{text}` is undefined across the domain");
            return Err(Error::InvalidExpression {
                text: text.to_owned(),
                reason: format!(
                    "undefined everywhere in [{}, {}]",
                    self.domain.min(),
                    self.domain.max()
                ),
            });
        }

        let (deriv, source) = self.derivative_for(&expr, deriv_text);
        info!("plotting `{text}` ({source} derivative)");
        self.active = Some(Active {
            text: text.to_owned(),
            expr,
            deriv,
            source,
        });
        self.anim.reset();
        self.resample();
        Ok(())
    }

    fn derivative_for(
        &self,
        expr: &B::Expr,
        deriv_text: Option<&str>,
    ) -> (Option<B::Expr>, DerivativeSource) {
        if let Some(d) = deriv_text {
            match self.eval.parse(d) {
                Ok(d) => return (Some(d), DerivativeSource::Explicit),
                Err(e) => warn!("ignoring derivative `{d}`: {e}"),
            }
        }
        match self.eval.backend().differentiate(expr) {
            Ok(d) => (Some(d), DerivativeSource::Symbolic),
            Err(e) => {
                debug!("falling back to numerical derivative: {e}");
                (None, DerivativeSource::Numeric)
            }
        }
    }

    /// Returns the active expression text
    pub fn expression(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.text.as_str())
    }

    /// Returns the active expression in simplified form
    pub fn simplified(&self) -> Option<String> {
        let a = self.active.as_ref()?;
        self.eval.backend().simplify(&a.expr).ok()
    }

    /// Returns the derivative expression in simplified form, if there is one
    pub fn simplified_derivative(&self) -> Option<String> {
        let d = self.active.as_ref()?.deriv.as_ref()?;
        self.eval.backend().simplify(d).ok()
    }

    /// Returns where derivative values come from
    pub fn derivative_source(&self) -> Option<DerivativeSource> {
        self.active.as_ref().map(|a| a.source)
    }

    /// Sets the domain
    ///
    /// Bounds must be finite with `min < max`; otherwise, this returns
    /// [`Error::DegenerateDomain`] and the previous domain is kept.
    pub fn set_domain(&mut self, min: f64, max: f64) -> Result<(), Error> {
        let domain = Domain::new(min, max).inspect_err(|e| warn!("{e}"))?;
        self.domain = domain;
        self.view.set_base(domain);
        self.anim.reset();
        self.resample();
        Ok(())
    }

    /// Returns the requested domain
    pub fn domain(&self) -> Domain {
        self.domain
    }

    ////////////////////////////////////////////////////////////////////////////
    // Viewport

    /// Borrows the viewport
    pub fn viewport(&self) -> &Viewport {
        &self.view
    }

    /// Returns the visible x range
    pub fn effective_range(&self) -> Domain {
        self.view.effective_range()
    }

    /// Sets the absolute zoom factor
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), Error> {
        self.view.set_zoom(zoom)?;
        self.resample();
        Ok(())
    }

    /// Multiplies the zoom factor
    pub fn zoom_by(&mut self, factor: f64) -> Result<(), Error> {
        self.view.zoom_by(factor)?;
        self.resample();
        Ok(())
    }

    /// Zooms about a pixel column, e.g. the pointer position
    pub fn zoom_about(
        &mut self,
        factor: f64,
        px: f64,
        screen: &Screen,
    ) -> Result<(), Error> {
        self.view.zoom_about(factor, px, screen)?;
        self.resample();
        Ok(())
    }

    /// Pans by `delta.x` math units and `delta.y` pixels
    pub fn pan(&mut self, delta: Vector2<f64>) -> Result<(), Error> {
        self.view.pan(delta)?;
        self.resample();
        Ok(())
    }

    /// Pans by a pointer drag, in pixels
    pub fn drag(
        &mut self,
        delta: Vector2<f64>,
        screen: &Screen,
    ) -> Result<(), Error> {
        self.view.drag(delta, screen)?;
        self.resample();
        Ok(())
    }

    /// Restores zoom 1 and zero pan
    pub fn reset_view(&mut self) {
        self.view.reset();
        self.resample();
    }

    ////////////////////////////////////////////////////////////////////////////
    // Animation

    /// Borrows the animation state
    pub fn animation(&self) -> &Animation {
        &self.anim
    }

    /// Starts the path-reveal animation
    pub fn start(&mut self) {
        self.anim.start();
    }

    /// Stops the animation, keeping its progress
    pub fn stop(&mut self) {
        self.anim.stop();
    }

    /// Sets the animation speed multiplier
    pub fn set_speed(&mut self, speed: f64) -> Result<(), Error> {
        self.anim.set_speed(speed)
    }

    /// Advances the animation by elapsed time
    pub fn tick(&mut self, dt: Duration) {
        self.anim.tick(dt);
    }

    /// Advances the animation to an absolute timestamp
    pub fn frame(&mut self, now: Duration) {
        self.anim.frame(now);
    }

    ////////////////////////////////////////////////////////////////////////////
    // Queries

    /// Highlights the math `x` under a pixel column, or clears the highlight
    pub fn highlight(&mut self, px: Option<f64>, screen: &Screen) {
        self.highlight = px.map(|px| self.view.from_viewport(px, screen));
    }

    /// Returns the highlighted math `x`, if any
    pub fn highlighted(&self) -> Option<f64> {
        self.highlight
    }

    /// Returns the active sample set
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Returns the samples revealed by the animation
    ///
    /// Before the animation has ever run (or after it's reset while
    /// stopped), the entire set is visible.
    pub fn visible_samples(&self) -> &[Sample] {
        if !self.anim.is_running() && self.anim.progress() == 0.0 {
            self.samples.samples()
        } else {
            visible_prefix(&self.samples, self.anim.progress())
        }
    }

    /// Returns the current tangent line
    ///
    /// The tangent touches the highlighted position if there is one;
    /// otherwise, it follows the head of a running animation.
    pub fn tangent(&self) -> Option<TangentSpec> {
        let a = self.active.as_ref()?;
        if let Some(x) = self.highlight {
            TangentSpec::at(&self.eval, &a.expr, a.deriv.as_ref(), x)
        } else if self.anim.is_running() {
            self.visible_samples().last().map(TangentSpec::from_sample)
        } else {
            None
        }
    }

    /// Projects the visible samples and tangent into pixel space
    pub fn frame_geometry(&self, screen: &Screen) -> Frame {
        let range = self.view.effective_range();
        let visible = self.visible_samples();
        let gap = 1.5 * range.width() / self.samples.resolution().max(1) as f64;
        let project = |x, y| self.view.to_viewport(Point2::new(x, y), screen);

        let function = polylines(visible, gap, |s| Some(project(s.x, s.y)));
        let derivative = polylines(visible, gap, |s| {
            s.dy_valid.then(|| project(s.x, s.dy))
        });
        let tangent = self.tangent();
        Frame {
            function,
            derivative,
            tangent: tangent.map(|t| {
                let (a, b) = t.across(range);
                (project(a.x, a.y), project(b.x, b.y))
            }),
            point: tangent.map(|t| project(t.point.x, t.point.y)),
            range,
        }
    }

    /// Recomputes the sample set over the visible range
    fn resample(&mut self) {
        let Some(a) = &self.active else {
            return;
        };
        let range = self.view.effective_range();
        debug!("resampling `{}` over [{}, {}]", a.text, range.min(), range.max());
        self.samples = sample(
            &self.eval,
            &a.expr,
            a.deriv.as_ref(),
            range,
            &self.config.sample,
        );
    }
}

/// Splits samples into polylines, breaking wherever consecutive points are
/// more than `gap` apart in `x` or `f` returns `None`
fn polylines<F>(samples: &[Sample], gap: f64, f: F) -> Vec<Vec<Point2<f64>>>
where
    F: Fn(&Sample) -> Option<Point2<f64>>,
{
    let mut out: Vec<Vec<Point2<f64>>> = vec![];
    let mut prev_x = None;
    for s in samples {
        let Some(p) = f(s) else {
            prev_x = None;
            continue;
        };
        match (prev_x, out.last_mut()) {
            (Some(x), Some(line)) if s.x - x <= gap => line.push(p),
            _ => out.push(vec![p]),
        }
        prev_x = Some(s.x);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::NativeBackend;

    fn plot() -> Plot<NativeBackend> {
        Plot::new(NativeBackend, PlotConfig::default()).unwrap()
    }

    #[test]
    fn empty_plot() {
        let p = plot();
        assert!(p.samples().is_empty());
        assert!(p.tangent().is_none());
        assert!(p.expression().is_none());
        assert!(p.frame_geometry(&Screen::default()).function.is_empty());
    }

    #[test]
    fn bad_config() {
        let mut cfg = PlotConfig::default();
        cfg.view.zoom_range = (0.0, 1.0);
        assert!(Plot::new(NativeBackend, cfg).is_err());
    }

    #[test]
    fn derivative_sources() {
        let mut p = plot();
        p.set_expression("x^3", None).unwrap();
        assert_eq!(p.derivative_source(), Some(DerivativeSource::Symbolic));
        assert_eq!(p.simplified_derivative().unwrap(), "3 * x^2");

        p.set_expression("x^3", Some("3x^2")).unwrap();
        assert_eq!(p.derivative_source(), Some(DerivativeSource::Explicit));

        // Broken derivative text falls back to the backend
        p.set_expression("x^3", Some("3x^")).unwrap();
        assert_eq!(p.derivative_source(), Some(DerivativeSource::Symbolic));
        assert_eq!(DerivativeSource::Numeric.to_string(), "numeric");
    }

    #[test]
    fn bad_expression_keeps_last_good() {
        let mut p = plot();
        p.set_expression("sin(x)", None).unwrap();
        let before = p.samples().clone();

        let err = p.set_expression("sin(x", None).unwrap_err();
        assert!(matches!(err, Error::InvalidExpression { .. }));
        assert_eq!(p.expression(), Some("sin(x)"));
        assert_eq!(p.samples(), &before);

        // Parses, but is never defined
        let err = p.set_expression("sqrt(-1 - x^2)", None).unwrap_err();
        assert!(matches!(err, Error::InvalidExpression { .. }));
        assert_eq!(p.expression(), Some("sin(x)"));

        // Cancelling terms must not hide that it's never defined
        let text = "sqrt(-1 - x^2) - sqrt(-1 - x^2)";
        let err = p.set_expression(text, None).unwrap_err();
        assert!(matches!(err, Error::InvalidExpression { .. }));
        assert_eq!(p.samples(), &before);
    }

    #[test]
    fn singularity_is_accepted() {
        let mut p = plot();
        p.set_expression("1 / x", None).unwrap();
        assert!(p.samples().iter().all(|s| s.x != 0.0));

        // The curve is split on either side of the asymptote
        let frame = p.frame_geometry(&Screen::default());
        assert_eq!(frame.function.len(), 2);
    }

    #[test]
    fn domain_changes() {
        let mut p = plot();
        p.set_expression("x", None).unwrap();
        p.set_domain(0.0, 4.0).unwrap();
        assert_eq!(p.samples().domain(), Domain::new(0.0, 4.0).unwrap());

        assert!(matches!(
            p.set_domain(4.0, 0.0),
            Err(Error::DegenerateDomain(..))
        ));
        assert!(p.set_domain(0.0, f64::NAN).is_err());
        assert_eq!(p.domain(), Domain::new(0.0, 4.0).unwrap());
    }

    #[test]
    fn changes_reset_animation() {
        let mut p = plot();
        p.set_expression("x", None).unwrap();
        p.start();
        p.tick(Duration::from_secs(1));
        assert_eq!(p.animation().progress(), 0.25);

        p.set_domain(-1.0, 1.0).unwrap();
        assert_eq!(p.animation().progress(), 0.0);
        assert!(p.animation().is_running());

        p.tick(Duration::from_secs(1));
        p.set_expression("x^2", None).unwrap();
        assert_eq!(p.animation().progress(), 0.0);

        // Rejected input doesn't reset anything
        p.tick(Duration::from_secs(1));
        assert!(p.set_expression("x +", None).is_err());
        assert!(p.set_domain(1.0, 1.0).is_err());
        assert_eq!(p.animation().progress(), 0.25);

        // Neither does viewport interaction
        p.set_zoom(2.0).unwrap();
        p.pan(Vector2::new(0.1, 3.0)).unwrap();
        assert_eq!(p.animation().progress(), 0.25);
    }

    #[test]
    fn zoom_resamples_visible_range() {
        let mut p = plot();
        p.set_expression("x^2", None).unwrap();
        p.set_zoom(4.0).unwrap();
        let r = p.samples().domain();
        assert_eq!((r.min(), r.max()), (-2.5, 2.5));
        assert_eq!(p.effective_range(), r);

        assert!(p.set_zoom(-1.0).is_err());
        assert_eq!(p.viewport().zoom(), 4.0);

        p.reset_view();
        assert_eq!(p.samples().domain(), p.domain());

        // Degenerate pans are rejected without touching the samples
        let before = p.samples().clone();
        let err = p.pan(Vector2::new(0.0, f64::NAN)).unwrap_err();
        assert!(matches!(err, Error::DegeneratePan(..)));
        assert_eq!(p.samples(), &before);
        let frame = p.frame_geometry(&Screen::default());
        assert!(frame.function[0].iter().all(|q| q.y.is_finite()));
    }

    #[test]
    fn visible_samples() {
        let mut p = plot();
        p.set_expression("x", None).unwrap();
        assert_eq!(p.visible_samples().len(), 801);

        p.start();
        assert!(p.visible_samples().is_empty());
        p.tick(Duration::from_secs(2));
        assert_eq!(p.visible_samples().len(), 401);

        // Stopping keeps the partial reveal
        p.stop();
        assert_eq!(p.visible_samples().len(), 401);
    }

    #[test]
    fn tangent_tracking() {
        let screen = Screen::new(840.0, 400.0, 20.0);
        let mut p = plot();
        p.set_expression("x^2", None).unwrap();
        assert!(p.tangent().is_none());

        // Pixel 420 is the middle of the screen, i.e. x = 0
        p.highlight(Some(420.0), &screen);
        let t = p.tangent().unwrap();
        assert_eq!(t.point.x, 0.0);
        assert_eq!(t.slope, 0.0);
        assert!(!t.degenerate);

        let frame = p.frame_geometry(&screen);
        let (a, b) = frame.tangent.unwrap();
        assert_eq!(a.y, b.y);
        assert_eq!(frame.point.unwrap(), Point2::new(420.0, 200.0));

        // Without a highlight, the tangent follows the animation
        p.highlight(None, &screen);
        p.start();
        p.tick(Duration::from_secs(1));
        let head = *p.visible_samples().last().unwrap();
        let t = p.tangent().unwrap();
        assert_eq!(t.point.x, head.x);
        assert!((t.slope - 2.0 * head.x).abs() < 1e-9);
    }

    #[cfg(feature = "rhai")]
    #[test]
    fn rhai_numeric_fallback() {
        use crate::backend::RhaiBackend;
        let mut p = Plot::new(RhaiBackend::new(), PlotConfig::default()).unwrap();
        p.set_expression("x^2", None).unwrap();
        assert_eq!(p.derivative_source(), Some(DerivativeSource::Numeric));
        assert!(p.simplified_derivative().is_none());
        for s in p.samples() {
            assert!(s.dy_valid);
            assert!((s.dy - 2.0 * s.x).abs() < 1e-3);
        }
    }
}
