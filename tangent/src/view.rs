//! Mapping between math coordinates and the screen
//!
//! Horizontal zoom and pan happen in math space: the visible x range is the
//! base domain, scaled about its center by `1 / zoom` and shifted by `pan.x`.
//! The vertical axis is a fixed span (±10 by default) scaled by `zoom`, and
//! shifted by `pan.y` *pixels* after projection.
//!
//! ```
//! use nalgebra::Point2;
//! use tangent::{config::ViewConfig, sample::Domain, view::{Screen, Viewport}};
//!
//! let mut view = Viewport::new(Domain::new(-10.0, 10.0)?, ViewConfig::default())?;
//! let screen = Screen::new(440.0, 240.0, 20.0);
//!
//! let p = view.to_viewport(Point2::new(0.0, 0.0), &screen);
//! assert_eq!(p, Point2::new(220.0, 120.0));
//!
//! view.set_zoom(2.0)?;
//! let r = view.effective_range();
//! assert_eq!((r.min(), r.max()), (-5.0, 5.0));
//! # Ok::<(), tangent::Error>(())
//! ```
use crate::{config::ViewConfig, sample::Domain, Error};
use log::warn;
use nalgebra::{Point2, Vector2};

/// Size of the drawing area, in pixels
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Screen {
    /// Total width
    pub width: f64,
    /// Total height
    pub height: f64,
    /// Blank margin on every side
    pub padding: f64,
}

impl Screen {
    /// Builds a new screen description
    pub fn new(width: f64, height: f64, padding: f64) -> Self {
        Self {
            width,
            height,
            padding,
        }
    }

    /// Returns the width available for plotting (at least one pixel)
    pub fn inner_width(&self) -> f64 {
        (self.width - 2.0 * self.padding).max(1.0)
    }

    /// Returns the height available for plotting (at least one pixel)
    pub fn inner_height(&self) -> f64 {
        (self.height - 2.0 * self.padding).max(1.0)
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new(800.0, 400.0, 40.0)
    }
}

/// Interactive state of a [`Viewport`]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewportState {
    /// Zoom factor, always within the configured bounds
    pub zoom: f64,
    /// Horizontal pan (math units) and vertical pan (pixels)
    pub pan: Vector2<f64>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vector2::zeros(),
        }
    }
}

/// Bidirectional transform between math coordinates and pixels
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    base: Domain,
    state: ViewportState,
    config: ViewConfig,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            base: Domain::default(),
            state: ViewportState::default(),
            config: ViewConfig::default(),
        }
    }
}

impl Viewport {
    /// Builds a viewport at zoom 1 (or the nearest allowed zoom) with no pan
    ///
    /// Returns [`Error::BadConfig`] if the configuration is out of range.
    pub fn new(base: Domain, config: ViewConfig) -> Result<Self, Error> {
        config.validate()?;
        let mut out = Self {
            base,
            state: ViewportState::default(),
            config,
        };
        out.state.zoom = out.clamp(1.0);
        Ok(out)
    }

    /// Returns the current zoom and pan
    pub fn state(&self) -> ViewportState {
        self.state
    }

    /// Returns the base domain
    pub fn base(&self) -> Domain {
        self.base
    }

    /// Returns the current zoom factor
    pub fn zoom(&self) -> f64 {
        self.state.zoom
    }

    fn clamp(&self, zoom: f64) -> f64 {
        let (lo, hi) = self.config.zoom_range;
        zoom.clamp(lo, hi)
    }

    /// Returns the visible x range after zoom and pan
    pub fn effective_range(&self) -> Domain {
        self.range_for(self.state).unwrap_or(self.base)
    }

    fn range_for(&self, state: ViewportState) -> Result<Domain, Error> {
        let width = self.base.width() / state.zoom;
        let center = self.base.center() + state.pan.x;
        Domain::new(center - width / 2.0, center + width / 2.0)
    }

    /// Returns pixels per math unit along each axis
    pub fn scale(&self, screen: &Screen) -> Vector2<f64> {
        Vector2::new(
            screen.inner_width() / self.effective_range().width(),
            screen.inner_height() / self.config.vertical_span * self.state.zoom,
        )
    }

    /// Maps a point in math coordinates to pixel coordinates
    ///
    /// Pixel `y` increases downwards.
    pub fn to_viewport(&self, p: Point2<f64>, screen: &Screen) -> Point2<f64> {
        let lo = self.effective_range().min();
        let s = self.scale(screen);
        Point2::new(
            screen.padding + (p.x - lo) * s.x,
            screen.height / 2.0 - p.y * s.y + self.state.pan.y,
        )
    }

    /// Maps a pixel column back to math `x`
    pub fn from_viewport(&self, px: f64, screen: &Screen) -> f64 {
        let lo = self.effective_range().min();
        lo + (px - screen.padding) / self.scale(screen).x
    }

    /// Sets the absolute zoom factor, clamped to the configured bounds
    ///
    /// Non-finite or non-positive values are rejected, keeping the previous
    /// zoom.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), Error> {
        if !(zoom.is_finite() && zoom > 0.0) {
            warn!("rejecting zoom {zoom}");
            return Err(Error::DegenerateZoom(zoom));
        }
        self.state.zoom = self.clamp(zoom);
        Ok(())
    }

    /// Multiplies the zoom factor, clamping to the configured bounds
    pub fn zoom_by(&mut self, factor: f64) -> Result<(), Error> {
        if !(factor.is_finite() && factor > 0.0) {
            warn!("rejecting zoom factor {factor}");
            return Err(Error::DegenerateZoom(factor));
        }
        self.set_zoom(self.state.zoom * factor)
    }

    /// Zooms while keeping the math `x` under pixel column `px` fixed
    pub fn zoom_about(
        &mut self,
        factor: f64,
        px: f64,
        screen: &Screen,
    ) -> Result<(), Error> {
        let before = self.from_viewport(px, screen);
        self.zoom_by(factor)?;
        let after = self.from_viewport(px, screen);
        self.state.pan.x += before - after;
        Ok(())
    }

    /// Pans by `delta.x` math units and `delta.y` pixels
    ///
    /// A delta that would leave the pan non-finite, or the visible range
    /// degenerate, is rejected and the previous pan is kept.
    pub fn pan(&mut self, delta: Vector2<f64>) -> Result<(), Error> {
        let state = ViewportState {
            pan: self.state.pan + delta,
            ..self.state
        };
        if !state.pan.iter().all(|v| v.is_finite())
            || self.range_for(state).is_err()
        {
            warn!("rejecting pan by ({}, {})", delta.x, delta.y);
            return Err(Error::DegeneratePan(delta.x, delta.y));
        }
        self.state = state;
        Ok(())
    }

    /// Pans by a pointer drag, given in pixels
    ///
    /// Content follows the pointer: dragging right reveals smaller `x`.
    pub fn drag(
        &mut self,
        delta: Vector2<f64>,
        screen: &Screen,
    ) -> Result<(), Error> {
        let dx = delta.x / self.scale(screen).x;
        self.pan(Vector2::new(-dx, delta.y))
    }

    /// Replaces the base domain, keeping zoom and pan
    pub fn set_base(&mut self, base: Domain) {
        self.base = base;
    }

    /// Restores zoom 1 and zero pan
    pub fn reset(&mut self) {
        self.state = ViewportState {
            zoom: self.clamp(1.0),
            pan: Vector2::zeros(),
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn view() -> Viewport {
        Viewport::new(Domain::new(-10.0, 10.0).unwrap(), ViewConfig::default())
            .unwrap()
    }

    #[test]
    fn effective_range() {
        let mut v = view();
        let r = v.effective_range();
        assert_eq!((r.min(), r.max()), (-10.0, 10.0));

        v.pan(Vector2::new(3.0, 0.0)).unwrap();
        let r = v.effective_range();
        assert_eq!((r.min(), r.max()), (-7.0, 13.0));

        v.set_zoom(4.0).unwrap();
        let r = v.effective_range();
        assert_eq!((r.min(), r.max()), (0.5, 5.5));
    }

    #[test]
    fn round_trip() {
        let screen = Screen::new(640.0, 480.0, 32.0);
        let mut v = view();
        for (zoom, pan) in [(1.0, 0.0), (2.5, -3.0), (0.5, 7.25), (5.0, 1.0)] {
            v.set_zoom(zoom).unwrap();
            v.pan(Vector2::new(pan, 0.0)).unwrap();
            let r = v.effective_range();
            let tol = r.width() / screen.inner_width();
            for i in 0..=20 {
                let x = r.min() + r.width() * i as f64 / 20.0;
                let p = v.to_viewport(Point2::new(x, 1.0), &screen);
                assert!((v.from_viewport(p.x, &screen) - x).abs() <= tol);
            }
        }
    }

    #[test]
    fn range_maps_to_padded_edges() {
        let screen = Screen::new(500.0, 300.0, 50.0);
        let mut v = view();
        v.set_zoom(2.0).unwrap();
        let r = v.effective_range();
        let lo = v.to_viewport(Point2::new(r.min(), 0.0), &screen);
        let hi = v.to_viewport(Point2::new(r.max(), 0.0), &screen);
        assert_relative_eq!(lo.x, 50.0);
        assert_relative_eq!(hi.x, 450.0);
        assert_relative_eq!(lo.y, 150.0);
    }

    #[test]
    fn vertical_pan_is_in_pixels() {
        let screen = Screen::new(500.0, 300.0, 50.0);
        let mut v = view();
        let before = v.to_viewport(Point2::new(0.0, 5.0), &screen);
        assert_relative_eq!(before.y, 150.0 - 5.0 * 10.0);

        v.set_zoom(2.0).unwrap();
        v.pan(Vector2::new(0.0, 25.0)).unwrap();
        let after = v.to_viewport(Point2::new(0.0, 5.0), &screen);
        assert_relative_eq!(after.y, 150.0 - 5.0 * 20.0 + 25.0);
    }

    #[test]
    fn zoom_monotonic_and_clamped() {
        let mut v = view();
        let mut prev = f64::INFINITY;
        for z in [0.5, 0.75, 1.0, 2.0, 3.5, 5.0] {
            v.set_zoom(z).unwrap();
            let w = v.effective_range().width();
            assert!(w < prev);
            prev = w;
        }

        v.set_zoom(100.0).unwrap();
        assert_eq!(v.zoom(), 5.0);
        v.set_zoom(0.01).unwrap();
        assert_eq!(v.zoom(), 0.5);

        for _ in 0..20 {
            v.zoom_by(1.5).unwrap();
            assert!(v.zoom() <= 5.0);
        }
        assert_eq!(v.zoom(), 5.0);
    }

    #[test]
    fn degenerate_zoom() {
        let mut v = view();
        v.set_zoom(2.0).unwrap();
        for z in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(v.set_zoom(z), Err(Error::DegenerateZoom(..))));
            assert!(matches!(v.zoom_by(z), Err(Error::DegenerateZoom(..))));
            assert_eq!(v.zoom(), 2.0);
        }
    }

    #[test]
    fn zoom_about_pointer() {
        let screen = Screen::new(600.0, 400.0, 0.0);
        let mut v = view();
        let px = 450.0;
        let x = v.from_viewport(px, &screen);
        v.zoom_about(2.0, px, &screen).unwrap();
        assert_eq!(v.zoom(), 2.0);
        assert_relative_eq!(v.from_viewport(px, &screen), x, epsilon = 1e-9);

        // Clamped zoom still keeps the anchor fixed
        v.zoom_about(10.0, px, &screen).unwrap();
        assert_eq!(v.zoom(), 5.0);
        assert_relative_eq!(v.from_viewport(px, &screen), x, epsilon = 1e-9);
    }

    #[test]
    fn drag_follows_pointer() {
        let screen = Screen::new(400.0, 400.0, 0.0);
        let mut v = view();
        let x = v.from_viewport(100.0, &screen);
        v.drag(Vector2::new(50.0, -10.0), &screen).unwrap();
        assert_relative_eq!(v.from_viewport(150.0, &screen), x, epsilon = 1e-9);
        assert_eq!(v.state().pan.y, -10.0);

        v.reset();
        assert_eq!(v.state(), ViewportState::default());
    }

    #[test]
    fn degenerate_pan() {
        let screen = Screen::default();
        let mut v = view();
        v.pan(Vector2::new(1.0, 5.0)).unwrap();
        let before = v.state();
        for delta in [
            Vector2::new(0.0, f64::NAN),
            Vector2::new(f64::INFINITY, 0.0),
            Vector2::new(f64::MAX, 0.0),
            Vector2::new(1e300, 0.0),
        ] {
            assert!(matches!(v.pan(delta), Err(Error::DegeneratePan(..))));
            assert!(matches!(
                v.drag(delta, &screen),
                Err(Error::DegeneratePan(..))
            ));
            assert_eq!(v.state(), before);
        }
        let p = v.to_viewport(Point2::new(0.0, 0.0), &screen);
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn bad_config() {
        let base = Domain::default();
        for zoom_range in [(2.0, 1.0), (f64::NAN, 1.0), (0.0, 1.0)] {
            let cfg = ViewConfig {
                zoom_range,
                ..ViewConfig::default()
            };
            assert!(matches!(
                Viewport::new(base, cfg),
                Err(Error::BadConfig(..))
            ));
        }

        // The starting zoom is clamped into range
        let cfg = ViewConfig {
            zoom_range: (2.0, 3.0),
            ..ViewConfig::default()
        };
        assert_eq!(Viewport::new(base, cfg).unwrap().zoom(), 2.0);
    }
}
