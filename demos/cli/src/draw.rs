//! Rasterizer for plot frames
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use nalgebra::Point2;
use tangent::{plot::Frame, view::Screen};

pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const AXES: Rgba<u8> = Rgba([160, 160, 160, 255]);
pub const FUNCTION: Rgba<u8> = Rgba([31, 119, 180, 255]);
pub const DERIVATIVE: Rgba<u8> = Rgba([255, 127, 14, 255]);
pub const TANGENT: Rgba<u8> = Rgba([214, 39, 40, 255]);

pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(screen: &Screen) -> Self {
        let (w, h) = (screen.width as u32, screen.height as u32);
        Self {
            image: RgbaImage::from_pixel(w.max(1), h.max(1), BACKGROUND),
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Draws a filled circle centered on the given point
    pub fn dot(&mut self, p: Point2<f64>, r: i32, color: Rgba<u8>) {
        let center = (p.x.round() as i32, p.y.round() as i32);
        draw_filled_circle_mut(&mut self.image, center, r, color);
    }

    /// Draws a line segment, after clipping it to the image bounds
    pub fn line(&mut self, a: Point2<f64>, b: Point2<f64>, color: Rgba<u8>) {
        // draw_line_segment_mut steps through every point on the segment,
        // including those off the canvas
        let w = self.image.width() as f64;
        let h = self.image.height() as f64;
        if let Some((a, b)) = clip(a, b, w - 1.0, h - 1.0) {
            draw_line_segment_mut(
                &mut self.image,
                (a.x as f32, a.y as f32),
                (b.x as f32, b.y as f32),
                color,
            );
        }
    }

    pub fn polyline(&mut self, pts: &[Point2<f64>], color: Rgba<u8>) {
        match pts {
            [p] => self.line(*p, *p, color),
            _ => {
                for w in pts.windows(2) {
                    self.line(w[0], w[1], color);
                }
            }
        }
    }

    /// Draws a complete frame, given the pixel positions of the axes
    pub fn draw_frame(
        &mut self,
        frame: &Frame,
        origin: Point2<f64>,
        screen: &Screen,
    ) {
        self.line(
            Point2::new(0.0, origin.y),
            Point2::new(screen.width, origin.y),
            AXES,
        );
        if frame.range.contains(0.0) {
            self.line(
                Point2::new(origin.x, 0.0),
                Point2::new(origin.x, screen.height),
                AXES,
            );
        }
        for line in &frame.derivative {
            self.polyline(line, DERIVATIVE);
        }
        for line in &frame.function {
            self.polyline(line, FUNCTION);
        }
        if let Some((a, b)) = frame.tangent {
            self.line(a, b, TANGENT);
        }
        if let Some(p) = frame.point {
            self.dot(p, 3, TANGENT);
        }
    }
}

/// Clips a segment to the rectangle `[0, w] × [0, h]` (Liang-Barsky)
fn clip(
    a: Point2<f64>,
    b: Point2<f64>,
    w: f64,
    h: f64,
) -> Option<(Point2<f64>, Point2<f64>)> {
    let d = b - a;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [
        (-d.x, a.x),
        (d.x, w - a.x),
        (-d.y, a.y),
        (d.y, h - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    if t0 > t1 || !t0.is_finite() || !t1.is_finite() {
        None
    } else {
        Some((a + d * t0, a + d * t1))
    }
}
