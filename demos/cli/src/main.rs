use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use nalgebra::{Point2, Vector2};
use rayon::prelude::*;

use tangent::{
    backend::{Backend, NativeBackend},
    config::{PlotConfig, SampleConfig},
    plot::Plot,
    view::Screen,
};

mod draw;

/// Plot a function, its derivative, and a tangent line
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print sampled `x`, `y`, and `dy` values
    Sample {
        #[clap(flatten)]
        plot: PlotSettings,

        /// Name of a text file to write (defaults to stdout)
        #[clap(short, long)]
        out: Option<PathBuf>,
    },

    /// Render a single frame to an image
    Render {
        #[clap(flatten)]
        plot: PlotSettings,

        #[clap(flatten)]
        image: ImageSettings,

        /// Name of a `.png` file to write
        #[clap(short, long)]
        out: PathBuf,

        /// Draw the tangent at this `x`
        #[clap(long, allow_negative_numbers = true)]
        at: Option<f64>,
    },

    /// Render the path-reveal animation as a sequence of images
    Animate {
        #[clap(flatten)]
        plot: PlotSettings,

        #[clap(flatten)]
        image: ImageSettings,

        /// Directory in which to write `frame_NNNN.png` files
        #[clap(short, long)]
        out: PathBuf,

        /// Number of frames
        #[clap(short = 'N', long, default_value_t = 120)]
        frames: usize,

        /// Frames per second of the synthetic clock
        #[clap(long, default_value_t = 30.0)]
        fps: f64,

        /// Animation speed multiplier
        #[clap(long, default_value_t = 1.0)]
        speed: f64,
    },
}

#[derive(ValueEnum, Copy, Clone)]
enum BackendMode {
    Native,

    #[cfg(feature = "rhai")]
    Rhai,
}

#[derive(Parser)]
struct PlotSettings {
    /// Expression in `x`
    #[clap(short, long)]
    expr: String,

    /// Derivative expression (computed by the backend if omitted)
    #[clap(short, long)]
    deriv: Option<String>,

    /// Expression backend
    #[clap(short, long, value_enum, default_value_t = BackendMode::Native)]
    backend: BackendMode,

    /// Lower bound of the domain
    #[clap(long, default_value_t = -10.0, allow_negative_numbers = true)]
    min: f64,

    /// Upper bound of the domain
    #[clap(long, default_value_t = 10.0, allow_negative_numbers = true)]
    max: f64,

    /// Zoom factor
    #[clap(short, long, default_value_t = 1.0)]
    zoom: f64,

    /// Horizontal pan, in math units
    #[clap(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pan_x: f64,

    /// Vertical pan, in pixels
    #[clap(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pan_y: f64,

    /// Number of sampling intervals
    #[clap(short, long, default_value_t = SampleConfig::DEFAULT_RESOLUTION)]
    resolution: NonZeroUsize,

    /// Keep points regardless of magnitude
    #[clap(long)]
    no_ceiling: bool,
}

#[derive(Parser)]
struct ImageSettings {
    /// Image width
    #[clap(long, default_value_t = 800)]
    width: u32,

    /// Image height
    #[clap(long, default_value_t = 400)]
    height: u32,

    /// Blank margin around the plot
    #[clap(long, default_value_t = 40)]
    padding: u32,
}

impl ImageSettings {
    fn screen(&self) -> Screen {
        Screen::new(
            self.width as f64,
            self.height as f64,
            self.padding as f64,
        )
    }
}

////////////////////////////////////////////////////////////////////////////////

fn build_plot<B: Backend>(backend: B, settings: &PlotSettings) -> Result<Plot<B>> {
    let mut cfg = PlotConfig::default();
    cfg.sample.resolution = settings.resolution;
    if settings.no_ceiling {
        cfg.sample.ceiling = None;
    }

    let start = Instant::now();
    let mut plot = Plot::new(backend, cfg)?;
    plot.set_domain(settings.min, settings.max)?;
    plot.set_zoom(settings.zoom)?;
    plot.pan(Vector2::new(settings.pan_x, settings.pan_y))?;
    plot.set_expression(&settings.expr, settings.deriv.as_deref())?;
    info!(
        "Sampled {} points in {:?}",
        plot.samples().len(),
        start.elapsed()
    );
    if let Some(s) = plot.simplified() {
        info!("f(x) = {s}");
    }
    if let Some(s) = plot.simplified_derivative() {
        info!("f'(x) = {s}");
    }
    Ok(plot)
}

fn origin<B: Backend>(plot: &Plot<B>, screen: &Screen) -> Point2<f64> {
    plot.viewport().to_viewport(Point2::origin(), screen)
}

fn run_sample<B: Backend>(
    backend: B,
    settings: &PlotSettings,
    out: Option<PathBuf>,
) -> Result<()> {
    let plot = build_plot(backend, settings)?;
    let mut w: Box<dyn Write> = match out {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(&path)
                .with_context(|| format!("could not create {path:?}"))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    writeln!(w, "x\ty\tdy")?;
    for s in plot.samples() {
        if s.dy_valid {
            writeln!(w, "{}\t{}\t{}", s.x, s.y, s.dy)?;
        } else {
            writeln!(w, "{}\t{}\t-", s.x, s.y)?;
        }
    }
    w.flush()?;
    Ok(())
}

fn run_render<B: Backend>(
    backend: B,
    settings: &PlotSettings,
    image: &ImageSettings,
    out: PathBuf,
    at: Option<f64>,
) -> Result<()> {
    let mut plot = build_plot(backend, settings)?;
    let screen = image.screen();
    if let Some(x) = at {
        let px = plot.viewport().to_viewport(Point2::new(x, 0.0), &screen).x;
        plot.highlight(Some(px), &screen);
        match plot.tangent() {
            Some(t) => info!(
                "tangent at x = {}: y = {} x + {}{}",
                t.point.x,
                t.slope,
                t.intercept,
                if t.degenerate { " (degenerate)" } else { "" }
            ),
            None => info!("f({x}) is undefined; no tangent"),
        }
    }

    let start = Instant::now();
    let frame = plot.frame_geometry(&screen);
    let mut canvas = draw::Canvas::new(&screen);
    canvas.draw_frame(&frame, origin(&plot, &screen), &screen);
    info!("Rendered frame in {:?}", start.elapsed());

    info!("Writing image to {out:?}");
    canvas.into_image().save(&out)?;
    Ok(())
}

fn run_animate<B: Backend>(
    backend: B,
    settings: &PlotSettings,
    image: &ImageSettings,
    out: PathBuf,
    frames: usize,
    fps: f64,
    speed: f64,
) -> Result<()> {
    anyhow::ensure!(fps > 0.0 && fps.is_finite(), "fps must be positive");
    let mut plot = build_plot(backend, settings)?;
    plot.set_speed(speed)?;
    let screen = image.screen();
    let origin = origin(&plot, &screen);

    // Step the engine on a synthetic clock; rasterization happens afterwards
    let start = Instant::now();
    plot.start();
    let mut geometry = Vec::with_capacity(frames);
    for i in 0..frames {
        plot.frame(Duration::from_secs_f64(i as f64 / fps));
        geometry.push(plot.frame_geometry(&screen));
    }
    info!("Computed {frames} frames in {:?}", start.elapsed());

    std::fs::create_dir_all(&out)?;
    let start = Instant::now();
    geometry
        .par_iter()
        .enumerate()
        .try_for_each(|(i, frame)| -> Result<()> {
            let mut canvas = draw::Canvas::new(&screen);
            canvas.draw_frame(frame, origin, &screen);
            let path = out.join(format!("frame_{i:04}.png"));
            canvas.into_image().save(&path)?;
            Ok(())
        })?;
    info!(
        "Rendered {frames}x at {:?} ms/frame",
        start.elapsed().as_micros() as f64 / 1000.0 / (frames.max(1) as f64)
    );
    Ok(())
}

fn run<B: Backend>(backend: B, cmd: Command) -> Result<()> {
    match cmd {
        Command::Sample { plot, out } => run_sample(backend, &plot, out),
        Command::Render {
            plot,
            image,
            out,
            at,
        } => run_render(backend, &plot, &image, out, at),
        Command::Animate {
            plot,
            image,
            out,
            frames,
            fps,
            speed,
        } => run_animate(backend, &plot, &image, out, frames, fps, speed),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();
    let mode = match &args.cmd {
        Command::Sample { plot, .. }
        | Command::Render { plot, .. }
        | Command::Animate { plot, .. } => plot.backend,
    };
    match mode {
        BackendMode::Native => run(NativeBackend, args.cmd),
        #[cfg(feature = "rhai")]
        BackendMode::Rhai => run(tangent::backend::RhaiBackend::new(), args.cmd),
    }
}
