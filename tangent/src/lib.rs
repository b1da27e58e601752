//! `tangent` is the engine behind interactive plots of a function, its
//! derivative, and a tangent line.
//!
//! It's responsible for everything except drawing:
//!
//! - Evaluating a user-supplied expression in `x`, tolerating points where it's
//!   undefined
//! - Finding derivative values, either symbolically or numerically
//! - Sampling the function across a domain
//! - Mapping between math coordinates and screen pixels under zoom and pan
//! - Computing tangent lines
//! - Driving a restartable path-reveal animation
//!
//! # Expressions
//! Expressions are handled by a [`Backend`](crate::backend::Backend), which
//! knows how to parse, evaluate, differentiate, and simplify them.
//!
//! The native backend builds expressions in a
//! [`Context`](crate::context::Context), an arena-style allocator which does
//! deduplication, constant folding, and simple algebraic rewrites:
//! ```
//! use tangent::context::Context;
//!
//! let mut ctx = Context::new();
//! let f = ctx.parse("x^3 + 0 * sin(x)")?;
//! assert_eq!(ctx.display(f)?, "x^3");
//!
//! let df = ctx.deriv(f)?;
//! assert_eq!(ctx.display(df)?, "3 * x^2");
//! # Ok::<(), tangent::Error>(())
//! ```
//!
//! With the `rhai` feature, expressions can also be evaluated as
//! [Rhai](https://rhai.rs) scripts; since that backend can't differentiate,
//! derivatives are estimated numerically.
//!
//! # Evaluation and sampling
//! An [`Evaluator`](crate::eval::Evaluator) wraps a backend and never fails:
//! undefined results become [`Value::Invalid`](crate::eval::Value::Invalid).
//! The [`sample`](crate::sample::sample) function walks a domain, dropping
//! invalid points:
//! ```
//! use tangent::{
//!     backend::NativeBackend,
//!     config::SampleConfig,
//!     eval::Evaluator,
//!     sample::{sample, Domain},
//! };
//!
//! let eval = Evaluator::new(NativeBackend);
//! let f = eval.parse("ln(x)")?;
//! let set = sample(
//!     &eval,
//!     &f,
//!     None,
//!     Domain::new(-1.0, 1.0)?,
//!     &SampleConfig::default(),
//! );
//! assert!(set.iter().all(|s| s.x > 0.0));
//! # Ok::<(), tangent::Error>(())
//! ```
//!
//! # Interaction
//! A [`Plot`](crate::plot::Plot) bundles an expression, domain,
//! [`Viewport`](crate::view::Viewport), and
//! [`Animation`](crate::animate::Animation), resampling whenever one of them
//! changes.  It never schedules work on its own; the host calls
//! [`Plot::tick`](crate::plot::Plot::tick) once per frame, then reads back
//! pixel-space geometry with
//! [`Plot::frame_geometry`](crate::plot::Plot::frame_geometry).
//!
//! ```
//! use std::time::Duration;
//! use tangent::{
//!     backend::NativeBackend, config::PlotConfig, plot::Plot, view::Screen,
//! };
//!
//! let mut plot = Plot::new(NativeBackend, PlotConfig::default())?;
//! plot.set_expression("sin(x)", None)?;
//! plot.zoom_by(2.0)?;
//! plot.start();
//! plot.tick(Duration::from_millis(500));
//!
//! let frame = plot.frame_geometry(&Screen::default());
//! assert_eq!(frame.function.len(), 1);
//! assert!(frame.tangent.is_some());
//! # Ok::<(), tangent::Error>(())
//! ```
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![warn(missing_docs)]

pub mod animate;
pub mod backend;
pub mod config;
pub mod context;
pub mod eval;
pub mod plot;
pub mod sample;
pub mod tangent;
pub mod tape;
pub mod view;

mod error;
pub use error::Error;
