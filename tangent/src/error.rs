//! Module containing the universal error type
use thiserror::Error;

/// Universal error type for `tangent`
#[derive(Error, Debug)]
pub enum Error {
    /// Node is not present in this `Context`
    #[error("node is not present in this `Context`")]
    BadNode,

    /// The parser found a token it did not expect
    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken {
        /// Byte offset of the token in the input text
        pos: usize,
        /// Printable form of the offending token
        found: String,
    },

    /// The input ended in the middle of an expression
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// Function name is not known to the parser
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    /// Variable name is not `x`
    #[error("unknown variable `{0}`; only `x` is allowed")]
    UnknownVariable(String),

    /// Expression is nested too deeply to parse
    #[error("expression is nested too deeply (limit {0})")]
    TooDeep(usize),

    /// A numeric literal could not be parsed
    #[error("invalid number `{0}`")]
    BadNumber(String),

    /// Expression failed to parse or failed its sanity probe
    #[error("invalid expression `{text}`: {reason}")]
    InvalidExpression {
        /// Expression text as supplied by the user
        text: String,
        /// Human-readable explanation
        reason: String,
    },

    /// Domain bounds are non-finite or not strictly ascending
    #[error("degenerate domain [{0}, {1}]")]
    DegenerateDomain(f64, f64),

    /// Zoom factor is non-finite or not strictly positive
    #[error("degenerate zoom {0}")]
    DegenerateZoom(f64),

    /// Pan would leave the viewport at a non-finite or degenerate position
    #[error("degenerate pan ({0}, {1})")]
    DegeneratePan(f64, f64),

    /// Animation speed is non-finite or not strictly positive
    #[error("animation speed must be positive, got {0}")]
    BadSpeed(f64),

    /// Configuration value is out of range
    #[error("bad configuration: {0}")]
    BadConfig(&'static str),

    /// The backend does not implement the requested operation
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// A script produced something other than a number
    #[error("expected a number, got {0}")]
    NotANumber(&'static str),

    /// Rhai error; see inner code for details
    #[cfg(feature = "rhai")]
    #[error("Rhai parse error")]
    RhaiParseError(#[from] rhai::ParseError),

    /// Rhai error; see inner code for details
    #[cfg(feature = "rhai")]
    #[error("Rhai evaluation error")]
    RhaiEvalError(#[from] rhai::EvalAltResult),
}

#[cfg(feature = "rhai")]
impl From<Box<rhai::EvalAltResult>> for Error {
    fn from(e: Box<rhai::EvalAltResult>) -> Self {
        Error::RhaiEvalError(*e)
    }
}
