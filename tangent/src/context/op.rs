use crate::context::Node;
use ordered_float::OrderedFloat;

/// A one-argument math operation
///
/// Every opcode except [`Neg`](UnaryOpcode::Neg) is also a function name in the
/// text grammar; the name is available through [`strum::IntoStaticStr`] and
/// parsed through [`std::str::FromStr`].
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[allow(missing_docs)]
pub enum UnaryOpcode {
    Neg,
    Abs,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Exp,
    #[strum(to_string = "ln", serialize = "log")]
    Ln,
}

impl UnaryOpcode {
    /// Applies the operation to a single value
    pub fn apply(&self, a: f64) -> f64 {
        match self {
            UnaryOpcode::Neg => -a,
            UnaryOpcode::Abs => a.abs(),
            UnaryOpcode::Sqrt => a.sqrt(),
            UnaryOpcode::Sin => a.sin(),
            UnaryOpcode::Cos => a.cos(),
            UnaryOpcode::Tan => a.tan(),
            UnaryOpcode::Exp => a.exp(),
            UnaryOpcode::Ln => a.ln(),
        }
    }

    /// Returns the function name, or `None` for prefix negation
    pub fn function_name(&self) -> Option<&'static str> {
        match self {
            UnaryOpcode::Neg => None,
            op => Some(op.into()),
        }
    }
}

/// A two-argument math operation
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum BinaryOpcode {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOpcode {
    /// Applies the operation to a pair of values
    ///
    /// Unlike [`f64::powf`], `Pow` propagates NaN from either side (so
    /// `NaN^0` is NaN rather than 1).
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOpcode::Add => a + b,
            BinaryOpcode::Sub => a - b,
            BinaryOpcode::Mul => a * b,
            BinaryOpcode::Div => a / b,
            BinaryOpcode::Pow if a.is_nan() || b.is_nan() => f64::NAN,
            BinaryOpcode::Pow => a.powf(b),
        }
    }

    /// Binding strength when parsing or printing infix text
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            BinaryOpcode::Add | BinaryOpcode::Sub => 1,
            BinaryOpcode::Mul | BinaryOpcode::Div => 2,
            BinaryOpcode::Pow => 4,
        }
    }

    /// Infix symbol, with surrounding whitespace
    pub(crate) fn symbol(&self) -> &'static str {
        match self {
            BinaryOpcode::Add => " + ",
            BinaryOpcode::Sub => " - ",
            BinaryOpcode::Mul => " * ",
            BinaryOpcode::Div => " / ",
            BinaryOpcode::Pow => "^",
        }
    }
}

/// Represents an operation in a math expression.
///
/// `Op`s should be constructed by calling functions on
/// [`Context`](crate::context::Context), e.g.
/// [`Context::add`](crate::context::Context::add) will generate an
/// `Op::Binary(BinaryOpcode::Add, .., ..)` node and return an opaque handle.
///
/// Each `Op` is tightly coupled to the [`Context`](crate::context::Context)
/// which generated it, and will not be valid for a different `Context`.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum Op {
    /// The free variable `x`
    Input,
    Const(OrderedFloat<f64>),
    Binary(BinaryOpcode, Node, Node),
    Unary(UnaryOpcode, Node),
}

impl Op {
    /// Iterates over children, producing 0, 1, or 2 values
    pub fn iter_children(&self) -> impl Iterator<Item = Node> + use<> {
        let out = match self {
            Op::Binary(_, a, b) => [Some(*a), Some(*b)],
            Op::Unary(_, a) => [Some(*a), None],
            Op::Input | Op::Const(..) => [None, None],
        };
        out.into_iter().flatten()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn function_names() {
        assert_eq!(UnaryOpcode::from_str("sin").unwrap(), UnaryOpcode::Sin);
        assert_eq!(UnaryOpcode::from_str("ln").unwrap(), UnaryOpcode::Ln);
        assert_eq!(UnaryOpcode::from_str("log").unwrap(), UnaryOpcode::Ln);
        assert!(UnaryOpcode::from_str("sinh").is_err());

        assert_eq!(UnaryOpcode::Ln.function_name(), Some("ln"));
        assert_eq!(UnaryOpcode::Sqrt.function_name(), Some("sqrt"));
        assert_eq!(UnaryOpcode::Neg.function_name(), None);
    }

    #[test]
    fn apply() {
        assert_eq!(BinaryOpcode::Pow.apply(2.0, 10.0), 1024.0);
        assert!(BinaryOpcode::Div.apply(1.0, 0.0).is_infinite());
        assert!(UnaryOpcode::Sqrt.apply(-1.0).is_nan());
        assert_eq!(UnaryOpcode::Neg.apply(3.0), -3.0);

        assert!(BinaryOpcode::Pow.apply(f64::NAN, 0.0).is_nan());
        assert!(BinaryOpcode::Pow.apply(1.0, f64::NAN).is_nan());
    }
}
