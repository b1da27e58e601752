//! Straight-line evaluation of expression graphs
//!
//! A [`Context`] is convenient for building and rewriting expressions, but
//! walking it for every evaluation is slow.  A [`Tape`] flattens the subgraph
//! reachable from a root node into a list of operations, each of which writes
//! to its own slot; evaluating it is a single pass over that list.
//!
//! ```
//! use tangent::context::Context;
//!
//! let mut ctx = Context::new();
//! let f = ctx.parse("x^2 + sin(x)")?;
//! let tape = ctx.get_tape(f)?;
//! assert_eq!(tape.len(), 5); // x, 2, x^2, sin(x), sum
//! assert_eq!(tape.eval(0.0), 0.0);
//! # Ok::<(), tangent::Error>(())
//! ```
use crate::{
    context::{BinaryOpcode, Context, Node, Op, UnaryOpcode},
    Error,
};
use std::collections::{BTreeMap, BTreeSet};

/// A single operation on a [`Tape`]
///
/// Arguments are indexes of earlier slots in the same tape.
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum TapeOp {
    Input,
    Const(f64),
    Unary(UnaryOpcode, u32),
    Binary(BinaryOpcode, u32, u32),
}

/// Flattened expression, ready for evaluation
///
/// The last operation on the tape is the output.
#[derive(Clone, Debug)]
pub struct Tape {
    ops: Vec<TapeOp>,
}

impl Tape {
    /// Builds a tape for the subgraph rooted at `root`
    pub fn new(ctx: &Context, root: Node) -> Result<Self, Error> {
        // Find every node reachable from the root
        let mut seen = BTreeSet::new();
        let mut todo = vec![root];
        while let Some(node) = todo.pop() {
            if !seen.insert(node) {
                continue;
            }
            let op = ctx.get_op(node).ok_or(Error::BadNode)?;
            todo.extend(op.iter_children());
        }

        // Nodes can only refer to nodes that already exist in the context, so
        // sorting by index gives us a valid evaluation order (and the root is
        // always last).
        let mut slots = BTreeMap::new();
        let mut ops = Vec::with_capacity(seen.len());
        for node in seen {
            let slot = |n: &Node| slots.get(n).copied().ok_or(Error::BadNode);
            let op = match *ctx.get_op(node).ok_or(Error::BadNode)? {
                Op::Input => TapeOp::Input,
                Op::Const(c) => TapeOp::Const(c.0),
                Op::Unary(op, a) => TapeOp::Unary(op, slot(&a)?),
                Op::Binary(op, a, b) => TapeOp::Binary(op, slot(&a)?, slot(&b)?),
            };
            slots.insert(node, ops.len() as u32);
            ops.push(op);
        }
        Ok(Self { ops })
    }

    /// Returns the number of operations on the tape
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Checks whether the tape is empty (which should never happen)
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterates over the tape's operations, in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &TapeOp> {
        self.ops.iter()
    }

    /// Evaluates the tape at a particular value of `x`
    ///
    /// Undefined operations produce NaN or infinite values, following IEEE-754
    /// semantics; this function never fails.
    pub fn eval(&self, x: f64) -> f64 {
        let mut slots = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let v = match *op {
                TapeOp::Input => x,
                TapeOp::Const(c) => c,
                TapeOp::Unary(op, a) => op.apply(slots[a as usize]),
                TapeOp::Binary(op, a, b) => {
                    op.apply(slots[a as usize], slots[b as usize])
                }
            };
            slots.push(v);
        }
        slots.last().copied().unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dupe() {
        let mut ctx = Context::new();
        let x = ctx.x();
        let x_squared = ctx.mul(x, x).unwrap();

        let tape = ctx.get_tape(x_squared).unwrap();
        assert_eq!(tape.len(), 3); // x, 2, x^2
        assert_eq!(tape.eval(3.0), 9.0);
    }

    #[test]
    fn test_unreachable_nodes_are_skipped() {
        let mut ctx = Context::new();
        let f = ctx.parse("sin(x) * cos(x) + exp(x)").unwrap();
        let g = ctx.parse("x + 1").unwrap();
        let tape = ctx.get_tape(g).unwrap();
        assert_eq!(tape.len(), 3);
        assert_eq!(tape.eval(2.0), 3.0);
        assert!(ctx.get_tape(f).unwrap().len() > 3);
    }

    #[test]
    fn test_root_is_last() {
        let mut ctx = Context::new();
        let f = ctx.parse("1 / (x - 2)").unwrap();
        let tape = ctx.get_tape(f).unwrap();
        assert!(matches!(
            tape.iter().last(),
            Some(TapeOp::Binary(BinaryOpcode::Div, ..))
        ));
        assert_eq!(tape.eval(3.0), 1.0);
        assert!(tape.eval(2.0).is_infinite());
    }

    #[test]
    fn test_bad_root() {
        let ctx = Context::new();
        let mut other = Context::new();
        let x = other.x();
        assert!(matches!(ctx.get_tape(x), Err(Error::BadNode)));
    }
}
