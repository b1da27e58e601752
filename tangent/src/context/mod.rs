//! Infrastructure for representing math expressions as graphs
mod indexed;
mod op;
mod parse;

use indexed::{define_index, IndexMap, IndexVec};
pub use op::{BinaryOpcode, Op, UnaryOpcode};

use crate::{tape::Tape, Error};

use ordered_float::OrderedFloat;

define_index!(Node, "An index in the `Context::ops` map");

/// Precedence of prefix negation (and of negative constants) in infix text
const NEG_PRECEDENCE: u8 = 3;

/// Precedence of atoms (constants, `x`, and function calls)
const ATOM_PRECEDENCE: u8 = 5;

/// A `Context` holds a set of deduplicated constants and operations over the
/// single free variable `x`.
///
/// It should be used like an arena allocator: it grows over time, then frees
/// all of its contents when dropped.
///
/// Every node constructor does constant folding and a handful of algebraic
/// simplifications (`a + 0 → a`, `a * 1 → a`, `a^1 → a`, ...), so trees built
/// by [`Context::deriv`] stay readable.  Rewrites which discard an operand
/// (`a * 0`, `a - a`, `a^0`) only apply when that operand is
/// [total](Context::is_total), so `sqrt(x) - sqrt(x)` is still undefined for
/// negative `x`.
#[derive(Clone, Debug, Default)]
pub struct Context {
    ops: IndexMap<Op, Node>,
}

impl Context {
    /// Build a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the context
    ///
    /// All [`Node`] handles from this context are invalidated.
    ///
    /// ```
    /// # use tangent::context::Context;
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// ctx.clear();
    /// assert!(ctx.eval(x, 1.0).is_err());
    /// ```
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Returns the number of [`Op`] nodes in the context
    ///
    /// ```
    /// # use tangent::context::Context;
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// assert_eq!(ctx.len(), 1);
    /// let _one = ctx.constant(1.0);
    /// assert_eq!(ctx.len(), 2);
    /// ctx.clear();
    /// assert_eq!(ctx.len(), 0);
    /// ```
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Checks whether the context is empty
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Checks whether the given [`Node`] is valid in this context
    fn check_node(&self, node: Node) -> Result<(), Error> {
        self.get_op(node).ok_or(Error::BadNode).map(|_| ())
    }

    /// Looks up the constant associated with the given node.
    ///
    /// If the node is invalid for this tree, returns an error; if the node is
    /// not a constant, returns `Ok(None)`.
    pub fn const_value(&self, n: Node) -> Result<Option<f64>, Error> {
        match self.get_op(n) {
            Some(Op::Const(c)) => Ok(Some(c.0)),
            Some(_) => Ok(None),
            _ => Err(Error::BadNode),
        }
    }

    /// Checks whether the subtree at `n` is defined for every real `x`
    ///
    /// Division, `sqrt`, `ln`, `tan` and powers other than non-negative
    /// integer constants are partial; so is a non-finite constant.
    pub fn is_total(&self, n: Node) -> Result<bool, Error> {
        let mut todo = vec![n];
        while let Some(node) = todo.pop() {
            let op = *self.get_op(node).ok_or(Error::BadNode)?;
            let total = match op {
                Op::Input => true,
                Op::Const(c) => c.0.is_finite(),
                Op::Unary(op, _) => !matches!(
                    op,
                    UnaryOpcode::Sqrt | UnaryOpcode::Ln | UnaryOpcode::Tan
                ),
                Op::Binary(BinaryOpcode::Div, ..) => false,
                Op::Binary(BinaryOpcode::Pow, _, b) => self
                    .const_value(b)?
                    .is_some_and(|e| e >= 0.0 && e.fract() == 0.0),
                Op::Binary(..) => true,
            };
            if !total {
                return Ok(false);
            }
            todo.extend(op.iter_children());
        }
        Ok(true)
    }

    /// Returns the height of the tree rooted at `root`, where a leaf has
    /// height 0
    ///
    /// ```
    /// # use tangent::context::Context;
    /// let mut ctx = Context::new();
    /// let f = ctx.parse("sin(x) + 1").unwrap();
    /// assert_eq!(ctx.height(f).unwrap(), 2);
    /// ```
    pub fn height(&self, root: Node) -> Result<usize, Error> {
        self.check_node(root)?;
        let mut heights: IndexVec<Option<usize>, Node> =
            vec![None; self.ops.len()].into();
        let mut todo = vec![(false, root)];
        while let Some((up, node)) = todo.pop() {
            if heights[node].is_some() {
                continue;
            }
            let op = *self.get_op(node).ok_or(Error::BadNode)?;
            if up {
                let mut h = 0;
                for c in op.iter_children() {
                    h = h.max(heights[c].ok_or(Error::BadNode)? + 1);
                }
                heights[node] = Some(h);
            } else {
                todo.push((true, node));
                todo.extend(op.iter_children().map(|c| (false, c)));
            }
        }
        heights[root].ok_or(Error::BadNode)
    }

    /// Looks up an operation by `Node` handle
    pub fn get_op(&self, node: Node) -> Option<&Op> {
        self.ops.get_by_index(node)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Primitives
    /// Constructs or finds the free variable `x`
    /// ```
    /// # use tangent::context::Context;
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// let v = ctx.eval(x, 1.0).unwrap();
    /// assert_eq!(v, 1.0);
    /// ```
    pub fn x(&mut self) -> Node {
        self.ops.insert(Op::Input)
    }

    /// Returns a node representing the given constant value.
    /// ```
    /// # let mut ctx = tangent::context::Context::new();
    /// let v = ctx.constant(3.0);
    /// assert_eq!(ctx.eval(v, 0.0).unwrap(), 3.0);
    /// ```
    pub fn constant(&mut self, f: f64) -> Node {
        self.ops.insert(Op::Const(OrderedFloat(f)))
    }

    ////////////////////////////////////////////////////////////////////////////
    // Helper functions to create nodes with constant folding
    /// Find or create a [Node] for the given unary operation, with constant
    /// folding and simplification.
    pub fn unary<A: IntoNode>(
        &mut self,
        op: UnaryOpcode,
        a: A,
    ) -> Result<Node, Error> {
        let a = a.into_node(self)?;
        let op_a = *self.get_op(a).ok_or(Error::BadNode)?;
        let out = match (op, op_a) {
            (_, Op::Const(c)) => self.constant(op.apply(c.0)),
            (UnaryOpcode::Neg, Op::Unary(UnaryOpcode::Neg, inner)) => inner,
            _ => self.ops.insert(Op::Unary(op, a)),
        };
        Ok(out)
    }

    /// Find or create a [Node] for the given binary operation, with constant
    /// folding and simplification.
    pub fn binary<A: IntoNode, B: IntoNode>(
        &mut self,
        op: BinaryOpcode,
        a: A,
        b: B,
    ) -> Result<Node, Error> {
        let a = a.into_node(self)?;
        let b = b.into_node(self)?;
        let ca = self.const_value(a)?;
        let cb = self.const_value(b)?;
        if let (Some(ca), Some(cb)) = (ca, cb) {
            return Ok(self.constant(op.apply(ca, cb)));
        }
        let out = match (op, ca, cb) {
            (BinaryOpcode::Add, Some(0.0), _) => b,
            (BinaryOpcode::Add, _, Some(0.0)) => a,
            (BinaryOpcode::Add, ..) if a == b => {
                return self.binary(BinaryOpcode::Mul, 2.0, a);
            }

            (BinaryOpcode::Sub, _, Some(0.0)) => a,
            (BinaryOpcode::Sub, Some(0.0), _) => {
                return self.unary(UnaryOpcode::Neg, b);
            }
            (BinaryOpcode::Sub, ..) if a == b && self.is_total(a)? => {
                self.constant(0.0)
            }

            (BinaryOpcode::Mul, Some(0.0), _) if self.is_total(b)? => {
                self.constant(0.0)
            }
            (BinaryOpcode::Mul, _, Some(0.0)) if self.is_total(a)? => {
                self.constant(0.0)
            }
            (BinaryOpcode::Mul, Some(1.0), _) => b,
            (BinaryOpcode::Mul, _, Some(1.0)) => a,
            (BinaryOpcode::Mul, Some(-1.0), _) => {
                return self.unary(UnaryOpcode::Neg, b);
            }
            (BinaryOpcode::Mul, _, Some(-1.0)) => {
                return self.unary(UnaryOpcode::Neg, a);
            }
            (BinaryOpcode::Mul, ..) if a == b => {
                return self.binary(BinaryOpcode::Pow, a, 2.0);
            }

            (BinaryOpcode::Div, _, Some(1.0)) => a,

            (BinaryOpcode::Pow, _, Some(1.0)) => a,
            (BinaryOpcode::Pow, _, Some(0.0)) if self.is_total(a)? => {
                self.constant(1.0)
            }
            (BinaryOpcode::Pow, Some(1.0), _) if self.is_total(b)? => {
                self.constant(1.0)
            }

            // Commutative operations are sorted to encourage deduplication
            (BinaryOpcode::Add | BinaryOpcode::Mul, ..) => {
                self.ops.insert(Op::Binary(op, a.min(b), a.max(b)))
            }
            _ => self.ops.insert(Op::Binary(op, a, b)),
        };
        Ok(out)
    }

    /// Builds an addition node
    /// ```
    /// # let mut ctx = tangent::context::Context::new();
    /// let x = ctx.x();
    /// let op = ctx.add(x, 1.0).unwrap();
    /// let v = ctx.eval(op, 1.0).unwrap();
    /// assert_eq!(v, 2.0);
    /// ```
    pub fn add<A: IntoNode, B: IntoNode>(
        &mut self,
        a: A,
        b: B,
    ) -> Result<Node, Error> {
        self.binary(BinaryOpcode::Add, a, b)
    }

    /// Builds a subtraction node
    pub fn sub<A: IntoNode, B: IntoNode>(
        &mut self,
        a: A,
        b: B,
    ) -> Result<Node, Error> {
        self.binary(BinaryOpcode::Sub, a, b)
    }

    /// Builds a multiplication node
    pub fn mul<A: IntoNode, B: IntoNode>(
        &mut self,
        a: A,
        b: B,
    ) -> Result<Node, Error> {
        self.binary(BinaryOpcode::Mul, a, b)
    }

    /// Builds a division node
    /// ```
    /// # let mut ctx = tangent::context::Context::new();
    /// let x = ctx.x();
    /// let op = ctx.div(1.0, x).unwrap();
    /// assert_eq!(ctx.eval(op, 4.0).unwrap(), 0.25);
    /// assert!(ctx.eval(op, 0.0).unwrap().is_infinite());
    /// ```
    pub fn div<A: IntoNode, B: IntoNode>(
        &mut self,
        a: A,
        b: B,
    ) -> Result<Node, Error> {
        self.binary(BinaryOpcode::Div, a, b)
    }

    /// Builds a node which raises `a` to the power `b`
    pub fn pow<A: IntoNode, B: IntoNode>(
        &mut self,
        a: A,
        b: B,
    ) -> Result<Node, Error> {
        self.binary(BinaryOpcode::Pow, a, b)
    }

    /// Builds a node which negates its input
    pub fn neg<A: IntoNode>(&mut self, a: A) -> Result<Node, Error> {
        self.unary(UnaryOpcode::Neg, a)
    }

    /// Builds a node which takes the absolute value of its input
    pub fn abs<A: IntoNode>(&mut self, a: A) -> Result<Node, Error> {
        self.unary(UnaryOpcode::Abs, a)
    }

    /// Builds a node which takes the square root of its input
    pub fn sqrt<A: IntoNode>(&mut self, a: A) -> Result<Node, Error> {
        self.unary(UnaryOpcode::Sqrt, a)
    }

    /// Builds a node which takes the sine of its input
    pub fn sin<A: IntoNode>(&mut self, a: A) -> Result<Node, Error> {
        self.unary(UnaryOpcode::Sin, a)
    }

    /// Builds a node which takes the cosine of its input
    pub fn cos<A: IntoNode>(&mut self, a: A) -> Result<Node, Error> {
        self.unary(UnaryOpcode::Cos, a)
    }

    /// Builds a node which takes the tangent of its input
    pub fn tan<A: IntoNode>(&mut self, a: A) -> Result<Node, Error> {
        self.unary(UnaryOpcode::Tan, a)
    }

    /// Builds a node which computes `e^a`
    pub fn exp<A: IntoNode>(&mut self, a: A) -> Result<Node, Error> {
        self.unary(UnaryOpcode::Exp, a)
    }

    /// Builds a node which takes the natural log of its input
    pub fn ln<A: IntoNode>(&mut self, a: A) -> Result<Node, Error> {
        self.unary(UnaryOpcode::Ln, a)
    }

    ////////////////////////////////////////////////////////////////////////////

    /// Flattens a subtree of the graph into straight-line code
    pub fn get_tape(&self, root: Node) -> Result<Tape, Error> {
        Tape::new(self, root)
    }

    /// Evaluates the given node at a particular value of `x`
    ///
    /// This builds a fresh [`Tape`] on every call; consider calling
    /// [`get_tape`](Self::get_tape) once and evaluating that instead.
    ///
    /// Math errors are not reported here; they show up as NaN or infinite
    /// results, exactly as in `f64` arithmetic.
    pub fn eval(&self, root: Node, x: f64) -> Result<f64, Error> {
        Ok(self.get_tape(root)?.eval(x))
    }

    ////////////////////////////////////////////////////////////////////////////

    /// Differentiates the given node with respect to `x`
    ///
    /// The result is built from simplifying constructors, so trivial terms
    /// are folded away:
    /// ```
    /// # use tangent::context::Context;
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// let f = ctx.pow(x, 3.0).unwrap();
    /// let df = ctx.deriv(f).unwrap();
    /// assert_eq!(ctx.display(df).unwrap(), "3 * x^2");
    /// assert_eq!(ctx.eval(df, 2.0).unwrap(), 12.0);
    /// ```
    pub fn deriv(&mut self, root: Node) -> Result<Node, Error> {
        self.check_node(root)?;

        // Depth-first recursion on the heap, to protect against stack overflows
        enum Action {
            Down,
            Up,
        }

        let mut done: IndexVec<Option<Node>, Node> =
            vec![None; self.ops.len()].into();
        let mut todo = vec![(Action::Down, root)];
        while let Some((action, node)) = todo.pop() {
            let op = *self.get_op(node).ok_or(Error::BadNode)?;
            match action {
                Action::Down => {
                    if done[node].is_some() {
                        continue;
                    }
                    todo.push((Action::Up, node));
                    todo.extend(op.iter_children().map(|c| (Action::Down, c)));
                }
                Action::Up => {
                    if done[node].is_some() {
                        continue;
                    }
                    let d = |n: Node| done[n].ok_or(Error::BadNode);
                    let r = match op {
                        Op::Input => self.constant(1.0),
                        Op::Const(..) => self.constant(0.0),
                        Op::Binary(op, a, b) => {
                            let (da, db) = (d(a)?, d(b)?);
                            self.deriv_binary(op, a, b, da, db)?
                        }
                        Op::Unary(op, a) => {
                            let da = d(a)?;
                            self.deriv_unary(op, a, da)?
                        }
                    };
                    done[node] = Some(r);
                }
            }
        }
        done[root].ok_or(Error::BadNode)
    }

    fn deriv_binary(
        &mut self,
        op: BinaryOpcode,
        a: Node,
        b: Node,
        da: Node,
        db: Node,
    ) -> Result<Node, Error> {
        match op {
            BinaryOpcode::Add => self.add(da, db),
            BinaryOpcode::Sub => self.sub(da, db),
            BinaryOpcode::Mul => {
                let lhs = self.deriv_mul(a, db)?;
                let rhs = self.deriv_mul(b, da)?;
                self.add(lhs, rhs)
            }
            BinaryOpcode::Div => {
                let num_lhs = self.deriv_mul(da, b)?;
                let num_rhs = self.deriv_mul(a, db)?;
                let num = self.sub(num_lhs, num_rhs)?;
                let den = self.pow(b, 2.0)?;
                self.div(num, den)
            }
            BinaryOpcode::Pow => {
                if let Some(n) = self.const_value(b)? {
                    // d/dx a^n = n * a^(n - 1) * a'
                    let p = self.pow(a, n - 1.0)?;
                    let p = self.deriv_mul(n, p)?;
                    self.deriv_mul(p, da)
                } else {
                    // d/dx a^b = a^b * (b' * ln(a) + b * a' / a)
                    let f = self.pow(a, b)?;
                    let ln_a = self.ln(a)?;
                    let lhs = self.deriv_mul(db, ln_a)?;
                    let rhs = self.deriv_mul(b, da)?;
                    let rhs = self.div(rhs, a)?;
                    let sum = self.add(lhs, rhs)?;
                    self.mul(f, sum)
                }
            }
        }
    }

    fn deriv_unary(
        &mut self,
        op: UnaryOpcode,
        a: Node,
        da: Node,
    ) -> Result<Node, Error> {
        let outer = match op {
            UnaryOpcode::Neg => return self.neg(da),
            UnaryOpcode::Abs => {
                let abs = self.abs(a)?;
                self.div(a, abs)?
            }
            UnaryOpcode::Sqrt => {
                let s = self.sqrt(a)?;
                let two_s = self.mul(2.0, s)?;
                return self.div(da, two_s);
            }
            UnaryOpcode::Sin => self.cos(a)?,
            UnaryOpcode::Cos => {
                let s = self.sin(a)?;
                self.neg(s)?
            }
            UnaryOpcode::Tan => {
                let c = self.cos(a)?;
                let c2 = self.pow(c, 2.0)?;
                return self.div(da, c2);
            }
            UnaryOpcode::Exp => self.exp(a)?,
            UnaryOpcode::Ln => return self.div(da, a),
        };
        self.deriv_mul(outer, da)
    }

    /// Product of two derivative terms
    ///
    /// A derivative is only used where its function is defined, so a zero
    /// factor drops the term even when the other factor is partial.
    fn deriv_mul<A: IntoNode, B: IntoNode>(
        &mut self,
        a: A,
        b: B,
    ) -> Result<Node, Error> {
        let a = a.into_node(self)?;
        let b = b.into_node(self)?;
        if self.const_value(a)? == Some(0.0) || self.const_value(b)? == Some(0.0)
        {
            Ok(self.constant(0.0))
        } else {
            self.mul(a, b)
        }
    }

    ////////////////////////////////////////////////////////////////////////////

    /// Prints the given node as infix text
    ///
    /// The output uses the same grammar as [`Context::parse`], so it can be
    /// parsed back into an equivalent tree.
    ///
    /// ```
    /// # use tangent::context::Context;
    /// let mut ctx = Context::new();
    /// let f = ctx.parse("-(x + 1)^2 / sin(x)").unwrap();
    /// assert_eq!(ctx.display(f).unwrap(), "-(x + 1)^2 / sin(x)");
    /// ```
    pub fn display(&self, node: Node) -> Result<String, Error> {
        let mut out = String::new();
        self.write_node(node, 0, &mut out)?;
        Ok(out)
    }

    /// Returns the binding strength of a node when printed
    fn precedence(&self, node: Node) -> Result<u8, Error> {
        Ok(match self.get_op(node).ok_or(Error::BadNode)? {
            Op::Const(c) if c.0.is_sign_negative() => NEG_PRECEDENCE,
            Op::Input | Op::Const(..) => ATOM_PRECEDENCE,
            Op::Unary(UnaryOpcode::Neg, ..) => NEG_PRECEDENCE,
            Op::Unary(..) => ATOM_PRECEDENCE,
            Op::Binary(op, ..) => op.precedence(),
        })
    }

    /// Writes a node, wrapping it in parentheses if it binds more loosely than
    /// `min_precedence`
    fn write_node(
        &self,
        node: Node,
        min_precedence: u8,
        out: &mut String,
    ) -> Result<(), Error> {
        let wrap = self.precedence(node)? < min_precedence;
        if wrap {
            out.push('(');
        }
        match *self.get_op(node).ok_or(Error::BadNode)? {
            Op::Input => out.push('x'),
            Op::Const(c) => out.push_str(&c.0.to_string()),
            Op::Unary(UnaryOpcode::Neg, a) => {
                out.push('-');
                self.write_node(a, NEG_PRECEDENCE, out)?;
            }
            Op::Unary(op, a) => {
                out.push_str(op.function_name().unwrap_or_default());
                out.push('(');
                self.write_node(a, 0, out)?;
                out.push(')');
            }
            Op::Binary(op, a, b) => {
                let p = op.precedence();
                // Left-associative operators need a tighter right-hand side;
                // exponentiation is right-associative, so it's the other way
                // around.
                let (lhs, rhs) = if op == BinaryOpcode::Pow {
                    (p + 1, p)
                } else {
                    (p, p + 1)
                };
                self.write_node(a, lhs, out)?;
                out.push_str(op.symbol());
                self.write_node(b, rhs, out)?;
            }
        }
        if wrap {
            out.push(')');
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
/// Helper trait for things that can be converted into a [`Node`] given a
/// [`Context`].
///
/// This trait allows you to write
/// ```
/// # let mut ctx = tangent::context::Context::new();
/// let x = ctx.x();
/// let sum = ctx.add(x, 1.0).unwrap();
/// ```
/// instead of the more verbose
/// ```
/// # let mut ctx = tangent::context::Context::new();
/// let x = ctx.x();
/// let num = ctx.constant(1.0);
/// let sum = ctx.add(x, num).unwrap();
/// ```
pub trait IntoNode {
    /// Converts the given values into a node
    fn into_node(self, ctx: &mut Context) -> Result<Node, Error>;
}

impl IntoNode for Node {
    fn into_node(self, ctx: &mut Context) -> Result<Node, Error> {
        ctx.check_node(self)?;
        Ok(self)
    }
}

impl IntoNode for f32 {
    fn into_node(self, ctx: &mut Context) -> Result<Node, Error> {
        Ok(ctx.constant(self as f64))
    }
}

impl IntoNode for f64 {
    fn into_node(self, ctx: &mut Context) -> Result<Node, Error> {
        Ok(ctx.constant(self))
    }
}

////////////////////////////////////////////////////////////////////////////////
