// This module defines the symbolic IR that every other part of the kernel compiler
// emits into and reads from. A compilation produces a flat, straight-line OpcodeStream
// of Instructions; each instruction is either a Comment or an Op carrying a structured
// statement. Statements are plain assignments over a small expression tree (symbols,
// literals, negation, addition, subtraction, multiplication) or calls into the fixed
// base-operation library used by subroutine-style FFT kernels. Def/use sets and the
// arithmetic cost of an op are derived from its statement when the op is built, so the
// dead-code pass and the cost report always agree with what gets emitted. Symbols name
// either recyclable temporaries or fixed I/O slots; rendering them to source text is
// parameterized by SlotNames so one IR can be serialized for any kernel signature.

//! Symbolic instruction stream.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A symbolic scalar location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// Recyclable temporary `t<n>`.
    Temp(u32),
    /// Input sample of a real kernel.
    Input(usize),
    /// Output bin of a real kernel.
    Output(usize),
    /// Real part of an in-place complex slot.
    Real(usize),
    /// Imaginary part of an in-place complex slot.
    Imag(usize),
}

impl Symbol {
    /// Temporary id, if this is a temporary.
    pub fn temp_id(&self) -> Option<u32> {
        match self {
            Symbol::Temp(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether this symbol is a recyclable temporary.
    pub fn is_temp(&self) -> bool {
        self.temp_id().is_some()
    }

    /// Render using the given slot names.
    pub fn display<'a>(&'a self, names: &'a SlotNames) -> Rendered<'a, Symbol> {
        Rendered { value: self, names }
    }
}

/// A complex value held in two scalar symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexSym {
    pub re: Symbol,
    pub im: Symbol,
}

impl ComplexSym {
    pub const fn new(re: Symbol, im: Symbol) -> Self {
        Self { re, im }
    }

    /// The in-place complex slot `addr` of an FFT kernel.
    pub const fn slot(addr: usize) -> Self {
        Self { re: Symbol::Real(addr), im: Symbol::Imag(addr) }
    }
}

/// Array names used when rendering I/O slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotNames {
    pub input: &'static str,
    pub output: &'static str,
    pub real: &'static str,
    pub imag: &'static str,
}

impl SlotNames {
    pub const DCT_FORWARD: SlotNames = SlotNames {
        input: "dct_in",
        output: "dct_out",
        real: "re",
        imag: "im",
    };

    pub const DCT_INVERSE: SlotNames = SlotNames {
        input: "idct_in",
        output: "idct_out",
        real: "re",
        imag: "im",
    };

    pub const FFT: SlotNames = SlotNames {
        input: "x_in",
        output: "x_out",
        real: "re",
        imag: "im",
    };
}

impl Default for SlotNames {
    fn default() -> Self {
        SlotNames::FFT
    }
}

/// Arithmetic operation counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cost {
    pub add: u32,
    pub mul: u32,
    pub neg: u32,
}

impl Cost {
    pub const fn new(add: u32, mul: u32, neg: u32) -> Self {
        Self { add, mul, neg }
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.add += rhs.add;
        self.mul += rhs.mul;
        self.neg += rhs.neg;
    }
}

/// Expression tree of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Sym(Symbol),
    Lit(f64),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// A floating point literal.
    pub fn lit(value: f64) -> Self {
        Expr::Lit(value)
    }

    /// Operation count of evaluating this expression once.
    pub fn cost(&self) -> Cost {
        let mut cost = Cost::default();
        self.visit(&mut |expr| match expr {
            Expr::Add(..) | Expr::Sub(..) => cost.add += 1,
            Expr::Mul(..) => cost.mul += 1,
            Expr::Neg(..) => cost.neg += 1,
            Expr::Sym(_) | Expr::Lit(_) => {}
        });
        cost
    }

    /// Symbols read by this expression, in first-use order.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        self.visit(&mut |expr| {
            if let Expr::Sym(sym) = expr {
                if !out.contains(sym) {
                    out.push(*sym);
                }
            }
        });
        out
    }

    /// Evaluate with the given symbol reader.
    pub fn eval(&self, read: &impl Fn(Symbol) -> f64) -> f64 {
        match self {
            Expr::Sym(sym) => read(*sym),
            Expr::Lit(value) => *value,
            Expr::Neg(a) => -a.eval(read),
            Expr::Add(a, b) => a.eval(read) + b.eval(read),
            Expr::Sub(a, b) => a.eval(read) - b.eval(read),
            Expr::Mul(a, b) => a.eval(read) * b.eval(read),
        }
    }

    /// Render using the given slot names.
    pub fn display<'a>(&'a self, names: &'a SlotNames) -> Rendered<'a, Expr> {
        Rendered { value: self, names }
    }

    fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Sym(_) | Expr::Lit(_) => {}
            Expr::Neg(a) => a.visit(f),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) => {
                a.visit(f);
                b.visit(f);
            }
        }
    }

    fn is_sum(&self) -> bool {
        matches!(self, Expr::Add(..) | Expr::Sub(..))
    }
}

impl From<Symbol> for Expr {
    fn from(sym: Symbol) -> Self {
        Expr::Sym(sym)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Lit(value)
    }
}

macro_rules! impl_expr_ops {
    ($ty:ty) => {
        impl<R: Into<Expr>> Add<R> for $ty {
            type Output = Expr;
            fn add(self, rhs: R) -> Expr {
                Expr::Add(Box::new(self.into()), Box::new(rhs.into()))
            }
        }

        impl<R: Into<Expr>> Sub<R> for $ty {
            type Output = Expr;
            fn sub(self, rhs: R) -> Expr {
                Expr::Sub(Box::new(self.into()), Box::new(rhs.into()))
            }
        }

        impl<R: Into<Expr>> Mul<R> for $ty {
            type Output = Expr;
            fn mul(self, rhs: R) -> Expr {
                Expr::Mul(Box::new(self.into()), Box::new(rhs.into()))
            }
        }

        impl Neg for $ty {
            type Output = Expr;
            fn neg(self) -> Expr {
                Expr::Neg(Box::new(self.into()))
            }
        }
    };
}

impl_expr_ops!(Expr);
impl_expr_ops!(Symbol);

/// Radix of a base-case butterfly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Radix {
    Two,
    Three,
    Four,
    Five,
}

impl Radix {
    /// Split priority when factorizing a composite size.
    pub const PRIORITY: [Radix; 4] = [Radix::Five, Radix::Four, Radix::Three, Radix::Two];

    pub const fn size(self) -> usize {
        match self {
            Radix::Two => 2,
            Radix::Three => 3,
            Radix::Four => 4,
            Radix::Five => 5,
        }
    }

    pub const fn from_size(n: usize) -> Option<Radix> {
        match n {
            2 => Some(Radix::Two),
            3 => Some(Radix::Three),
            4 => Some(Radix::Four),
            5 => Some(Radix::Five),
            _ => None,
        }
    }
}

/// Routines of the base-operation library, in canonical import order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseOp {
    Tr2,
    Tr3,
    Tr4,
    Tr5,
    Rot,
    Swap,
    Cshft,
}

impl BaseOp {
    pub const ALL: [BaseOp; 7] = [
        BaseOp::Tr2,
        BaseOp::Tr3,
        BaseOp::Tr4,
        BaseOp::Tr5,
        BaseOp::Rot,
        BaseOp::Swap,
        BaseOp::Cshft,
    ];

    /// Function name in `fft::baseop`.
    pub const fn name(self) -> &'static str {
        match self {
            BaseOp::Tr2 => "mx_tr2",
            BaseOp::Tr3 => "mx_tr3",
            BaseOp::Tr4 => "mx_tr4",
            BaseOp::Tr5 => "mx_tr5",
            BaseOp::Rot => "mx_rot",
            BaseOp::Swap => "mx_swap",
            BaseOp::Cshft => "mx_cshft",
        }
    }

    /// Operation count of one call.
    pub const fn cost(self) -> Cost {
        match self {
            BaseOp::Tr2 => Cost::new(4, 0, 0),
            BaseOp::Tr3 => Cost::new(12, 4, 0),
            BaseOp::Tr4 => Cost::new(16, 0, 0),
            BaseOp::Tr5 => Cost::new(32, 12, 0),
            BaseOp::Rot => Cost::new(2, 4, 0),
            BaseOp::Swap | BaseOp::Cshft => Cost::new(0, 0, 0),
        }
    }
}

/// A call into the base-operation library, addressed by complex slot.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseOpCall {
    Butterfly { radix: Radix, slots: Vec<usize> },
    Rotate { slot: usize, cos: f64, sin: f64 },
    Swap { a: usize, b: usize },
    /// `slots` mirrors shift table `table` of the kernel.
    CyclicShift { table: usize, slots: Vec<usize> },
}

impl BaseOpCall {
    pub fn op(&self) -> BaseOp {
        match self {
            BaseOpCall::Butterfly { radix, .. } => match radix {
                Radix::Two => BaseOp::Tr2,
                Radix::Three => BaseOp::Tr3,
                Radix::Four => BaseOp::Tr4,
                Radix::Five => BaseOp::Tr5,
            },
            BaseOpCall::Rotate { .. } => BaseOp::Rot,
            BaseOpCall::Swap { .. } => BaseOp::Swap,
            BaseOpCall::CyclicShift { .. } => BaseOp::Cshft,
        }
    }

    /// Complex slots read and written in place.
    pub fn slots(&self) -> Vec<usize> {
        match self {
            BaseOpCall::Butterfly { slots, .. } | BaseOpCall::CyclicShift { slots, .. } => slots.clone(),
            BaseOpCall::Rotate { slot, .. } => vec![*slot],
            BaseOpCall::Swap { a, b } => vec![*a, *b],
        }
    }
}

/// A statement of the straight-line kernel body.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { dst: Symbol, expr: Expr },
    Call(BaseOpCall),
}

impl Stmt {
    pub fn display<'a>(&'a self, names: &'a SlotNames) -> Rendered<'a, Stmt> {
        Rendered { value: self, names }
    }
}

/// An emitted operation with its def/use sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub stmt: Stmt,
    pub inputs: Vec<Symbol>,
    pub outputs: Vec<Symbol>,
    /// Writes an externally observable output; a liveness root.
    pub mandatory: bool,
    /// Removed by dead-code elimination; never emitted.
    pub pruned: bool,
    pub cost: Cost,
}

impl Op {
    /// Build an op, deriving def/use sets and cost from the statement.
    pub fn new(stmt: Stmt, mandatory: bool) -> Self {
        let (inputs, outputs, cost) = match &stmt {
            Stmt::Assign { dst, expr } => (expr.symbols(), vec![*dst], expr.cost()),
            Stmt::Call(call) => {
                let syms: Vec<Symbol> = call
                    .slots()
                    .into_iter()
                    .flat_map(|slot| [Symbol::Real(slot), Symbol::Imag(slot)])
                    .collect();
                (syms.clone(), syms, call.op().cost())
            }
        };
        Self { stmt, inputs, outputs, mandatory, pruned: false, cost }
    }
}

/// One entry of the opcode stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Comment(String),
    Op(Op),
}

impl Instruction {
    pub fn as_op(&self) -> Option<&Op> {
        match self {
            Instruction::Op(op) => Some(op),
            Instruction::Comment(_) => None,
        }
    }

    /// Whether this entry survives into emitted code.
    pub fn is_live(&self) -> bool {
        match self {
            Instruction::Comment(_) => true,
            Instruction::Op(op) => !op.pruned,
        }
    }
}

/// Ordered list of instructions for one compilation.
#[derive(Debug, Default, Clone)]
pub struct OpcodeStream {
    instructions: Vec<Instruction>,
}

impl OpcodeStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instructions_mut(&mut self) -> &mut [Instruction] {
        &mut self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    /// Total cost of the ops that were not pruned.
    pub fn live_cost(&self) -> Cost {
        let mut cost = Cost::default();
        for op in self.instructions.iter().filter_map(Instruction::as_op) {
            if !op.pruned {
                cost += op.cost;
            }
        }
        cost
    }
}

impl From<Vec<Instruction>> for OpcodeStream {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

/// Source-text rendering of an IR item.
pub struct Rendered<'a, T> {
    value: &'a T,
    names: &'a SlotNames,
}

/// Rust literal for `value`; negative values are parenthesized.
pub fn format_literal(value: f64) -> String {
    let text = format!("{:?}", value);
    if value.is_sign_negative() {
        format!("({})", text)
    } else {
        text
    }
}

impl fmt::Display for Rendered<'_, Symbol> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Symbol::Temp(id) => write!(f, "t{}", id),
            Symbol::Input(i) => write!(f, "{}[{}]", self.names.input, i),
            Symbol::Output(i) => write!(f, "{}[{}]", self.names.output, i),
            Symbol::Real(i) => write!(f, "{}[{}]", self.names.real, i),
            Symbol::Imag(i) => write!(f, "{}[{}]", self.names.imag, i),
        }
    }
}

impl Rendered<'_, Expr> {
    fn operand<'b>(&'b self, expr: &'b Expr, wrap: bool) -> impl fmt::Display + 'b {
        struct Operand<'b> {
            inner: Rendered<'b, Expr>,
            wrap: bool,
        }
        impl fmt::Display for Operand<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.wrap {
                    write!(f, "({})", self.inner)
                } else {
                    write!(f, "{}", self.inner)
                }
            }
        }
        Operand { inner: Rendered { value: expr, names: self.names }, wrap }
    }
}

impl fmt::Display for Rendered<'_, Expr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Expr::Sym(sym) => write!(f, "{}", sym.display(self.names)),
            Expr::Lit(value) => f.write_str(&format_literal(*value)),
            Expr::Neg(a) => {
                let wrap = a.is_sum() || matches!(**a, Expr::Neg(_));
                write!(f, "-{}", self.operand(a, wrap))
            }
            Expr::Add(a, b) => {
                let wrap = b.is_sum() || matches!(**b, Expr::Neg(_));
                write!(f, "{} + {}", self.operand(a, false), self.operand(b, wrap))
            }
            Expr::Sub(a, b) => {
                let wrap = b.is_sum() || matches!(**b, Expr::Neg(_));
                write!(f, "{} - {}", self.operand(a, false), self.operand(b, wrap))
            }
            Expr::Mul(a, b) => {
                let wrap_b = b.is_sum() || matches!(**b, Expr::Neg(_));
                write!(f, "{} * {}", self.operand(a, a.is_sum()), self.operand(b, wrap_b))
            }
        }
    }
}

impl fmt::Display for Rendered<'_, Stmt> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names;
        match self.value {
            Stmt::Assign { dst, expr } => {
                write!(f, "{} = {};", dst.display(names), expr.display(names))
            }
            Stmt::Call(call) => {
                write!(f, "{}({}, {}", call.op().name(), names.real, names.imag)?;
                match call {
                    BaseOpCall::Butterfly { slots, .. } => {
                        for slot in slots {
                            write!(f, ", {}", slot)?;
                        }
                    }
                    BaseOpCall::Rotate { slot, cos, sin } => {
                        write!(f, ", {}, {:?}, {:?}", slot, cos, sin)?;
                    }
                    BaseOpCall::Swap { a, b } => write!(f, ", {}, {}", a, b)?,
                    BaseOpCall::CyclicShift { table, .. } => write!(f, ", &CSHFT_INDEXES_{}", table)?,
                }
                f.write_str(");")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: u32) -> Symbol {
        Symbol::Temp(id)
    }

    #[test]
    fn test_assign_derives_deps_and_cost() {
        let expr = Expr::lit(0.5) * (t(0) + t(1));
        let op = Op::new(Stmt::Assign { dst: t(2), expr }, false);
        assert_eq!(op.inputs, vec![t(0), t(1)]);
        assert_eq!(op.outputs, vec![t(2)]);
        assert_eq!(op.cost, Cost::new(1, 1, 0));
    }

    #[test]
    fn test_repeated_symbol_listed_once() {
        let op = Op::new(Stmt::Assign { dst: t(0), expr: t(0) + t(0) }, false);
        assert_eq!(op.inputs, vec![t(0)]);
    }

    #[test]
    fn test_render_expressions() {
        let names = SlotNames::DCT_FORWARD;
        let neg_sum = -(t(1) + t(2));
        assert_eq!(neg_sum.display(&names).to_string(), "-(t1 + t2)");

        let scaled = Expr::lit(-0.5) * Symbol::Input(3);
        assert_eq!(scaled.display(&names).to_string(), "(-0.5) * dct_in[3]");

        let nested = t(0) - (t(1) - t(2));
        assert_eq!(nested.display(&names).to_string(), "t0 - (t1 - t2)");

        let stmt = Stmt::Assign { dst: Symbol::Output(1), expr: -Expr::from(t(4)) };
        assert_eq!(stmt.display(&names).to_string(), "dct_out[1] = -t4;");
    }

    #[test]
    fn test_render_calls() {
        let names = SlotNames::FFT;
        let call = Stmt::Call(BaseOpCall::Butterfly { radix: Radix::Three, slots: vec![0, 4, 8] });
        assert_eq!(call.display(&names).to_string(), "mx_tr3(re, im, 0, 4, 8);");

        let call = Stmt::Call(BaseOpCall::CyclicShift { table: 2, slots: vec![1, 3, 9] });
        assert_eq!(call.display(&names).to_string(), "mx_cshft(re, im, &CSHFT_INDEXES_2);");

        // Call arguments are never wrapped in parentheses.
        let call = Stmt::Call(BaseOpCall::Rotate { slot: 59, cos: -1.0, sin: -0.25 });
        assert_eq!(call.display(&names).to_string(), "mx_rot(re, im, 59, -1.0, -0.25);");
    }

    #[test]
    fn test_call_touches_both_parts() {
        let op = Op::new(Stmt::Call(BaseOpCall::Swap { a: 1, b: 5 }), true);
        assert_eq!(op.inputs, vec![Symbol::Real(1), Symbol::Imag(1), Symbol::Real(5), Symbol::Imag(5)]);
        assert_eq!(op.inputs, op.outputs);
    }

    #[test]
    fn test_eval() {
        let expr = Expr::lit(2.0) * (t(0) - t(1));
        let value = expr.eval(&|sym| match sym {
            Symbol::Temp(0) => 5.0,
            Symbol::Temp(1) => 3.0,
            _ => f64::NAN,
        });
        assert_eq!(value, 4.0);
    }
}
