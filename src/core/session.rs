// This module provides arena-based compilation session management using the bumpalo crate.
// CompilationSession is the per-compilation context that every emitting component is
// handed explicitly: it owns the opcode stream, the temporary allocator, the lifetime
// intervals recorded for each temporary, the ordered set of base operations referenced
// by subroutine kernels, the cyclic-shift tables, and compilation statistics. Analysis
// passes borrow the session's arena for scratch data (dependency lists), so a session
// and everything it allocated disappear together once the KernelIR has been extracted.
// Nothing here is global, which keeps compilations independent and deterministic.
// SessionStats tracks the emitted/pruned instruction counts, temporary pressure, the
// arithmetic cost of the surviving code, and per-kind rotation and butterfly counts.

//! Arena-based compilation session management.
//!
//! All emission goes through a [`CompilationSession`], which pairs every
//! temporary allocation with a recorded [`TempLifetime`] so later passes can
//! check that no temporary is reused while still referenced.

use super::analyzer::DeadCodeEliminator;
use super::error::CompileResult;
use super::opcode::{BaseOp, BaseOpCall, ComplexSym, Cost, Expr, Instruction, Op, OpcodeStream, Radix, Stmt, Symbol};
use super::temp_alloc::TempAllocator;
use bumpalo::Bump;
use hashbrown::HashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Allocation interval of one temporary, in stream positions.
///
/// Instructions at `opened_at..closed_at` were emitted while the name was
/// held by the same owner. `closed_at` is `None` while still allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempLifetime {
    pub temp: u32,
    pub opened_at: usize,
    pub closed_at: Option<usize>,
}

impl TempLifetime {
    /// Whether stream position `pos` falls inside this interval.
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.opened_at && self.closed_at.map_or(true, |end| pos < end)
    }
}

/// Arena-based compilation session.
///
/// One session is created per kernel and threaded through every component
/// that emits instructions.
pub struct CompilationSession<'arena> {
    /// Arena allocator for analysis scratch data.
    arena: &'arena Bump,

    /// Instructions emitted so far.
    stream: OpcodeStream,

    /// Temporary name pool.
    temps: TempAllocator,

    /// Every allocation interval, in allocation order.
    lifetimes: Vec<TempLifetime>,

    /// Open interval index per allocated temporary.
    open_lifetimes: HashMap<u32, usize>,

    /// Base operations referenced by calls.
    base_ops: BTreeSet<BaseOp>,

    /// Index lists of cyclic-shift calls.
    shift_tables: Vec<Vec<usize>>,

    /// Whether stage comments are kept.
    annotate: bool,

    /// Session statistics for debugging and reporting.
    stats: SessionStats,
}

impl<'arena> CompilationSession<'arena> {
    /// Create a new compilation session with the given arena.
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stream: OpcodeStream::new(),
            temps: TempAllocator::new(),
            lifetimes: Vec::new(),
            open_lifetimes: HashMap::new(),
            base_ops: BTreeSet::new(),
            shift_tables: Vec::new(),
            annotate: false,
            stats: SessionStats::default(),
        }
    }

    /// Keep or drop stage comments.
    pub fn set_annotate(&mut self, annotate: bool) {
        self.annotate = annotate;
    }

    /// Allocate a scalar temporary.
    pub fn alloc_temp(&mut self) -> Symbol {
        let sym = self.temps.allocate();
        if let Symbol::Temp(id) = sym {
            self.open_lifetimes.insert(id, self.lifetimes.len());
            self.lifetimes.push(TempLifetime { temp: id, opened_at: self.stream.len(), closed_at: None });
        }
        sym
    }

    /// Allocate a complex pair of temporaries.
    pub fn alloc_complex(&mut self) -> ComplexSym {
        let re = self.alloc_temp();
        let im = self.alloc_temp();
        ComplexSym::new(re, im)
    }

    /// Release a scalar temporary.
    pub fn release_temp(&mut self, sym: Symbol) -> CompileResult<()> {
        self.temps.release(sym)?;
        if let Some(id) = sym.temp_id() {
            if let Some(idx) = self.open_lifetimes.remove(&id) {
                self.lifetimes[idx].closed_at = Some(self.stream.len());
            }
        }
        Ok(())
    }

    /// Release both halves of a complex temporary.
    pub fn release_complex(&mut self, value: ComplexSym) -> CompileResult<()> {
        self.release_temp(value.re)?;
        self.release_temp(value.im)
    }

    /// Emit `dst = expr`.
    pub fn assign(&mut self, dst: Symbol, expr: impl Into<Expr>) {
        self.push_op(Op::new(Stmt::Assign { dst, expr: expr.into() }, false));
    }

    /// Emit `dst = expr` as a liveness root.
    pub fn assign_output(&mut self, dst: Symbol, expr: impl Into<Expr>) {
        self.push_op(Op::new(Stmt::Assign { dst, expr: expr.into() }, true));
    }

    /// Emit a base-operation call. Calls write the kernel's in-place
    /// buffers, so they are always liveness roots.
    pub fn call(&mut self, call: BaseOpCall) {
        self.base_ops.insert(call.op());
        self.push_op(Op::new(Stmt::Call(call), true));
    }

    /// Register a cyclic-shift index list and return its table id.
    pub fn add_shift_table(&mut self, indexes: Vec<usize>) -> usize {
        self.shift_tables.push(indexes);
        self.shift_tables.len() - 1
    }

    /// Emit a comment line when annotations are enabled.
    pub fn comment(&mut self, text: impl Into<String>) {
        if self.annotate {
            self.stream.push(Instruction::Comment(text.into()));
        }
    }

    /// Emit a prebuilt op.
    pub fn push_op(&mut self, op: Op) {
        self.stats.instructions_emitted += 1;
        self.stream.push(Instruction::Op(op));
    }

    /// Instructions emitted so far.
    pub fn stream(&self) -> &OpcodeStream {
        &self.stream
    }

    /// Recorded allocation intervals.
    pub fn lifetimes(&self) -> &[TempLifetime] {
        &self.lifetimes
    }

    /// Base operations referenced so far.
    pub fn base_ops(&self) -> &BTreeSet<BaseOp> {
        &self.base_ops
    }

    /// Temporary allocator state.
    pub fn temps(&self) -> &TempAllocator {
        &self.temps
    }

    /// Record a synthesized rotation of the given kind.
    pub fn record_rotation(&mut self, kind: &'static str) {
        *self.stats.rotation_counts.entry(kind).or_insert(0) += 1;
    }

    /// Record a base-case butterfly.
    pub fn record_butterfly(&mut self, radix: Radix) {
        self.stats.butterflies += 1;
        log::trace!("butterfly radix {}", radix.size());
    }

    /// Prune ops no mandatory op depends on, with the dependency lists in
    /// the session arena. Returns the number pruned.
    pub fn eliminate_dead_code(&mut self) -> usize {
        let pruned = DeadCodeEliminator::new(self.arena).run(self.stream.instructions_mut());
        self.stats.instructions_pruned += pruned;
        pruned
    }

    /// Get compilation statistics with the current live cost.
    pub fn stats(&self) -> SessionStats {
        let mut stats = self.stats.clone();
        stats.cost = self.stream.live_cost();
        stats.temps_issued = self.temps.issued_count();
        stats.peak_temps = self.temps.peak();
        stats
    }

    /// Consume the session, keeping what outlives the arena.
    pub fn finish(self) -> SessionOutput {
        let stats = self.stats();
        SessionOutput {
            instructions: self.stream.into_instructions(),
            base_ops: self.base_ops,
            shift_tables: self.shift_tables,
            stats,
        }
    }
}

/// Owned results of a finished session.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub instructions: Vec<Instruction>,
    pub base_ops: BTreeSet<BaseOp>,
    pub shift_tables: Vec<Vec<usize>>,
    pub stats: SessionStats,
}

/// Compilation session statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionStats {
    /// Ops emitted, pruned ones included.
    pub instructions_emitted: usize,

    /// Ops removed by dead-code elimination.
    pub instructions_pruned: usize,

    /// Distinct temporary names issued.
    pub temps_issued: usize,

    /// Largest number of simultaneously allocated temporaries.
    pub peak_temps: usize,

    /// Arithmetic cost of the surviving ops.
    pub cost: Cost,

    /// Base-case butterflies synthesized.
    pub butterflies: usize,

    /// Rotations synthesized, by kind.
    pub rotation_counts: BTreeMap<&'static str, usize>,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Session Statistics:")?;
        writeln!(f, "  Instructions emitted: {}", self.instructions_emitted)?;
        writeln!(f, "  Instructions pruned: {}", self.instructions_pruned)?;
        writeln!(f, "  Temporaries issued: {} (peak {})", self.temps_issued, self.peak_temps)?;
        writeln!(f, "  Additions: {}", self.cost.add)?;
        writeln!(f, "  Multiplications: {}", self.cost.mul)?;
        writeln!(f, "  Negations: {}", self.cost.neg)?;
        writeln!(f, "  Butterflies: {}", self.butterflies)?;

        if !self.rotation_counts.is_empty() {
            writeln!(f, "  Rotation breakdown:")?;
            for (kind, count) in &self.rotation_counts {
                writeln!(f, "    {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}
