// This module is the compilation driver. compile() takes a validated KernelConfig, creates
// a CompilationSession over a fresh bumpalo arena, and runs the engine for the requested
// transform: the DCT engine for forward and inverse DCT-II kernels, or the mixed-radix
// planner over the inline or subroutine backend for FFT kernels. In debug builds the
// recorded temporary lifetimes are checked against the finished stream before dead-code
// elimination, since pruning is only sound when no temporary was recycled while still
// referenced. The surviving stream, shift tables, base-operation set and statistics are
// moved out of the session into an owned KernelIR, the arena is dropped, and when the
// configuration asks for it the kernel is evaluated numerically against a direct-sum
// reference before it is handed to the emitter.

//! Kernel compilation driver.

use crate::config::{KernelConfig, Strategy, TransformKind};
use crate::core::{
    BaseOp, CompilationSession, CompileResult, Cost, Instruction, LifetimeChecker,
    SessionStats, SlotNames,
};
use crate::dct;
use crate::fft::{emit_inline_fft, emit_subroutine_fft, split_into_parts, Permutation, RadixFactorization};
use bumpalo::Bump;
use std::collections::BTreeSet;

/// A compiled kernel, independent of the arena it was built in.
#[derive(Debug, Clone)]
pub struct KernelIR {
    pub kind: TransformKind,
    pub n: usize,
    pub strategy: Strategy,
    pub orthogonal: bool,
    /// DCT scaling vector; empty for FFT kernels.
    pub coefficients: Vec<f64>,
    /// The full stream, pruned ops included.
    pub instructions: Vec<Instruction>,
    /// Index lists referenced by cyclic-shift calls.
    pub shift_tables: Vec<Vec<usize>>,
    /// Base operations called by a subroutine kernel.
    pub base_ops: BTreeSet<BaseOp>,
    /// Address map resolved by the reorder calls of a subroutine kernel.
    pub permutation: Option<Permutation>,
    pub stats: SessionStats,
    pub max_function_lines: usize,
}

impl KernelIR {
    pub fn slot_names(&self) -> SlotNames {
        self.kind.slot_names()
    }

    /// Entries that survive into emitted code.
    pub fn live_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().filter(|inst| inst.is_live())
    }

    /// Arithmetic cost of the live ops.
    pub fn cost(&self) -> Cost {
        self.stats.cost
    }

    /// Live entries grouped into functions. Inline kernels are one part.
    pub fn parts(&self) -> Vec<Vec<&Instruction>> {
        match self.strategy {
            Strategy::Subroutine => split_into_parts(&self.instructions, self.max_function_lines),
            Strategy::Inline => vec![self.live_instructions().collect()],
        }
    }

    /// Temporaries referenced by live ops, ascending.
    pub fn used_temps(&self) -> Vec<u32> {
        let mut seen = BTreeSet::new();
        for op in self.live_instructions().filter_map(Instruction::as_op) {
            for sym in op.inputs.iter().chain(&op.outputs) {
                if let Some(id) = sym.temp_id() {
                    seen.insert(id);
                }
            }
        }
        seen.into_iter().collect()
    }

    /// Name of the public kernel function.
    pub fn function_name(&self) -> String {
        match self.kind {
            TransformKind::DctForward => format!("dct2_forward_{}", self.n),
            TransformKind::DctInverse => format!("dct2_inverse_{}", self.n),
            TransformKind::Fft => format!("fft_mixed_radix_{}", self.n),
        }
    }
}

/// Compile the kernel described by `config`.
pub fn compile(config: &KernelConfig) -> CompileResult<KernelIR> {
    config.validate()?;
    let n = config.size();
    match config.transform {
        TransformKind::DctForward | TransformKind::DctInverse => dct::check_size(n)?,
        TransformKind::Fft => {
            RadixFactorization::new(n)?;
        }
    }

    let coefficients = if config.transform.is_dct() {
        dct::coefficients(n, config.orthogon)
    } else {
        Vec::new()
    };

    let arena = Bump::new();
    let mut session = CompilationSession::new(&arena);
    session.set_annotate(config.annotate);

    log::debug!("emitting {} kernel, N = {} ({})", config.transform, n, config.strategy);
    let permutation = match (config.transform, config.strategy) {
        (TransformKind::DctForward, _) => {
            dct::emit_forward(&mut session, n, &coefficients)?;
            None
        }
        (TransformKind::DctInverse, _) => {
            dct::emit_inverse(&mut session, n, &coefficients)?;
            None
        }
        (TransformKind::Fft, Strategy::Inline) => {
            emit_inline_fft(&mut session, n)?;
            None
        }
        (TransformKind::Fft, Strategy::Subroutine) => Some(emit_subroutine_fft(&mut session, n)?),
    };

    if cfg!(debug_assertions) {
        log::debug!("checking {} temporary lifetimes", session.lifetimes().len());
        LifetimeChecker::new(session.lifetimes()).check(session.stream().instructions())?;
    }

    session.eliminate_dead_code();

    let output = session.finish();
    let kernel = KernelIR {
        kind: config.transform,
        n,
        strategy: config.strategy,
        orthogonal: config.orthogon,
        coefficients,
        instructions: output.instructions,
        shift_tables: output.shift_tables,
        base_ops: output.base_ops,
        permutation,
        stats: output.stats,
        max_function_lines: config.max_function_lines,
    };

    if config.verify {
        let max_error = crate::eval::self_check(&kernel)?;
        log::debug!("self-check passed, max error {:e}", max_error);
    }

    let cost = kernel.cost();
    log::info!(
        "compiled {}: {} live ops, {} pruned, Mul/Add/Neg = {}/{}/{}",
        kernel.function_name(),
        kernel.stats.instructions_emitted - kernel.stats.instructions_pruned,
        kernel.stats.instructions_pruned,
        cost.mul,
        cost.add,
        cost.neg
    );
    Ok(kernel)
}
