// This module implements the subroutine compilation strategy for FFT kernels. Instead of
// expanding every butterfly and twiddle into scalar arithmetic, SubroutineBackend records
// one base-operation call per planner request, addressed by physical complex slot, so the
// generated kernel stays small even for large N. Twiddles whose constant is numerically
// the identity are dropped. Once planning has finished, the address map the planner
// accumulated is resolved into actual data movement: each 2-cycle of the permutation
// becomes a swap and each longer cycle becomes a cyclic shift whose index list is stored
// as a shift table on the session. Large call streams are split into bounded parts that a
// dispatcher invokes in order.

//! Subroutine-call FFT backend and final reorder resolution.

use super::planner::{FftBackend, Permutation, RadixPlanner};
use super::rotation::RationalAngle;
use crate::core::{BaseOpCall, CompilationSession, CompileResult, Instruction, Radix};

/// Twiddles closer than this to `1 + 0i` are skipped.
const IDENTITY_TOLERANCE: f64 = 1e-32;

/// Records base-operation calls for every planner request.
pub struct SubroutineBackend<'s, 'arena> {
    session: &'s mut CompilationSession<'arena>,
}

impl<'s, 'arena> SubroutineBackend<'s, 'arena> {
    pub fn new(session: &'s mut CompilationSession<'arena>) -> Self {
        Self { session }
    }
}

impl FftBackend for SubroutineBackend<'_, '_> {
    fn butterfly(&mut self, radix: Radix, slots: &[usize]) -> CompileResult<()> {
        self.session.record_butterfly(radix);
        self.session.call(BaseOpCall::Butterfly { radix, slots: slots.to_vec() });
        Ok(())
    }

    fn twiddle(&mut self, slot: usize, angle: RationalAngle) -> CompileResult<()> {
        let rad = angle.radians();
        let (cos, sin) = (rad.cos(), rad.sin());
        if ((cos - 1.0).powi(2) + sin.powi(2)).sqrt() < IDENTITY_TOLERANCE {
            return Ok(());
        }
        self.session.record_rotation(angle.kind().name());
        self.session.call(BaseOpCall::Rotate { slot, cos, sin });
        Ok(())
    }
}

/// Emit swap and cyclic-shift calls that move bin `k` from `perm[k]` to `k`.
pub fn resolve_permutation(session: &mut CompilationSession<'_>, perm: &Permutation) {
    for cycle in perm.cycles() {
        match cycle.len() {
            0 | 1 => {}
            2 => {
                log::trace!("swap {} <-> {}", cycle[0], cycle[1]);
                session.call(BaseOpCall::Swap { a: cycle[0], b: cycle[1] });
            }
            len => {
                log::trace!("cyclic shift of {} slots starting at {}", len, cycle[0]);
                let table = session.add_shift_table(cycle.clone());
                session.call(BaseOpCall::CyclicShift { table, slots: cycle });
            }
        }
    }
}

/// Emit an `n`-point FFT as base-operation calls, leaving the output in
/// natural order. Returns the address map before resolution.
pub fn emit_subroutine_fft(session: &mut CompilationSession<'_>, n: usize) -> CompileResult<Permutation> {
    session.comment(format!("{}-point transform", n));
    let perm = {
        let mut backend = SubroutineBackend::new(session);
        RadixPlanner::plan(&mut backend, n)?
    };

    session.comment("reorder");
    resolve_permutation(session, &perm);
    Ok(perm)
}

/// Split the live entries of `insts` into parts of at most `max_lines`
/// entries. There is always at least one part.
pub fn split_into_parts(insts: &[Instruction], max_lines: usize) -> Vec<Vec<&Instruction>> {
    let max_lines = max_lines.max(1);
    let live: Vec<&Instruction> = insts.iter().filter(|inst| inst.is_live()).collect();
    if live.is_empty() {
        return vec![Vec::new()];
    }
    live.chunks(max_lines).map(|chunk| chunk.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BaseOp, Stmt};
    use bumpalo::Bump;

    fn calls(session: &CompilationSession<'_>) -> Vec<BaseOpCall> {
        session
            .stream()
            .instructions()
            .iter()
            .filter_map(Instruction::as_op)
            .filter_map(|op| match &op.stmt {
                Stmt::Call(call) => Some(call.clone()),
                Stmt::Assign { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_unit_transform_emits_nothing() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_subroutine_fft(&mut session, 1).unwrap();
        assert!(session.stream().is_empty());
    }

    #[test]
    fn test_base_case_is_one_call() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_subroutine_fft(&mut session, 5).unwrap();
        assert_eq!(calls(&session), vec![BaseOpCall::Butterfly { radix: Radix::Five, slots: vec![0, 1, 2, 3, 4] }]);
    }

    #[test]
    fn test_identity_twiddles_skipped() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_subroutine_fft(&mut session, 6).unwrap();

        let rotations = calls(&session)
            .into_iter()
            .filter(|call| matches!(call, BaseOpCall::Rotate { .. }))
            .count();
        // Only n1 = 1 with n2 = 1, 2 are non-trivial.
        assert_eq!(rotations, 2);
    }

    #[test]
    fn test_reorder_uses_swaps_and_shifts() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        let perm = emit_subroutine_fft(&mut session, 6).unwrap();
        assert_eq!(perm.as_slice(), &[0, 2, 4, 1, 3, 5]);

        let out = session.finish();
        assert_eq!(out.shift_tables, vec![vec![1, 2, 4, 3]]);
        assert!(out.base_ops.contains(&BaseOp::Cshft));
        assert!(!out.base_ops.contains(&BaseOp::Swap));
    }

    #[test]
    fn test_split_into_parts() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_subroutine_fft(&mut session, 24).unwrap();
        let insts = session.stream().instructions();
        let total = insts.len();

        let parts = split_into_parts(insts, 10);
        assert_eq!(parts.len(), total.div_ceil(10));
        assert!(parts.iter().all(|part| part.len() <= 10));
        assert_eq!(parts.iter().map(Vec::len).sum::<usize>(), total);

        assert_eq!(split_into_parts(&[], 10).len(), 1);
    }
}
