//! Inline FFT backend: every butterfly and twiddle is expanded into scalar
//! assignments over complex symbols.

use super::butterfly::synthesize_butterfly;
use super::planner::{FftBackend, Permutation, RadixPlanner};
use super::rotation::{synthesize_rotation, RationalAngle};
use crate::core::{CompilationSession, CompileResult, ComplexSym, Radix, Symbol};

/// Expands planner requests over a fixed array of complex symbols.
pub struct InlineBackend<'s, 'arena> {
    session: &'s mut CompilationSession<'arena>,
    data: &'s [ComplexSym],
}

impl<'s, 'arena> InlineBackend<'s, 'arena> {
    pub fn new(session: &'s mut CompilationSession<'arena>, data: &'s [ComplexSym]) -> Self {
        Self { session, data }
    }
}

impl FftBackend for InlineBackend<'_, '_> {
    fn butterfly(&mut self, _radix: Radix, slots: &[usize]) -> CompileResult<()> {
        let values: Vec<ComplexSym> = slots.iter().map(|&slot| self.data[slot]).collect();
        synthesize_butterfly(self.session, &values)
    }

    fn twiddle(&mut self, slot: usize, angle: RationalAngle) -> CompileResult<()> {
        synthesize_rotation(self.session, self.data[slot], angle, None)
    }
}

/// Transform `data` in place; bin `k` ends up in `data[perm[k]]`.
pub fn inline_fft(session: &mut CompilationSession<'_>, data: &[ComplexSym]) -> CompileResult<Permutation> {
    let mut backend = InlineBackend::new(session, data);
    RadixPlanner::plan(&mut backend, data.len())
}

/// Emit a complete in-place `n`-point FFT over the `re`/`im` slots.
///
/// Inputs are loaded into temporaries so the result can be stored back in
/// natural order without any runtime reordering.
pub fn emit_inline_fft(session: &mut CompilationSession<'_>, n: usize) -> CompileResult<Permutation> {
    let data: Vec<ComplexSym> = (0..n).map(|_| session.alloc_complex()).collect();

    session.comment("load");
    for (i, value) in data.iter().enumerate() {
        session.assign(value.re, Symbol::Real(i));
        session.assign(value.im, Symbol::Imag(i));
    }

    session.comment(format!("{}-point transform", n));
    let perm = inline_fft(session, &data)?;

    session.comment("store");
    for k in 0..n {
        let value = data[perm.get(k)];
        session.assign_output(Symbol::Real(k), value.re);
        session.assign_output(Symbol::Imag(k), value.im);
    }

    for value in data {
        session.release_complex(value)?;
    }
    Ok(perm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CompileError;
    use bumpalo::Bump;

    #[test]
    fn test_inline_fft_releases_everything() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_inline_fft(&mut session, 12).unwrap();
        assert_eq!(session.temps().in_use_count(), 0);
    }

    #[test]
    fn test_every_output_written_once() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_inline_fft(&mut session, 6).unwrap();

        let mut written: Vec<Symbol> = session
            .stream()
            .instructions()
            .iter()
            .filter_map(|inst| inst.as_op())
            .filter(|op| op.mandatory)
            .flat_map(|op| op.outputs.clone())
            .collect();
        written.sort();
        assert_eq!(written.len(), 12);
        written.dedup();
        assert_eq!(written.len(), 12);
    }

    #[test]
    fn test_pruning_keeps_outputs() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_inline_fft(&mut session, 8).unwrap();
        let pruned = session.eliminate_dead_code();
        // Loads are all consumed by the transform.
        assert_eq!(pruned, 0);
    }

    #[test]
    fn test_non_smooth_size() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        assert!(matches!(emit_inline_fft(&mut session, 7), Err(CompileError::BadRadix { .. })));
    }
}
