//! Mixed-radix FFT synthesis.
//!
//! The [`planner`] decomposes an N-point DFT and drives an [`FftBackend`];
//! [`inline`] expands everything into scalar code while [`subroutine`] emits
//! calls into [`baseop`].

pub mod baseop;
pub mod butterfly;
pub mod inline;
pub mod planner;
pub mod rotation;
pub mod subroutine;

pub use butterfly::synthesize_butterfly;
pub use inline::{emit_inline_fft, inline_fft, InlineBackend};
pub use planner::{FftBackend, Permutation, RadixFactorization, RadixPlanner};
pub use rotation::{synthesize_rotation, RationalAngle, RotationKind};
pub use subroutine::{emit_subroutine_fft, resolve_permutation, split_into_parts, SubroutineBackend};
