//! tkgen - Transform Kernel Generator.
//!
//! tkgen is an offline symbolic compiler that pre-bakes fixed-size transform
//! kernels: forward and inverse DCT-II (via Makhoul's reduction to an N/2-point
//! FFT) and in-place mixed-radix FFTs over radices 2, 3, 4 and 5. Kernels are
//! fully scheduled straight-line code with no runtime recursion or radix
//! dispatch.
//!
//! # Primary Usage
//!
//! ```no_run
//! use tkgen::{compile, emit_rust, KernelConfig, TransformKind};
//!
//! let config = KernelConfig::new(TransformKind::DctForward, 16).with_orthogonal(true);
//! let kernel = compile(&config)?;
//! let source = emit_rust(&kernel)?;
//! println!("{}", source);
//! # Ok::<(), tkgen::CompileError>(())
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Shared infrastructure (IR, session, allocator, analyses)
//! - [`fft`] - Mixed-radix planner, inline and subroutine backends, base-op library
//! - [`dct`] - DCT-II forward and inverse engines
//! - [`kernel`] - Compilation driver
//! - [`eval`] - IR interpreter and reference transforms
//! - [`emit`] - Rust source emission
//! - [`config`] - JSON kernel configuration

pub mod config;
pub mod core;
pub mod dct;
pub mod emit;
pub mod eval;
pub mod fft;
pub mod kernel;

// Re-export common types from organized modules
pub use config::{KernelConfig, Strategy, TransformKind};
pub use crate::core::{
    // Session management
    CompilationSession, SessionStats,
    // Errors
    CompileError, CompileResult,
    // IR
    Cost, Instruction, Symbol,
};
pub use emit::{emit_rust, RustEmitter};
pub use eval::Evaluator;
pub use kernel::{compile, KernelIR};
