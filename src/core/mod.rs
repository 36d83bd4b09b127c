// This module serves as the central hub for tkgen's core infrastructure, the pieces that
// every kernel engine shares. It exports and organizes the key subsystems: the symbolic
// IR (symbols, expressions, base-operation calls and the instruction stream with exact
// def/use sets and cost counters), temporary allocation (a FIFO free list of recyclable
// scalar names), session management (the per-compilation arena, stream, allocator,
// recorded temporary lifetimes and statistics), the def/use analyses (dead-code
// elimination and the temporary lifetime checker), and the error types. Engines above
// this layer (the DCT reduction and the FFT planner with its backends) only ever emit
// through a CompilationSession, so everything a compilation produces is owned by one
// value and can be moved out as a unit once the analyses have run.

//! Core tkgen infrastructure
//!
//! # Key Components
//!
//! ## Symbolic IR (`opcode`)
//! - Scalar [`Symbol`]s: recyclable temporaries and fixed I/O slots
//! - Expression trees with derived def/use sets and operation counts
//! - Base-operation calls used by subroutine kernels
//!
//! ## Temporary Allocation (`temp_alloc`)
//! - FIFO recycling of temporary names
//! - Misuse (double release, releasing an I/O slot) is an error
//!
//! ## Session Management (`session`)
//! - Arena-based scratch allocation using `bumpalo`
//! - Lifetime interval of every temporary allocation
//! - Compilation statistics
//!
//! ## Analyses (`analyzer`)
//! - Dead-code elimination driven by mandatory outputs
//! - Temporary lifetime checking

pub mod analyzer;
pub mod error;
pub mod opcode;
pub mod session;
pub mod temp_alloc;

// Re-export core components
pub use session::{
    CompilationSession,
    SessionOutput,
    SessionStats,
    TempLifetime,
};

pub use opcode::{
    format_literal,
    BaseOp,
    BaseOpCall,
    ComplexSym,
    Cost,
    Expr,
    Instruction,
    Op,
    OpcodeStream,
    Radix,
    SlotNames,
    Stmt,
    Symbol,
};

pub use temp_alloc::TempAllocator;

pub use error::{
    CompileError,
    CompileResult,
};

pub use analyzer::{DeadCodeEliminator, DefUseGraph, LifetimeChecker};
