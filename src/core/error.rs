// This module defines error types for the tkgen kernel compiler using the thiserror crate
// for idiomatic Rust error handling. CompileError is the main error enum covering the
// failure scenarios of a compilation: transform sizes that admit no mixed-radix
// factorization, temporary allocator misuse by the IR construction code, rejected
// configuration files, file system errors while loading configs or writing kernels,
// kernels whose numeric self-check disagrees with the direct-sum reference, and
// formatting failures while rendering source. Each variant carries relevant context for
// debugging. The module also provides CompileResult<T> as a convenience type alias for
// Result<T, CompileError>. All errors are fatal: a compilation is a deterministic
// function of its input, so nothing is retried.

//! Error types for the kernel compiler.
//!
//! Using thiserror for more idiomatic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kernel compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Bad radix: {size} has no mixed-radix factorization over {{5, 4, 3, 2}}")]
    BadRadix {
        size: usize,
    },

    #[error("Allocator invariant violated: {reason}")]
    AllocatorInvariantViolation {
        reason: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Kernel self-check failed: max error {max_error:e} exceeds tolerance")]
    VerificationFailed {
        max_error: f64,
    },

    #[error("Failed to render kernel source")]
    Render(#[from] std::fmt::Error),
}

impl CompileError {
    /// Shorthand for an [`CompileError::InvalidConfig`] with a formatted reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        CompileError::InvalidConfig { reason: reason.into() }
    }
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CompileError::BadRadix { size: 7 };
        assert!(err.to_string().contains("7"));

        let err = CompileError::invalid_config("missing field `N`");
        assert_eq!(err.to_string(), "Invalid configuration: missing field `N`");

        let err = CompileError::AllocatorInvariantViolation { reason: "t3 is not in use".into() };
        assert!(err.to_string().contains("t3 is not in use"));
    }

    #[test]
    fn test_format_errors_convert() {
        fn render() -> CompileResult<()> {
            let written: std::fmt::Result = Err(std::fmt::Error);
            written?;
            Ok(())
        }
        assert!(matches!(render(), Err(CompileError::Render(_))));
    }
}
