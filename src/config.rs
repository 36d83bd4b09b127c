//! Kernel configuration.
//!
//! A kernel is described by a small JSON object:
//!
//! ```json
//! { "N": 16, "orthogon": true, "output": "dct2-16.rs" }
//! ```
//!
//! Only `N` is required by the library; the command line tool also needs
//! `output`. Everything else has a default.

use crate::core::{CompileError, CompileResult, SlotNames};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of kernel to generate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    #[default]
    DctForward,
    DctInverse,
    Fft,
}

impl TransformKind {
    pub fn is_dct(self) -> bool {
        matches!(self, TransformKind::DctForward | TransformKind::DctInverse)
    }

    /// Array names used by kernels of this kind.
    pub fn slot_names(self) -> SlotNames {
        match self {
            TransformKind::DctForward => SlotNames::DCT_FORWARD,
            TransformKind::DctInverse => SlotNames::DCT_INVERSE,
            TransformKind::Fft => SlotNames::FFT,
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransformKind::DctForward => "dct-forward",
            TransformKind::DctInverse => "dct-inverse",
            TransformKind::Fft => "fft",
        })
    }
}

/// How FFT kernels are emitted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Straight-line scalar code.
    #[default]
    Inline,
    /// Calls into `fft::baseop`.
    Subroutine,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Inline => "inline",
            Strategy::Subroutine => "subroutine",
        })
    }
}

pub const DEFAULT_MAX_FUNCTION_LINES: usize = 500;

fn default_max_function_lines() -> usize {
    DEFAULT_MAX_FUNCTION_LINES
}

fn default_verify() -> bool {
    true
}

/// Options of one kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelConfig {
    /// Transform size.
    #[serde(rename = "N")]
    pub n: usize,

    /// Use the orthonormal DCT scaling.
    #[serde(default)]
    pub orthogon: bool,

    /// Generated file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub transform: TransformKind,

    #[serde(default)]
    pub strategy: Strategy,

    /// Upper bound on entries per generated part function.
    #[serde(default = "default_max_function_lines")]
    pub max_function_lines: usize,

    /// Keep stage comments in the generated code.
    #[serde(default)]
    pub annotate: bool,

    /// Evaluate the kernel against a direct-sum reference before emitting.
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl KernelConfig {
    pub fn new(transform: TransformKind, n: usize) -> Self {
        Self {
            n,
            orthogon: false,
            output: None,
            transform,
            strategy: Strategy::Inline,
            max_function_lines: DEFAULT_MAX_FUNCTION_LINES,
            annotate: false,
            verify: true,
        }
    }

    pub fn with_orthogonal(mut self, orthogon: bool) -> Self {
        self.orthogon = orthogon;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_function_lines(mut self, lines: usize) -> Self {
        self.max_function_lines = lines;
        self
    }

    pub fn with_annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> CompileResult<Self> {
        let config: KernelConfig =
            serde_json::from_str(text).map_err(|e| CompileError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> CompileResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded config from {}", path.display());
        Self::from_json_str(&text)
    }

    /// Reject option combinations that cannot be compiled.
    ///
    /// Radix constraints on `N` are checked by the planner, not here.
    pub fn validate(&self) -> CompileResult<()> {
        if self.n == 0 {
            return Err(CompileError::invalid_config("`N` must be a positive integer"));
        }
        if self.max_function_lines == 0 {
            return Err(CompileError::invalid_config("`max_function_lines` must be positive"));
        }
        if self.transform.is_dct() && self.strategy == Strategy::Subroutine {
            return Err(CompileError::invalid_config(format!(
                "strategy `subroutine` only applies to `fft`, not `{}`",
                self.transform
            )));
        }
        Ok(())
    }

    /// Transform size.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Where the generated source goes. Relative paths are taken relative to
    /// the directory holding `config_path`.
    pub fn output_path(&self, config_path: &Path) -> CompileResult<PathBuf> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| CompileError::invalid_config("missing `output`"))?;
        if output.is_absolute() {
            return Ok(output.clone());
        }
        let base = config_path.parent().unwrap_or_else(|| Path::new(""));
        Ok(base.join(output))
    }
}
