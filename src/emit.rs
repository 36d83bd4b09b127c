// This module serializes a compiled KernelIR into Rust source. Inline kernels become one
// public function whose body is the surviving straight-line stream, preceded by one
// declaration per temporary that is still referenced; DCT kernels additionally get an
// in-place wrapper that copies the input before running the kernel over the same buffer.
// Subroutine kernels import exactly the base operations they call (in canonical order),
// declare their cyclic-shift tables as constants, and lay the call stream out as
// numbered part functions driven by a public dispatcher when it exceeds the configured
// function size. Pruned ops are skipped and stage comments are copied as line comments.
// The output only depends on the KernelIR, so compiling the same configuration twice
// yields byte-identical files.

//! Rust source emission for compiled kernels.

use crate::config::{Strategy, TransformKind};
use crate::core::{BaseOp, CompileResult, Instruction, SlotNames};
use crate::kernel::KernelIR;
use std::fmt::{self, Write as _};

/// Put on every generated function. Temporaries are declared ahead of their
/// first write, and a one-point kernel never touches its buffers.
const KERNEL_ALLOW: &str =
    "#[allow(unused_mut, unused_assignments, unused_variables, clippy::all)]";

/// Writes a [`KernelIR`] as a Rust module.
pub struct RustEmitter<'k> {
    kernel: &'k KernelIR,
    names: SlotNames,
    out: String,
}

impl<'k> RustEmitter<'k> {
    pub fn new(kernel: &'k KernelIR) -> Self {
        Self { kernel, names: kernel.slot_names(), out: String::new() }
    }

    /// Produce the complete source file.
    pub fn emit(mut self) -> CompileResult<String> {
        self.emit_preamble()?;
        match self.kernel.strategy {
            Strategy::Inline => self.emit_inline_kernel()?,
            Strategy::Subroutine => self.emit_subroutine_kernel()?,
        }
        Ok(self.out)
    }

    fn emit_preamble(&mut self) -> fmt::Result {
        let cost = self.kernel.cost();
        writeln!(self.out, "// Generated by tkgen. Do not edit.")?;
        writeln!(self.out, "//")?;
        writeln!(
            self.out,
            "// {}-point {} kernel, Mul/Add/Neg = {}/{}/{}.",
            self.kernel.n, self.kernel.kind, cost.mul, cost.add, cost.neg
        )?;
        writeln!(self.out)
    }

    fn emit_doc(&mut self) -> fmt::Result {
        let n = self.kernel.n;
        let (title, formula, scaling) = match self.kernel.kind {
            TransformKind::DctForward => (
                "Type-II forward DCT",
                "dct_out[k] = C[k] * sum(n = 0..N-1, dct_in[n] * cos((2n + 1)kπ / 2N))",
                true,
            ),
            TransformKind::DctInverse => (
                "Type-II inverse DCT",
                "idct_out[n] = sum(k = 0..N-1, C[k] * idct_in[k] * cos((2n + 1)kπ / 2N))",
                true,
            ),
            TransformKind::Fft => (
                "mixed-radix FFT",
                "X[k] = sum(n = 0..N-1, x[n] * exp(-2πi nk / N))",
                false,
            ),
        };

        writeln!(self.out, "/// {}-point {}.", n, title)?;
        writeln!(self.out, "///")?;
        writeln!(self.out, "/// Expected output: `{}`, N = {}.", formula, n)?;
        if !scaling {
            return writeln!(self.out, "/// Transforms `re`/`im` in place; both must hold N values.");
        }
        if self.kernel.orthogonal {
            writeln!(self.out, "/// Orthogonal scaling: `C[0] = sqrt(1 / N)`, `C[k] = sqrt(2 / N)`.")
        } else {
            writeln!(self.out, "/// Not orthogonalized: `C[k] = 1`.")
        }
    }

    fn emit_body(&mut self, insts: &[&Instruction], indent: &str) -> fmt::Result {
        for inst in insts {
            match inst {
                Instruction::Comment(text) => writeln!(self.out, "{}// {}", indent, text)?,
                Instruction::Op(op) => writeln!(self.out, "{}{}", indent, op.stmt.display(&self.names))?,
            }
        }
        Ok(())
    }

    fn emit_inline_kernel(&mut self) -> fmt::Result {
        let name = self.kernel.function_name();
        let params = match self.kernel.kind {
            TransformKind::Fft => format!("{}: &mut [f64], {}: &mut [f64]", self.names.real, self.names.imag),
            _ => format!("{}: &[f64], {}: &mut [f64]", self.names.input, self.names.output),
        };

        self.emit_doc()?;
        writeln!(self.out, "{}", KERNEL_ALLOW)?;
        writeln!(self.out, "pub fn {}({}) {{", name, params)?;
        for id in self.kernel.used_temps() {
            writeln!(self.out, "    let mut t{}: f64;", id)?;
        }
        for part in &self.kernel.parts() {
            self.emit_body(part, "    ")?;
        }
        writeln!(self.out, "}}")?;

        if self.kernel.kind.is_dct() {
            let n = self.kernel.n;
            writeln!(self.out)?;
            writeln!(self.out, "/// In-place variant of [`{}`].", name)?;
            writeln!(self.out, "pub fn {}_in_place(buf: &mut [f64]) {{", name)?;
            writeln!(self.out, "    let mut input = [0.0f64; {}];", n)?;
            writeln!(self.out, "    input.copy_from_slice(&buf[..{}]);", n)?;
            writeln!(self.out, "    {}(&input, buf);", name)?;
            writeln!(self.out, "}}")?;
        }
        Ok(())
    }

    fn emit_subroutine_kernel(&mut self) -> fmt::Result {
        let name = self.kernel.function_name();
        let params = format!("{}: &mut [f64], {}: &mut [f64]", self.names.real, self.names.imag);

        if !self.kernel.base_ops.is_empty() {
            let imports: Vec<&str> = BaseOp::ALL
                .iter()
                .filter(|op| self.kernel.base_ops.contains(*op))
                .map(|op| op.name())
                .collect();
            writeln!(self.out, "use tkgen::fft::baseop::{{{}}};", imports.join(", "))?;
            writeln!(self.out)?;
        }

        for (id, table) in self.kernel.shift_tables.iter().enumerate() {
            let items: Vec<String> = table.iter().map(|i| i.to_string()).collect();
            writeln!(
                self.out,
                "const CSHFT_INDEXES_{}: [usize; {}] = [{}];",
                id,
                table.len(),
                items.join(", ")
            )?;
        }
        if !self.kernel.shift_tables.is_empty() {
            writeln!(self.out)?;
        }

        let parts = self.kernel.parts();
        if parts.len() == 1 {
            self.emit_doc()?;
            writeln!(self.out, "{}", KERNEL_ALLOW)?;
            writeln!(self.out, "pub fn {}({}) {{", name, params)?;
            self.emit_body(&parts[0], "    ")?;
            return writeln!(self.out, "}}");
        }

        for (j, part) in parts.iter().enumerate() {
            writeln!(self.out, "{}", KERNEL_ALLOW)?;
            writeln!(self.out, "fn {}_part{}({}) {{", name, j, params)?;
            self.emit_body(part, "    ")?;
            writeln!(self.out, "}}")?;
            writeln!(self.out)?;
        }

        self.emit_doc()?;
        writeln!(self.out, "pub fn {}({}) {{", name, params)?;
        for j in 0..parts.len() {
            writeln!(self.out, "    {}_part{}({}, {});", name, j, self.names.real, self.names.imag)?;
        }
        writeln!(self.out, "}}")
    }
}

/// Render `kernel` as Rust source.
pub fn emit_rust(kernel: &KernelIR) -> CompileResult<String> {
    RustEmitter::new(kernel).emit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::kernel::compile;

    #[test]
    fn test_inline_dct_signature() {
        let kernel = compile(&KernelConfig::new(TransformKind::DctForward, 8).with_orthogonal(true)).unwrap();
        let src = emit_rust(&kernel).unwrap();
        assert!(src.contains("pub fn dct2_forward_8(dct_in: &[f64], dct_out: &mut [f64]) {"));
        assert!(src.contains("pub fn dct2_forward_8_in_place(buf: &mut [f64]) {"));
        assert!(src.contains("Orthogonal scaling"));
        assert!(src.contains("dct_out[7] = "));
        assert!(src.contains("let mut t0: f64;"));
    }

    #[test]
    fn test_inline_fft_signature() {
        let kernel = compile(&KernelConfig::new(TransformKind::Fft, 4)).unwrap();
        let src = emit_rust(&kernel).unwrap();
        assert!(src.contains("pub fn fft_mixed_radix_4(re: &mut [f64], im: &mut [f64]) {"));
        assert!(!src.contains("_in_place"));
    }

    #[test]
    fn test_subroutine_layout() {
        let config = KernelConfig::new(TransformKind::Fft, 60)
            .with_strategy(Strategy::Subroutine)
            .with_max_function_lines(20);
        let kernel = compile(&config).unwrap();
        let src = emit_rust(&kernel).unwrap();

        assert!(src.contains("use tkgen::fft::baseop::{mx_tr3, mx_tr4, mx_tr5, mx_rot"));
        assert!(src.contains("const CSHFT_INDEXES_0: [usize; "));
        assert!(src.contains("fn fft_mixed_radix_60_part0(re: &mut [f64], im: &mut [f64]) {"));
        assert!(src.contains("    fft_mixed_radix_60_part1(re, im);"));
        assert!(!src.contains("let mut t"));
        assert!(!src.contains(", (-"));
        assert_eq!(src.matches("#[allow(").count(), kernel.parts().len());
    }

    #[test]
    fn test_trivial_subroutine_kernel_allows_unused_buffers() {
        let config = KernelConfig::new(TransformKind::Fft, 1).with_strategy(Strategy::Subroutine);
        let kernel = compile(&config).unwrap();
        let src = emit_rust(&kernel).unwrap();
        assert!(src.contains(&format!("{}\npub fn fft_mixed_radix_1(re: &mut [f64], im: &mut [f64]) {{\n}}", KERNEL_ALLOW)));
    }

    #[test]
    fn test_comments_are_emitted_when_annotating() {
        let kernel = compile(&KernelConfig::new(TransformKind::DctInverse, 4).with_annotate(true)).unwrap();
        let src = emit_rust(&kernel).unwrap();
        assert!(src.contains("    // pre-rotation"));
        assert!(src.contains("    // unpack"));
    }
}
