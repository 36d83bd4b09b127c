//! Numeric interpreter for compiled kernels.
//!
//! [`Evaluator`] executes the live ops of a [`KernelIR`] over `f64`, with
//! calls dispatched to [`crate::fft::baseop`]. [`reference`] holds the
//! direct-sum definitions the kernels are checked against.

use crate::core::{BaseOpCall, CompileError, CompileResult, Instruction, Stmt, Symbol};
use crate::fft::baseop;
use crate::kernel::KernelIR;

/// Machine state while running a kernel. Unwritten temporaries and outputs
/// read as NaN. Without a separate output buffer, `Output(i)` aliases
/// `Input(i)`, which is how an in-place call sees the kernel.
struct Machine {
    temps: Vec<f64>,
    input: Vec<f64>,
    output: Option<Vec<f64>>,
    re: Vec<f64>,
    im: Vec<f64>,
}

impl Machine {
    fn read(&self, sym: Symbol) -> f64 {
        match sym {
            Symbol::Temp(id) => self.temps[id as usize],
            Symbol::Input(i) => self.input[i],
            Symbol::Output(i) => self.output.as_ref().map_or(self.input[i], |out| out[i]),
            Symbol::Real(i) => self.re[i],
            Symbol::Imag(i) => self.im[i],
        }
    }

    fn write(&mut self, sym: Symbol, value: f64) {
        let slot = match sym {
            Symbol::Temp(id) => &mut self.temps[id as usize],
            Symbol::Input(i) => panic!("kernel writes input slot {}", i),
            Symbol::Output(i) => match &mut self.output {
                Some(out) => &mut out[i],
                None => &mut self.input[i],
            },
            Symbol::Real(i) => &mut self.re[i],
            Symbol::Imag(i) => &mut self.im[i],
        };
        *slot = value;
    }

    fn call(&mut self, call: &BaseOpCall, shift_tables: &[Vec<usize>]) {
        let (re, im) = (&mut self.re[..], &mut self.im[..]);
        match call {
            BaseOpCall::Butterfly { slots, .. } => match slots.as_slice() {
                &[a, b] => baseop::mx_tr2(re, im, a, b),
                &[a, b, c] => baseop::mx_tr3(re, im, a, b, c),
                &[a, b, c, d] => baseop::mx_tr4(re, im, a, b, c, d),
                &[a, b, c, d, e] => baseop::mx_tr5(re, im, a, b, c, d, e),
                other => panic!("butterfly over {} slots", other.len()),
            },
            BaseOpCall::Rotate { slot, cos, sin } => baseop::mx_rot(re, im, *slot, *cos, *sin),
            BaseOpCall::Swap { a, b } => baseop::mx_swap(re, im, *a, *b),
            BaseOpCall::CyclicShift { table, .. } => baseop::mx_cshft(re, im, &shift_tables[*table]),
        }
    }
}

/// Runs a compiled kernel on concrete data.
pub struct Evaluator<'k> {
    kernel: &'k KernelIR,
    temp_count: usize,
}

impl<'k> Evaluator<'k> {
    pub fn new(kernel: &'k KernelIR) -> Self {
        let temp_count = kernel.used_temps().last().map_or(0, |&id| id as usize + 1);
        Self { kernel, temp_count }
    }

    fn execute(&self, machine: &mut Machine) {
        for inst in &self.kernel.instructions {
            let Instruction::Op(op) = inst else { continue };
            if op.pruned {
                continue;
            }
            match &op.stmt {
                Stmt::Assign { dst, expr } => {
                    let value = expr.eval(&|sym| machine.read(sym));
                    machine.write(*dst, value);
                }
                Stmt::Call(call) => machine.call(call, &self.kernel.shift_tables),
            }
        }
    }

    /// Run a DCT kernel on `input` and return its output.
    ///
    /// # Panics
    ///
    /// Panics if `input` does not hold exactly N samples.
    pub fn run_real(&self, input: &[f64]) -> Vec<f64> {
        let n = self.kernel.n;
        assert_eq!(input.len(), n, "kernel expects {} samples", n);
        let mut machine = Machine {
            temps: vec![f64::NAN; self.temp_count],
            input: input.to_vec(),
            output: Some(vec![f64::NAN; n]),
            re: Vec::new(),
            im: Vec::new(),
        };
        self.execute(&mut machine);
        machine.output.unwrap_or_default()
    }

    /// Run a DCT kernel with `buf` as both input and output, so every store
    /// to `out[i]` is visible to later reads of `in[i]`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` does not hold exactly N samples.
    pub fn run_real_in_place(&self, buf: &mut [f64]) {
        let n = self.kernel.n;
        assert_eq!(buf.len(), n, "kernel expects {} samples", n);
        let mut machine = Machine {
            temps: vec![f64::NAN; self.temp_count],
            input: buf.to_vec(),
            output: None,
            re: Vec::new(),
            im: Vec::new(),
        };
        self.execute(&mut machine);
        buf.copy_from_slice(&machine.input);
    }

    /// Run an FFT kernel in place on parallel real/imaginary arrays.
    ///
    /// # Panics
    ///
    /// Panics if either array does not hold exactly N values.
    pub fn run_complex(&self, re: &mut [f64], im: &mut [f64]) {
        let n = self.kernel.n;
        assert_eq!(re.len(), n, "kernel expects {} real parts", n);
        assert_eq!(im.len(), n, "kernel expects {} imaginary parts", n);
        let mut machine = Machine {
            temps: vec![f64::NAN; self.temp_count],
            input: Vec::new(),
            output: None,
            re: re.to_vec(),
            im: im.to_vec(),
        };
        self.execute(&mut machine);
        re.copy_from_slice(&machine.re);
        im.copy_from_slice(&machine.im);
    }
}

/// Direct-sum transform definitions.
pub mod reference {
    use std::f64::consts::PI;

    /// `out[k] = C[k] · Σ x[i] · cos((2i + 1)kπ / 2N)`
    pub fn dct_forward(x: &[f64], c: &[f64]) -> Vec<f64> {
        let n = x.len();
        (0..n)
            .map(|k| {
                let sum: f64 = x
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v * (PI * ((2 * i + 1) * k) as f64 / (2 * n) as f64).cos())
                    .sum();
                c[k] * sum
            })
            .collect()
    }

    /// `out[i] = Σ C[k] · y[k] · cos((2i + 1)kπ / 2N)`
    pub fn dct_inverse(y: &[f64], c: &[f64]) -> Vec<f64> {
        let n = y.len();
        (0..n)
            .map(|i| {
                y.iter()
                    .enumerate()
                    .map(|(k, v)| c[k] * v * (PI * ((2 * i + 1) * k) as f64 / (2 * n) as f64).cos())
                    .sum()
            })
            .collect()
    }

    /// `X[k] = Σ x[j] · e^{-2πi·jk/N}`
    pub fn dft(re: &[f64], im: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = re.len();
        let mut out_re = vec![0.0; n];
        let mut out_im = vec![0.0; n];
        for k in 0..n {
            for j in 0..n {
                let angle = -2.0 * PI * ((j * k) % n) as f64 / n as f64;
                let (s, c) = angle.sin_cos();
                out_re[k] += re[j] * c - im[j] * s;
                out_im[k] += re[j] * s + im[j] * c;
            }
        }
        (out_re, out_im)
    }
}

/// Deterministic, non-symmetric test signal.
pub fn test_signal(n: usize, seed: f64) -> Vec<f64> {
    (0..n)
        .map(|i| (0.7 * i as f64 + seed).sin() + 0.05 * i as f64 - 0.3)
        .collect()
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, |acc, d| if d.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(d) })
}

/// Evaluate `kernel` on a test signal and compare it with the direct sum.
///
/// Returns the largest absolute error, or
/// [`CompileError::VerificationFailed`] if it is not small relative to the
/// magnitude of the reference output (NaN counts as a failure).
pub fn self_check(kernel: &KernelIR) -> CompileResult<f64> {
    use crate::config::TransformKind;

    let evaluator = Evaluator::new(kernel);
    let n = kernel.n;
    let (max_error, scale) = match kernel.kind {
        TransformKind::DctForward | TransformKind::DctInverse => {
            let x = test_signal(n, 0.3);
            let got = evaluator.run_real(&x);
            let want = if kernel.kind == TransformKind::DctForward {
                reference::dct_forward(&x, &kernel.coefficients)
            } else {
                reference::dct_inverse(&x, &kernel.coefficients)
            };
            let scale = want.iter().fold(1.0f64, |acc, v| acc.max(v.abs()));
            (max_abs_diff(&got, &want), scale)
        }
        TransformKind::Fft => {
            let re0 = test_signal(n, 0.3);
            let im0 = test_signal(n, 1.1);
            let (want_re, want_im) = reference::dft(&re0, &im0);
            let (mut re, mut im) = (re0, im0);
            evaluator.run_complex(&mut re, &mut im);
            let scale = want_re
                .iter()
                .chain(&want_im)
                .fold(1.0f64, |acc, v| acc.max(v.abs()));
            (max_abs_diff(&re, &want_re).max(max_abs_diff(&im, &want_im)), scale)
        }
    };

    let tolerance = 1e-9 * scale;
    if max_error.is_nan() || max_error > tolerance {
        return Err(CompileError::VerificationFailed { max_error });
    }
    Ok(max_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KernelConfig, Strategy, TransformKind};
    use crate::core::{Expr, Op};
    use crate::kernel::compile;

    #[test]
    fn test_reference_dct_small() {
        let out = reference::dct_forward(&[1.0, 2.0, 3.0, 4.0], &[1.0; 4]);
        assert!((out[0] - 10.0).abs() < 1e-12);
        // Odd bins of a linear ramp are negative.
        assert!(out[1] < 0.0 && out[3] < 0.0);
        assert!(out[2].abs() < 1e-12);
    }

    #[test]
    fn test_reference_dft_impulse() {
        let (re, im) = reference::dft(&[1.0, 0.0, 0.0], &[0.0; 3]);
        assert!(re.iter().all(|v| (v - 1.0).abs() < 1e-15));
        assert!(im.iter().all(|v| v.abs() < 1e-15));
    }

    #[test]
    fn test_in_place_matches_out_of_place() {
        for kind in [TransformKind::DctForward, TransformKind::DctInverse] {
            let kernel = compile(&KernelConfig::new(kind, 12).with_verify(false)).unwrap();
            let evaluator = Evaluator::new(&kernel);
            let x = test_signal(12, 0.9);
            let out = evaluator.run_real(&x);
            let mut buf = x.clone();
            evaluator.run_real_in_place(&mut buf);
            assert_eq!(buf, out, "{}", kind);
        }
    }

    #[test]
    fn test_in_place_sees_early_stores() {
        let mut kernel = compile(&KernelConfig::new(TransformKind::DctForward, 8).with_verify(false)).unwrap();
        // A store to out[1] ahead of every load clobbers in[1] only when the
        // buffers alias; out of place it is overwritten by the final store.
        let early = Op::new(Stmt::Assign { dst: Symbol::Output(1), expr: Expr::lit(1234.0) }, true);
        kernel.instructions.insert(0, Instruction::Op(early));

        let evaluator = Evaluator::new(&kernel);
        let x = test_signal(8, 0.4);
        let out = evaluator.run_real(&x);
        let mut buf = x.clone();
        evaluator.run_real_in_place(&mut buf);
        assert_ne!(buf, out);

        let clean = compile(&KernelConfig::new(TransformKind::DctForward, 8).with_verify(false)).unwrap();
        assert_eq!(out, Evaluator::new(&clean).run_real(&x));
    }

    #[test]
    fn test_self_check_passes_for_both_strategies() {
        for strategy in [Strategy::Inline, Strategy::Subroutine] {
            let config = KernelConfig::new(TransformKind::Fft, 40)
                .with_strategy(strategy)
                .with_verify(false);
            let kernel = compile(&config).unwrap();
            assert!(self_check(&kernel).unwrap() < 1e-10);
        }
    }

    #[test]
    fn test_self_check_detects_tampering() {
        let mut kernel = compile(&KernelConfig::new(TransformKind::DctInverse, 8).with_verify(false)).unwrap();
        // Drop one mandatory store; its output stays NaN.
        let last = kernel
            .instructions
            .iter_mut()
            .rev()
            .find_map(|inst| match inst {
                Instruction::Op(op) if op.mandatory => Some(op),
                _ => None,
            })
            .unwrap();
        last.pruned = true;
        assert!(matches!(self_check(&kernel), Err(CompileError::VerificationFailed { .. })));
    }
}
