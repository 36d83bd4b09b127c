//! Closed-form base-case butterflies (2, 3, 4 and 5 points).
//!
//! The formulas are identical to the routines in [`super::baseop`], so an
//! inlined kernel and a subroutine kernel round the same way.

use crate::core::{CompilationSession, CompileError, CompileResult, ComplexSym, Expr, Radix, Symbol};

/// `sqrt(3) / 2`
pub const SIN_60: f64 = 0.8660254037844386;
/// `(cos(2π/5) - cos(4π/5)) / 2`
pub const C5_1: f64 = 0.5590169943749475;
/// `sin(2π/5)`
pub const S5_1: f64 = 0.9510565162951535;
/// `sin(4π/5)`
pub const S5_2: f64 = 0.5877852522924731;

#[derive(Clone, Copy)]
enum Part {
    Re,
    Im,
}

impl Part {
    fn of(self, value: ComplexSym) -> Symbol {
        match self {
            Part::Re => value.re,
            Part::Im => value.im,
        }
    }
}

/// Emit the same formula for the real and the imaginary lane.
fn lanewise(session: &mut CompilationSession<'_>, dst: ComplexSym, f: impl Fn(Part) -> Expr) {
    for part in [Part::Re, Part::Im] {
        session.assign(part.of(dst), f(part));
    }
}

fn alloc<const K: usize>(session: &mut CompilationSession<'_>) -> [ComplexSym; K] {
    std::array::from_fn(|_| session.alloc_complex())
}

fn release(session: &mut CompilationSession<'_>, temps: &[ComplexSym]) -> CompileResult<()> {
    for value in temps {
        session.release_complex(*value)?;
    }
    Ok(())
}

/// Emit an in-place DFT over `x`, whose length selects the radix.
pub fn synthesize_butterfly(session: &mut CompilationSession<'_>, x: &[ComplexSym]) -> CompileResult<()> {
    let radix = Radix::from_size(x.len()).ok_or(CompileError::BadRadix { size: x.len() })?;
    session.record_butterfly(radix);
    match radix {
        Radix::Two => radix2(session, x),
        Radix::Three => radix3(session, x),
        Radix::Four => radix4(session, x),
        Radix::Five => radix5(session, x),
    }
}

fn radix2(s: &mut CompilationSession<'_>, x: &[ComplexSym]) -> CompileResult<()> {
    let [t1, t2] = alloc::<2>(s);
    lanewise(s, t1, |p| p.of(x[0]).into());
    lanewise(s, t2, |p| p.of(x[1]).into());
    lanewise(s, x[0], |p| p.of(t1) + p.of(t2));
    lanewise(s, x[1], |p| p.of(t1) - p.of(t2));
    release(s, &[t1, t2])
}

fn radix3(s: &mut CompilationSession<'_>, x: &[ComplexSym]) -> CompileResult<()> {
    let [t1, t2, t3] = alloc::<3>(s);
    lanewise(s, t1, |p| p.of(x[1]) + p.of(x[2]));
    lanewise(s, t2, |p| p.of(x[0]) - Expr::lit(0.5) * p.of(t1));
    lanewise(s, t3, |p| Expr::lit(SIN_60) * (p.of(x[1]) - p.of(x[2])));
    lanewise(s, x[0], |p| p.of(x[0]) + p.of(t1));
    s.assign(x[1].re, t2.re + t3.im);
    s.assign(x[1].im, t2.im - t3.re);
    s.assign(x[2].re, t2.re - t3.im);
    s.assign(x[2].im, t2.im + t3.re);
    release(s, &[t1, t2, t3])
}

fn radix4(s: &mut CompilationSession<'_>, x: &[ComplexSym]) -> CompileResult<()> {
    let [t1, t2, t3, t4] = alloc::<4>(s);
    lanewise(s, t1, |p| p.of(x[0]) + p.of(x[2]));
    lanewise(s, t2, |p| p.of(x[1]) + p.of(x[3]));
    lanewise(s, t3, |p| p.of(x[0]) - p.of(x[2]));
    lanewise(s, t4, |p| p.of(x[1]) - p.of(x[3]));
    lanewise(s, x[0], |p| p.of(t1) + p.of(t2));
    s.assign(x[1].re, t3.re + t4.im);
    s.assign(x[1].im, t3.im - t4.re);
    lanewise(s, x[2], |p| p.of(t1) - p.of(t2));
    s.assign(x[3].re, t3.re - t4.im);
    s.assign(x[3].im, t3.im + t4.re);
    release(s, &[t1, t2, t3, t4])
}

fn radix5(s: &mut CompilationSession<'_>, x: &[ComplexSym]) -> CompileResult<()> {
    let t: [ComplexSym; 11] = alloc::<11>(s);
    let [t1, t2, t3, t4, t5, t6, t7, t8, t9, t10, t11] = t;
    lanewise(s, t1, |p| p.of(x[1]) + p.of(x[4]));
    lanewise(s, t2, |p| p.of(x[2]) + p.of(x[3]));
    lanewise(s, t3, |p| p.of(x[1]) - p.of(x[4]));
    lanewise(s, t4, |p| p.of(x[2]) - p.of(x[3]));
    lanewise(s, t5, |p| p.of(t1) + p.of(t2));
    lanewise(s, t6, |p| Expr::lit(C5_1) * (p.of(t1) - p.of(t2)));
    lanewise(s, t7, |p| p.of(x[0]) - Expr::lit(0.25) * p.of(t5));
    lanewise(s, t8, |p| p.of(t7) + p.of(t6));
    lanewise(s, t9, |p| p.of(t7) - p.of(t6));
    lanewise(s, t10, |p| Expr::lit(S5_1) * p.of(t3) + Expr::lit(S5_2) * p.of(t4));
    lanewise(s, t11, |p| Expr::lit(S5_2) * p.of(t3) - Expr::lit(S5_1) * p.of(t4));
    lanewise(s, x[0], |p| p.of(x[0]) + p.of(t5));
    s.assign(x[1].re, t8.re + t10.im);
    s.assign(x[1].im, t8.im - t10.re);
    s.assign(x[2].re, t9.re + t11.im);
    s.assign(x[2].im, t9.im - t11.re);
    s.assign(x[3].re, t9.re - t11.im);
    s.assign(x[3].im, t9.im + t11.re);
    s.assign(x[4].re, t8.re - t10.im);
    s.assign(x[4].im, t8.im + t10.re);
    release(s, &t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Instruction;
    use bumpalo::Bump;

    /// Run the emitted ops directly on a small complex buffer.
    fn run(n: usize, re: &mut [f64], im: &mut [f64]) {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        let slots: Vec<ComplexSym> = (0..n).map(ComplexSym::slot).collect();
        synthesize_butterfly(&mut session, &slots).unwrap();

        let mut temps = vec![f64::NAN; session.temps().issued_count()];
        for inst in session.stream().instructions() {
            let Instruction::Op(op) = inst else { continue };
            let crate::core::Stmt::Assign { dst, expr } = &op.stmt else { continue };
            let value = expr.eval(&|sym| match sym {
                Symbol::Temp(id) => temps[id as usize],
                Symbol::Real(i) => re[i],
                Symbol::Imag(i) => im[i],
                _ => f64::NAN,
            });
            match *dst {
                Symbol::Temp(id) => temps[id as usize] = value,
                Symbol::Real(i) => re[i] = value,
                Symbol::Imag(i) => im[i] = value,
                _ => unreachable!(),
            }
        }
    }

    fn check_against_dft(n: usize) {
        let re0: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin() + 0.25).collect();
        let im0: Vec<f64> = (0..n).map(|i| (i as f64 * 1.3).cos() - 0.5).collect();
        let (mut re, mut im) = (re0.clone(), im0.clone());
        run(n, &mut re, &mut im);

        for k in 0..n {
            let (mut sr, mut si) = (0.0, 0.0);
            for j in 0..n {
                let a = -2.0 * std::f64::consts::PI * (j * k) as f64 / n as f64;
                sr += re0[j] * a.cos() - im0[j] * a.sin();
                si += re0[j] * a.sin() + im0[j] * a.cos();
            }
            assert!((re[k] - sr).abs() < 1e-12, "radix {} bin {} re", n, k);
            assert!((im[k] - si).abs() < 1e-12, "radix {} bin {} im", n, k);
        }
    }

    #[test]
    fn test_butterflies_match_dft() {
        for n in 2..=5 {
            check_against_dft(n);
        }
    }

    #[test]
    fn test_temporaries_released() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        let slots: Vec<ComplexSym> = (0..5).map(ComplexSym::slot).collect();
        synthesize_butterfly(&mut session, &slots).unwrap();
        assert_eq!(session.temps().in_use_count(), 0);
        assert_eq!(session.temps().issued_count(), 22);
    }

    #[test]
    fn test_unsupported_size() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        let slots: Vec<ComplexSym> = (0..6).map(ComplexSym::slot).collect();
        assert!(matches!(
            synthesize_butterfly(&mut session, &slots),
            Err(CompileError::BadRadix { size: 6 })
        ));
    }
}
