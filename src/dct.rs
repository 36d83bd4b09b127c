// This module implements the DCT-II engine on top of the inline FFT. Both directions use
// Makhoul's reduction of an N-point DCT-II to an N/2-point complex FFT. The forward
// transform packs the even/odd reordered input into N/2 complex values, transforms them,
// splits the half-length spectrum into the spectrum of the real reordered sequence
// (the butterfly between bins k and N/2 - k), and finishes with the quarter-sample
// post-rotation e^{-iπk/2N}; real parts give the bins up to N/2 and negated imaginary
// parts the mirrored bins above it. The inverse runs the same steps backwards: the
// input is pre-rotated and folded into N/2 complex values, transformed, and the real and
// imaginary parts are unscrambled into output samples. Scaling coefficients equal to one
// (or minus one) never cost a multiplication, and equal pairs of coefficients are folded
// into the gain of the rotation they feed.

//! DCT-II forward and inverse synthesis via an N/2-point FFT.

use crate::core::{CompilationSession, CompileError, CompileResult, ComplexSym, Expr, Symbol};
use crate::fft::{inline_fft, RadixFactorization, RationalAngle};
use crate::fft::rotation::synthesize_rotation;
use std::f64::consts::FRAC_1_SQRT_2;

/// Tolerance used when comparing coefficients.
const COEFF_EPSILON: f64 = 1e-8;

/// Whether two coefficients are equal for folding purposes.
pub fn is_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < COEFF_EPSILON
}

/// Scaling vector `C[0..n)`: all ones, or the orthonormal scaling.
pub fn coefficients(n: usize, orthogonal: bool) -> Vec<f64> {
    if !orthogonal {
        return vec![1.0; n];
    }
    let nf = n as f64;
    (0..n)
        .map(|k| if k == 0 { (1.0 / nf).sqrt() } else { (2.0 / nf).sqrt() })
        .collect()
}

/// Check that an `n`-point DCT-II can be synthesized.
pub fn check_size(n: usize) -> CompileResult<()> {
    if n == 0 || n % 2 != 0 {
        return Err(CompileError::BadRadix { size: n });
    }
    RadixFactorization::new(n / 2).map(|_| ())
}

/// `coeff · src`, or a plain load when `coeff` is one.
fn scaled(coeff: f64, src: Symbol) -> Expr {
    if is_equal(coeff, 1.0) {
        src.into()
    } else {
        Expr::lit(coeff) * src
    }
}

/// Fold a pair of equal coefficients into `gain`.
///
/// Returns the rotation gain (`None` when it is one) and the remaining
/// per-lane coefficients.
fn fold_gain(gain: f64, c1: f64, c2: f64) -> (Option<f64>, f64, f64) {
    let (mut gain, mut c1, mut c2) = (gain, c1, c2);
    if is_equal(c1, c2) {
        gain *= c1;
        c1 = 1.0;
        c2 = 1.0;
    }
    let gain = if is_equal(gain, 1.0) { None } else { Some(gain) };
    (gain, c1, c2)
}

/// Emit an `n`-point forward DCT-II from `Input` to `Output` slots:
/// `out[k] = C[k] · Σ in[i] · cos((2i + 1)kπ / 2n)`.
pub fn emit_forward(session: &mut CompilationSession<'_>, n: usize, c: &[f64]) -> CompileResult<()> {
    check_size(n)?;
    let m = n / 2;
    log::debug!("forward DCT-II: {} points over a {}-point FFT", n, m);

    let xp_index: Vec<usize> = (0..n).map(|i| if i < m { 2 * i } else { 2 * n - 1 - 2 * i }).collect();

    session.comment("pack");
    let xc: Vec<ComplexSym> = (0..m).map(|_| session.alloc_complex()).collect();
    for (i, value) in xc.iter().enumerate() {
        session.assign(value.re, Symbol::Input(xp_index[2 * i]));
        session.assign(value.im, Symbol::Input(xp_index[2 * i + 1]));
    }

    session.comment(format!("{}-point FFT", m));
    let addr = inline_fft(session, &xc)?;

    let mut xp: Vec<ComplexSym> = (0..m).map(|k| xc[addr.get(k)]).collect();
    let xp_m = session.alloc_complex();
    xp.push(xp_m);

    session.comment("split");
    {
        let tmp0 = session.alloc_temp();
        let tmp1 = session.alloc_temp();
        session.assign(tmp0, xp[0].re + xp[0].im);
        session.assign(tmp1, xp[0].re - xp[0].im);
        session.assign(xp[0].re, tmp0);
        session.assign(xp[0].im, Expr::lit(0.0));
        session.assign(xp_m.re, tmp1);
        session.assign(xp_m.im, Expr::lit(0.0));
        session.release_temp(tmp0)?;
        session.release_temp(tmp1)?;
    }

    for k in 1..m {
        let (x1, x2) = (xp[k], xp[m - k]);
        let angle = RationalAngle::new(-2 * k as i64, n as i64);
        if k < m - k {
            let tmp1 = session.alloc_temp();
            let tmp2 = session.alloc_temp();
            let tmp3 = session.alloc_temp();
            let tmp4 = session.alloc_temp();
            session.assign(tmp1, x1.re + x2.re);
            session.assign(tmp2, x1.im - x2.im);
            session.assign(tmp3, x1.im + x2.im);
            session.assign(tmp4, x2.re - x1.re);
            synthesize_rotation(session, ComplexSym::new(tmp3, tmp4), angle, None)?;
            session.assign(x1.re, tmp1 + tmp3);
            session.assign(x1.im, tmp2 + tmp4);
            session.assign(x2.re, tmp1 - tmp3);
            session.assign(x2.im, tmp4 - tmp2);
            for tmp in [tmp1, tmp2, tmp3, tmp4] {
                session.release_temp(tmp)?;
            }
        } else if k == m - k {
            let tmp1 = session.alloc_temp();
            let tmp3 = session.alloc_temp();
            let tmp4 = session.alloc_temp();
            session.assign(tmp1, x1.re + x2.re);
            session.assign(tmp3, x1.im + x2.im);
            session.assign(tmp4, x2.re - x1.re);
            synthesize_rotation(session, ComplexSym::new(tmp3, tmp4), angle, None)?;
            session.assign(x1.re, tmp1 + tmp3);
            session.assign(x1.im, tmp4);
            for tmp in [tmp1, tmp3, tmp4] {
                session.release_temp(tmp)?;
            }
        }
    }

    session.comment("post-rotation");
    for (k, value) in xp.iter().enumerate().skip(1) {
        let coeff = if k == m { None } else { Some(0.5) };
        synthesize_rotation(session, *value, RationalAngle::new(-(k as i64), 2 * n as i64), coeff)?;
    }

    session.comment("store");
    for k in 0..n {
        let expr = if k <= m {
            let src = xp[k].re;
            if is_equal(c[k], 1.0) {
                Expr::from(src)
            } else if is_equal(c[k], -1.0) {
                -src
            } else {
                Expr::lit(c[k]) * src
            }
        } else {
            let src = xp[n - k].im;
            if is_equal(c[k], 1.0) {
                -src
            } else if is_equal(c[k], -1.0) {
                Expr::from(src)
            } else {
                Expr::lit(-c[k]) * src
            }
        };
        session.assign_output(Symbol::Output(k), expr);
    }

    for value in xc {
        session.release_complex(value)?;
    }
    session.release_complex(xp_m)
}

/// Emit an `n`-point inverse DCT-II from `Input` to `Output` slots:
/// `out[i] = Σ C[k] · in[k] · cos((2i + 1)kπ / 2n)`.
pub fn emit_inverse(session: &mut CompilationSession<'_>, n: usize, c: &[f64]) -> CompileResult<()> {
    check_size(n)?;
    let m = n / 2;
    log::debug!("inverse DCT-II: {} points over a {}-point FFT", n, m);

    let zc: Vec<ComplexSym> = (0..m).map(|_| session.alloc_complex()).collect();

    session.comment("pre-rotation");
    let mut k = 0;
    while 2 * k <= m {
        if k == 0 {
            let tmp1 = session.alloc_temp();
            let tmp2 = session.alloc_temp();
            session.assign(tmp1, scaled(c[0], Symbol::Input(0)));
            session.assign(tmp2, scaled(FRAC_1_SQRT_2 * c[m], Symbol::Input(m)));
            session.assign(zc[0].re, tmp1 + tmp2);
            session.assign(zc[0].im, tmp1 - tmp2);
            session.release_temp(tmp1)?;
            session.release_temp(tmp2)?;
        } else if 2 * k == m {
            let (gain, c1, c2) = fold_gain(1.0, c[k], c[n - k]);
            session.assign(zc[k].re, scaled(c1, Symbol::Input(k)));
            session.assign(zc[k].im, scaled(c2, Symbol::Input(n - k)));
            synthesize_rotation(session, zc[k], RationalAngle::new(-(k as i64), 2 * n as i64), gain)?;
        } else {
            let z1 = session.alloc_complex();
            let z2 = session.alloc_complex();

            let (gain, c1, c2) = fold_gain(0.5, c[k], c[n - k]);
            session.assign(z1.re, scaled(c1, Symbol::Input(k)));
            session.assign(z1.im, scaled(c2, Symbol::Input(n - k)));
            synthesize_rotation(session, z1, RationalAngle::new(-(k as i64), 2 * n as i64), gain)?;

            let (gain, c1, c2) = fold_gain(0.5, c[m - k], c[m + k]);
            session.assign(z2.re, scaled(c1, Symbol::Input(m - k)));
            session.assign(z2.im, scaled(c2, Symbol::Input(m + k)));
            synthesize_rotation(session, z2, RationalAngle::new(k as i64 - m as i64, 2 * n as i64), gain)?;

            let zc1 = session.alloc_complex();
            let zc2 = session.alloc_complex();
            session.assign(zc1.re, z1.re + z2.re);
            session.assign(zc1.im, z1.im - z2.im);
            session.assign(zc2.re, -(z1.im + z2.im));
            session.assign(zc2.im, z1.re - z2.re);
            session.release_complex(z1)?;
            session.release_complex(z2)?;

            synthesize_rotation(session, zc2, RationalAngle::new(-2 * k as i64, n as i64), None)?;

            session.assign(zc[k].re, zc1.re + zc2.re);
            session.assign(zc[k].im, zc1.im + zc2.im);
            session.assign(zc[m - k].re, zc1.re - zc2.re);
            session.assign(zc[m - k].im, zc2.im - zc1.im);
            session.release_complex(zc1)?;
            session.release_complex(zc2)?;
        }
        k += 1;
    }

    session.comment(format!("{}-point FFT", m));
    let addr = inline_fft(session, &zc)?;

    session.comment("unpack");
    for i in 0..n {
        let off = if i % 2 == 0 { i / 2 } else { n - 1 - (i - 1) / 2 };
        let value = zc[addr.get(off / 2)];
        let src = if off % 2 == 0 { value.re } else { value.im };
        session.assign_output(Symbol::Output(i), src);
    }

    for value in zc {
        session.release_complex(value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    #[test]
    fn test_coefficients() {
        assert_eq!(coefficients(4, false), vec![1.0; 4]);
        let c = coefficients(8, true);
        assert!(is_equal(c[0], (1.0f64 / 8.0).sqrt()));
        assert!(c[1..].iter().all(|&v| is_equal(v, 0.5)));
    }

    #[test]
    fn test_fold_gain() {
        assert_eq!(fold_gain(1.0, 1.0, 1.0), (None, 1.0, 1.0));
        assert_eq!(fold_gain(0.5, 1.0, 1.0), (Some(0.5), 1.0, 1.0));
        assert_eq!(fold_gain(0.5, 2.0, 2.0), (None, 1.0, 1.0));
        assert_eq!(fold_gain(0.5, 0.3, 0.7), (Some(0.5), 0.3, 0.7));
    }

    #[test]
    fn test_bad_sizes() {
        for n in [0, 3, 14, 22] {
            assert!(matches!(check_size(n), Err(CompileError::BadRadix { .. })), "{}", n);
        }
        for n in [2, 4, 16, 40, 64] {
            assert!(check_size(n).is_ok(), "{}", n);
        }
    }

    #[test]
    fn test_forward_releases_temporaries() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_forward(&mut session, 16, &coefficients(16, true)).unwrap();
        assert_eq!(session.temps().in_use_count(), 0);
    }

    #[test]
    fn test_inverse_releases_temporaries() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_inverse(&mut session, 24, &coefficients(24, false)).unwrap();
        assert_eq!(session.temps().in_use_count(), 0);
    }

    #[test]
    fn test_every_output_is_mandatory() {
        let arena = Bump::new();
        let mut session = CompilationSession::new(&arena);
        emit_forward(&mut session, 8, &coefficients(8, false)).unwrap();
        let mut outputs: Vec<Symbol> = session
            .stream()
            .instructions()
            .iter()
            .filter_map(|inst| inst.as_op())
            .filter(|op| op.mandatory)
            .flat_map(|op| op.outputs.clone())
            .collect();
        outputs.sort();
        assert_eq!(outputs, (0..8).map(Symbol::Output).collect::<Vec<_>>());
    }
}
