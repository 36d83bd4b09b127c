//! Twiddle rotation synthesis.
//!
//! Multiplying a complex value by `coeff · e^{iπp/q}` is specialized by angle:
//! multiples of π/2 become moves and sign flips, odd multiples of π/4 share a
//! single `cos 45°` scale, and everything else uses the three-multiply complex
//! product.

use crate::core::{CompilationSession, CompileResult, ComplexSym, Expr};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Angle `π·p/q` with `q > 0` and `0 <= p < 2q`, in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RationalAngle {
    p: i64,
    q: i64,
}

/// Shape of a normalized angle, selecting the synthesis strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationKind {
    /// Angle 0.
    Identity,
    /// Angle π.
    HalfTurn,
    /// Angle π/2 (`positive`) or 3π/2.
    QuarterTurn { positive: bool },
    /// Odd multiple `octant` of π/4.
    Diagonal { octant: u8 },
    General,
}

impl RotationKind {
    pub const fn name(self) -> &'static str {
        match self {
            RotationKind::Identity => "identity",
            RotationKind::HalfTurn => "half-turn",
            RotationKind::QuarterTurn { .. } => "quarter-turn",
            RotationKind::Diagonal { .. } => "diagonal",
            RotationKind::General => "general",
        }
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl RationalAngle {
    /// Normalize `π·p/q`.
    ///
    /// # Panics
    ///
    /// Panics if `q` is zero.
    pub fn new(p: i64, q: i64) -> Self {
        assert!(q != 0, "rotation angle with zero denominator");
        let t = gcd(p, q);
        let (mut p, mut q) = (p / t, q / t);
        if q < 0 {
            p = -p;
            q = -q;
        }
        Self { p: p.rem_euclid(2 * q), q }
    }

    pub fn numerator(&self) -> i64 {
        self.p
    }

    pub fn denominator(&self) -> i64 {
        self.q
    }

    pub fn radians(&self) -> f64 {
        PI * self.p as f64 / self.q as f64
    }

    pub fn kind(&self) -> RotationKind {
        match (self.p, self.q) {
            (0, _) => RotationKind::Identity,
            (1, 1) => RotationKind::HalfTurn,
            (p, 2) => RotationKind::QuarterTurn { positive: p == 1 },
            (p, 4) => RotationKind::Diagonal { octant: p as u8 },
            _ => RotationKind::General,
        }
    }
}

/// Emit `value *= coeff · e^{i·angle}` in place.
pub fn synthesize_rotation(
    session: &mut CompilationSession<'_>,
    value: ComplexSym,
    angle: RationalAngle,
    coeff: Option<f64>,
) -> CompileResult<()> {
    let kind = angle.kind();
    log::trace!("rotate {:?} by {}π/{} ({})", value, angle.p, angle.q, kind.name());
    let ComplexSym { re, im } = value;

    match kind {
        RotationKind::Identity => {
            let Some(c) = coeff else { return Ok(()) };
            session.assign(re, re * Expr::lit(c));
            session.assign(im, im * Expr::lit(c));
        }
        RotationKind::HalfTurn => match coeff {
            Some(c) => {
                session.assign(re, Expr::lit(-c) * re);
                session.assign(im, Expr::lit(-c) * im);
            }
            None => {
                session.assign(re, -re);
                session.assign(im, -im);
            }
        },
        RotationKind::QuarterTurn { positive } => {
            let tmp = session.alloc_temp();
            match (positive, coeff) {
                (true, Some(c)) => {
                    session.assign(tmp, Expr::lit(c) * re);
                    session.assign(re, Expr::lit(-c) * im);
                    session.assign(im, tmp);
                }
                (true, None) => {
                    session.assign(tmp, re);
                    session.assign(re, -im);
                    session.assign(im, tmp);
                }
                (false, Some(c)) => {
                    session.assign(tmp, Expr::lit(-c) * re);
                    session.assign(re, Expr::lit(c) * im);
                    session.assign(im, tmp);
                }
                (false, None) => {
                    session.assign(tmp, re);
                    session.assign(re, im);
                    session.assign(im, -tmp);
                }
            }
            session.release_temp(tmp)?;
        }
        RotationKind::Diagonal { octant } => {
            let tmp0 = session.alloc_temp();
            let tmp1 = session.alloc_temp();
            let (rot_re, rot_im) = match octant {
                1 => (re - im, re + im),
                3 => (-re - im, re - im),
                5 => (im - re, -re - im),
                _ => (re + im, im - re),
            };
            let scale = FRAC_1_SQRT_2 * coeff.unwrap_or(1.0);
            session.assign(tmp0, rot_re);
            session.assign(tmp1, rot_im);
            session.assign(re, tmp0 * Expr::lit(scale));
            session.assign(im, tmp1 * Expr::lit(scale));
            session.release_temp(tmp0)?;
            session.release_temp(tmp1)?;
        }
        RotationKind::General => {
            let rad = angle.radians();
            let scale = coeff.unwrap_or(1.0);
            let (c, d) = (rad.cos() * scale, rad.sin() * scale);

            let t0 = session.alloc_temp();
            let t1 = session.alloc_temp();
            let t2 = session.alloc_temp();
            session.assign(t0, Expr::lit(c) * (re + im));
            session.assign(t1, re * Expr::lit(d - c));
            session.assign(t2, im * Expr::lit(c + d));
            session.assign(re, t0 - t2);
            session.assign(im, t0 + t1);
            session.release_temp(t0)?;
            session.release_temp(t1)?;
            session.release_temp(t2)?;
        }
    }

    session.record_rotation(kind.name());
    Ok(())
}
