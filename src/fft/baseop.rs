//! Base-operation library called by subroutine FFT kernels.
//!
//! Every routine works in place on parallel real/imaginary arrays and takes
//! complex slot indices. The butterflies use the same formulas as the
//! inlined kernels in [`super::butterfly`].

use super::butterfly::{C5_1, S5_1, S5_2, SIN_60};

/// 2-point DFT over slots `i0`, `i1`.
pub fn mx_tr2(re: &mut [f64], im: &mut [f64], i0: usize, i1: usize) {
    let (t1r, t1i) = (re[i0], im[i0]);
    let (t2r, t2i) = (re[i1], im[i1]);
    re[i0] = t1r + t2r;
    im[i0] = t1i + t2i;
    re[i1] = t1r - t2r;
    im[i1] = t1i - t2i;
}

/// 3-point DFT.
pub fn mx_tr3(re: &mut [f64], im: &mut [f64], i0: usize, i1: usize, i2: usize) {
    let t1r = re[i1] + re[i2];
    let t1i = im[i1] + im[i2];
    let t2r = re[i0] - 0.5 * t1r;
    let t2i = im[i0] - 0.5 * t1i;
    let t3r = SIN_60 * (re[i1] - re[i2]);
    let t3i = SIN_60 * (im[i1] - im[i2]);
    re[i0] += t1r;
    im[i0] += t1i;
    re[i1] = t2r + t3i;
    im[i1] = t2i - t3r;
    re[i2] = t2r - t3i;
    im[i2] = t2i + t3r;
}

/// 4-point DFT.
pub fn mx_tr4(re: &mut [f64], im: &mut [f64], i0: usize, i1: usize, i2: usize, i3: usize) {
    let t1r = re[i0] + re[i2];
    let t1i = im[i0] + im[i2];
    let t2r = re[i1] + re[i3];
    let t2i = im[i1] + im[i3];
    let t3r = re[i0] - re[i2];
    let t3i = im[i0] - im[i2];
    let t4r = re[i1] - re[i3];
    let t4i = im[i1] - im[i3];
    re[i0] = t1r + t2r;
    im[i0] = t1i + t2i;
    re[i1] = t3r + t4i;
    im[i1] = t3i - t4r;
    re[i2] = t1r - t2r;
    im[i2] = t1i - t2i;
    re[i3] = t3r - t4i;
    im[i3] = t3i + t4r;
}

/// 5-point DFT.
#[allow(clippy::too_many_arguments)]
pub fn mx_tr5(re: &mut [f64], im: &mut [f64], i0: usize, i1: usize, i2: usize, i3: usize, i4: usize) {
    let t1r = re[i1] + re[i4];
    let t1i = im[i1] + im[i4];
    let t2r = re[i2] + re[i3];
    let t2i = im[i2] + im[i3];
    let t3r = re[i1] - re[i4];
    let t3i = im[i1] - im[i4];
    let t4r = re[i2] - re[i3];
    let t4i = im[i2] - im[i3];
    let t5r = t1r + t2r;
    let t5i = t1i + t2i;
    let t6r = C5_1 * (t1r - t2r);
    let t6i = C5_1 * (t1i - t2i);
    let t7r = re[i0] - 0.25 * t5r;
    let t7i = im[i0] - 0.25 * t5i;
    let t8r = t7r + t6r;
    let t8i = t7i + t6i;
    let t9r = t7r - t6r;
    let t9i = t7i - t6i;
    let t10r = S5_1 * t3r + S5_2 * t4r;
    let t10i = S5_1 * t3i + S5_2 * t4i;
    let t11r = S5_2 * t3r - S5_1 * t4r;
    let t11i = S5_2 * t3i - S5_1 * t4i;
    re[i0] += t5r;
    im[i0] += t5i;
    re[i1] = t8r + t10i;
    im[i1] = t8i - t10r;
    re[i2] = t9r + t11i;
    im[i2] = t9i - t11r;
    re[i3] = t9r - t11i;
    im[i3] = t9i + t11r;
    re[i4] = t8r - t10i;
    im[i4] = t8i + t10r;
}

/// Multiply slot `idx` by `c_r + i·c_i`.
pub fn mx_rot(re: &mut [f64], im: &mut [f64], idx: usize, c_r: f64, c_i: f64) {
    let (r, i) = (re[idx], im[idx]);
    re[idx] = r * c_r - i * c_i;
    im[idx] = r * c_i + i * c_r;
}

pub fn mx_swap(re: &mut [f64], im: &mut [f64], a: usize, b: usize) {
    re.swap(a, b);
    im.swap(a, b);
}

/// Shift values backwards along `idxes`: slot `idxes[j]` receives the value
/// of `idxes[j + 1]` and the last slot receives the first value.
pub fn mx_cshft(re: &mut [f64], im: &mut [f64], idxes: &[usize]) {
    let Some((&first, rest)) = idxes.split_first() else { return };
    let (r0, i0) = (re[first], im[first]);
    let mut cur = first;
    for &next in rest {
        re[cur] = re[next];
        im[cur] = im[next];
        cur = next;
    }
    re[cur] = r0;
    im[cur] = i0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tr2() {
        let mut re = [1.0, 2.0];
        let mut im = [0.5, -1.0];
        mx_tr2(&mut re, &mut im, 0, 1);
        assert_eq!(re, [3.0, -1.0]);
        assert_eq!(im, [-0.5, 1.5]);
    }

    #[test]
    fn test_tr4_impulse_is_flat() {
        let mut re = [0.0, 1.0, 0.0, 0.0];
        let mut im = [0.0; 4];
        mx_tr4(&mut re, &mut im, 0, 1, 2, 3);
        // e^{-iπk/2} for k = 0..4
        assert_eq!(re, [1.0, 0.0, -1.0, 0.0]);
        assert_eq!(im, [0.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rot_quarter() {
        let mut re = [2.0];
        let mut im = [3.0];
        mx_rot(&mut re, &mut im, 0, 0.0, 1.0);
        assert_eq!((re[0], im[0]), (-3.0, 2.0));
    }

    #[test]
    fn test_cshft_follows_index_order() {
        let mut re = [10.0, 11.0, 12.0, 13.0, 14.0];
        let mut im = [0.0, 1.0, 2.0, 3.0, 4.0];
        mx_cshft(&mut re, &mut im, &[0, 3, 1]);
        assert_eq!(re, [13.0, 10.0, 12.0, 11.0, 14.0]);
        assert_eq!(im, [3.0, 0.0, 2.0, 1.0, 4.0]);
    }

    #[test]
    fn test_swap() {
        let mut re = [1.0, 2.0, 3.0];
        let mut im = [4.0, 5.0, 6.0];
        mx_swap(&mut re, &mut im, 0, 2);
        assert_eq!(re, [3.0, 2.0, 1.0]);
        assert_eq!(im, [6.0, 5.0, 4.0]);
    }
}
