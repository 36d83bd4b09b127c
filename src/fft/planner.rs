// This module implements the recursive mixed-radix (Cooley-Tukey) planner that turns an
// N-point DFT into base-case butterflies, twiddle rotations and address relabelings.
// RadixFactorization fixes the decomposition tree up front: for a composite size the
// split radix N2 is the first of 5, 4, 3, 2 that divides N and N1 = N / N2 is refined
// recursively, so every 5-smooth N has exactly one canonical tree and any other size
// is rejected before a single instruction is emitted. RadixPlanner walks that tree
// against an FftBackend, the seam between planning and emission: the inline backend
// expands butterflies and rotations into scalar arithmetic while the subroutine backend
// records calls into the base-operation library. The output reorder of every split is
// never materialized as data movement; it is applied to the logical-to-physical address
// map by rotating the addresses along the cycles of the reorder permutation, and the
// final map is handed back to the caller as a Permutation.

//! Mixed-radix decomposition and address bookkeeping.

use super::rotation::RationalAngle;
use crate::core::{CompileError, CompileResult, Radix};
use std::fmt;

/// Canonical decomposition tree of an N-point DFT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadixFactorization {
    /// One point; the transform is the identity.
    Unit,
    /// A base-case butterfly.
    Base(Radix),
    /// `n = n1.size() · n2.size()`, with `n2` the inner radix.
    Split {
        n: usize,
        n1: Box<RadixFactorization>,
        n2: Radix,
    },
}

impl RadixFactorization {
    /// Factorize `n`, failing with [`CompileError::BadRadix`] unless it is 5-smooth.
    pub fn new(n: usize) -> CompileResult<Self> {
        if n == 0 {
            return Err(CompileError::BadRadix { size: 0 });
        }
        if n == 1 {
            return Ok(RadixFactorization::Unit);
        }
        if let Some(radix) = Radix::from_size(n) {
            return Ok(RadixFactorization::Base(radix));
        }

        let n2 = Radix::PRIORITY
            .into_iter()
            .find(|radix| n % radix.size() == 0)
            .ok_or(CompileError::BadRadix { size: n })?;
        let n1 = RadixFactorization::new(n / n2.size())?;
        Ok(RadixFactorization::Split { n, n1: Box::new(n1), n2 })
    }

    /// Transform size.
    pub fn size(&self) -> usize {
        match self {
            RadixFactorization::Unit => 1,
            RadixFactorization::Base(radix) => radix.size(),
            RadixFactorization::Split { n, .. } => *n,
        }
    }

    /// Radices from the outermost split inwards.
    pub fn radices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut node = self;
        loop {
            match node {
                RadixFactorization::Unit => break,
                RadixFactorization::Base(radix) => {
                    out.push(radix.size());
                    break;
                }
                RadixFactorization::Split { n1, n2, .. } => {
                    out.push(n2.size());
                    node = n1;
                }
            }
        }
        out
    }
}

impl fmt::Display for RadixFactorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let radices = self.radices();
        if radices.is_empty() {
            return f.write_str("1");
        }
        let parts: Vec<String> = radices.iter().map(|r| r.to_string()).collect();
        f.write_str(&parts.join(" x "))
    }
}

/// Logical index to physical slot map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    map: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self { map: (0..n).collect() }
    }

    /// Wrap `map`, which must be a bijection on `0..map.len()`.
    pub fn from_vec(map: Vec<usize>) -> Self {
        debug_assert!({
            let mut seen = vec![false; map.len()];
            map.iter().all(|&i| i < seen.len() && !std::mem::replace(&mut seen[i], true))
        });
        Self { map }
    }

    /// Rebuild a permutation from its cycles: each element maps to its successor.
    pub fn from_cycles(n: usize, cycles: &[Vec<usize>]) -> Self {
        let mut map: Vec<usize> = (0..n).collect();
        for cycle in cycles {
            for (j, &from) in cycle.iter().enumerate() {
                map[from] = cycle[(j + 1) % cycle.len()];
            }
        }
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, i: usize) -> usize {
        self.map[i]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.map
    }

    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(i, &j)| i == j)
    }

    /// Disjoint cycles `[i, map[i], map[map[i]], ...]`, singletons included,
    /// ordered by their smallest element.
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.map.len()];
        let mut cycles = Vec::new();
        for start in 0..self.map.len() {
            if visited[start] {
                continue;
            }
            let mut cycle = vec![start];
            visited[start] = true;
            let mut cur = self.map[start];
            while cur != start {
                visited[cur] = true;
                cycle.push(cur);
                cur = self.map[cur];
            }
            cycles.push(cycle);
        }
        cycles
    }
}

/// Emission hooks driven by [`RadixPlanner`].
///
/// Slots are physical addresses into the transform's data.
pub trait FftBackend {
    /// In-place base-case DFT over `slots`.
    fn butterfly(&mut self, radix: Radix, slots: &[usize]) -> CompileResult<()>;

    /// Multiply slot `slot` by `e^{i·angle}`.
    fn twiddle(&mut self, slot: usize, angle: RationalAngle) -> CompileResult<()>;
}

/// Recursive Cooley-Tukey composition over a backend.
pub struct RadixPlanner<'b, B: FftBackend> {
    backend: &'b mut B,
    addresses: Vec<usize>,
}

impl<'b, B: FftBackend> RadixPlanner<'b, B> {
    pub fn new(backend: &'b mut B, n: usize) -> Self {
        Self { backend, addresses: (0..n).collect() }
    }

    /// Plan an `n`-point transform and return where each output bin ends up.
    pub fn plan(backend: &'b mut B, n: usize) -> CompileResult<Permutation> {
        let factorization = RadixFactorization::new(n)?;
        log::debug!("planning {}-point transform as {}", n, factorization);

        let mut planner = Self::new(backend, n);
        let indices: Vec<usize> = (0..n).collect();
        planner.compose(&factorization, &indices)?;
        Ok(Permutation::from_vec(planner.addresses))
    }

    /// Transform the logical positions `indices` in place.
    ///
    /// Afterwards bin `k` of that sub-transform lives at
    /// `addresses[indices[k]]`.
    pub fn compose(&mut self, node: &RadixFactorization, indices: &[usize]) -> CompileResult<()> {
        match node {
            RadixFactorization::Unit => Ok(()),
            RadixFactorization::Base(radix) => {
                let slots: Vec<usize> = indices.iter().map(|&i| self.addresses[i]).collect();
                self.backend.butterfly(*radix, &slots)
            }
            RadixFactorization::Split { n, n1, n2 } => {
                let n = *n;
                let r2 = n2.size();
                let r1 = n / r2;
                log::trace!("split {} = {} x {}", n, r1, r2);

                let inner = RadixFactorization::Base(*n2);
                for i1 in 0..r1 {
                    let group: Vec<usize> = (0..r2).map(|i2| indices[r1 * i2 + i1]).collect();
                    self.compose(&inner, &group)?;
                    for (i2, &logical) in group.iter().enumerate() {
                        let angle = RationalAngle::new(-2 * (i1 * i2) as i64, n as i64);
                        self.backend.twiddle(self.addresses[logical], angle)?;
                    }
                }

                for i2 in 0..r2 {
                    let group: Vec<usize> = (0..r1).map(|i1| indices[r1 * i2 + i1]).collect();
                    self.compose(n1, &group)?;
                }

                // Output m = r2·i1 + i2 sits at logical position r1·i2 + i1.
                let reorder = Permutation::from_vec((0..n).map(|m| r1 * (m % r2) + m / r2).collect());
                for cycle in reorder.cycles() {
                    if cycle.len() < 2 {
                        continue;
                    }
                    let first = self.addresses[indices[cycle[0]]];
                    for pair in cycle.windows(2) {
                        self.addresses[indices[pair[0]]] = self.addresses[indices[pair[1]]];
                    }
                    self.addresses[indices[cycle[cycle.len() - 1]]] = first;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what the planner asks for.
    #[derive(Default)]
    struct Recorder {
        butterflies: Vec<(Radix, Vec<usize>)>,
        twiddles: Vec<(usize, RationalAngle)>,
    }

    impl FftBackend for Recorder {
        fn butterfly(&mut self, radix: Radix, slots: &[usize]) -> CompileResult<()> {
            self.butterflies.push((radix, slots.to_vec()));
            Ok(())
        }

        fn twiddle(&mut self, slot: usize, angle: RationalAngle) -> CompileResult<()> {
            self.twiddles.push((slot, angle));
            Ok(())
        }
    }

    #[test]
    fn test_factorization_priority() {
        assert_eq!(RadixFactorization::new(60).unwrap().radices(), vec![5, 4, 3]);
        assert_eq!(RadixFactorization::new(16).unwrap().radices(), vec![4, 4]);
        assert_eq!(RadixFactorization::new(8).unwrap().radices(), vec![4, 2]);
        assert_eq!(RadixFactorization::new(1).unwrap(), RadixFactorization::Unit);
        assert_eq!(RadixFactorization::new(24).unwrap().to_string(), "4 x 3 x 2");
    }

    #[test]
    fn test_factorization_rejects_non_smooth() {
        for n in [0, 7, 14, 11, 49] {
            assert!(matches!(RadixFactorization::new(n), Err(CompileError::BadRadix { .. })));
        }
        assert!(matches!(RadixFactorization::new(14), Err(CompileError::BadRadix { size: 7 })));
    }

    #[test]
    fn test_cycles_round_trip() {
        let perm = Permutation::from_vec(vec![2, 0, 1, 3, 5, 4]);
        let cycles = perm.cycles();
        assert_eq!(cycles, vec![vec![0, 2, 1], vec![3], vec![4, 5]]);
        assert_eq!(Permutation::from_cycles(6, &cycles), perm);
    }

    #[test]
    fn test_base_case_has_identity_addresses() {
        let mut rec = Recorder::default();
        let perm = RadixPlanner::plan(&mut rec, 4).unwrap();
        assert!(perm.is_identity());
        assert_eq!(rec.butterflies, vec![(Radix::Four, vec![0, 1, 2, 3])]);
        assert!(rec.twiddles.is_empty());
    }

    #[test]
    fn test_split_six() {
        let mut rec = Recorder::default();
        let perm = RadixPlanner::plan(&mut rec, 6).unwrap();

        // N2 = 3 over stride 2, then N1 = 2 over contiguous pairs.
        assert_eq!(rec.butterflies[0], (Radix::Three, vec![0, 2, 4]));
        assert_eq!(rec.butterflies[1], (Radix::Three, vec![1, 3, 5]));
        assert_eq!(rec.butterflies[2], (Radix::Two, vec![0, 1]));
        assert_eq!(rec.butterflies[3], (Radix::Two, vec![2, 3]));
        assert_eq!(rec.butterflies[4], (Radix::Two, vec![4, 5]));

        // Twiddle for n1 = 1, n2 = 2 is e^{-i·4π/6}.
        assert_eq!(rec.twiddles[5], (5, RationalAngle::new(-4, 6)));

        // Bin k = 2·n1 + n2 is at slot 2·n2 + n1.
        assert_eq!(perm.as_slice(), &[0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let mut a = Recorder::default();
        let mut b = Recorder::default();
        let pa = RadixPlanner::plan(&mut a, 120).unwrap();
        let pb = RadixPlanner::plan(&mut b, 120).unwrap();
        assert_eq!(pa, pb);
        assert_eq!(a.butterflies, b.butterflies);
        assert_eq!(a.twiddles, b.twiddles);
    }
}
