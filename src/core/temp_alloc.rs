//! Temporary variable allocation.
//!
//! This module implements the TempAllocator that hands out the scalar temporaries
//! used by the emitted kernel body. Names are recycled through a FIFO free list so
//! that kernels stay within a small, stable set of locals; fresh names are issued
//! sequentially (`t0`, `t1`, ...) only when nothing can be reused.

use super::error::{CompileError, CompileResult};
use super::opcode::Symbol;
use hashbrown::HashSet;
use std::collections::VecDeque;

/// Allocator for recyclable temporaries.
///
/// A temporary is in exactly one of the in-use set or the free list at a time.
/// Whether a released name is still referenced by later instructions is not
/// checked here; see [`crate::core::analyzer::LifetimeChecker`].
#[derive(Debug, Default)]
pub struct TempAllocator {
    /// Next never-issued id.
    next_id: u32,
    /// Released ids, reused oldest first.
    free: VecDeque<u32>,
    /// Ids currently handed out.
    in_use: HashSet<u32>,
    /// Largest number of simultaneously live temporaries.
    peak: usize,
}

impl TempAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a temporary, preferring the oldest released name.
    pub fn allocate(&mut self) -> Symbol {
        let id = match self.free.pop_front() {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };
        self.in_use.insert(id);
        self.peak = self.peak.max(self.in_use.len());
        Symbol::Temp(id)
    }

    /// Return a temporary to the free list.
    pub fn release(&mut self, sym: Symbol) -> CompileResult<()> {
        let Some(id) = sym.temp_id() else {
            return Err(CompileError::AllocatorInvariantViolation {
                reason: format!("{:?} is an I/O slot, not a temporary", sym),
            });
        };

        if !self.in_use.remove(&id) {
            return Err(CompileError::AllocatorInvariantViolation {
                reason: format!("t{} released while not in use", id),
            });
        }

        self.free.push_back(id);
        Ok(())
    }

    /// Whether `sym` is a temporary currently handed out.
    pub fn is_allocated(&self, sym: Symbol) -> bool {
        sym.temp_id().is_some_and(|id| self.in_use.contains(&id))
    }

    /// Number of temporaries currently handed out.
    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }

    /// Number of distinct names ever issued.
    pub fn issued_count(&self) -> usize {
        self.next_id as usize
    }

    /// Largest number of simultaneously live temporaries.
    pub fn peak(&self) -> usize {
        self.peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_fresh_names() {
        let mut temps = TempAllocator::new();
        assert_eq!(temps.allocate(), Symbol::Temp(0));
        assert_eq!(temps.allocate(), Symbol::Temp(1));
        assert_eq!(temps.allocate(), Symbol::Temp(2));
        assert_eq!(temps.in_use_count(), 3);
    }

    #[test]
    fn test_fifo_reuse() {
        let mut temps = TempAllocator::new();
        let a = temps.allocate();
        let b = temps.allocate();
        let c = temps.allocate();

        temps.release(b).unwrap();
        temps.release(a).unwrap();

        // Oldest release comes back first.
        assert_eq!(temps.allocate(), b);
        assert_eq!(temps.allocate(), a);
        assert_eq!(temps.allocate(), Symbol::Temp(3));
        assert!(temps.is_allocated(c));
        assert_eq!(temps.issued_count(), 4);
        assert_eq!(temps.peak(), 4);
    }

    #[test]
    fn test_double_release_is_violation() {
        let mut temps = TempAllocator::new();
        let a = temps.allocate();
        temps.release(a).unwrap();

        let err = temps.release(a).unwrap_err();
        assert!(matches!(err, CompileError::AllocatorInvariantViolation { .. }));
    }

    #[test]
    fn test_release_of_io_slot_is_violation() {
        let mut temps = TempAllocator::new();
        assert!(temps.release(Symbol::Output(0)).is_err());
        assert!(temps.release(Symbol::Temp(9)).is_err());
    }
}
