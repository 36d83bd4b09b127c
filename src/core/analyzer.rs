// This module implements the analyses that run over a finished opcode stream. Both are
// built on one def/use resolution: walking the stream in program order, every input
// symbol of an op resolves to the most recent prior op that wrote it (symbols with no
// prior writer are external inputs). DeadCodeEliminator turns that resolution into a
// dependency graph whose per-op edge lists live in the session arena, seeds a worklist
// with every op that is neither mandatory nor depended upon, and prunes transitively by
// decrementing in-degrees, the incremental form of a backward reachability sweep from the
// mandatory set. LifetimeChecker replays the same resolution against the allocation
// intervals the session recorded for every temporary and rejects any read whose writer
// belongs to a different (earlier, already released) owner of the same name, which is
// exactly the situation in which pruning based on that graph would become unsound.

//! Def/use analyses: dead-code elimination and temporary lifetime checking.

use super::error::{CompileError, CompileResult};
use super::opcode::{Instruction, Symbol};
use super::session::TempLifetime;
use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use hashbrown::HashMap;
use std::collections::VecDeque;

/// Walk `insts` in program order, reporting every input of every unpruned op
/// together with the index of its most recent writer.
fn resolve_inputs(insts: &[Instruction], mut visit: impl FnMut(usize, Symbol, Option<usize>)) {
    let mut last_writer: HashMap<Symbol, usize> = HashMap::new();
    for (idx, inst) in insts.iter().enumerate() {
        let Instruction::Op(op) = inst else { continue };
        if op.pruned {
            continue;
        }
        for sym in &op.inputs {
            visit(idx, *sym, last_writer.get(sym).copied());
        }
        for sym in &op.outputs {
            last_writer.insert(*sym, idx);
        }
    }
}

/// Dependency edges of an opcode stream.
///
/// `deps(i)` lists, without duplicates, the ops whose results op `i` reads.
pub struct DefUseGraph<'arena> {
    deps: BumpVec<'arena, &'arena [usize]>,
}

impl<'arena> DefUseGraph<'arena> {
    /// Build the graph, allocating edge lists in `arena`.
    pub fn build(arena: &'arena Bump, insts: &[Instruction]) -> Self {
        let mut per_inst: Vec<Vec<usize>> = vec![Vec::new(); insts.len()];
        resolve_inputs(insts, |idx, _sym, writer| {
            if let Some(writer) = writer {
                let list = &mut per_inst[idx];
                if !list.contains(&writer) {
                    list.push(writer);
                }
            }
        });

        let mut deps = BumpVec::with_capacity_in(insts.len(), arena);
        for list in &per_inst {
            let slice: &'arena [usize] = arena.alloc_slice_copy(list);
            deps.push(slice);
        }
        Self { deps }
    }

    /// Ops that op `idx` depends on.
    pub fn deps(&self, idx: usize) -> &'arena [usize] {
        self.deps[idx]
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}

/// Prunes ops that no mandatory op transitively depends on.
pub struct DeadCodeEliminator<'arena> {
    arena: &'arena Bump,
}

impl<'arena> DeadCodeEliminator<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self { arena }
    }

    /// Mark dead ops as pruned and return how many were pruned.
    ///
    /// Comments and already pruned ops are left alone, so running the pass
    /// again on its own output prunes nothing.
    pub fn run(&self, insts: &mut [Instruction]) -> usize {
        let graph = DefUseGraph::build(self.arena, insts);

        let mut in_degree = vec![0u32; insts.len()];
        for (idx, inst) in insts.iter().enumerate() {
            let Instruction::Op(op) = inst else { continue };
            if op.pruned {
                continue;
            }
            if op.mandatory {
                in_degree[idx] += 1;
            }
            for &dep in graph.deps(idx) {
                in_degree[dep] += 1;
            }
        }

        let mut queue: VecDeque<usize> = insts
            .iter()
            .enumerate()
            .filter(|(idx, inst)| matches!(inst, Instruction::Op(op) if !op.pruned && in_degree[*idx] == 0))
            .map(|(idx, _)| idx)
            .collect();

        let mut pruned = 0;
        while let Some(idx) = queue.pop_front() {
            if let Instruction::Op(op) = &mut insts[idx] {
                op.pruned = true;
                pruned += 1;
            }
            for &dep in graph.deps(idx) {
                in_degree[dep] -= 1;
                if in_degree[dep] == 0 {
                    queue.push_back(dep);
                }
            }
        }

        log::debug!("dead-code elimination pruned {} of {} instructions", pruned, insts.len());
        pruned
    }
}

/// Verifies that temporaries are never reused while still referenced.
pub struct LifetimeChecker<'a> {
    intervals: HashMap<u32, Vec<&'a TempLifetime>>,
}

impl<'a> LifetimeChecker<'a> {
    pub fn new(lifetimes: &'a [TempLifetime]) -> Self {
        let mut intervals: HashMap<u32, Vec<&'a TempLifetime>> = HashMap::new();
        for lifetime in lifetimes {
            intervals.entry(lifetime.temp).or_default().push(lifetime);
        }
        Self { intervals }
    }

    fn interval_at(&self, temp: u32, pos: usize) -> Option<&'a TempLifetime> {
        self.intervals
            .get(&temp)
            .and_then(|list| list.iter().copied().find(|lifetime| lifetime.contains(pos)))
    }

    /// Check every temporary read and write of `insts`.
    pub fn check(&self, insts: &[Instruction]) -> CompileResult<()> {
        for (idx, inst) in insts.iter().enumerate() {
            let Instruction::Op(op) = inst else { continue };
            for sym in &op.outputs {
                if let Some(temp) = sym.temp_id() {
                    if self.interval_at(temp, idx).is_none() {
                        return Err(CompileError::AllocatorInvariantViolation {
                            reason: format!("t{} written at instruction {} while not allocated", temp, idx),
                        });
                    }
                }
            }
        }

        let mut violation = None;
        resolve_inputs(insts, |idx, sym, writer| {
            if violation.is_some() {
                return;
            }
            let Some(temp) = sym.temp_id() else { return };
            let Some(writer) = writer else {
                violation = Some(format!("t{} read at instruction {} before any write", temp, idx));
                return;
            };
            match self.interval_at(temp, writer) {
                Some(lifetime) if lifetime.contains(idx) => {}
                Some(lifetime) => {
                    violation = Some(format!(
                        "t{} read at instruction {} after its owner released it at {}",
                        temp,
                        idx,
                        lifetime.closed_at.unwrap_or(idx)
                    ));
                }
                None => {
                    violation = Some(format!("t{} written at instruction {} while not allocated", temp, writer));
                }
            }
        });

        match violation {
            Some(reason) => Err(CompileError::AllocatorInvariantViolation { reason }),
            None => Ok(()),
        }
    }
}
