//! Iterative backtracking fill of the unpinned cells of one zone.

use rand_chacha::ChaCha8Rng;

use super::connectivity::has_dead_end;
use super::zone::{Orientation, ZoneWork};
use crate::types::Pos;

/// An attempt restarts after this many backtracks per zone cell.
pub(super) const RESTART_STEPS_PER_CELL: u64 = 8;

/// Backtrack steps shared by every attempt on one zone.
#[derive(Clone, Copy, Debug)]
pub(super) struct StepBudget {
    pub(super) spent: u64,
    pub(super) limit: u64,
}

impl StepBudget {
    pub(super) fn new(limit: u64) -> Self {
        Self { spent: 0, limit }
    }

    /// Charges one step; false once the budget is overdrawn.
    pub(super) fn charge(&mut self) -> bool {
        self.spent += 1;
        self.spent <= self.limit
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum FillOutcome {
    Complete,
    /// The attempt should start over with fresh draws.
    Restart { cell: Option<Pos> },
    Exhausted { cell: Option<Pos> },
}

enum Frame {
    /// Already covered by a large room placed at an earlier cell.
    Covered,
    Open { cell: Pos, candidates: Vec<Orientation>, next: usize, placed: bool },
}

pub(super) fn fill(
    work: &mut ZoneWork<'_>,
    rng: &mut ChaCha8Rng,
    budget: &mut StepBudget,
) -> FillOutcome {
    let cells: Vec<Pos> =
        work.band.cells.iter().copied().filter(|pos| !work.occupied.contains_key(pos)).collect();
    let pool = work.normal_pool.clone();
    let restart_after = RESTART_STEPS_PER_CELL * work.band.cells.len() as u64;
    let mut attempt_steps = 0_u64;
    let mut frames: Vec<Frame> = Vec::with_capacity(cells.len());

    'descend: loop {
        if frames.len() == cells.len() {
            if has_dead_end(work) {
                let cell = cells.last().copied();
                if !budget.charge() {
                    return FillOutcome::Exhausted { cell };
                }
                return FillOutcome::Restart { cell };
            }
            return FillOutcome::Complete;
        }

        let cell = cells[frames.len()];
        if work.occupied.contains_key(&cell) {
            frames.push(Frame::Covered);
            continue;
        }
        let candidates = work.ordered_candidates(cell, &pool, rng);
        frames.push(Frame::Open { cell, candidates, next: 0, placed: false });

        loop {
            let Some(Frame::Open { cell, candidates, next, placed }) = frames.last_mut() else {
                return FillOutcome::Restart { cell: None };
            };
            if advance(work, *cell, candidates, next) {
                *placed = true;
                continue 'descend;
            }

            let stuck = Some(*cell);
            frames.pop();
            attempt_steps += 1;
            if !budget.charge() {
                return FillOutcome::Exhausted { cell: stuck };
            }
            if attempt_steps >= restart_after {
                return FillOutcome::Restart { cell: stuck };
            }

            while matches!(frames.last(), Some(Frame::Covered)) {
                frames.pop();
            }
            match frames.last_mut() {
                None => return FillOutcome::Restart { cell: stuck },
                Some(Frame::Open { placed, .. }) => {
                    if *placed {
                        work.unplace_last();
                        *placed = false;
                    }
                }
                Some(Frame::Covered) => {}
            }
        }
    }
}

/// Places the next candidate that fits and leaves no dead end.
fn advance(
    work: &mut ZoneWork<'_>,
    cell: Pos,
    candidates: &[Orientation],
    next: &mut usize,
) -> bool {
    while let Some(&orientation) = candidates.get(*next) {
        *next += 1;
        let footprint = work.footprint(cell, orientation);
        if !work.fits(&footprint) {
            continue;
        }
        work.place(orientation, footprint);
        if !has_dead_end(work) {
            return true;
        }
        work.unplace_last();
    }
    false
}
