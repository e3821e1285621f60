//! The instrumentation hook: one call per comparison executed by the target.
//!
//! This is the hottest path in the runtime (the source budget gives it more
//! than a third of the whole core). It never allocates beyond the map
//! entries genuinely introduced by new coverage, and it never returns an
//! error — malformed input degrades to a logged no-op rather than a panic.

use std::collections::BTreeMap;

use crate::state::GlobalState;
use crate::tree::BranchTree;
use crate::{predicate, INITIAL_R};

/// Runs one instrumentation event through self-mode or base/delta-mode
/// bookkeeping, depending on the phase recorded in `state`.
///
/// `is_int` is accepted for signature parity with the instrumentation
/// contract but unused: both integer and floating operands arrive already
/// promoted to `f64`.
pub fn pen(tree: &BranchTree, state: &mut GlobalState, lhs: f64, rhs: f64, br_id: i32, cmp_id: i32, _is_int: bool) {
    if br_id < 0 || br_id >= tree.br_count() {
        log::warn!("pen: br_id {br_id} out of range 0..{} (clamped to no-op)", tree.br_count());
        return;
    }

    let current_truth = predicate::truth(lhs, rhs, cmp_id);
    let current = if current_truth { br_id } else { br_id + tree.br_count() };
    let target_truth = state.target < tree.br_count();

    if state.explored.insert(current) {
        state.unexplored.remove(&current);
        state.seed_of_exit.insert(current, state.efc_seed_count);
        state.is_efc = true;
    }

    if state.self_mode {
        self_mode(tree, state, lhs, rhs, cmp_id, current, current_truth, target_truth);
    } else {
        let nodes: Vec<i32> = state.unexplored.iter().copied().collect();
        for exit in nodes {
            handle(tree, state, lhs, rhs, cmp_id, exit, current, current_truth);
        }
    }
}

fn self_mode(
    tree: &BranchTree,
    state: &mut GlobalState,
    lhs: f64,
    rhs: f64,
    cmp_id: i32,
    current: i32,
    current_truth: bool,
    target_truth: bool,
) {
    if let Some(i) = tree.prefix_position(state.target, current) {
        let k = i as i32 + 1;
        if k > state.conds_satisfied_max_sample {
            state.conds_satisfied_max_sample = k;
            state.r = if k == tree.depth(state.target) as i32 { 0.0 } else { INITIAL_R };
        }
        return;
    }

    let reverse = tree.reverse(current);
    if let Some(i) = tree.prefix_position(state.target, reverse) {
        let k = i as i32 + 1;
        if k > state.conds_satisfied_max_sample {
            let d = predicate::distance(lhs, rhs, cmp_id, current_truth, target_truth, true);
            state.r = state.r.min(d);
        }
    }
}

/// Shared bookkeeping for `handle_base`/`handle_delta`: which reservoir gets
/// written depends only on `state.base_phase`, so both dispatch here rather
/// than duplicating the prefix-tracking logic.
fn handle(tree: &BranchTree, state: &mut GlobalState, lhs: f64, rhs: f64, cmp_id: i32, exit: i32, current: i32, current_truth: bool) {
    if let Some(i) = tree.prefix_position(exit, current) {
        let k = i as i32 + 1;
        state.temporary_start_for_unexplored.entry(exit).or_insert(1);

        let max_sample = state.conds_satisfied_max_sample_for_unexplored.entry(exit).or_insert(0);
        if k > *max_sample {
            *max_sample = k;

            let d = predicate::distance(lhs, rhs, cmp_id, current_truth, current_truth, false);
            let last = state.conds_satisfied_last.entry(exit).or_insert(0);
            if k > *last {
                *last = k;
            } else {
                let start = state.temporary_start_for_unexplored.entry(exit).or_insert(1);
                *start = (*start).min(k);
                *last = k;
            }
            state.temporary_r_for_unexplored.entry(exit).or_default().insert(k, d);
        }
        return;
    }

    let reverse = tree.reverse(current);
    let Some(i) = tree.prefix_position(exit, reverse) else { return };
    let k = i as i32 + 1;

    let max_sample = state.conds_satisfied_max_sample_for_unexplored.get(&exit).copied().unwrap_or(0);
    if k <= max_sample {
        return;
    }

    let target_truth = reverse < tree.br_count();
    let d = predicate::distance(lhs, rhs, cmp_id, current_truth, target_truth, false);

    let reservoir: &mut BTreeMap<i32, f64> = if state.base_phase {
        state.base_r.entry(exit).or_default()
    } else {
        state.delta_r.entry(exit).or_default()
    };

    let improved = match reservoir.get(&k) {
        None => {
            reservoir.insert(k, d);
            true
        }
        Some(&existing) => {
            if d < existing {
                reservoir.insert(k, d);
                true
            } else {
                false
            }
        }
    };

    if improved {
        let start = state.temporary_start_for_unexplored.get(&exit).copied().unwrap_or(1);
        if let Some(scratch) = state.temporary_r_for_unexplored.get(&exit) {
            let carry: Vec<(i32, f64)> = scratch.range(start..k).map(|(&j, &v)| (j, v)).collect();
            let reservoir = if state.base_phase {
                state.base_r.entry(exit).or_default()
            } else {
                state.delta_r.entry(exit).or_default()
            };
            for (j, v) in carry {
                reservoir.insert(j, v);
            }
        }
        state.temporary_start_for_unexplored.insert(exit, k);
    }
}
