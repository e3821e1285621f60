//! Gradient scoring and the priority queue over unexplored exits.
//!
//! `update_sample` folds one base/delta sample pair's reservoirs into
//! `gradient_score_sum`; `update_queue` rebuilds the priority queue from
//! current reservoirs; `pop_queue_target` dispenses the next target.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::state::GlobalState;
use crate::tree::BranchTree;
use crate::GRADIENT_REWARD;

/// One candidate in the scheduler's queue. Smaller `cost` is higher
/// priority; ties break on smaller `gradient_score`.
#[derive(Debug, Clone, Copy)]
pub struct PriorityEntry {
    pub node_id: i32,
    pub similarity: i32,
    pub constraint_nb: i32,
    pub gradient_score: f64,
    pub seed_id: i32,
}

impl PriorityEntry {
    fn cost(&self) -> i32 {
        self.constraint_nb * (self.constraint_nb - self.similarity)
    }
}

impl PartialEq for PriorityEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriorityEntry {}

impl PartialOrd for PriorityEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `BinaryHeap` is a max-heap, so this is inverted: the entry that should be
/// popped *first* (smaller cost, then smaller gradient_score) compares as
/// *greater*.
impl Ord for PriorityEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.cost().cmp(&self.cost()) {
            Ordering::Equal => other.gradient_score.total_cmp(&self.gradient_score),
            ordering => ordering,
        }
    }
}

/// Folds the just-finished sample's base/delta reservoirs into
/// `gradient_score_sum`. Invoked by `finish_sample` in non-self modes.
pub fn update_sample(state: &mut GlobalState) {
    let nodes: Vec<i32> = state.unexplored.iter().copied().collect();
    for exit in nodes {
        let empty = std::collections::BTreeMap::new();
        let base = state.base_r.get(&exit).unwrap_or(&empty);
        let delta = state.delta_r.get(&exit).unwrap_or(&empty);
        let b = base.len();
        let d = delta.len();

        if b <= 1 {
            continue;
        }
        if b > d {
            continue;
        }
        if b < d {
            *state.gradient_score_sum.entry(exit).or_insert(0.0) += GRADIENT_REWARD;
            continue;
        }

        let Some(&br) = base.get(&(b as i32)) else { continue };
        let Some(&dr) = delta.get(&(d as i32)) else { continue };
        if br <= 0.0 || dr <= 0.0 {
            continue;
        }
        let k = br / (br - dr);
        if k.is_nan() || k.is_infinite() {
            continue;
        }

        let mut ratio_max = f64::NEG_INFINITY;
        let mut accepted = false;
        let mut viable = true;
        for j in 1..b as i32 {
            let base_rj = base.get(&j).copied().unwrap_or(0.0);
            let delta_rj = delta.get(&j).copied().unwrap_or(0.0);
            if !(base_rj <= 0.0 && delta_rj <= 0.0) {
                viable = false;
                break;
            }
            let ratio_j = (base_rj - delta_rj) / base_rj;
            let ratio = ratio_j * k;
            if ratio.is_nan() || ratio.is_infinite() {
                viable = false;
                break;
            }
            ratio_max = ratio_max.max(ratio);
            accepted = true;
        }

        if viable && accepted && ratio_max < 1.0 {
            *state.gradient_score_sum.entry(exit).or_insert(0.0) += 1.0 - ratio_max;
        }
    }
}

/// Rebuilds the priority queue from the current reservoirs and scores.
pub fn update_queue(tree: &BranchTree, state: &GlobalState, queue: &mut BinaryHeap<PriorityEntry>) {
    for &exit in &state.unexplored {
        let similarity = state.base_r.get(&exit).map_or(-1, |r| r.len() as i32 - 1);
        queue.push(PriorityEntry {
            node_id: exit,
            similarity,
            constraint_nb: tree.depth(exit) as i32,
            gradient_score: state.gradient_score_sum.get(&exit).copied().unwrap_or(0.0),
            seed_id: state.seed_id_base,
        });
    }
}

/// Pops entries until one still in `unexplored` is found. Sets `target` and
/// resets the per-target scratch. Returns `(-1, -1)` when the queue empties.
pub fn pop_queue_target(state: &mut GlobalState, queue: &mut BinaryHeap<PriorityEntry>) -> (i32, i32) {
    while let Some(entry) = queue.pop() {
        if state.unexplored.contains(&entry.node_id) {
            state.target = entry.node_id;
            state.conds_satisfied_max_seed = 0;
            state.conds_satisfied_max_sample = 0;
            return (entry.node_id, entry.seed_id);
        }
    }
    (-1, -1)
}
