//! Process-wide run state: coverage sets, gradient reservoirs, per-sample
//! scratch, and the phase-transition state machine that drives them.
//!
//! Everything here is mutated exclusively by [`crate::hook::pen`] and the
//! phase-transition methods below; there is no locking because the contract
//! (see the crate-level docs) guarantees a single thread drives both.

use std::collections::{HashMap, HashSet};

use crate::INITIAL_R;

type Reservoir = HashMap<i32, std::collections::BTreeMap<i32, f64>>;

/// All mutable state for one `initialize_runtime`..process-exit lifetime.
pub struct GlobalState {
    pub explored: HashSet<i32>,
    pub unexplored: HashSet<i32>,
    pub seed_of_exit: HashMap<i32, i32>,
    pub gradient_score_sum: HashMap<i32, f64>,
    pub base_r: Reservoir,
    pub delta_r: Reservoir,

    pub conds_satisfied_max_sample: i32,
    pub conds_satisfied_max_sample_for_unexplored: HashMap<i32, i32>,
    pub temporary_r_for_unexplored: Reservoir,
    pub temporary_start_for_unexplored: HashMap<i32, i32>,
    pub conds_satisfied_last: HashMap<i32, i32>,

    pub target: i32,
    pub r: f64,
    pub self_mode: bool,
    pub base_phase: bool,
    pub seed_id_base: i32,
    pub efc_seed_count: i32,
    pub is_efc: bool,
    pub conds_satisfied_max_seed: i32,
}

impl GlobalState {
    /// `exit_count` is `2 * brCount`; every exit starts unexplored.
    #[must_use]
    pub fn new(exit_count: usize) -> Self {
        Self {
            explored: HashSet::new(),
            unexplored: (0..exit_count as i32).collect(),
            seed_of_exit: HashMap::new(),
            gradient_score_sum: HashMap::new(),
            base_r: HashMap::new(),
            delta_r: HashMap::new(),
            conds_satisfied_max_sample: 0,
            conds_satisfied_max_sample_for_unexplored: HashMap::new(),
            temporary_r_for_unexplored: HashMap::new(),
            temporary_start_for_unexplored: HashMap::new(),
            conds_satisfied_last: HashMap::new(),
            target: -1,
            r: INITIAL_R,
            self_mode: true,
            base_phase: false,
            seed_id_base: 0,
            efc_seed_count: 0,
            is_efc: false,
            conds_satisfied_max_seed: 0,
        }
    }

    #[must_use]
    pub fn seed_of(&self, exit: i32) -> i32 {
        self.seed_of_exit.get(&exit).copied().unwrap_or(-1)
    }

    pub fn warmup_target(&mut self, target: i32) {
        self.target = target;
        self.conds_satisfied_max_seed = 0;
        self.conds_satisfied_max_sample = 0;
    }

    pub fn begin_self_phase(&mut self) {
        self.self_mode = true;
        self.conds_satisfied_max_seed = self.conds_satisfied_max_seed.max(self.conds_satisfied_max_sample);
        self.initial_sample();
    }

    pub fn begin_base_phase(&mut self) {
        self.self_mode = false;
        self.base_phase = true;
        self.gradient_score_sum.clear();
        self.seed_id_base = self.efc_seed_count;
        self.initial_sample();
    }

    pub fn begin_delta_phase(&mut self) {
        self.self_mode = false;
        self.base_phase = false;
        self.initial_sample();
    }

    /// Resets the scratch that tracks progress within a single sample.
    /// In base mode also clears `base_r`; in delta mode, `delta_r`.
    pub fn initial_sample(&mut self) {
        self.r = INITIAL_R;
        self.is_efc = false;
        self.conds_satisfied_max_sample = 0;
        self.conds_satisfied_max_sample_for_unexplored.clear();
        self.temporary_r_for_unexplored.clear();
        self.temporary_start_for_unexplored.clear();
        self.conds_satisfied_last.clear();
        if !self.self_mode {
            if self.base_phase {
                self.base_r.clear();
            } else {
                self.delta_r.clear();
            }
        }
    }
}
