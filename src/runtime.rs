//! The safe, process-wide API beneath the C-ABI surface in [`crate::ffi`].
//!
//! `Runtime` owns the immutable [`BranchTree`], the mutable [`GlobalState`],
//! and the priority queue, and exposes exactly the driver-facing operations
//! the external interface names. There is no public way to mutate state
//! outside of these operations and [`Runtime::pen`].

use std::collections::BinaryHeap;

use crate::config::Config;
use crate::error::RuntimeError;
use crate::scheduler::{self, PriorityEntry};
use crate::state::GlobalState;
use crate::tree::BranchTree;
use crate::hook;

/// Result of `finish_sample`: a bitmask plus the seed id assigned to this
/// sample's new coverage, if any.
///
/// Bit 0: new coverage this sample (`is_efc`). Bit 1: `target` is now
/// explored. Bit 2: every exit is now explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishOutcome {
    pub flags: i32,
    pub seed_id: i32,
}

impl FinishOutcome {
    pub const NEW_COVERAGE: i32 = 1;
    pub const TARGET_COVERED: i32 = 2;
    pub const ALL_COVERED: i32 = 4;
}

pub struct Runtime {
    tree: BranchTree,
    state: GlobalState,
    queue: BinaryHeap<PriorityEntry>,
}

impl Runtime {
    /// Loads metadata, edges, builds prefixes/maps, and starts with clear
    /// state. The equivalent of `initialize_runtime`.
    pub fn initialize(config: &Config) -> Result<Self, RuntimeError> {
        let tree = BranchTree::load(config)?;
        let state = GlobalState::new(tree.exit_count());
        Ok(Self {
            tree,
            state,
            queue: BinaryHeap::new(),
        })
    }

    #[must_use]
    pub fn get_br_count(&self) -> i32 {
        self.tree.br_count()
    }

    #[must_use]
    pub fn get_arg_count(&self) -> i32 {
        self.tree.arg_count()
    }

    pub fn warmup_target(&mut self, node: i32) {
        self.state.warmup_target(node);
    }

    pub fn begin_self_phase(&mut self) {
        self.state.begin_self_phase();
    }

    pub fn begin_base_phase(&mut self) {
        self.state.begin_base_phase();
    }

    pub fn begin_delta_phase(&mut self) {
        self.state.begin_delta_phase();
    }

    /// The instrumentation entry point, called once per comparison executed
    /// by the target function.
    pub fn pen(&mut self, lhs: f64, rhs: f64, br_id: i32, cmp_id: i32, is_int: bool) {
        hook::pen(&self.tree, &mut self.state, lhs, rhs, br_id, cmp_id, is_int);
    }

    /// Folds the sample just executed into `gradient_score_sum` (in
    /// non-self modes) and reports coverage flags for the driver.
    pub fn finish_sample(&mut self) -> FinishOutcome {
        if !self.state.self_mode {
            scheduler::update_sample(&mut self.state);
        }

        let mut flags = 0;
        let seed_id;
        if self.state.is_efc {
            flags |= FinishOutcome::NEW_COVERAGE;
            seed_id = self.state.efc_seed_count;
            self.state.efc_seed_count += 1;
        } else {
            seed_id = -1;
        }
        if self.state.explored.contains(&self.state.target) {
            flags |= FinishOutcome::TARGET_COVERED;
        }
        if self.state.explored.len() >= self.tree.exit_count() {
            flags |= FinishOutcome::ALL_COVERED;
        }

        FinishOutcome { flags, seed_id }
    }

    pub fn update_queue(&mut self) {
        scheduler::update_queue(&self.tree, &self.state, &mut self.queue);
    }

    #[must_use]
    pub fn pop_queue_target(&mut self) -> (i32, i32) {
        scheduler::pop_queue_target(&mut self.state, &mut self.queue)
    }

    #[must_use]
    pub fn get_r(&self) -> f64 {
        self.state.r
    }

    #[must_use]
    pub fn get_explored_count(&self) -> usize {
        self.state.explored.len()
    }

    #[must_use]
    pub fn get_node_seed(&self, exit: i32) -> i32 {
        self.state.seed_of(exit)
    }

    #[must_use]
    pub fn get_tree_parent(&self, exit: i32) -> i32 {
        self.tree.parent_of(exit)
    }

    #[must_use]
    pub fn get_tree_children_count(&self, exit: i32) -> i32 {
        self.tree.children_count(exit) as i32
    }

    #[must_use]
    pub fn get_tree_child(&self, exit: i32, index: i32) -> i32 {
        if index < 0 {
            return -1;
        }
        self.tree.child(exit, index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::FCMP_OGT;

    fn s1_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("instrumentation_meta.txt"), "3 2").unwrap();
        std::fs::write(dir.path().join("edges.txt"), "0 1\n1 2\n").unwrap();
        let config = Config::with_dir(dir.path());
        (dir, config)
    }

    #[test]
    fn initialize_twice_produces_identical_state() {
        let (_dir, config) = s1_config();
        let a = Runtime::initialize(&config).unwrap();
        let b = Runtime::initialize(&config).unwrap();
        assert_eq!(a.get_br_count(), b.get_br_count());
        assert_eq!(a.get_explored_count(), b.get_explored_count());
        assert_eq!(a.get_tree_parent(2), b.get_tree_parent(2));
    }

    #[test]
    fn base_phase_then_update_queue_reports_minus_one_similarity() {
        let (_dir, config) = s1_config();
        let mut runtime = Runtime::initialize(&config).unwrap();
        runtime.begin_base_phase();
        runtime.update_queue();
        let (target, _seed) = runtime.pop_queue_target();
        assert!(target != -1);
        assert_eq!(runtime.get_r(), crate::INITIAL_R);
    }

    #[test]
    fn s2_finish_sample_reports_new_coverage_and_target_covered() {
        let (_dir, config) = s1_config();
        let mut runtime = Runtime::initialize(&config).unwrap();
        runtime.warmup_target(1);
        runtime.begin_self_phase();

        runtime.pen(5.0, 0.0, 0, FCMP_OGT, false);
        runtime.pen(7.0, 0.0, 1, FCMP_OGT, false);

        let outcome = runtime.finish_sample();
        assert_eq!(outcome.flags, FinishOutcome::NEW_COVERAGE | FinishOutcome::TARGET_COVERED);
        assert_eq!(outcome.seed_id, 0);
    }

    #[test]
    fn finish_sample_without_new_coverage_returns_seed_minus_one() {
        let (_dir, config) = s1_config();
        let mut runtime = Runtime::initialize(&config).unwrap();
        runtime.warmup_target(0);
        runtime.begin_self_phase();
        runtime.pen(5.0, 0.0, 0, FCMP_OGT, false);
        runtime.finish_sample();

        runtime.begin_self_phase();
        runtime.pen(5.0, 0.0, 0, FCMP_OGT, false);
        let outcome = runtime.finish_sample();
        assert_eq!(outcome.seed_id, -1);
        assert_eq!(outcome.flags & FinishOutcome::NEW_COVERAGE, 0);
    }

    #[test]
    fn pop_queue_target_never_returns_an_explored_exit() {
        let (_dir, config) = s1_config();
        let mut runtime = Runtime::initialize(&config).unwrap();
        runtime.warmup_target(0);
        runtime.begin_self_phase();
        runtime.pen(5.0, 0.0, 0, FCMP_OGT, false);
        runtime.finish_sample();

        runtime.begin_base_phase();
        runtime.update_queue();
        let (target, _) = runtime.pop_queue_target();
        assert_ne!(target, 0);
    }

    #[test]
    fn tree_introspection_defends_out_of_range_ids() {
        let (_dir, config) = s1_config();
        let runtime = Runtime::initialize(&config).unwrap();
        assert_eq!(runtime.get_tree_parent(999), -1);
        assert_eq!(runtime.get_tree_children_count(999), 0);
        assert_eq!(runtime.get_tree_child(0, -1), -1);
    }
}
