//! C-ABI surface so a driver written in any language can host the runtime.
//!
//! The runtime is process-wide and single-threaded by contract (see the
//! concurrency notes on [`crate::Runtime`]); the `Mutex` below exists only
//! because Rust has no way to expose a mutable `static` across an `extern
//! "C"` boundary safely, not because the algorithm is meant to be called
//! concurrently. A driver that calls these functions from more than one
//! thread at a time violates the contract regardless of what the mutex does.

use std::sync::{Mutex, OnceLock};

use crate::config::Config;
use crate::runtime::Runtime;

static RUNTIME: OnceLock<Mutex<Option<Runtime>>> = OnceLock::new();

fn cell() -> &'static Mutex<Option<Runtime>> {
    RUNTIME.get_or_init(|| Mutex::new(None))
}

fn with_runtime<T>(default: T, f: impl FnOnce(&mut Runtime) -> T) -> T {
    let mut guard = cell().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    match guard.as_mut() {
        Some(runtime) => f(runtime),
        None => {
            log::error!("runtime operation called before initialize_runtime");
            default
        }
    }
}

/// Pair returned by `pop_queue_target`.
#[repr(C)]
pub struct TargetAndSeed {
    pub target_id: i32,
    pub seed_id: i32,
}

/// Pair returned by `finish_sample`.
#[repr(C)]
pub struct FinishResult {
    pub flags: i32,
    pub seed_id: i32,
}

/// Loads `output/instrumentation_meta.txt` and `output/edges.txt` (or the
/// path from `COVERGRAD_OUTPUT_DIR`) and resets all process-wide state.
/// Logs and leaves the runtime uninitialized on failure, since the contract
/// gives the hook no way to report an error after the fact.
#[unsafe(no_mangle)]
pub extern "C" fn initialize_runtime() {
    let config = Config::from_env();
    match Runtime::initialize(&config) {
        Ok(runtime) => {
            *cell().lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(runtime);
        }
        Err(err) => log::error!("initialize_runtime failed: {err}"),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn get_br_count() -> i32 {
    with_runtime(-1, Runtime::get_br_count)
}

#[unsafe(no_mangle)]
pub extern "C" fn get_arg_count() -> i32 {
    with_runtime(-1, Runtime::get_arg_count)
}

#[unsafe(no_mangle)]
pub extern "C" fn warmup_target(node: i32) {
    with_runtime((), |runtime| runtime.warmup_target(node));
}

#[unsafe(no_mangle)]
pub extern "C" fn pop_queue_target() -> TargetAndSeed {
    let (target_id, seed_id) = with_runtime((-1, -1), Runtime::pop_queue_target);
    TargetAndSeed { target_id, seed_id }
}

#[unsafe(no_mangle)]
pub extern "C" fn get_explored_count() -> i32 {
    with_runtime(-1, |runtime| runtime.get_explored_count() as i32)
}

#[unsafe(no_mangle)]
pub extern "C" fn begin_self_phase() {
    with_runtime((), Runtime::begin_self_phase);
}

#[unsafe(no_mangle)]
pub extern "C" fn begin_base_phase() {
    with_runtime((), Runtime::begin_base_phase);
}

#[unsafe(no_mangle)]
pub extern "C" fn begin_delta_phase() {
    with_runtime((), Runtime::begin_delta_phase);
}

#[unsafe(no_mangle)]
pub extern "C" fn finish_sample() -> FinishResult {
    let outcome = with_runtime(
        crate::runtime::FinishOutcome { flags: 0, seed_id: -1 },
        Runtime::finish_sample,
    );
    FinishResult {
        flags: outcome.flags,
        seed_id: outcome.seed_id,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn update_queue() {
    with_runtime((), Runtime::update_queue);
}

#[unsafe(no_mangle)]
pub extern "C" fn get_r() -> f64 {
    with_runtime(crate::INITIAL_R, Runtime::get_r)
}

#[unsafe(no_mangle)]
pub extern "C" fn get_node_seed(exit: i32) -> i32 {
    with_runtime(-1, |runtime| runtime.get_node_seed(exit))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_tree_parent(exit: i32) -> i32 {
    with_runtime(-1, |runtime| runtime.get_tree_parent(exit))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_tree_children_count(exit: i32) -> i32 {
    with_runtime(0, |runtime| runtime.get_tree_children_count(exit))
}

#[unsafe(no_mangle)]
pub extern "C" fn get_tree_child(exit: i32, index: i32) -> i32 {
    with_runtime(-1, |runtime| runtime.get_tree_child(exit, index))
}

/// The instrumentation hook. `is_int` is accepted for signature parity and
/// unused; the caller has already promoted integer operands to `f64`.
#[unsafe(no_mangle)]
pub extern "C" fn __pen(lhs: f64, rhs: f64, br_id: i32, cmp_id: i32, is_int: bool) {
    with_runtime((), |runtime| runtime.pen(lhs, rhs, br_id, cmp_id, is_int));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_before_initialize_return_defaults_without_panicking() {
        // RUNTIME is process-wide static; other tests in this binary may
        // have already initialized it, so only assert this never panics.
        let _ = get_br_count();
        let _ = pop_queue_target();
    }
}
