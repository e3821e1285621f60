//! Runtime core for a gradient-guided coverage-directed fuzzer targeting a
//! single instrumented numeric function.
//!
//! The crate is organized leaves-first: [`predicate`] is a pure numeric
//! library, [`tree`] is the immutable control-dependence forest, [`state`]
//! is the mutable per-run bookkeeping, [`hook`] is the instrumentation
//! entry point that updates it, and [`scheduler`] turns accumulated
//! evidence into a priority queue. [`Runtime`] wires all of these behind
//! the driver-facing operations described in the external interface; [`ffi`]
//! exposes that surface across a C ABI for a non-Rust driver.

pub mod config;
pub mod error;
pub mod ffi;
pub mod hook;
pub mod predicate;
pub mod runtime;
pub mod scheduler;
pub mod state;
pub mod tree;

pub use config::Config;
pub use error::RuntimeError;
pub use runtime::{FinishOutcome, Runtime};
pub use tree::MAXN;

/// Reset value for `r` at the start of each sample; also the "no better
/// distance found yet" sentinel self mode falls back to.
pub const INITIAL_R: f64 = 1e12;

/// Added to `gradient_score_sum[e]` when a delta sample reaches strictly
/// deeper prefix coverage than the paired base sample.
pub const GRADIENT_REWARD: f64 = 1e12;
