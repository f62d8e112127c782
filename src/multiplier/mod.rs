//! The parallel multiplication engine: estimate, partition, run, merge.
//!
//! [`driver::multiply`] is the only entry point most callers need; the other submodules are
//! its collaborators, each independently testable and independently swappable:
//!
//! - [`estimator`] samples the inputs to predict output cardinality and pick a strategy.
//! - [`partitioner`] turns that strategy into concrete per-worker work assignments.
//! - [`kernel`] multiplies and deposits one term pair, with a specialized override for packed
//!   monomials.
//! - [`accumulator`] is the lock-free, open-addressed output table each worker (and the final
//!   merge) writes into.

pub mod accumulator;
pub mod driver;
pub mod estimator;
pub mod kernel;
pub mod partitioner;

pub use driver::{multiply, multiply_cancellable};
