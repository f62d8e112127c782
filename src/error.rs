use thiserror::Error;

/// Errors produced by [`crate::multiply`] and its collaborators.
///
/// The taxonomy mirrors the driver's state machine: every non-`Done` exit is one of these
/// variants, and `multiply` never returns a partial result alongside an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The two operand series are defined over different symbol sets and were not aligned
    /// before being handed to the multiplier.
    #[error("incompatible symbol sets: {0}")]
    IncompatibleSymbols(String),

    /// The user-supplied cancellation flag was observed set while workers were running.
    #[error("multiplication cancelled")]
    Cancelled,

    /// A coefficient operation (multiplication, addition) raised an error. `worker` and
    /// `pair` identify where in the Cartesian product the failure was observed, for
    /// diagnostics only -- the value itself carries no recovery information.
    #[error("coefficient operation failed in worker {worker} at pair ({}, {}): {source}", pair.0, pair.1)]
    CoefficientError {
        /// Index of the worker (workgroup) that observed the failure.
        worker: usize,
        /// The `(i, j)` index pair into `A x B` being processed when the failure occurred.
        pair: (usize, usize),
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A debug-only internal invariant was violated. Fatal; never returned in release builds,
    /// where the corresponding `debug_assert!` is compiled out.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolated(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
