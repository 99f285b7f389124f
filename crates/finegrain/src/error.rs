#![forbid(unsafe_code)]

//! Engine fault types.
//!
//! The engine absorbs almost every failure locally (equal-value writes,
//! reentrant writes, unparseable persisted data). The one condition it can
//! surface is a runaway propagation cascade, detected by the bounded
//! depth guard in [`crate::cell`].

use thiserror::Error;

/// Raised when a single top-level write cascades deeper than the configured
/// propagation depth limit.
///
/// A synchronous cycle among live cells re-enters a cell that is still
/// propagating and is cut by that cell's reentrancy guard instead. This
/// fault fires when a cascade keeps reaching fresh cells: a derivation
/// chain longer than the limit, or a graph that manufactures new cells
/// while propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("propagation depth {depth} reached limit {limit}; cyclic write-back suspected")]
pub struct CycleSuspected {
    /// Depth of the propagation chain when the write was dropped.
    pub depth: usize,
    /// The limit in force at the time (see
    /// [`crate::cell::set_propagation_depth_limit`]).
    pub limit: usize,
}
