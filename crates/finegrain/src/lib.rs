#![forbid(unsafe_code)]

//! Fine-grained reactive state: cells, views, lenses, and time-shaping
//! combinators for single-threaded UI graphs.
//!
//! - [`Cell`]: mutable reactive memory location with three listener
//!   channels (upward, downward, effects) and lazy, reference-counted
//!   upstream subscription.
//! - [`View`]: read-only projection sharing the cell subscription contract.
//! - [`Iso`] / [`Lens`] / [`Cell::zoom`]: bidirectional focusing into parts
//!   of a structured value, preserving untouched siblings.
//! - [`pack2`] / [`pack3`] / [`list`]: aggregate several cells into one.
//! - [`Cell::batch`] / [`Cell::debounce`] / [`Cell::throttle`]: reshape
//!   update timing through a host [`Scheduler`].
//! - `state-persistence` feature: bind cells to a key-value
//!   [`StateStore`](persist::StateStore) for rehydration and durable
//!   writes.
//!
//! # Architecture
//!
//! Everything is `Rc<RefCell<..>>` single-threaded shared ownership; the
//! graph is `!Send` by construction. Propagation from a `set` is a fully
//! synchronous depth-first walk; the only deferral points are the opt-in
//! time-shaping combinators, which resume through the scheduler and then
//! perform an ordinary synchronous `set`. Per-cell reentrancy guards plus a
//! thread-local propagation depth limit keep cyclic write-back graphs from
//! looping unbounded (see [`CycleSuspected`]).

pub mod aggregate;
pub mod cell;
pub mod error;
pub mod lens;
#[cfg(feature = "state-persistence")]
pub mod persist;
pub mod timing;
pub mod view;

pub use aggregate::{list, pack2, pack3};
pub use cell::{Cell, Subscription, propagation_depth_limit, set_propagation_depth_limit};
pub use error::CycleSuspected;
pub use lens::{Iso, Lens};
#[cfg(feature = "state-persistence")]
pub use persist::{FileStore, MemoryStore, StateStore};
pub use timing::{ManualScheduler, Scheduler, TimerToken};
pub use view::View;
