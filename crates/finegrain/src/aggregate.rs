#![forbid(unsafe_code)]

//! Aggregate cells: tuples and vectors of cells as one cell.
//!
//! # Design
//!
//! The aggregates own no independent state: their value is always a fresh
//! snapshot assembled by reading every branch, and any branch change
//! republishes the whole snapshot. Writes distribute back into the
//! branches; the echo a distribution causes on the branch that triggered
//! the republish dies on that branch's reentrancy or equality guard.
//!
//! Arity constructors ([`pack2`], [`pack3`]) replace a dynamic
//! keyed-object aggregate; [`list`] is the homogeneous analogue.
//!
//! # Invariants
//!
//! 1. `packed.get()` always equals the tuple/vector of current branch
//!    values, installed or not.
//! 2. One branch change produces exactly one republish.
//! 3. Distribution writes branches in declaration (tuple/index) order.
//!
//! # Failure Modes
//!
//! - [`list`] distribution with a longer written vector ignores the extra
//!   elements; a shorter one leaves the remaining branches untouched.

use crate::cell::Cell;

/// Aggregate two cells into a cell of a pair.
#[must_use]
pub fn pack2<A, B>(a: &Cell<A>, b: &Cell<B>) -> Cell<(A, B)>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
{
    let packed = Cell::new((a.get(), b.get()));
    {
        let a = a.clone();
        let b = b.clone();
        packed.override_read(move || (a.get(), b.get()));
    }
    {
        let a = a.clone();
        let b = b.clone();
        packed
            .listen_up(move |(next_a, next_b): &(A, B), _| {
                a.set(next_a.clone());
                b.set(next_b.clone());
            })
            .detach();
    }
    republish_on(&packed, a);
    republish_on(&packed, b);
    packed
}

/// Aggregate three cells into a cell of a triple.
#[must_use]
pub fn pack3<A, B, C>(a: &Cell<A>, b: &Cell<B>, c: &Cell<C>) -> Cell<(A, B, C)>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
    C: Clone + PartialEq + 'static,
{
    let packed = Cell::new((a.get(), b.get(), c.get()));
    {
        let a = a.clone();
        let b = b.clone();
        let c = c.clone();
        packed.override_read(move || (a.get(), b.get(), c.get()));
    }
    {
        let a = a.clone();
        let b = b.clone();
        let c = c.clone();
        packed
            .listen_up(move |(next_a, next_b, next_c): &(A, B, C), _| {
                a.set(next_a.clone());
                b.set(next_b.clone());
                c.set(next_c.clone());
            })
            .detach();
    }
    republish_on(&packed, a);
    republish_on(&packed, b);
    republish_on(&packed, c);
    packed
}

/// Aggregate a vector of cells into a cell of a vector.
#[must_use]
pub fn list<T: Clone + PartialEq + 'static>(branches: Vec<Cell<T>>) -> Cell<Vec<T>> {
    let snapshot = {
        let branches = branches.clone();
        move || branches.iter().map(Cell::get).collect::<Vec<T>>()
    };
    let packed = Cell::new(snapshot());
    packed.override_read(snapshot);
    {
        let branches = branches.clone();
        packed
            .listen_up(move |next: &Vec<T>, _| {
                for (branch, value) in branches.iter().zip(next.iter()) {
                    branch.set(value.clone());
                }
            })
            .detach();
    }
    for branch in &branches {
        republish_on(&packed, branch);
    }
    packed
}

/// Wire one branch: any downward change on `branch` republishes the packed
/// snapshot (lazily, once the aggregate has a consumer).
fn republish_on<P, S>(packed: &Cell<P>, branch: &Cell<S>)
where
    P: Clone + 'static,
    S: Clone + 'static,
{
    let weak = packed.downgrade();
    packed.listen_to(
        branch,
        move |_, _| {
            if let Some(packed) = weak.upgrade() {
                let fresh = packed.get();
                packed.set(fresh);
            }
        },
        false,
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
