#![forbid(unsafe_code)]

//! Bidirectional derivation: isomorphisms, zoom lenses, and structural
//! accessors.
//!
//! # Design
//!
//! [`Cell::zoom`] is the one primitive: it derives a writable cell from a
//! `(focus, unfocus)` pair, where `unfocus` rebuilds the owner value around
//! the written focus and must leave untouched siblings structurally intact.
//! Everything else here is a `zoom` instance: [`Cell::iso`] for invertible
//! conversions, the container accessors ([`Cell::at`], [`Cell::lookup`],
//! [`Cell::find`]), the optional adapters ([`Cell::or`],
//! [`Cell::partial`]), and the boolean conveniences.
//!
//! The write-back path goes through the derived cell's *upward* channel, so
//! it behaves like any external `set` on the source; the echo coming back
//! down dies on the derived cell's reentrancy guard.
//!
//! # Invariants
//!
//! 1. Writing through a zoomed cell leaves everything outside the focus
//!    structurally unchanged in the source.
//! 2. A zoomed cell's own equality predicate decides whether *its*
//!    listeners fire, independent of the source's predicate.
//! 3. `derived.get() == focus(&source.get())` at all times, installed or
//!    not.
//! 4. Listeners on a zoomed cell only ever observe values the cell
//!    actually held: a write the `unfocus` refuses (out-of-bounds [`at`],
//!    no-match [`find`]) runs no listener, and a write it adjusts notifies
//!    with the adjusted focus.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::cell::Cell;

// ---------------------------------------------------------------------------
// Isomorphism
// ---------------------------------------------------------------------------

/// A pure, total, invertible conversion between two types.
///
/// The round-trip law (`backward(forward(a)) ≍ a` for values the graph
/// actually carries) is assumed, not checked; a violating pair produces
/// inconsistent round-trips.
pub struct Iso<A, B> {
    forward: Rc<dyn Fn(&A) -> B>,
    backward: Rc<dyn Fn(&B) -> A>,
}

impl<A, B> Clone for Iso<A, B> {
    fn clone(&self) -> Self {
        Self {
            forward: Rc::clone(&self.forward),
            backward: Rc::clone(&self.backward),
        }
    }
}

impl<A: 'static, B: 'static> Iso<A, B> {
    #[must_use]
    pub fn new(forward: impl Fn(&A) -> B + 'static, backward: impl Fn(&B) -> A + 'static) -> Self {
        Self {
            forward: Rc::new(forward),
            backward: Rc::new(backward),
        }
    }

    #[must_use]
    pub fn forward(&self, a: &A) -> B {
        (self.forward)(a)
    }

    #[must_use]
    pub fn backward(&self, b: &B) -> A {
        (self.backward)(b)
    }

    /// The reverse isomorphism.
    #[must_use]
    pub fn invert(&self) -> Iso<B, A> {
        Iso {
            forward: Rc::clone(&self.backward),
            backward: Rc::clone(&self.forward),
        }
    }
}

// ---------------------------------------------------------------------------
// Write-only lens
// ---------------------------------------------------------------------------

type Mutator<A> = Box<dyn FnOnce(A) -> A>;

/// A write-only handle focused into part of an owner value.
///
/// A lens can modify its focus without ever reading it back out: each write
/// threads a mutator through the whole focusing chain in one
/// [`Cell::modify`] on the root.
pub struct Lens<A> {
    apply: Rc<dyn Fn(Mutator<A>)>,
}

impl<A> Clone for Lens<A> {
    fn clone(&self) -> Self {
        Self {
            apply: Rc::clone(&self.apply),
        }
    }
}

impl<A: Clone + 'static> Lens<A> {
    /// The root lens: writes become `cell.modify`.
    #[must_use]
    pub fn of(cell: &Cell<A>) -> Self {
        let cell = cell.clone();
        Self {
            apply: Rc::new(move |mutator: Mutator<A>| cell.modify(mutator)),
        }
    }

    /// Apply `f` to the focus.
    pub fn modify(&self, f: impl FnOnce(A) -> A + 'static) {
        (self.apply)(Box::new(f));
    }

    /// Replace the focus.
    pub fn set(&self, value: A) {
        self.modify(move |_| value);
    }

    /// Focus deeper. Untouched siblings of the new focus pass through
    /// `unfocus` structurally unchanged.
    #[must_use]
    pub fn zoom<B: 'static>(
        &self,
        focus: impl Fn(&A) -> B + 'static,
        unfocus: impl Fn(B, &A) -> A + 'static,
    ) -> Lens<B> {
        let parent = Rc::clone(&self.apply);
        let focus = Rc::new(focus);
        let unfocus = Rc::new(unfocus);
        Lens {
            apply: Rc::new(move |mutator: Mutator<B>| {
                let focus = Rc::clone(&focus);
                let unfocus = Rc::clone(&unfocus);
                parent(Box::new(move |a: A| {
                    let b = mutator(focus(&a));
                    unfocus(b, &a)
                }));
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Zoom and iso on cells
// ---------------------------------------------------------------------------

impl<T: Clone + 'static> Cell<T> {
    /// Derive a bidirectional cell mirroring `focus(source)`.
    ///
    /// Writes call `source.modify(|a| unfocus(written, &a))`; `unfocus` is
    /// responsible for preserving everything outside the focus. This is
    /// also the typed rendering of field access: a `prop`-style lens is a
    /// `zoom` with a field accessor/updater pair.
    #[must_use]
    pub fn zoom<B: Clone + PartialEq + 'static>(
        &self,
        focus: impl Fn(&T) -> B + 'static,
        unfocus: impl Fn(B, &T) -> T + 'static,
    ) -> Cell<B> {
        let focus = Rc::new(focus);
        let derived = Cell::new(focus(&self.get()));
        {
            let source = self.clone();
            let focus = Rc::clone(&focus);
            derived.override_read(move || focus(&source.get()));
        }
        {
            // Edit write-back; lives in the derived cell's upward registry
            // and therefore dies with the derived cell.
            let source = self.clone();
            derived
                .listen_up(move |new: &B, _| {
                    let new = new.clone();
                    source.modify(|a| unfocus(new, &a));
                })
                .detach();
        }
        let weak = derived.downgrade();
        derived.listen_to(
            self,
            move |a, _| {
                if let Some(derived) = weak.upgrade() {
                    derived.set(focus(a));
                }
            },
            false,
        );
        derived
    }

    /// Derive a bidirectional cell through an isomorphism.
    #[must_use]
    pub fn iso<B: Clone + PartialEq + 'static>(&self, iso: Iso<T, B>) -> Cell<B> {
        let Iso { forward, backward } = iso;
        self.zoom(move |a| forward(a), move |b, _| backward(&b))
    }
}

// ---------------------------------------------------------------------------
// Structural accessors
// ---------------------------------------------------------------------------

impl<T: Clone + PartialEq + 'static> Cell<Vec<T>> {
    /// Focus one index. Writing `Some` replaces the slot (out-of-bounds
    /// writes are dropped), writing `None` removes it.
    #[must_use]
    pub fn at(&self, index: usize) -> Cell<Option<T>> {
        self.zoom(
            move |items| items.get(index).cloned(),
            move |slot, items| {
                let mut next = items.clone();
                match slot {
                    Some(value) => {
                        if let Some(target) = next.get_mut(index) {
                            *target = value;
                        }
                    }
                    None => {
                        if index < next.len() {
                            next.remove(index);
                        }
                    }
                }
                next
            },
        )
    }

    /// Focus the first element matching `matches`. Writing updates that
    /// element in place; writing `None` deletes it; writing with no match
    /// present leaves the source unchanged.
    #[must_use]
    pub fn find(&self, matches: impl Fn(&T) -> bool + 'static) -> Cell<Option<T>> {
        let matches = Rc::new(matches);
        let matches_write = Rc::clone(&matches);
        self.zoom(
            move |items| items.iter().find(|item| matches(item)).cloned(),
            move |slot, items| {
                let mut next = items.clone();
                let position = next.iter().position(|item| matches_write(item));
                match (slot, position) {
                    (Some(value), Some(index)) => next[index] = value,
                    (None, Some(index)) => {
                        next.remove(index);
                    }
                    (_, None) => {}
                }
                next
            },
        )
    }
}

impl<K: Ord + Clone + 'static, V: Clone + PartialEq + 'static> Cell<BTreeMap<K, V>> {
    /// Focus one key. Writing `None` removes the key entirely.
    #[must_use]
    pub fn lookup(&self, key: K) -> Cell<Option<V>> {
        let write_key = key.clone();
        self.zoom(
            move |map| map.get(&key).cloned(),
            move |slot, map| {
                let mut next = map.clone();
                match slot {
                    Some(value) => {
                        next.insert(write_key.clone(), value);
                    }
                    None => {
                        next.remove(&write_key);
                    }
                }
                next
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Optional adapters
// ---------------------------------------------------------------------------

impl<T: Clone + PartialEq + 'static> Cell<Option<T>> {
    /// Adapt an optional cell into a required one, substituting `default`
    /// while empty. Writes pass through as `Some`.
    #[must_use]
    pub fn or(&self, default: T) -> Cell<T> {
        self.zoom(
            move |slot| slot.clone().unwrap_or_else(|| default.clone()),
            |value, _| Some(value),
        )
    }
}

impl<T: Clone + PartialEq + 'static> Cell<T> {
    /// Adapt a required cell into an optional one. Writing `None` keeps the
    /// current value.
    #[must_use]
    pub fn partial(&self) -> Cell<Option<T>> {
        self.zoom(
            |value| Some(value.clone()),
            |slot, current| slot.unwrap_or_else(|| current.clone()),
        )
    }
}

// ---------------------------------------------------------------------------
// Boolean conveniences
// ---------------------------------------------------------------------------

impl Cell<bool> {
    /// The negated mirror of this cell (an involution iso).
    #[must_use]
    pub fn negate(&self) -> Cell<bool> {
        self.zoom(|b| !b, |b, _| !b)
    }

    pub fn on(&self) {
        self.set(true);
    }

    pub fn off(&self) {
        self.set(false);
    }

    pub fn toggle(&self) {
        self.modify(|b| !b);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
