#![forbid(unsafe_code)]

//! Mutable reactive cells with lazy subscription lifecycle.
//!
//! [`Cell<T>`] is the source-of-truth primitive of the engine: a shared,
//! single-threaded memory location with an equality predicate and three
//! listener channels. Derived handles ([`crate::View`], lens cells,
//! aggregates, time-shaped views) are all built from cells plus the
//! installer machinery in this module.
//!
//! # Design
//!
//! A `Cell<T>` is an `Rc` handle over shared interior state; cloning a cell
//! clones the handle, not the value. Listener callbacks live in sparse
//! indexed slot vectors so that removal during dispatch never shifts the
//! indices of listeners still waiting to run. Upstream wiring is deferred:
//! a derived cell queues *installers* and only runs them once it has a
//! downstream or effect consumer, so building an unused derivation is free
//! of subscription cost.
//!
//! # Invariants
//!
//! 1. Installed upstream subscriptions exist iff
//!    `downstream_count() + effect_count() > 0`.
//! 2. For one `set`, upward listeners fire before downward listeners, which
//!    fire before effects; within a channel, registration order.
//! 3. A `set` while the same cell is already propagating is dropped.
//! 4. A `set` of a value the equality predicate accepts as current runs no
//!    listeners.
//! 5. Upward listeners observe the proposed value; downward and effect
//!    listeners observe the value the cell actually holds once upward
//!    write-back has settled, with the same `old`. A write the upstream
//!    refuses runs no downward or effect listeners at all.
//!
//! # Failure Modes
//!
//! - **Cyclic write-back among live cells**: a synchronous cycle always
//!   re-enters a cell that is still propagating, so the reentrancy guard
//!   cuts it after one round. The thread-local depth counter bounds the
//!   remaining runaways (cascades that keep reaching fresh cells, or
//!   derivation chains longer than the limit); such a write is dropped and
//!   [`CycleSuspected`] surfaced (`try_set`) or logged (`set`).
//! - **Listener panics**: propagate to the caller of `set`; the cell's value
//!   has already been swapped, remaining listeners in the cascade do not run.

use std::cell::{Cell as StdCell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::CycleSuspected;

// ---------------------------------------------------------------------------
// Propagation depth guard
// ---------------------------------------------------------------------------

/// Default cascade depth after which a cycle is suspected.
const DEFAULT_DEPTH_LIMIT: usize = 256;

thread_local! {
    static DEPTH: StdCell<usize> = const { StdCell::new(0) };
    static DEPTH_LIMIT: StdCell<usize> = const { StdCell::new(DEFAULT_DEPTH_LIMIT) };
}

/// Set the propagation depth limit for the current thread.
///
/// The limit bounds how deep a single top-level `set` may cascade through
/// the graph before further writes are dropped as cycle-suspected.
pub fn set_propagation_depth_limit(limit: usize) {
    DEPTH_LIMIT.set(limit.max(1));
}

/// The propagation depth limit in force on the current thread.
#[must_use]
pub fn propagation_depth_limit() -> usize {
    DEPTH_LIMIT.get()
}

// ---------------------------------------------------------------------------
// Listener registries
// ---------------------------------------------------------------------------

/// Listener callback: `(new, old)`. `old` is `None` only for the immediate
/// invocation of an effect registered with `run_now`.
type Listener<T> = Rc<dyn Fn(&T, Option<&T>)>;

/// The three propagation channels, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Up,
    Down,
    Effect,
}

/// Sparse indexed listener slots.
///
/// New listeners always append, so an index identifies a listener for its
/// whole lifetime. Removal punches a hole; trailing holes are trimmed after
/// the removal (never before) so in-flight dispatch indices stay valid.
struct Registry<T> {
    slots: RefCell<Vec<Option<Listener<T>>>>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    fn add(&self, listener: Listener<T>) -> usize {
        let mut slots = self.slots.borrow_mut();
        slots.push(Some(listener));
        slots.len() - 1
    }

    fn remove(&self, index: usize) {
        let mut slots = self.slots.borrow_mut();
        if let Some(slot) = slots.get_mut(index) {
            *slot = None;
        }
        while slots.last().is_some_and(Option::is_none) {
            slots.pop();
        }
    }

    fn occupied(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.is_some()).count()
    }

    /// Invoke every occupied slot in index order.
    ///
    /// The slot vector is re-borrowed per step: a listener that removes
    /// another listener (or itself) mid-dispatch simply leaves a hole that
    /// later steps skip. Listeners appended during dispatch run on the next
    /// propagation, not this one.
    fn dispatch(&self, new: &T, old: Option<&T>) {
        let len = self.slots.borrow().len();
        for index in 0..len {
            let listener = self.slots.borrow().get(index).and_then(Clone::clone);
            if let Some(listener) = listener {
                listener(new, old);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII guard for a registered listener.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// removes the listener; both are idempotent. Removal does not cancel a
/// propagation already dispatching to that listener.
pub struct Subscription {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// Remove the listener now instead of at drop time.
    pub fn unsubscribe(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }

    /// Keep the listener registered for as long as its cell lives.
    ///
    /// Used for a cell's own internal wiring (write-back listeners), where
    /// the listener should die with the cell rather than with a guard.
    pub(crate) fn detach(mut self) {
        self.cleanup = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cleanup.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A deferred upstream subscription: run on activation, re-queued on
/// teardown so the cell can re-activate later.
pub(crate) type Installer = Rc<dyn Fn() -> Subscription>;

struct CellInner<T> {
    value: RefCell<T>,
    eq: Box<dyn Fn(&T, &T) -> bool>,
    /// Live read override for derived cells (`get` recomputes through this
    /// instead of returning the stored value).
    read: RefCell<Option<Rc<dyn Fn() -> T>>>,
    /// Reentrancy counter; non-zero while this cell is propagating.
    busy: StdCell<u32>,
    ups: Registry<T>,
    downs: Registry<T>,
    effects: Registry<T>,
    pending: RefCell<Vec<Installer>>,
    installed: RefCell<Vec<(Subscription, Installer)>>,
}

/// A mutable reactive memory location.
///
/// Cloning yields another handle to the same cell. See the module docs for
/// the propagation and lifecycle contract.
pub struct Cell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("value", &*self.inner.value.borrow())
            .field("busy", &self.inner.busy.get())
            .field("ups", &self.inner.ups.occupied())
            .field("downs", &self.inner.downs.occupied())
            .field("effects", &self.inner.effects.occupied())
            .field("installed", &self.is_installed())
            .finish()
    }
}

/// Weak handle used by internal wiring so listeners never keep their own
/// cell alive through its own registries.
pub(crate) struct WeakCell<T> {
    inner: Weak<CellInner<T>>,
}

impl<T> Clone for WeakCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakCell<T> {
    pub(crate) fn upgrade(&self) -> Option<Cell<T>> {
        self.inner.upgrade().map(|inner| Cell { inner })
    }
}

impl<T> Cell<T> {
    // -- introspection ------------------------------------------------------

    /// Occupied upward listener slots.
    #[must_use]
    pub fn upstream_count(&self) -> usize {
        self.inner.ups.occupied()
    }

    /// Occupied downward listener slots.
    #[must_use]
    pub fn downstream_count(&self) -> usize {
        self.inner.downs.occupied()
    }

    /// Occupied effect listener slots.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        self.inner.effects.occupied()
    }

    /// Whether upstream subscriptions are currently installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        !self.inner.installed.borrow().is_empty()
    }
}

impl<T: Clone + PartialEq + 'static> Cell<T> {
    /// Create a cell with structural (`PartialEq`) change detection.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_eq(value, |a, b| a == b)
    }
}

impl<T: Clone + 'static> Cell<T> {
    /// Create a cell with a custom equality predicate.
    ///
    /// The predicate decides whether a written value counts as a change; a
    /// write the predicate accepts as equal runs no listeners.
    #[must_use]
    pub fn with_eq(value: T, eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(CellInner {
                value: RefCell::new(value),
                eq: Box::new(eq),
                read: RefCell::new(None),
                busy: StdCell::new(0),
                ups: Registry::new(),
                downs: Registry::new(),
                effects: Registry::new(),
                pending: RefCell::new(Vec::new()),
                installed: RefCell::new(Vec::new()),
            }),
        }
    }

    // -- reads --------------------------------------------------------------

    /// Current value.
    ///
    /// Derived cells recompute through their read override, so reads are
    /// fresh even while no subscription is installed.
    #[must_use]
    pub fn get(&self) -> T {
        let read = self.inner.read.borrow().clone();
        match read {
            Some(read) => read(),
            None => self.inner.value.borrow().clone(),
        }
    }

    // -- writes -------------------------------------------------------------

    /// Write a value, propagating to listeners on change.
    ///
    /// No-op while this cell is already propagating (reentrancy guard) and
    /// when the equality predicate accepts the value as current. A write
    /// dropped by the depth guard is logged and otherwise ignored; use
    /// [`try_set`](Self::try_set) to observe it.
    pub fn set(&self, value: T) {
        if let Err(error) = self.try_set(value) {
            tracing::error!(%error, "dropping write");
        }
    }

    /// Like [`set`](Self::set), surfacing the depth guard.
    pub fn try_set(&self, value: T) -> Result<(), CycleSuspected> {
        if self.inner.busy.get() > 0 {
            tracing::trace!("reentrant write dropped");
            return Ok(());
        }
        // While dormant, a derived cell's stored value can lag its read
        // override; refresh it so the equality baseline is the live value.
        // Installed cells are kept current by propagation.
        if self.inner.installed.borrow().is_empty() {
            let read = self.inner.read.borrow().clone();
            if let Some(read) = read {
                let fresh = read();
                *self.inner.value.borrow_mut() = fresh;
            }
        }
        let old = self.inner.value.borrow().clone();
        if (self.inner.eq)(&old, &value) {
            return Ok(());
        }
        let depth = DEPTH.get();
        let limit = DEPTH_LIMIT.get();
        if depth >= limit {
            return Err(CycleSuspected { depth, limit });
        }

        DEPTH.set(depth + 1);
        self.inner.busy.set(self.inner.busy.get() + 1);
        // Write-back first: upward listeners see the proposed value and may
        // edit upstream state, possibly refusing or adjusting the write.
        self.inner.ups.dispatch(&value, Some(&old));
        // What the cell holds now is what upstream accepted, not necessarily
        // the raw written value.
        let read = self.inner.read.borrow().clone();
        let settled = match read {
            Some(read) => read(),
            None => value,
        };
        if !(self.inner.eq)(&old, &settled) {
            *self.inner.value.borrow_mut() = settled.clone();
            self.inner.downs.dispatch(&settled, Some(&old));
            self.inner.effects.dispatch(&settled, Some(&old));
        }
        self.inner.busy.set(self.inner.busy.get() - 1);
        DEPTH.set(DEPTH.get() - 1);
        Ok(())
    }

    /// Write `f(current)`.
    pub fn modify(&self, f: impl FnOnce(T) -> T) {
        self.set(f(self.get()));
    }

    // -- listener registration ----------------------------------------------

    /// Register a durable side-effect listener.
    ///
    /// Registration activates any pending upstream installers. With
    /// `run_now`, the callback is invoked once synchronously with
    /// `(&current, None)`.
    #[must_use]
    pub fn effect(&self, callback: impl Fn(&T, Option<&T>) + 'static, run_now: bool) -> Subscription {
        let listener: Listener<T> = Rc::new(callback);
        let index = self.inner.effects.add(Rc::clone(&listener));
        self.ensure_installed();
        if run_now {
            listener(&self.get(), None);
        }
        self.subscription(Channel::Effect, index)
    }

    /// Register a downward (read-dependent) listener. Activates pending
    /// upstream installers, like [`effect`](Self::effect).
    #[must_use]
    pub fn listen_down(&self, callback: impl Fn(&T, Option<&T>) + 'static) -> Subscription {
        let index = self.inner.downs.add(Rc::new(callback));
        self.ensure_installed();
        self.subscription(Channel::Down, index)
    }

    /// Register an upward (edit write-back) listener.
    ///
    /// Upward listeners represent "tell my owner about edits", not "I need
    /// data", so registering one does *not* activate upstream installers.
    #[must_use]
    pub fn listen_up(&self, callback: impl Fn(&T, Option<&T>) + 'static) -> Subscription {
        let index = self.inner.ups.add(Rc::new(callback));
        self.subscription(Channel::Up, index)
    }

    /// Queue an installer subscribing `callback` to `source`'s downward
    /// channel once this cell gains its first consumer.
    ///
    /// With `autorun`, each activation also invokes the callback once with
    /// `(&source.get(), None)`.
    pub fn listen_to<S: Clone + 'static>(
        &self,
        source: &Cell<S>,
        callback: impl Fn(&S, Option<&S>) + 'static,
        autorun: bool,
    ) {
        let source = source.clone();
        let callback: Rc<dyn Fn(&S, Option<&S>)> = Rc::new(callback);
        self.push_installer(Rc::new(move || {
            if autorun {
                callback(&source.get(), None);
            }
            let callback = Rc::clone(&callback);
            source.listen_down(move |new, old| callback(new, old))
        }));
    }

    // -- lifecycle machinery ------------------------------------------------

    pub(crate) fn downgrade(&self) -> WeakCell<T> {
        WeakCell {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Route `get()` through a live recomputation instead of the stored
    /// value. Set once, at derivation time.
    pub(crate) fn override_read(&self, read: impl Fn() -> T + 'static) {
        *self.inner.read.borrow_mut() = Some(Rc::new(read));
    }

    /// Queue an installer and activate it immediately if a consumer is
    /// already attached.
    pub(crate) fn push_installer(&self, installer: Installer) {
        self.inner.pending.borrow_mut().push(installer);
        self.ensure_installed();
    }

    fn live_consumers(&self) -> usize {
        self.inner.downs.occupied() + self.inner.effects.occupied()
    }

    fn ensure_installed(&self) {
        if self.live_consumers() == 0 || self.inner.pending.borrow().is_empty() {
            return;
        }
        if self.inner.installed.borrow().is_empty() {
            // Coming out of a dormant period: the stored value may be stale
            // relative to upstream, which would corrupt the equality
            // baseline for the next propagation. Refresh it silently.
            let read = self.inner.read.borrow().clone();
            if let Some(read) = read {
                let fresh = read();
                *self.inner.value.borrow_mut() = fresh;
            }
        }
        let pending: Vec<Installer> = self.inner.pending.borrow_mut().drain(..).collect();
        for installer in pending {
            let subscription = installer();
            self.inner.installed.borrow_mut().push((subscription, installer));
        }
    }

    fn teardown_if_idle(&self) {
        if self.live_consumers() > 0 {
            return;
        }
        let installed: Vec<(Subscription, Installer)> =
            self.inner.installed.borrow_mut().drain(..).collect();
        for (subscription, installer) in installed {
            drop(subscription);
            self.inner.pending.borrow_mut().push(installer);
        }
    }

    fn subscription(&self, channel: Channel, index: usize) -> Subscription {
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let cell = Cell { inner };
            match channel {
                Channel::Up => cell.inner.ups.remove(index),
                Channel::Down => cell.inner.downs.remove(index),
                Channel::Effect => cell.inner.effects.remove(index),
            }
            if channel != Channel::Up {
                cell.teardown_if_idle();
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<StdCell<u32>>, impl Fn(&i32, Option<&i32>)) {
        let count = Rc::new(StdCell::new(0));
        let count_clone = Rc::clone(&count);
        (count, move |_: &i32, _: Option<&i32>| {
            count_clone.set(count_clone.get() + 1);
        })
    }

    #[test]
    fn equal_write_runs_no_listeners() {
        let cell = Cell::new(0);
        let (count, bump) = counter();
        let _sub = cell.effect(bump, false);

        cell.set(0);
        assert_eq!(count.get(), 0);

        cell.set(1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn listeners_observe_new_and_old() {
        let cell = Cell::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = cell.effect(
            move |new, old| seen_clone.borrow_mut().push((*new, old.copied())),
            false,
        );

        cell.set(1);
        cell.set(5);
        assert_eq!(*seen.borrow(), vec![(1, Some(0)), (5, Some(1))]);
    }

    #[test]
    fn run_now_effect_sees_current_with_no_old() {
        let cell = Cell::new(7);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = cell.effect(
            move |new, old| seen_clone.borrow_mut().push((*new, old.copied())),
            true,
        );
        assert_eq!(*seen.borrow(), vec![(7, None)]);
    }

    #[test]
    fn reentrant_write_is_dropped() {
        let cell = Cell::new(0);
        let cell_clone = cell.clone();
        let (count, _) = counter();
        let count_clone = Rc::clone(&count);
        let _sub = cell.effect(
            move |_, _| {
                count_clone.set(count_clone.get() + 1);
                // Nested write on the same cell must be a no-op.
                cell_clone.set(99);
            },
            false,
        );

        cell.set(1);
        assert_eq!(count.get(), 1);
        assert_eq!(cell.get(), 1);
    }

    #[test]
    fn channel_order_is_up_down_effect() {
        let cell = Cell::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let log = |tag: &'static str| {
            let order = Rc::clone(&order);
            move |_: &i32, _: Option<&i32>| order.borrow_mut().push(tag)
        };
        let _e = cell.effect(log("effect"), false);
        let _d = cell.listen_down(log("down"));
        let _u = cell.listen_up(log("up"));

        cell.set(1);
        assert_eq!(*order.borrow(), vec!["up", "down", "effect"]);
    }

    #[test]
    fn registration_order_within_channel() {
        let cell = Cell::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let log = |tag: &'static str| {
            let order = Rc::clone(&order);
            move |_: &i32, _: Option<&i32>| order.borrow_mut().push(tag)
        };
        let _a = cell.effect(log("first"), false);
        let _b = cell.effect(log("second"), false);
        let _c = cell.effect(log("third"), false);

        cell.set(1);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn removal_during_dispatch_skips_removed_listener() {
        let cell = Cell::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        // First listener removes the third during dispatch; the second must
        // still run, the third must not.
        let third_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let third_clone = Rc::clone(&third_slot);
        let order_a = Rc::clone(&order);
        let _a = cell.effect(
            move |_, _| {
                order_a.borrow_mut().push("first");
                third_clone.borrow_mut().take();
            },
            false,
        );
        let order_b = Rc::clone(&order);
        let _b = cell.effect(move |_, _| order_b.borrow_mut().push("second"), false);
        let order_c = Rc::clone(&order);
        let c = cell.effect(move |_, _| order_c.borrow_mut().push("third"), false);
        *third_slot.borrow_mut() = Some(c);

        cell.set(1);
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let cell = Cell::new(0);
        let (count, bump) = counter();
        let mut sub = cell.effect(bump, false);

        sub.unsubscribe();
        sub.unsubscribe();
        drop(sub);

        cell.set(1);
        assert_eq!(count.get(), 0);
        assert_eq!(cell.effect_count(), 0);
    }

    #[test]
    fn custom_equality_predicate() {
        // Magnitude-only equality: sign changes are not changes.
        let cell = Cell::with_eq(2i32, |a, b| a.abs() == b.abs());
        let (count, bump) = counter();
        let _sub = cell.effect(bump, false);

        cell.set(-2);
        assert_eq!(count.get(), 0);
        cell.set(3);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn fan_out_across_cells_terminates_and_stabilizes() {
        let a = Cell::new(0);
        let b = Cell::new(0);
        let b_clone = b.clone();
        let _sub = a.effect(move |new, _| b_clone.set(new * 2), false);

        a.set(3);
        assert_eq!(b.get(), 6);
    }

    #[test]
    fn two_cell_cycle_is_cut_by_reentrancy_guard() {
        let a: Cell<i32> = Cell::new(0);
        let b: Cell<i32> = Cell::new(0);
        let (count, _) = counter();

        let b_clone = b.clone();
        let _ab = a.effect(move |new, _| b_clone.set(new + 1), false);
        let a_clone = a.clone();
        let count_clone = Rc::clone(&count);
        let _ba = b.effect(
            move |new, _| {
                count_clone.set(count_clone.get() + 1);
                a_clone.set(new + 1);
            },
            false,
        );

        // The write back into `a` re-enters a cell that is still
        // propagating, so it dies on the reentrancy guard after one round.
        a.set(1);
        assert_eq!(count.get(), 1);
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn deep_cascade_surfaces_cycle_fault_at_limit() {
        set_propagation_depth_limit(4);
        // A chain of distinct cells, each forwarding to the next: no cell is
        // ever re-entered, so only the depth guard can stop the cascade.
        let cells: Vec<Cell<u32>> = (0..8).map(|_| Cell::new(0)).collect();
        let fault = Rc::new(RefCell::new(None));
        let mut subs = Vec::new();
        for pair in cells.windows(2) {
            let next = pair[1].clone();
            let fault_slot = Rc::clone(&fault);
            subs.push(pair[0].effect(
                move |new, _| {
                    if let Err(e) = next.try_set(new + 1) {
                        *fault_slot.borrow_mut() = Some(e);
                    }
                },
                false,
            ));
        }

        cells[0].set(1);
        let fault = fault.borrow_mut().take().expect("depth guard should have fired");
        assert_eq!(fault.limit, 4);
        assert_eq!(fault.depth, 4);
        // The cascade got exactly `limit` cells deep and no further.
        assert_eq!(cells[3].get(), 4);
        assert_eq!(cells[4].get(), 0);
        set_propagation_depth_limit(DEFAULT_DEPTH_LIMIT);
    }

    #[test]
    fn debug_formatting_reports_lifecycle() {
        let cell = Cell::new(3);
        let _sub = cell.effect(|_, _| {}, false);
        let rendered = format!("{cell:?}");
        assert!(rendered.contains("value: 3"));
        assert!(rendered.contains("effects: 1"));
        assert!(rendered.contains("installed: false"));
    }

    #[test]
    fn pending_installer_runs_only_with_consumer() {
        let source = Cell::new(1);
        let derived: Cell<i32> = Cell::new(1);
        let derived_weak = derived.downgrade();
        derived.listen_to(
            &source,
            move |new, _| {
                if let Some(derived) = derived_weak.upgrade() {
                    derived.set(*new);
                }
            },
            false,
        );

        assert_eq!(source.downstream_count(), 0);
        assert!(!derived.is_installed());

        let sub = derived.effect(|_, _| {}, false);
        assert_eq!(source.downstream_count(), 1);
        assert!(derived.is_installed());

        drop(sub);
        assert_eq!(source.downstream_count(), 0);
        assert!(!derived.is_installed());

        // Reinstallation after teardown works.
        let _sub = derived.effect(|_, _| {}, false);
        assert_eq!(source.downstream_count(), 1);
    }

    #[test]
    fn listen_up_does_not_activate_installers() {
        let source = Cell::new(1);
        let derived: Cell<i32> = Cell::new(1);
        derived.listen_to(&source, |_, _| {}, false);

        let _up = derived.listen_up(|_, _| {});
        assert_eq!(source.downstream_count(), 0);
        assert!(!derived.is_installed());
    }

    #[test]
    fn autorun_installer_fires_on_each_activation() {
        let source = Cell::new(5);
        let derived: Cell<i32> = Cell::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        derived.listen_to(
            &source,
            move |new, _| seen_clone.borrow_mut().push(*new),
            true,
        );

        let sub = derived.effect(|_, _| {}, false);
        assert_eq!(*seen.borrow(), vec![5]);
        drop(sub);

        source.set(9);
        assert!(seen.borrow().len() == 1, "dormant cell must not observe");

        let _sub = derived.effect(|_, _| {}, false);
        assert_eq!(*seen.borrow(), vec![5, 9]);
    }

    #[test]
    fn dropping_derived_cell_uninstalls_from_source() {
        let source = Cell::new(1);
        let sub;
        {
            let derived: Cell<i32> = Cell::new(1);
            let weak = derived.downgrade();
            derived.listen_to(
                &source,
                move |new, _| {
                    if let Some(derived) = weak.upgrade() {
                        derived.set(*new);
                    }
                },
                false,
            );
            sub = derived.effect(|_, _| {}, false);
            assert_eq!(source.downstream_count(), 1);
        }
        // The derived cell is gone; its installed subscription dropped with
        // it, removing the source listener.
        assert_eq!(source.downstream_count(), 0);
        drop(sub);
    }
}
