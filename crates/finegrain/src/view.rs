#![forbid(unsafe_code)]

//! Read-only reactive projections.
//!
//! A [`View<T>`] wraps a relay [`Cell<T>`] and exposes the read/subscribe
//! half of its contract — no `set`, no `modify`. Projection views (built
//! with [`Cell::map`]) carry a read override, so
//! `view.get() == project(source.get())` holds even while no subscription
//! is installed; time-shaped views (see [`crate::timing`]) deliberately do
//! not, since their whole purpose is to lag the source.

use std::rc::Rc;

use crate::cell::{Cell, Subscription};

/// A read-only reactive projection of one or more cells.
pub struct View<T> {
    relay: Cell<T>,
}

impl<T> Clone for View<T> {
    fn clone(&self) -> Self {
        Self {
            relay: self.relay.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for View<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View").field("relay", &self.relay).finish()
    }
}

impl<T: Clone + 'static> View<T> {
    pub(crate) fn from_relay(relay: Cell<T>) -> Self {
        Self { relay }
    }

    /// Current value. Fresh for projection views even while uninstalled.
    #[must_use]
    pub fn get(&self) -> T {
        self.relay.get()
    }

    /// Register a durable side-effect listener; see [`Cell::effect`].
    #[must_use]
    pub fn effect(&self, callback: impl Fn(&T, Option<&T>) + 'static, run_now: bool) -> Subscription {
        self.relay.effect(callback, run_now)
    }

    /// Register a downward listener; see [`Cell::listen_down`].
    #[must_use]
    pub fn listen_down(&self, callback: impl Fn(&T, Option<&T>) + 'static) -> Subscription {
        self.relay.listen_down(callback)
    }

    /// Derive a projection view of this view.
    #[must_use]
    pub fn map<B: Clone + PartialEq + 'static>(&self, project: impl Fn(&T) -> B + 'static) -> View<B> {
        self.relay.map(project)
    }

    pub(crate) fn relay(&self) -> &Cell<T> {
        &self.relay
    }
}

impl<T: Clone + 'static> Cell<T> {
    /// A read-only handle onto this cell.
    #[must_use]
    pub fn view(&self) -> View<T> {
        View {
            relay: self.clone(),
        }
    }

    /// Derive a read-only view computing `project(source)`.
    ///
    /// The view's relay is seeded with the current projection and kept
    /// current by a lazily installed subscription; reads always recompute
    /// through the source, so an uninstalled view is never stale.
    #[must_use]
    pub fn map<B: Clone + PartialEq + 'static>(&self, project: impl Fn(&T) -> B + 'static) -> View<B> {
        let project = Rc::new(project);
        let relay = Cell::new(project(&self.get()));
        {
            let source = self.clone();
            let project = Rc::clone(&project);
            relay.override_read(move || project(&source.get()));
        }
        let weak = relay.downgrade();
        relay.listen_to(
            self,
            move |new, _| {
                if let Some(relay) = weak.upgrade() {
                    relay.set(project(new));
                }
            },
            false,
        );
        View { relay }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
