#![forbid(unsafe_code)]

//! Time-shaping combinators: batch, debounce, throttle.
//!
//! # Design
//!
//! Each combinator wraps a source cell and returns a [`View`] whose relay
//! is driven through an abstract [`Scheduler`] instead of synchronously.
//! The upstream subscription *and* any armed timer are owned by the relay's
//! installer, so a combinator consumes no timer resources until it has a
//! consumer, and cancels everything on teardown.
//!
//! Time-shaped views report the last *propagated* value from `get()` — the
//! lag is the point, so they carry no read override.
//!
//! # Invariants
//!
//! 1. At most one timer per combinator is armed at any instant.
//! 2. A cancelled token never fires.
//! 3. Debounce and throttle never drop the final source value: the last
//!    update always reaches the relay once the timers quiesce.
//!
//! # Failure Modes
//!
//! - A scheduler that fires callbacks after `cancel` violates the contract
//!   and can produce duplicate propagations; [`ManualScheduler`] is the
//!   reference implementation.

use std::cell::{Cell as StdCell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::cell::{Cell, Installer, Subscription, WeakCell};
use crate::view::View;

// ---------------------------------------------------------------------------
// Scheduler abstraction
// ---------------------------------------------------------------------------

/// Identifies a scheduled callback for cancellation.
pub type TimerToken = u64;

/// Host timer collaborator.
///
/// `cancel` must guarantee the callback cannot fire once it returns.
pub trait Scheduler {
    /// Run `callback` once, `delay` from now.
    fn schedule_after(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerToken;

    /// Run `callback` on the next frame tick.
    fn schedule_next_frame(&self, callback: Box<dyn FnOnce()>) -> TimerToken;

    /// Drop a scheduled callback. Unknown or already-fired tokens are a
    /// no-op.
    fn cancel(&self, token: TimerToken);
}

// ---------------------------------------------------------------------------
// Manual scheduler (virtual clock)
// ---------------------------------------------------------------------------

struct ScheduledTask {
    token: TimerToken,
    due: Duration,
    callback: Box<dyn FnOnce()>,
}

struct ManualInner {
    now: Duration,
    frame_interval: Duration,
    next_token: TimerToken,
    tasks: Vec<ScheduledTask>,
}

/// Deterministic virtual-clock scheduler.
///
/// Time only moves when [`advance`](Self::advance) is called; due callbacks
/// fire in deadline order (ties break by scheduling order), and callbacks
/// scheduled while advancing fire in the same call if they fall inside the
/// advanced window. Cloning shares the clock.
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl Clone for ManualScheduler {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// A scheduler with a 16ms frame interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_frame_interval(Duration::from_millis(16))
    }

    #[must_use]
    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ManualInner {
                now: Duration::ZERO,
                frame_interval,
                next_token: 0,
                tasks: Vec::new(),
            })),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of armed timers (diagnostics).
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// Move the clock forward, firing every callback that comes due.
    pub fn advance(&self, by: Duration) {
        let target = self.inner.borrow().now + by;
        loop {
            let task = {
                let mut inner = self.inner.borrow_mut();
                let next = inner
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, task)| task.due <= target)
                    .min_by_key(|(_, task)| (task.due, task.token))
                    .map(|(index, _)| index);
                match next {
                    Some(index) => {
                        let task = inner.tasks.remove(index);
                        inner.now = inner.now.max(task.due);
                        Some(task)
                    }
                    None => None,
                }
            };
            match task {
                Some(task) => (task.callback)(),
                None => break,
            }
        }
        self.inner.borrow_mut().now = target;
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerToken {
        let mut inner = self.inner.borrow_mut();
        let token = inner.next_token;
        inner.next_token += 1;
        let due = inner.now + delay;
        inner.tasks.push(ScheduledTask {
            token,
            due,
            callback,
        });
        token
    }

    fn schedule_next_frame(&self, callback: Box<dyn FnOnce()>) -> TimerToken {
        let frame_interval = self.inner.borrow().frame_interval;
        self.schedule_after(frame_interval, callback)
    }

    fn cancel(&self, token: TimerToken) {
        self.inner
            .borrow_mut()
            .tasks
            .retain(|task| task.token != token);
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

struct ThrottleState<T> {
    window: Option<TimerToken>,
    trailing: Option<T>,
}

/// Open a suppression window; when it closes, flush a stashed trailing
/// value (exactly once) and open the next window.
fn arm_throttle<T: Clone + PartialEq + 'static>(
    state: &Rc<RefCell<ThrottleState<T>>>,
    scheduler: &Rc<dyn Scheduler>,
    relay: &WeakCell<T>,
    delay: Duration,
) {
    let fire_state = Rc::clone(state);
    let fire_scheduler = Rc::clone(scheduler);
    let fire_relay = relay.clone();
    let token = scheduler.schedule_after(
        delay,
        Box::new(move || {
            let trailing = {
                let mut state = fire_state.borrow_mut();
                state.window = None;
                state.trailing.take()
            };
            if let Some(value) = trailing {
                if let Some(relay) = fire_relay.upgrade() {
                    relay.set(value);
                }
                arm_throttle(&fire_state, &fire_scheduler, &fire_relay, delay);
            }
        }),
    );
    state.borrow_mut().window = Some(token);
}

impl<T: Clone + PartialEq + 'static> Cell<T> {
    /// Coalesce same-tick updates into one next-frame propagation carrying
    /// the most recent value.
    #[must_use]
    pub fn batch(&self, scheduler: &Rc<dyn Scheduler>) -> View<T> {
        let relay = Cell::new(self.get());
        let weak = relay.downgrade();
        let source = self.clone();
        let scheduler = Rc::clone(scheduler);
        let installer: Installer = Rc::new(move || {
            let pending: Rc<StdCell<Option<TimerToken>>> = Rc::new(StdCell::new(None));
            let latest: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
            let sub = {
                let weak = weak.clone();
                let scheduler = Rc::clone(&scheduler);
                let pending = Rc::clone(&pending);
                let latest = Rc::clone(&latest);
                source.listen_down(move |new: &T, _| {
                    *latest.borrow_mut() = Some(new.clone());
                    if pending.get().is_some() {
                        return;
                    }
                    let weak = weak.clone();
                    let pending_fire = Rc::clone(&pending);
                    let latest_fire = Rc::clone(&latest);
                    let token = scheduler.schedule_next_frame(Box::new(move || {
                        pending_fire.set(None);
                        let value = latest_fire.borrow_mut().take();
                        if let (Some(value), Some(relay)) = (value, weak.upgrade()) {
                            relay.set(value);
                        }
                    }));
                    pending.set(Some(token));
                })
            };
            let scheduler = Rc::clone(&scheduler);
            Subscription::new(move || {
                drop(sub);
                if let Some(token) = pending.take() {
                    scheduler.cancel(token);
                }
            })
        });
        relay.push_installer(installer);
        View::from_relay(relay)
    }

    /// Propagate only after `delay` of source silence, carrying the latest
    /// value. The relay starts at the source's current value.
    #[must_use]
    pub fn debounce(&self, delay: Duration, scheduler: &Rc<dyn Scheduler>) -> View<T> {
        let relay = Cell::new(self.get());
        let weak = relay.downgrade();
        let source = self.clone();
        let scheduler = Rc::clone(scheduler);
        let installer: Installer = Rc::new(move || {
            let pending: Rc<StdCell<Option<TimerToken>>> = Rc::new(StdCell::new(None));
            let sub = {
                let weak = weak.clone();
                let scheduler = Rc::clone(&scheduler);
                let pending = Rc::clone(&pending);
                source.listen_down(move |new: &T, _| {
                    if let Some(token) = pending.take() {
                        scheduler.cancel(token);
                    }
                    let weak = weak.clone();
                    let pending_fire = Rc::clone(&pending);
                    let next = new.clone();
                    let token = scheduler.schedule_after(
                        delay,
                        Box::new(move || {
                            pending_fire.set(None);
                            if let Some(relay) = weak.upgrade() {
                                relay.set(next);
                            }
                        }),
                    );
                    pending.set(Some(token));
                })
            };
            let scheduler = Rc::clone(&scheduler);
            Subscription::new(move || {
                drop(sub);
                if let Some(token) = pending.take() {
                    scheduler.cancel(token);
                }
            })
        });
        relay.push_installer(installer);
        View::from_relay(relay)
    }

    /// Propagate the first update immediately, then at most once per
    /// `delay` window; the last update inside a window propagates exactly
    /// once when it closes (leading + trailing).
    #[must_use]
    pub fn throttle(&self, delay: Duration, scheduler: &Rc<dyn Scheduler>) -> View<T> {
        let relay = Cell::new(self.get());
        let weak = relay.downgrade();
        let source = self.clone();
        let scheduler = Rc::clone(scheduler);
        let installer: Installer = Rc::new(move || {
            let state: Rc<RefCell<ThrottleState<T>>> = Rc::new(RefCell::new(ThrottleState {
                window: None,
                trailing: None,
            }));
            let sub = {
                let weak = weak.clone();
                let scheduler = Rc::clone(&scheduler);
                let state = Rc::clone(&state);
                source.listen_down(move |new: &T, _| {
                    let suppressed = state.borrow().window.is_some();
                    if suppressed {
                        state.borrow_mut().trailing = Some(new.clone());
                        return;
                    }
                    if let Some(relay) = weak.upgrade() {
                        relay.set(new.clone());
                    }
                    arm_throttle(&state, &scheduler, &weak, delay);
                })
            };
            let scheduler = Rc::clone(&scheduler);
            let state = Rc::clone(&state);
            Subscription::new(move || {
                drop(sub);
                let mut state = state.borrow_mut();
                state.trailing = None;
                if let Some(token) = state.window.take() {
                    scheduler.cancel(token);
                }
            })
        });
        relay.push_installer(installer);
        View::from_relay(relay)
    }
}

impl<T: Clone + PartialEq + 'static> View<T> {
    /// See [`Cell::batch`].
    #[must_use]
    pub fn batch(&self, scheduler: &Rc<dyn Scheduler>) -> View<T> {
        self.relay().batch(scheduler)
    }

    /// See [`Cell::debounce`].
    #[must_use]
    pub fn debounce(&self, delay: Duration, scheduler: &Rc<dyn Scheduler>) -> View<T> {
        self.relay().debounce(delay, scheduler)
    }

    /// See [`Cell::throttle`].
    #[must_use]
    pub fn throttle(&self, delay: Duration, scheduler: &Rc<dyn Scheduler>) -> View<T> {
        self.relay().throttle(delay, scheduler)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
