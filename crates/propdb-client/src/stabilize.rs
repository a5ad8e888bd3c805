//! Value stabilization: debounce, throttle and memoization.
//!
//! [`Debounce`] and [`Throttle`] are plain state machines driven by explicit
//! timestamps, so their behavior is testable without a clock. The
//! [`spawn_debouncer`] and [`spawn_throttler`] drivers run them on
//! `tokio::time`.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    due: Instant,
}

/// Emits a value only after `delay` passes with no newer, different value.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay: Duration,
    latest: Option<T>,
    pending: Option<Pending<T>>,
}

impl<T: Clone + PartialEq> Debounce<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: None,
            pending: None,
        }
    }

    /// Record a new value at `now`.
    ///
    /// If the pending value was already due at `now` it is returned, and
    /// `value` starts a new burst. A value equal to the most recent push
    /// leaves the timer alone.
    pub fn push(&mut self, value: T, now: Instant) -> Option<T> {
        let due = self.poll(now);
        if self.latest.as_ref() == Some(&value) {
            return due;
        }
        self.latest = Some(value.clone());
        self.pending = Some(Pending {
            value,
            due: now + self.delay,
        });
        due
    }

    /// Take the pending value if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| p.due <= now) {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    /// Forget the last pushed value so pushing it again starts a new burst.
    ///
    /// A pending value, if any, keeps its deadline.
    pub fn forget_latest(&mut self) {
        self.latest = None;
    }

    /// When the pending value becomes due, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }
}

/// Emits at most one value per `limit`, always keeping the latest.
///
/// The first value of a fresh window is emitted at once. Values arriving
/// inside an open window replace each other, and the survivor is emitted
/// when the window ends, opening the next window.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    limit: Duration,
    window_end: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            window_end: None,
            pending: None,
        }
    }

    /// Record `value` at `now`, returning whatever should be emitted now.
    pub fn push(&mut self, value: T, now: Instant) -> Option<T> {
        if let Some(survivor) = self.tick(now) {
            // The survivor opened a window at `now`; `value` waits in it.
            self.pending = Some(value);
            return Some(survivor);
        }
        match self.window_end {
            Some(end) if now < end => {
                self.pending = Some(value);
                None
            }
            _ => {
                self.window_end = Some(now + self.limit);
                Some(value)
            }
        }
    }

    /// Close the window if it has ended, emitting the survivor.
    pub fn tick(&mut self, now: Instant) -> Option<T> {
        let end = self.window_end?;
        if now < end {
            return None;
        }
        match self.pending.take() {
            Some(survivor) => {
                self.window_end = Some(now + self.limit);
                Some(survivor)
            }
            None => {
                self.window_end = None;
                None
            }
        }
    }

    /// When the open window ends, if one is open.
    #[must_use]
    pub fn window_end(&self) -> Option<Instant> {
        self.window_end
    }
}

/// Caches a derived value until its dependency changes under `PartialEq`.
#[derive(Debug, Clone)]
pub struct Memo<D, V> {
    cached: Option<(D, V)>,
    computations: u64,
}

impl<D, V> Default for Memo<D, V> {
    fn default() -> Self {
        Self {
            cached: None,
            computations: 0,
        }
    }
}

impl<D: PartialEq, V> Memo<D, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value for `deps`, computing it with `compute` only when
    /// `deps` differs from the previous call.
    pub fn get_or_compute(&mut self, deps: D, compute: impl FnOnce(&D) -> V) -> &V {
        if self.cached.as_ref().is_some_and(|(prev, _)| *prev != deps) {
            self.cached = None;
        }
        let computations = &mut self.computations;
        &self
            .cached
            .get_or_insert_with(|| {
                *computations += 1;
                let value = compute(&deps);
                (deps, value)
            })
            .1
    }

    /// How many times `compute` has run.
    #[must_use]
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

/// Reference-equality wrapper for compound memo dependencies.
///
/// Two `ByRef`s are equal only when they point at the same allocation, so a
/// structurally equal but freshly built value still counts as a change.
#[derive(Debug)]
pub struct ByRef<T>(pub Arc<T>);

impl<T> ByRef<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl<T> Clone for ByRef<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for ByRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for ByRef<T> {}

impl<T> Deref for ByRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Run a [`Debounce`] on `tokio::time`.
///
/// Values sent on the returned sender come out of the returned receiver once
/// they have been quiet for `delay`. Dropping the sender flushes the pending
/// value at its deadline and ends the task.
pub fn spawn_debouncer<T>(
    delay: Duration,
) -> (mpsc::UnboundedSender<T>, mpsc::UnboundedReceiver<T>)
where
    T: Clone + PartialEq + Send + 'static,
{
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<T>();
    let (output_tx, output_rx) = mpsc::unbounded_channel::<T>();

    tokio::spawn(async move {
        let mut debounce = Debounce::new(delay);
        loop {
            let deadline = debounce.deadline();
            tokio::select! {
                received = input_rx.recv() => {
                    let Some(value) = received else { break };
                    if let Some(due) = debounce.push(value, Instant::now()) {
                        if output_tx.send(due).is_err() {
                            return;
                        }
                    }
                }
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    if let Some(due) = debounce.poll(Instant::now()) {
                        if output_tx.send(due).is_err() {
                            return;
                        }
                    }
                }
            }
        }

        if let Some(deadline) = debounce.deadline() {
            tokio::time::sleep_until(deadline).await;
            if let Some(due) = debounce.poll(Instant::now()) {
                let _ = output_tx.send(due);
            }
        }
    });

    (input_tx, output_rx)
}

/// Run a [`Throttle`] on `tokio::time`.
///
/// Dropping the sender emits the last survivor at its window end and ends
/// the task.
pub fn spawn_throttler<T>(
    limit: Duration,
) -> (mpsc::UnboundedSender<T>, mpsc::UnboundedReceiver<T>)
where
    T: Send + 'static,
{
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<T>();
    let (output_tx, output_rx) = mpsc::unbounded_channel::<T>();

    tokio::spawn(async move {
        let mut throttle = Throttle::new(limit);
        loop {
            let window_end = throttle.window_end();
            tokio::select! {
                received = input_rx.recv() => {
                    let Some(value) = received else { break };
                    if let Some(emit) = throttle.push(value, Instant::now()) {
                        if output_tx.send(emit).is_err() {
                            return;
                        }
                    }
                }
                () = tokio::time::sleep_until(window_end.unwrap_or_else(Instant::now)),
                    if window_end.is_some() =>
                {
                    if let Some(emit) = throttle.tick(Instant::now()) {
                        if output_tx.send(emit).is_err() {
                            return;
                        }
                    }
                }
            }
        }

        if let Some(end) = throttle.window_end() {
            tokio::time::sleep_until(end).await;
            if let Some(emit) = throttle.tick(Instant::now()) {
                let _ = output_tx.send(emit);
            }
        }
    });

    (input_tx, output_rx)
}

#[cfg(test)]
#[path = "stabilize_test.rs"]
mod tests;
