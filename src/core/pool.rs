//! The generic quota pool engine.
//!
//! A [`QuotaPool`] owns a depletable quantity of some resource and an ordered
//! queue of outstanding requests for it. Callers acquire a fixed amount, or
//! supply a decision callback sized against the live available quota, and
//! receive an [`Alloc`] that must be returned to the pool. Requests that
//! cannot be satisfied immediately park their task on a per-request,
//! single-use notification channel until the pool's wake logic resolves it.
//!
//! The queue is strictly FIFO by arrival, with head-of-line blocking: only
//! the request at the head is ever evaluated when quota changes, and a head
//! that cannot yet proceed is never skipped in favor of a smaller request
//! behind it. This trades possible underutilization for starvation-freedom
//! of long-waiting large requests.
//!
//! All state transitions happen under a single `parking_lot::Mutex`; decision
//! callbacks run while it is held, which is what makes them an atomic,
//! consistent read of pool state. They must therefore not block, perform I/O,
//! or call back into the same pool.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::core::error::PoolError;
use crate::core::quota::Quota;

/// How long a request may wait before the slow-acquisition diagnostics fire,
/// unless overridden via [`PoolOptions::with_slow_acquire`].
pub const DEFAULT_SLOW_ACQUIRE_THRESHOLD: Duration = Duration::from_secs(5);

/// Diagnostic hook invoked with the pool name and the time waited so far when
/// a request has been parked longer than the slow-acquisition threshold.
pub type SlowAcquireHook = Arc<dyn Fn(&str, Duration) + Send + Sync>;

/// Outcome of a decision callback passed to [`QuotaPool::acquire_func`].
///
/// The callback is evaluated against the quota available at the moment it is
/// this request's turn, so the decision can be context-sensitive (for
/// example, "take the largest unit of work that currently fits").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision<Q> {
    /// Take this much quota now. Taking more than is available is a caller
    /// bug and fails the acquisition with
    /// [`PoolError::InternalInvariantViolation`].
    Take(Q),
    /// There is nothing left to take; resolve the request immediately with
    /// no allocation and no error.
    Stop,
    /// Not enough quota yet; stay at the head of the queue and keep waiting.
    Wait,
}

/// Construction options for a [`QuotaPool`].
pub struct PoolOptions<Q: Quota> {
    max_capacity: Option<Q>,
    unbounded: bool,
    slow_acquire_threshold: Duration,
    on_slow_acquire: Option<SlowAcquireHook>,
}

impl<Q: Quota> Default for PoolOptions<Q> {
    fn default() -> Self {
        Self {
            max_capacity: None,
            unbounded: false,
            slow_acquire_threshold: DEFAULT_SLOW_ACQUIRE_THRESHOLD,
            on_slow_acquire: None,
        }
    }
}

impl<Q: Quota> PoolOptions<Q> {
    /// Create options with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the total quota ever outstanding to `max`, independently of the
    /// initial amount. Without this, the bound is the initial capacity.
    #[must_use]
    pub fn with_max_capacity(mut self, max: Q) -> Self {
        self.max_capacity = Some(max);
        self
    }

    /// Leave the pool unbounded: no fixed acquisition is ever rejected as
    /// exceeding capacity, and the conservation bound is not tracked.
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.unbounded = true;
        self
    }

    /// Install a diagnostic hook fired once per request after it has waited
    /// longer than `threshold`. Purely observational; grant order is
    /// unaffected.
    #[must_use]
    pub fn with_slow_acquire(mut self, threshold: Duration, hook: SlowAcquireHook) -> Self {
        self.slow_acquire_threshold = threshold;
        self.on_slow_acquire = Some(hook);
        self
    }
}

/// A queued request. The request's kind (fixed amount or decision callback)
/// lives in the caller's future; the queue only tracks arrival order and the
/// single-use wake channel.
struct Waiter {
    seq: u64,
    notify: Option<oneshot::Sender<()>>,
}

struct PoolState<Q: Quota> {
    available: Q,
    /// Upper bound on quota ever outstanding. `None` means unbounded.
    capacity: Option<Q>,
    /// Close reason; set at most once.
    closed: Option<String>,
    next_seq: u64,
    queue: VecDeque<Waiter>,
}

struct PoolCore<Q: Quota> {
    name: String,
    slow_acquire_threshold: Duration,
    on_slow_acquire: Option<SlowAcquireHook>,
    state: Mutex<PoolState<Q>>,
}

/// Wake the request at the head of the queue, if it has an armed channel.
fn notify_head<Q: Quota>(st: &mut PoolState<Q>) {
    if let Some(head) = st.queue.front_mut() {
        if let Some(tx) = head.notify.take() {
            let _ = tx.send(());
        }
    }
}

impl<Q: Quota> PoolCore<Q> {
    fn release_quota(&self, amount: Q) {
        let mut st = self.state.lock();
        st.available = st.available.add(amount);
        notify_head(&mut st);
    }
}

/// Removes a parked request from the queue if its future is dropped before
/// it resolves. Promotes and wakes the next request when the head departs.
struct WaitGuard<'a, Q: Quota> {
    core: &'a PoolCore<Q>,
    seq: u64,
    armed: bool,
}

impl<Q: Quota> Drop for WaitGuard<'_, Q> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut st = self.core.state.lock();
        if let Some(pos) = st.queue.iter().position(|w| w.seq == self.seq) {
            st.queue.remove(pos);
            if pos == 0 {
                notify_head(&mut st);
            }
        }
    }
}

/// Result of evaluating a request against the live pool state, under the
/// lock. Produced by the per-kind grant closures in `acquire`/`acquire_func`.
enum Step<Q> {
    Granted(Q),
    Stop,
    Wait,
    Fail(PoolError),
}

/// Quota carved out of a pool. Must be returned exactly once, either via
/// [`Alloc::release`] or implicitly on drop.
pub struct Alloc<Q: Quota> {
    amount: Q,
    core: Arc<PoolCore<Q>>,
    released: bool,
}

impl<Q: Quota> Alloc<Q> {
    fn new(core: Arc<PoolCore<Q>>, amount: Q) -> Self {
        Self {
            amount,
            core,
            released: false,
        }
    }

    /// The amount of quota held by this allocation.
    pub fn amount(&self) -> Q {
        self.amount
    }

    /// Return the held quota to the pool and wake the head of the queue.
    ///
    /// Safe to call from any task, independent of which task acquired.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AllocReleased`] on the second and subsequent
    /// calls; `available` is only ever credited once.
    pub fn release(&mut self) -> Result<(), PoolError> {
        if self.released {
            return Err(PoolError::AllocReleased);
        }
        self.released = true;
        self.core.release_quota(self.amount);
        Ok(())
    }
}

impl<Q: Quota> fmt::Debug for Alloc<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alloc")
            .field("pool", &self.core.name)
            .field("amount", &self.amount)
            .field("released", &self.released)
            .finish()
    }
}

impl<Q: Quota> Drop for Alloc<Q> {
    fn drop(&mut self) {
        // Leaked allocations would silently shrink the pool, so unreleased
        // quota is returned here.
        if !self.released {
            self.released = true;
            self.core.release_quota(self.amount);
        }
    }
}

/// A FIFO pool of depletable quota, generic over the quantity type.
///
/// Cloning is shallow; clones share the same pool. The pool is an explicitly
/// owned object injected into whatever needs admission control, never a
/// process-wide singleton; [`QuotaPool::close`] is the teardown hook.
pub struct QuotaPool<Q: Quota> {
    core: Arc<PoolCore<Q>>,
}

impl<Q: Quota> fmt::Debug for QuotaPool<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.core.state.lock();
        f.debug_struct("QuotaPool")
            .field("name", &self.core.name)
            .field("available", &st.available)
            .field("capacity", &st.capacity)
            .field("queued", &st.queue.len())
            .field("closed", &st.closed.is_some())
            .finish()
    }
}

impl<Q: Quota> Clone for QuotaPool<Q> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<Q: Quota> QuotaPool<Q> {
    /// Create a pool holding `initial` quota, bounded by `initial`.
    /// The name exists purely for logging and diagnostics.
    pub fn new(name: impl Into<String>, initial: Q) -> Self {
        Self::with_options(name, initial, PoolOptions::default())
    }

    /// Create a pool with explicit [`PoolOptions`].
    pub fn with_options(name: impl Into<String>, initial: Q, opts: PoolOptions<Q>) -> Self {
        let capacity = if opts.unbounded {
            None
        } else {
            Some(opts.max_capacity.unwrap_or(initial))
        };
        Self {
            core: Arc::new(PoolCore {
                name: name.into(),
                slow_acquire_threshold: opts.slow_acquire_threshold,
                on_slow_acquire: opts.on_slow_acquire,
                state: Mutex::new(PoolState {
                    available: initial,
                    capacity,
                    closed: None,
                    next_seq: 0,
                    queue: VecDeque::new(),
                }),
            }),
        }
    }

    /// The name this pool was constructed with.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Acquire a fixed `amount` of quota, parking until it is available.
    ///
    /// Grants synchronously when the queue is empty and `amount` fits;
    /// otherwise joins the FIFO queue. Cancellation is by dropping the
    /// returned future (see also [`QuotaPool::acquire_timeout`]); a dropped
    /// request leaves the queue and never holds quota.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidRequest`] when `amount` is invalid or exceeds the
    /// pool's capacity bound (the request could never succeed), and
    /// [`PoolError::Closed`] when the pool is, or becomes, closed.
    pub async fn acquire(&self, amount: Q) -> Result<Alloc<Q>, PoolError> {
        if !amount.is_valid() {
            return Err(PoolError::InvalidRequest(format!(
                "pool {}: cannot acquire {amount:?}",
                self.core.name
            )));
        }
        let name = self.core.name.clone();
        let granted = self
            .acquire_inner(
                |st: &PoolState<Q>| {
                    if let Some(cap) = st.capacity {
                        if !amount.fits_in(cap) {
                            return Err(PoolError::InvalidRequest(format!(
                                "pool {name}: acquisition of {amount:?} exceeds capacity {cap:?}"
                            )));
                        }
                    }
                    Ok(())
                },
                |st| {
                    if amount.fits_in(st.available) {
                        st.available = st.available.sub(amount);
                        Step::Granted(amount)
                    } else {
                        Step::Wait
                    }
                },
            )
            .await?;
        match granted {
            Some(alloc) => Ok(alloc),
            // a fixed request only ever resolves by grant, cancel, or close
            None => Err(PoolError::InternalInvariantViolation(format!(
                "pool {}: fixed acquisition resolved without a grant",
                self.core.name
            ))),
        }
    }

    /// Like [`QuotaPool::acquire`], but fails with [`PoolError::Canceled`]
    /// if not granted within `timeout`. A zero timeout fails before the
    /// first synchronous check, taking no quota.
    ///
    /// # Errors
    ///
    /// As [`QuotaPool::acquire`], plus [`PoolError::Canceled`] on expiry.
    pub async fn acquire_timeout(&self, amount: Q, timeout: Duration) -> Result<Alloc<Q>, PoolError> {
        if timeout.is_zero() {
            return Err(PoolError::Canceled(self.core.name.clone()));
        }
        match tokio::time::timeout(timeout, self.acquire(amount)).await {
            Ok(res) => res,
            Err(_) => Err(PoolError::Canceled(self.core.name.clone())),
        }
    }

    /// Acquire a caller-decided amount of quota.
    ///
    /// `decide` is invoked with the live available quota, under the pool's
    /// internal lock, at the moment it is this request's turn: first
    /// synchronously if the queue is empty, then again each time quota
    /// changes while the request is at the head. It must be non-blocking,
    /// must not perform I/O, and must not call back into this pool.
    ///
    /// Returns `Ok(None)` when `decide` resolves with [`Decision::Stop`],
    /// meaning the caller's own demand source is exhausted.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] when the pool is, or becomes, closed;
    /// [`PoolError::InternalInvariantViolation`] when `decide` tries to take
    /// more than is available (nothing is taken in that case).
    pub async fn acquire_func<F>(&self, mut decide: F) -> Result<Option<Alloc<Q>>, PoolError>
    where
        F: FnMut(Q) -> Decision<Q>,
    {
        let name = self.core.name.clone();
        self.acquire_inner(
            |_| Ok(()),
            move |st| match decide(st.available) {
                Decision::Take(take) => {
                    if !take.is_valid() || !take.fits_in(st.available) {
                        tracing::error!(
                            pool = %name,
                            take = ?take,
                            available = ?st.available,
                            "decision callback took more quota than available"
                        );
                        return Step::Fail(PoolError::InternalInvariantViolation(format!(
                            "pool {name}: decision took {take:?} with {:?} available",
                            st.available
                        )));
                    }
                    st.available = st.available.sub(take);
                    Step::Granted(take)
                }
                Decision::Stop => Step::Stop,
                Decision::Wait => Step::Wait,
            },
        )
        .await
    }

    /// Like [`QuotaPool::acquire_func`], but fails with
    /// [`PoolError::Canceled`] if not resolved within `timeout`.
    ///
    /// # Errors
    ///
    /// As [`QuotaPool::acquire_func`], plus [`PoolError::Canceled`] on
    /// expiry.
    pub async fn acquire_func_timeout<F>(
        &self,
        decide: F,
        timeout: Duration,
    ) -> Result<Option<Alloc<Q>>, PoolError>
    where
        F: FnMut(Q) -> Decision<Q>,
    {
        if timeout.is_zero() {
            return Err(PoolError::Canceled(self.core.name.clone()));
        }
        match tokio::time::timeout(timeout, self.acquire_func(decide)).await {
            Ok(res) => res,
            Err(_) => Err(PoolError::Canceled(self.core.name.clone())),
        }
    }

    /// Administratively add `delta` quota to the pool, raising both the
    /// available amount and the capacity bound, and re-evaluate the head of
    /// the queue.
    pub fn add_capacity(&self, delta: Q) {
        debug_assert!(delta.is_valid());
        let mut st = self.core.state.lock();
        st.available = st.available.add(delta);
        st.capacity = st.capacity.map(|c| c.add(delta));
        notify_head(&mut st);
    }

    /// Close the pool: fail every queued request with [`PoolError::Closed`]
    /// and make all subsequent acquisitions fail immediately. Idempotent,
    /// and safe to call concurrently with any number of outstanding
    /// acquisitions and releases. Outstanding allocations may still be
    /// released afterwards.
    pub fn close(&self, reason: &str) {
        let mut st = self.core.state.lock();
        if st.closed.is_some() {
            return;
        }
        tracing::debug!(
            pool = %self.core.name,
            reason,
            waiters = st.queue.len(),
            "closing quota pool"
        );
        st.closed = Some(format!("{}: {reason}", self.core.name));
        // Dropping the queue entries drops their wake channels, which
        // unparks every waiter; each then observes `closed` and returns.
        st.queue.clear();
    }

    /// Best-effort snapshot of the available quota, for metrics and
    /// diagnostics only. Not a basis for correctness decisions: the value
    /// may be stale by the time the caller observes it.
    pub fn approximate_quota(&self) -> Q {
        self.core.state.lock().available
    }

    /// The pool's capacity bound, or `None` if unbounded.
    pub fn capacity(&self) -> Option<Q> {
        self.core.state.lock().capacity
    }

    /// Number of requests currently parked in the queue.
    pub fn queue_len(&self) -> usize {
        self.core.state.lock().queue.len()
    }

    /// The shared wait/wake protocol behind both acquisition kinds.
    ///
    /// `check` runs once under the lock before anything is enqueued and
    /// rejects requests that can never succeed. `step` evaluates the request
    /// against live state under the lock: synchronously when the queue is
    /// empty, and again on every wake while this request is the head.
    async fn acquire_inner<C, F>(&self, check: C, mut step: F) -> Result<Option<Alloc<Q>>, PoolError>
    where
        C: FnOnce(&PoolState<Q>) -> Result<(), PoolError>,
        F: FnMut(&mut PoolState<Q>) -> Step<Q>,
    {
        let (seq, mut rx) = {
            let mut st = self.core.state.lock();
            if let Some(reason) = &st.closed {
                return Err(PoolError::Closed(reason.clone()));
            }
            check(&st)?;
            // FIFO: the fast path applies only when nothing is queued ahead.
            if st.queue.is_empty() {
                match step(&mut st) {
                    Step::Granted(amount) => {
                        return Ok(Some(Alloc::new(Arc::clone(&self.core), amount)));
                    }
                    Step::Stop => return Ok(None),
                    Step::Fail(err) => return Err(err),
                    Step::Wait => {}
                }
            }
            let seq = st.next_seq;
            st.next_seq += 1;
            let (tx, rx) = oneshot::channel();
            st.queue.push_back(Waiter {
                seq,
                notify: Some(tx),
            });
            (seq, rx)
        };

        let mut guard = WaitGuard {
            core: &*self.core,
            seq,
            armed: true,
        };
        let start = Instant::now();
        let slow_deadline = start + self.core.slow_acquire_threshold;
        let mut slow_reported = false;

        loop {
            if slow_reported {
                let _ = (&mut rx).await;
            } else {
                tokio::select! {
                    _ = &mut rx => {}
                    () = tokio::time::sleep_until(slow_deadline) => {
                        let waited = start.elapsed();
                        tracing::warn!(
                            pool = %self.core.name,
                            waited = ?waited,
                            "slow quota acquisition"
                        );
                        if let Some(hook) = &self.core.on_slow_acquire {
                            hook(&self.core.name, waited);
                        }
                        slow_reported = true;
                        continue;
                    }
                }
            }

            let mut st = self.core.state.lock();
            if let Some(reason) = &st.closed {
                // close() already drained the queue.
                guard.armed = false;
                return Err(PoolError::Closed(reason.clone()));
            }
            // Wakes are only ever delivered to the head of the queue.
            debug_assert_eq!(st.queue.front().map(|w| w.seq), Some(seq));
            match step(&mut st) {
                Step::Granted(amount) => {
                    st.queue.pop_front();
                    // One departure can free capacity for several requests
                    // behind it; cascade while quota remains.
                    if !st.available.is_zero() {
                        notify_head(&mut st);
                    }
                    guard.armed = false;
                    return Ok(Some(Alloc::new(Arc::clone(&self.core), amount)));
                }
                Step::Stop => {
                    st.queue.pop_front();
                    if !st.available.is_zero() {
                        notify_head(&mut st);
                    }
                    guard.armed = false;
                    return Ok(None);
                }
                Step::Fail(err) => {
                    st.queue.pop_front();
                    if !st.available.is_zero() {
                        notify_head(&mut st);
                    }
                    guard.armed = false;
                    return Err(err);
                }
                Step::Wait => {
                    // Still the head; re-arm a fresh wake channel. Requests
                    // behind this one are deliberately not considered.
                    let (tx, new_rx) = oneshot::channel();
                    if let Some(head) = st.queue.front_mut() {
                        head.notify = Some(tx);
                    }
                    rx = new_rx;
                }
            }
        }
    }
}
