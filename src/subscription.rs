//! Disposal primitives.
//!
//! A [`Subscription`] is a live registration: unsubscribing it stops further
//! callbacks and releases whatever the registration owns. Every teardown in
//! this crate funnels through the exactly-once guards defined here, so
//! operators never have to re-invent disposal safety.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Mutex, Once,
};

/// A live registration that can be cancelled.
///
/// `unsubscribe` may be called from any thread, any number of times; only the
/// first call performs teardown. `is_closed` reports whether teardown has
/// been requested.
pub trait Subscription: Send + Sync {
  /// Deregisters the stream before it has finished delivering events and
  /// releases owned resources. Idempotent.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;
}

/// Type-erased, shareable disposal handle.
pub type SubscriptionHandle = Arc<dyn Subscription>;

impl<T: Subscription + ?Sized> Subscription for Arc<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

impl<T: Subscription + ?Sized> Subscription for Box<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

// ============================================================================
// Exactly-once guards
// ============================================================================

/// Exactly-once teardown gate.
///
/// The first caller of [`dispose`](Self::dispose) runs the teardown closure;
/// every concurrent caller blocks until that teardown has finished, so no
/// caller ever returns from `dispose` while the resource is still being
/// released. The closed flag is observable (`is_closed`) as soon as any
/// caller has requested disposal, before teardown completes.
///
/// A plain read-then-write boolean is race-prone here: two threads can both
/// observe "not disposed" and both run teardown. The atomic flag plus
/// [`Once`] collapses that into a single winner.
pub struct DisposeGate {
  closed: AtomicBool,
  teardown: Once,
}

impl Default for DisposeGate {
  fn default() -> Self { Self::new() }
}

impl DisposeGate {
  pub const fn new() -> Self {
    DisposeGate { closed: AtomicBool::new(false), teardown: Once::new() }
  }

  /// Runs `teardown` exactly once across all callers; returns only after the
  /// winning teardown has completed.
  pub fn dispose(&self, teardown: impl FnOnce()) {
    self.closed.store(true, Ordering::Release);
    self.teardown.call_once(teardown);
  }

  #[inline]
  pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }
}

/// Non-blocking exactly-once flag.
///
/// Unlike [`DisposeGate`], losers of the race return immediately; the flag
/// only decides a winner. Used for the completion guard, which is
/// independent of the disposed guard.
#[derive(Default)]
pub struct OnceFlag(AtomicBool);

impl OnceFlag {
  pub const fn new() -> Self { OnceFlag(AtomicBool::new(false)) }

  /// Atomically claims the flag. Returns `true` for exactly one caller.
  #[inline]
  pub fn try_claim(&self) -> bool { !self.0.swap(true, Ordering::AcqRel) }

  #[inline]
  pub fn is_set(&self) -> bool { self.0.load(Ordering::Acquire) }
}

// ============================================================================
// Handles
// ============================================================================

/// A subscription with nothing to release.
///
/// Producers that finish their work synchronously inside wiring return this;
/// it reports closed from the start.
#[derive(Clone, Copy, Debug, Default)]
pub struct NopSubscription;

impl Subscription for NopSubscription {
  #[inline]
  fn unsubscribe(&self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

/// Runs a teardown closure exactly once when unsubscribed.
pub struct FnSubscription<F> {
  gate: DisposeGate,
  teardown: Mutex<Option<F>>,
}

impl<F: FnOnce() + Send> FnSubscription<F> {
  pub fn new(teardown: F) -> Self {
    FnSubscription { gate: DisposeGate::new(), teardown: Mutex::new(Some(teardown)) }
  }
}

impl<F: FnOnce() + Send> Subscription for FnSubscription<F> {
  fn unsubscribe(&self) {
    self.gate.dispose(|| {
      if let Some(teardown) = self.teardown.lock().unwrap().take() {
        teardown();
      }
    });
  }

  #[inline]
  fn is_closed(&self) -> bool { self.gate.is_closed() }
}

/// An RAII wrapper that unsubscribes when dropped (falls out of scope).
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(T);

impl<T: Subscription> SubscriptionGuard<T> {
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }
}

impl<T: Subscription> Subscription for SubscriptionGuard<T> {
  #[inline]
  fn unsubscribe(&self) { self.0.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}

// ============================================================================
// Tests
// ============================================================================
