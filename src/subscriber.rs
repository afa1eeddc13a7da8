//! Subscriber machinery.
//!
//! A consumer is assembled from two halves: a *sink*, the reaction code an
//! operator or end user writes, and the [`Subscriber`] shell, which owns the
//! exactly-once disposal and completion guards plus the upstream slot. The
//! shell is written once and parametrized by the sink, so no operator ever
//! duplicates the lifecycle machinery.

use std::sync::Arc;

use crate::{
  error::SharedError,
  slot::SourceSlot,
  subscription::{DisposeGate, OnceFlag, Subscription},
};

// ============================================================================
// Sink capability traits
// ============================================================================

/// Lifecycle half shared by every sink flavor.
pub trait Sink: Send + Sync {
  /// Releases resources owned by this sink. Runs exactly once, from the
  /// winning unsubscribe call, before the upstream cascade.
  fn on_unsubscribe(&self) {}

  /// A non-terminal error signal travelling downstream. The stream stays
  /// live. Sinks that do not forward it anywhere get this default, which
  /// records the drop and moves on.
  fn on_error_resume(&self, error: SharedError) {
    tracing::debug!(error = %error, "error-resume signal reached a sink that does not handle it");
  }
}

/// Value half of a subscriber: receives each produced value.
pub trait EventSink<T>: Sink {
  fn on_next(&self, value: T);
}

/// Completion half of a completable subscriber.
pub trait CompletableSink<C>: Sink {
  /// Completion hook, run at most once with the terminal payload. A returned
  /// error propagates to the completion caller *after* disposal has run.
  fn on_completed(&self, completion: C) -> Result<(), SharedError>;
}

/// Value-only sink built from a closure.
///
/// ```
/// use rivulet::prelude::*;
///
/// let sink = FnSink(|v: i32| println!("{v}"));
/// ```
#[derive(Clone)]
pub struct FnSink<F>(pub F);

impl<F: Send + Sync> Sink for FnSink<F> {}

impl<T, F> EventSink<T> for FnSink<F>
where
  F: Fn(T) + Send + Sync,
{
  #[inline]
  fn on_next(&self, value: T) { (self.0)(value) }
}

// ============================================================================
// Subscriber
// ============================================================================

/// The consumer shell: sink plus lifecycle state.
///
/// Producers hold an `Arc<Subscriber<K>>` and invoke callbacks through it
/// from whatever thread produced the value; they never own the subscriber.
/// The same `Arc` doubles as the disposal handle returned from `subscribe`,
/// which is what lets subscription chains compose.
///
/// Delivery is gated on the disposed and completed flags. A callback already
/// in flight on another thread may still observe pre-dispose state (a
/// tolerated window), but no callback starts after an `unsubscribe` call has
/// returned, because unsubscribe blocks until teardown finished.
pub struct Subscriber<K> {
  sink: K,
  gate: DisposeGate,
  completed: OnceFlag,
  source: SourceSlot,
}

impl<K: Sink> Subscriber<K> {
  pub fn new(sink: K) -> Arc<Self> {
    Arc::new(Subscriber {
      sink,
      gate: DisposeGate::new(),
      completed: OnceFlag::new(),
      source: SourceSlot::new(),
    })
  }

  pub(crate) fn source(&self) -> &SourceSlot { &self.source }

  #[inline]
  fn is_live(&self) -> bool { !self.gate.is_closed() && !self.completed.is_set() }

  /// Delivers one value to the sink, unless the subscriber reached a
  /// terminal state.
  pub fn next<T>(&self, value: T)
  where
    K: EventSink<T>,
  {
    if !self.is_live() {
      return;
    }
    self.sink.on_next(value);
  }

  /// Forwards a non-terminal error signal to the sink.
  pub fn error_resume(&self, error: SharedError) {
    if !self.is_live() {
      return;
    }
    self.sink.on_error_resume(error);
  }

  /// Terminates the subscriber with `completion`.
  ///
  /// Exactly one caller wins the completed flag and runs the completion
  /// hook; disposal then runs unconditionally, even when the hook failed, so
  /// a misbehaving hook can never leave the subscriber half-alive. The
  /// hook's error is returned afterwards. Redundant calls are no-ops.
  pub fn complete<C>(&self, completion: C) -> Result<(), SharedError>
  where
    K: CompletableSink<C>,
  {
    if self.gate.is_closed() || !self.completed.try_claim() {
      return Ok(());
    }
    let outcome = self.sink.on_completed(completion);
    self.unsubscribe();
    outcome
  }
}

impl<K: Sink> Subscription for Subscriber<K> {
  /// First caller runs the sink teardown, then closes the upstream slot
  /// (cascading cancellation upstream); everyone else blocks until that
  /// finished, then returns.
  fn unsubscribe(&self) {
    self.gate.dispose(|| {
      self.sink.on_unsubscribe();
      self.source.unsubscribe();
    });
  }

  #[inline]
  fn is_closed(&self) -> bool { self.gate.is_closed() }
}

// ============================================================================
// Tests
// ============================================================================
