//! Producer protocol.
//!
//! An [`Event`] pushes values at a subscriber; a [`CompletableEvent`]
//! additionally delivers one typed terminal payload. Producers implement only
//! the wiring (`subscribe_core`); the provided `subscribe` wraps it with the
//! lifecycle guarantees every caller relies on: a failed wiring detaches the
//! subscriber before the error propagates, and a successful wiring lands its
//! handle in the subscriber's single-assignment slot.

use std::{sync::Arc, time::Duration};

use crate::{
  error::SharedError,
  ops::debounce::DebounceOp,
  subscriber::{CompletableSink, EventSink, Sink, Subscriber},
  subscription::{Subscription, SubscriptionHandle},
  timer::TimeSource,
  tracker,
};

/// Terminal outcome of a completable stream.
#[derive(Clone, Debug)]
pub enum Completion {
  /// The stream ran to its natural end.
  Done,
  /// The stream stopped because of an error.
  Failed(SharedError),
}

impl Completion {
  #[inline]
  pub fn is_done(&self) -> bool { matches!(self, Completion::Done) }

  #[inline]
  pub fn is_failed(&self) -> bool { matches!(self, Completion::Failed(_)) }
}

// ============================================================================
// Producer traits
// ============================================================================

/// A push-based source of values.
pub trait Event<T> {
  /// Producer wiring: connect `subscriber` to the source and return the
  /// handle that cancels the connection. Callbacks may start flowing before
  /// this returns.
  fn subscribe_core<K>(
    &self,
    subscriber: &Arc<Subscriber<K>>,
  ) -> Result<SubscriptionHandle, SharedError>
  where
    K: EventSink<T> + 'static;

  /// Subscribes `sink` to this source.
  ///
  /// The returned subscriber *is* the disposal handle; unsubscribing it
  /// tears down the whole chain. If wiring fails the subscriber is disposed
  /// before the error is returned unchanged, so no half-wired consumer
  /// survives a failed setup.
  fn subscribe<K>(&self, sink: K) -> Result<Arc<Subscriber<K>>, SharedError>
  where
    K: EventSink<T> + 'static,
  {
    let subscriber = Subscriber::new(sink);
    finish_subscribe(subscriber, |s| self.subscribe_core(s))
  }
}

/// A push-based source of values with one typed terminal payload.
pub trait CompletableEvent<T, C> {
  fn subscribe_core<K>(
    &self,
    subscriber: &Arc<Subscriber<K>>,
  ) -> Result<SubscriptionHandle, SharedError>
  where
    K: EventSink<T> + CompletableSink<C> + 'static;

  /// Subscribes `sink` to this source; same contract as
  /// [`Event::subscribe`].
  fn subscribe<K>(&self, sink: K) -> Result<Arc<Subscriber<K>>, SharedError>
  where
    K: EventSink<T> + CompletableSink<C> + 'static,
  {
    let subscriber = Subscriber::new(sink);
    finish_subscribe(subscriber, |s| self.subscribe_core(s))
  }
}

/// Shared tail of both `subscribe` flavors: wire, track, store the handle,
/// or detach on failure.
fn finish_subscribe<K: Sink + 'static>(
  subscriber: Arc<Subscriber<K>>,
  wire: impl FnOnce(&Arc<Subscriber<K>>) -> Result<SubscriptionHandle, SharedError>,
) -> Result<Arc<Subscriber<K>>, SharedError> {
  match wire(&subscriber) {
    Ok(handle) => {
      let handle = tracker::try_track(handle);
      if let Err(error) = subscriber.source().assign(handle) {
        subscriber.unsubscribe();
        return Err(Arc::new(error));
      }
      Ok(subscriber)
    }
    Err(error) => {
      tracing::debug!(error = %error, "producer wiring failed, detaching subscriber");
      subscriber.unsubscribe();
      Err(error)
    }
  }
}

// ============================================================================
// Operator extensions
// ============================================================================

/// Operator methods available on every completable source.
pub trait CompletableEventExt<T, C>: CompletableEvent<T, C> + Sized {
  /// Emits only the most recent upstream value once no newer value arrived
  /// for `window`; a pending value is flushed on upstream completion.
  fn debounce<TS: TimeSource>(self, window: Duration, time_source: TS) -> DebounceOp<Self, TS> {
    DebounceOp { source: self, window, time_source }
  }
}

impl<T, C, S: CompletableEvent<T, C>> CompletableEventExt<T, C> for S {}

// ============================================================================
// Tests
// ============================================================================
