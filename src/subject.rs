//! Subjects: hot, multicast push sources.
//!
//! A subject is both the producer callers subscribe to and the surface the
//! owning side pushes into. Cloning a subject clones a handle to the same
//! subscriber list, so one half of the program can hold the emitting side
//! while another subscribes.
//!
//! Emission snapshots the live subscriber list under the lock and delivers
//! outside it, so callbacks are free to subscribe or unsubscribe without
//! deadlocking the subject. A subscriber added from inside a callback does
//! not see the in-progress emission.

use std::sync::{Arc, Mutex, Weak};

use smallvec::SmallVec;

use crate::{
  error::SharedError,
  event::{CompletableEvent, Event},
  subscriber::{CompletableSink, EventSink, Subscriber},
  subscription::{DisposeGate, NopSubscription, Subscription, SubscriptionHandle},
};

// ============================================================================
// Delivery targets (type-erased subscribers)
// ============================================================================

trait ValueTarget<T>: Send + Sync {
  fn deliver(&self, value: T);
  fn is_stopped(&self) -> bool;
}

impl<T, K: EventSink<T>> ValueTarget<T> for Subscriber<K> {
  fn deliver(&self, value: T) { self.next(value) }

  fn is_stopped(&self) -> bool { self.is_closed() }
}

trait CompletableTarget<T, C>: Send + Sync {
  fn deliver(&self, value: T);
  fn deliver_error(&self, error: SharedError);
  fn finish(&self, completion: C) -> Result<(), SharedError>;
  fn is_stopped(&self) -> bool;
}

impl<T, C, K> CompletableTarget<T, C> for Subscriber<K>
where
  K: EventSink<T> + CompletableSink<C>,
{
  fn deliver(&self, value: T) { self.next(value) }

  fn deliver_error(&self, error: SharedError) { self.error_resume(error) }

  fn finish(&self, completion: C) -> Result<(), SharedError> { self.complete(completion) }

  fn is_stopped(&self) -> bool { self.is_closed() }
}

// ============================================================================
// Detach handle
// ============================================================================

trait RemoveById {
  fn remove(&mut self, id: u64);
}

/// Handle a subject gives each subscriber; unsubscribing removes the entry
/// from the subject's list. Holds only a weak reference so the handle never
/// keeps the subject alive.
struct DetachSubscription<L> {
  id: u64,
  list: Weak<Mutex<L>>,
  gate: DisposeGate,
}

impl<L: RemoveById + Send> Subscription for DetachSubscription<L> {
  fn unsubscribe(&self) {
    self.gate.dispose(|| {
      if let Some(list) = self.list.upgrade() {
        list.lock().unwrap().remove(self.id);
      }
    });
  }

  fn is_closed(&self) -> bool { self.gate.is_closed() }
}

// ============================================================================
// Value-only subject
// ============================================================================

struct SubjectInner<T> {
  next_id: u64,
  entries: SmallVec<[(u64, Arc<dyn ValueTarget<T>>); 1]>,
}

impl<T> Default for SubjectInner<T> {
  fn default() -> Self { SubjectInner { next_id: 0, entries: SmallVec::new() } }
}

impl<T> RemoveById for SubjectInner<T> {
  fn remove(&mut self, id: u64) { self.entries.retain(|(entry_id, _)| *entry_id != id); }
}

/// A hot source that multicasts each value to every live subscriber.
pub struct Subject<T> {
  inner: Arc<Mutex<SubjectInner<T>>>,
}

impl<T> Clone for Subject<T> {
  fn clone(&self) -> Self { Subject { inner: self.inner.clone() } }
}

impl<T> Default for Subject<T> {
  fn default() -> Self { Self::new() }
}

impl<T> Subject<T> {
  pub fn new() -> Self { Subject { inner: Arc::new(Mutex::new(SubjectInner::default())) } }

  /// Pushes one value to every live subscriber.
  pub fn next(&self, value: T)
  where
    T: Clone,
  {
    for target in self.live_targets() {
      target.deliver(value.clone());
    }
  }

  pub fn subscriber_count(&self) -> usize { self.inner.lock().unwrap().entries.len() }

  pub fn is_empty(&self) -> bool { self.inner.lock().unwrap().entries.is_empty() }

  /// Prunes stopped subscribers and snapshots the rest.
  fn live_targets(&self) -> SmallVec<[Arc<dyn ValueTarget<T>>; 1]> {
    let mut inner = self.inner.lock().unwrap();
    inner.entries.retain(|(_, target)| !target.is_stopped());
    inner.entries.iter().map(|(_, target)| target.clone()).collect()
  }
}

impl<T: 'static> Event<T> for Subject<T> {
  fn subscribe_core<K>(
    &self,
    subscriber: &Arc<Subscriber<K>>,
  ) -> Result<SubscriptionHandle, SharedError>
  where
    K: EventSink<T> + 'static,
  {
    let mut inner = self.inner.lock().unwrap();
    let id = inner.next_id;
    inner.next_id += 1;
    inner.entries.push((id, subscriber.clone() as Arc<dyn ValueTarget<T>>));
    Ok(Arc::new(DetachSubscription {
      id,
      list: Arc::downgrade(&self.inner),
      gate: DisposeGate::new(),
    }))
  }
}

// ============================================================================
// Completable subject
// ============================================================================

struct CompletableInner<T, C> {
  next_id: u64,
  closed: bool,
  entries: SmallVec<[(u64, Arc<dyn CompletableTarget<T, C>>); 1]>,
}

impl<T, C> Default for CompletableInner<T, C> {
  fn default() -> Self { CompletableInner { next_id: 0, closed: false, entries: SmallVec::new() } }
}

impl<T, C> RemoveById for CompletableInner<T, C> {
  fn remove(&mut self, id: u64) { self.entries.retain(|(entry_id, _)| *entry_id != id); }
}

/// A hot multicast source with one typed terminal payload.
///
/// `complete` drains the subscriber list and closes the subject; subscribers
/// arriving afterwards stay attached but receive nothing further (terminal
/// payloads are not replayed).
pub struct CompletableSubject<T, C> {
  inner: Arc<Mutex<CompletableInner<T, C>>>,
}

impl<T, C> Clone for CompletableSubject<T, C> {
  fn clone(&self) -> Self { CompletableSubject { inner: self.inner.clone() } }
}

impl<T, C> Default for CompletableSubject<T, C> {
  fn default() -> Self { Self::new() }
}

impl<T, C> CompletableSubject<T, C> {
  pub fn new() -> Self {
    CompletableSubject { inner: Arc::new(Mutex::new(CompletableInner::default())) }
  }

  /// Pushes one value to every live subscriber.
  pub fn next(&self, value: T)
  where
    T: Clone,
  {
    for target in self.live_targets() {
      target.deliver(value.clone());
    }
  }

  /// Broadcasts a non-terminal error signal; the subject stays open.
  pub fn error_resume(&self, error: SharedError) {
    for target in self.live_targets() {
      target.deliver_error(error.clone());
    }
  }

  /// Terminates the subject, completing every subscriber exactly once.
  ///
  /// The first failing completion hook decides the returned error; later
  /// hook failures are logged and dropped, since each subscriber was still
  /// disposed by its own completion guard.
  pub fn complete(&self, completion: C) -> Result<(), SharedError>
  where
    C: Clone,
  {
    let drained = {
      let mut inner = self.inner.lock().unwrap();
      if inner.closed {
        return Ok(());
      }
      inner.closed = true;
      std::mem::take(&mut inner.entries)
    };

    let mut first_failure = None;
    for (_, target) in drained {
      if let Err(error) = target.finish(completion.clone()) {
        if first_failure.is_none() {
          first_failure = Some(error);
        } else {
          tracing::debug!(error = %error, "additional completion hook failure dropped");
        }
      }
    }
    first_failure.map_or(Ok(()), Err)
  }

  pub fn is_terminated(&self) -> bool { self.inner.lock().unwrap().closed }

  pub fn subscriber_count(&self) -> usize { self.inner.lock().unwrap().entries.len() }

  fn live_targets(&self) -> SmallVec<[Arc<dyn CompletableTarget<T, C>>; 1]> {
    let mut inner = self.inner.lock().unwrap();
    inner.entries.retain(|(_, target)| !target.is_stopped());
    inner.entries.iter().map(|(_, target)| target.clone()).collect()
  }
}

impl<T: 'static, C: 'static> CompletableEvent<T, C> for CompletableSubject<T, C> {
  fn subscribe_core<K>(
    &self,
    subscriber: &Arc<Subscriber<K>>,
  ) -> Result<SubscriptionHandle, SharedError>
  where
    K: EventSink<T> + CompletableSink<C> + 'static,
  {
    let mut inner = self.inner.lock().unwrap();
    if inner.closed {
      return Ok(Arc::new(NopSubscription));
    }
    let id = inner.next_id;
    inner.next_id += 1;
    inner
      .entries
      .push((id, subscriber.clone() as Arc<dyn CompletableTarget<T, C>>));
    Ok(Arc::new(DetachSubscription {
      id,
      list: Arc::downgrade(&self.inner),
      gate: DisposeGate::new(),
    }))
  }
}

// ============================================================================
// Tests
// ============================================================================
