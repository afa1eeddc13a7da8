//! Debounce: collapse bursts, fire after quiescence.
//!
//! Each incoming value replaces the pending one and rearms a one-shot timer;
//! only when the window elapses with no newer arrival is the latest value
//! emitted. A monotonic generation counter distinguishes the current pending
//! state from timer firings that were scheduled for an earlier value, which
//! is what keeps a caller-driven rearm race-free against the firing thread.
//! The same shape (value slot, generation counter, scheduled-callback token
//! behind one lock) extends to any collapse-then-fire operator.

use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc, Mutex,
};

use crate::{
  error::SharedError,
  event::CompletableEvent,
  subscriber::{CompletableSink, EventSink, Sink, Subscriber},
  subscription::SubscriptionHandle,
  timer::{normalize_delay, Duration, TimeSource, TimerHandle},
};

/// Operator returned by
/// [`debounce`](crate::event::CompletableEventExt::debounce).
pub struct DebounceOp<S, TS> {
  pub(crate) source: S,
  pub(crate) window: Duration,
  pub(crate) time_source: TS,
}

impl<T, C, S, TS> CompletableEvent<T, C> for DebounceOp<S, TS>
where
  S: CompletableEvent<T, C>,
  TS: TimeSource,
  T: Send + 'static,
{
  fn subscribe_core<K>(
    &self,
    subscriber: &Arc<Subscriber<K>>,
  ) -> Result<SubscriptionHandle, SharedError>
  where
    K: EventSink<T> + CompletableSink<C> + 'static,
  {
    let core = Arc::new(DebounceCore {
      downstream: subscriber.clone(),
      window: normalize_delay(self.window),
      generation: AtomicU64::new(0),
      state: Mutex::new(PendingState { latest: None, timer: None }),
    });

    // The callback holds only a weak reference; the owned timer handle lives
    // inside the state it fires into, and a strong reference would keep that
    // cycle alive past disposal.
    let weak = Arc::downgrade(&core);
    let timer = self.time_source.create_stopped_timer(Arc::new(move || {
      if let Some(core) = weak.upgrade() {
        let fired_generation = core.generation.load(Ordering::Acquire);
        core.fire(fired_generation);
      }
    }));
    core.state.lock().unwrap().timer = Some(timer);

    let upstream = self.source.subscribe(DebounceSink { core })?;
    Ok(upstream as SubscriptionHandle)
  }
}

struct PendingState<T> {
  latest: Option<T>,
  timer: Option<Box<dyn TimerHandle>>,
}

struct DebounceCore<K, T> {
  downstream: Arc<Subscriber<K>>,
  window: Duration,
  generation: AtomicU64,
  state: Mutex<PendingState<T>>,
}

impl<K, T> DebounceCore<K, T>
where
  K: EventSink<T>,
{
  /// Timer firing path. `fired_generation` was read before the lock; a
  /// mismatch under the lock means a newer value superseded this firing.
  fn fire(&self, fired_generation: u64) {
    let mut state = self.state.lock().unwrap();
    if self.generation.load(Ordering::Acquire) != fired_generation {
      return;
    }
    if let Some(value) = state.latest.take() {
      // Emitting while the lock is held totally orders this emission
      // against concurrent rearms on the same instance. A downstream that
      // synchronously feeds values back into this operator will deadlock;
      // insert an explicit async boundary for feedback loops.
      self.downstream.next(value);
    }
  }
}

/// The sink this operator plugs into its upstream source.
pub struct DebounceSink<K, T> {
  core: Arc<DebounceCore<K, T>>,
}

impl<K: Sink, T: Send> Sink for DebounceSink<K, T> {
  fn on_unsubscribe(&self) {
    let (timer, _pending) = {
      let mut state = self.core.state.lock().unwrap();
      (state.timer.take(), state.latest.take())
    };
    // The pending value is dropped silently; nothing may be emitted once
    // disposal started.
    if let Some(timer) = timer {
      timer.unsubscribe();
    }
  }

  fn on_error_resume(&self, error: SharedError) {
    // Non-value signals pass through immediately, unaffected by pending
    // state.
    self.core.downstream.error_resume(error);
  }
}

impl<K, T> EventSink<T> for DebounceSink<K, T>
where
  K: EventSink<T>,
  T: Send,
{
  fn on_next(&self, value: T) {
    let state = &mut *self.core.state.lock().unwrap();
    state.latest = Some(value);
    self.core.generation.fetch_add(1, Ordering::AcqRel);
    if let Some(timer) = &state.timer {
      // Restart the window; the generation bump supersedes any earlier
      // scheduled firing without an explicit cancel.
      timer.invoke_once(self.core.window);
    }
  }
}

impl<K, T, C> CompletableSink<C> for DebounceSink<K, T>
where
  K: EventSink<T> + CompletableSink<C>,
  T: Send,
{
  fn on_completed(&self, completion: C) -> Result<(), SharedError> {
    {
      let mut state = self.core.state.lock().unwrap();
      if let Some(value) = state.latest.take() {
        self.core.downstream.next(value);
      }
    }
    // The pending value, if any, was flushed strictly before the completion
    // signal; nothing is emitted after it.
    self.core.downstream.complete(completion)
  }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::{
    error::shared,
    event::{Completion, CompletableEventExt},
    subject::CompletableSubject,
    subscription::Subscription,
    timer::VirtualTimeSource,
  };

  #[derive(Clone, Default)]
  struct JournalSink {
    entries: Arc<Mutex<Vec<String>>>,
  }

  impl JournalSink {
    fn entries(&self) -> Vec<String> { self.entries.lock().unwrap().clone() }
  }

  impl Sink for JournalSink {
    fn on_error_resume(&self, error: SharedError) {
      self.entries.lock().unwrap().push(format!("error:{error}"));
    }
  }

  impl EventSink<i32> for JournalSink {
    fn on_next(&self, value: i32) { self.entries.lock().unwrap().push(format!("next:{value}")); }
  }

  impl CompletableSink<Completion> for JournalSink {
    fn on_completed(&self, completion: Completion) -> Result<(), SharedError> {
      let tag = if completion.is_done() { "done" } else { "failed" };
      self.entries.lock().unwrap().push(format!("completed:{tag}"));
      Ok(())
    }
  }

  fn debounced(
    window: Duration,
  ) -> (CompletableSubject<i32, Completion>, VirtualTimeSource, JournalSink) {
    let subject = CompletableSubject::new();
    let clock = VirtualTimeSource::new();
    let sink = JournalSink::default();
    subject
      .clone()
      .debounce(window, clock.clone())
      .subscribe(sink.clone())
      .unwrap();
    (subject, clock, sink)
  }

  #[test]
  fn bursts_collapse_to_the_last_value() {
    let (subject, clock, sink) = debounced(Duration::from_secs(5));

    subject.next(1); // t = 0, window ends at 5
    clock.advance(Duration::from_secs(4));
    subject.next(2); // t = 4, window restarts, ends at 9

    clock.advance(Duration::from_secs(4)); // t = 8: still inside the window
    assert!(sink.entries().is_empty());

    clock.advance(Duration::from_secs(1)); // t = 9: quiescence held
    assert_eq!(sink.entries(), vec!["next:2"]);

    clock.advance(Duration::from_secs(60));
    assert_eq!(sink.entries(), vec!["next:2"]);
  }

  #[test]
  fn completion_flushes_the_pending_value_first() {
    let (subject, _clock, sink) = debounced(Duration::from_secs(5));

    subject.next(7);
    subject.complete(Completion::Done).unwrap();

    assert_eq!(sink.entries(), vec!["next:7", "completed:done"]);
  }

  #[test]
  fn completion_with_nothing_pending_completes_only() {
    let (subject, clock, sink) = debounced(Duration::from_secs(5));

    subject.next(7);
    clock.advance(Duration::from_secs(5)); // value already emitted
    subject.complete(Completion::Done).unwrap();

    assert_eq!(sink.entries(), vec!["next:7", "completed:done"]);
  }

  #[test]
  fn stale_generation_firing_is_a_no_op() {
    let sink = JournalSink::default();
    let downstream = Subscriber::new(sink.clone());
    let core = DebounceCore {
      downstream,
      window: Duration::from_secs(5),
      generation: AtomicU64::new(0),
      state: Mutex::new(PendingState::<i32> { latest: None, timer: None }),
    };

    // A value arrives: generation 1, value pending.
    core.state.lock().unwrap().latest = Some(1);
    core.generation.store(1, Ordering::Release);
    // The firing scheduled for generation 0 must neither emit nor clear the
    // pending state.
    core.fire(0);
    assert!(sink.entries().is_empty());
    assert!(core.state.lock().unwrap().latest.is_some());

    // The current-generation firing emits.
    core.fire(1);
    assert_eq!(sink.entries(), vec!["next:1"]);
    assert!(core.state.lock().unwrap().latest.is_none());
  }

  #[test]
  fn firing_with_nothing_pending_is_a_no_op() {
    let sink = JournalSink::default();
    let downstream = Subscriber::new(sink.clone());
    let core = DebounceCore {
      downstream,
      window: Duration::from_secs(5),
      generation: AtomicU64::new(3),
      state: Mutex::new(PendingState::<i32> { latest: None, timer: None }),
    };

    core.fire(3);
    assert!(sink.entries().is_empty());
  }

  #[test]
  fn unsubscribe_drops_the_pending_value_and_releases_the_timer() {
    let subject = CompletableSubject::<i32, Completion>::new();
    let clock = VirtualTimeSource::new();
    let sink = JournalSink::default();
    let subscription = subject
      .clone()
      .debounce(Duration::from_secs(5), clock.clone())
      .subscribe(sink.clone())
      .unwrap();

    subject.next(1);
    subscription.unsubscribe();
    clock.advance(Duration::from_secs(60));

    assert!(sink.entries().is_empty());
  }

  #[test]
  fn error_resume_passes_through_without_touching_pending_state() {
    let (subject, clock, sink) = debounced(Duration::from_secs(5));

    subject.next(1);
    subject.error_resume(shared(std::fmt::Error));
    clock.advance(Duration::from_secs(5));

    let entries = sink.entries();
    assert!(entries[0].starts_with("error:"));
    assert_eq!(entries[1], "next:1");
  }

  #[test]
  fn zero_window_still_fires_asynchronously() {
    let (subject, clock, sink) = debounced(Duration::ZERO);

    subject.next(9);
    // Not emitted inline; the timer must fire first.
    assert!(sink.entries().is_empty());
    clock.advance(Duration::from_nanos(1));
    assert_eq!(sink.entries(), vec!["next:9"]);
  }
}
