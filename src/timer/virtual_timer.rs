//! Manually advanced clock for deterministic tests.

use std::sync::{Arc, Mutex, Weak};

use super::{Duration, TimeSource, TimerCallback, TimerHandle};
use crate::subscription::{DisposeGate, Subscription};

struct ClockInner {
  now: Duration,
  timers: Vec<Weak<VirtualTimerCore>>,
}

struct VirtualTimerCore {
  callback: TimerCallback,
  deadline: Mutex<Option<Duration>>,
}

/// A [`TimeSource`] whose time only moves when [`advance`](Self::advance) is
/// called. Clones share the same clock.
#[derive(Clone)]
pub struct VirtualTimeSource {
  inner: Arc<Mutex<ClockInner>>,
}

impl Default for VirtualTimeSource {
  fn default() -> Self { Self::new() }
}

impl VirtualTimeSource {
  pub fn new() -> Self {
    VirtualTimeSource {
      inner: Arc::new(Mutex::new(ClockInner { now: Duration::ZERO, timers: Vec::new() })),
    }
  }

  /// Elapsed virtual time since the clock was created.
  pub fn now(&self) -> Duration { self.inner.lock().unwrap().now }

  /// Moves the clock forward by `by`, firing due timers in deadline order.
  ///
  /// The clock sits exactly at a timer's deadline while its callback runs,
  /// and the registry lock is released around each callback so callbacks may
  /// rearm or release timers.
  pub fn advance(&self, by: Duration) {
    let target = self.inner.lock().unwrap().now + by;

    while let Some(core) = self.turn_to_next_due(target) {
      core.deadline.lock().unwrap().take();
      (core.callback)();
    }

    self.inner.lock().unwrap().now = target;
  }

  /// Finds the earliest timer due at or before `target`, sets the clock to
  /// its deadline, and returns it.
  fn turn_to_next_due(&self, target: Duration) -> Option<Arc<VirtualTimerCore>> {
    let mut inner = self.inner.lock().unwrap();
    inner.timers.retain(|weak| weak.strong_count() > 0);

    let mut due: Option<(Duration, Arc<VirtualTimerCore>)> = None;
    for weak in &inner.timers {
      let Some(core) = weak.upgrade() else { continue };
      let Some(deadline) = *core.deadline.lock().unwrap() else { continue };
      if deadline <= target && due.as_ref().map_or(true, |(best, _)| deadline < *best) {
        due = Some((deadline, core));
      }
    }

    due.map(|(deadline, core)| {
      inner.now = deadline;
      core
    })
  }
}

impl TimeSource for VirtualTimeSource {
  fn create_stopped_timer(&self, callback: TimerCallback) -> Box<dyn TimerHandle> {
    let core = Arc::new(VirtualTimerCore { callback, deadline: Mutex::new(None) });
    self.inner.lock().unwrap().timers.push(Arc::downgrade(&core));
    Box::new(VirtualTimer { core, clock: Arc::downgrade(&self.inner), gate: DisposeGate::new() })
  }
}

struct VirtualTimer {
  core: Arc<VirtualTimerCore>,
  clock: Weak<Mutex<ClockInner>>,
  gate: DisposeGate,
}

impl TimerHandle for VirtualTimer {
  fn invoke_once(&self, delay: Duration) {
    if self.gate.is_closed() {
      return;
    }
    let Some(clock) = self.clock.upgrade() else { return };
    let now = clock.lock().unwrap().now;
    *self.core.deadline.lock().unwrap() = Some(now + delay);
  }
}

impl Subscription for VirtualTimer {
  fn unsubscribe(&self) {
    self.gate.dispose(|| {
      self.core.deadline.lock().unwrap().take();
    });
  }

  fn is_closed(&self) -> bool { self.gate.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  fn counting_timer(clock: &VirtualTimeSource) -> (Box<dyn TimerHandle>, Arc<AtomicUsize>) {
    let fires = Arc::new(AtomicUsize::new(0));
    let counted = fires.clone();
    let timer = clock.create_stopped_timer(Arc::new(move || {
      counted.fetch_add(1, Ordering::SeqCst);
    }));
    (timer, fires)
  }

  #[test]
  fn fires_once_at_its_deadline() {
    let clock = VirtualTimeSource::new();
    let (timer, fires) = counting_timer(&clock);

    timer.invoke_once(Duration::from_secs(5));
    clock.advance(Duration::from_secs(4));
    assert_eq!(fires.load(Ordering::SeqCst), 0);

    clock.advance(Duration::from_secs(1));
    assert_eq!(fires.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(60));
    assert_eq!(fires.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn rearm_supersedes_earlier_deadline() {
    let clock = VirtualTimeSource::new();
    let (timer, fires) = counting_timer(&clock);

    timer.invoke_once(Duration::from_secs(5));
    clock.advance(Duration::from_secs(4));
    timer.invoke_once(Duration::from_secs(5));

    clock.advance(Duration::from_secs(4));
    assert_eq!(fires.load(Ordering::SeqCst), 0);
    assert_eq!(clock.now(), Duration::from_secs(8));

    clock.advance(Duration::from_secs(1));
    assert_eq!(fires.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn released_timer_never_fires() {
    let clock = VirtualTimeSource::new();
    let (timer, fires) = counting_timer(&clock);

    timer.invoke_once(Duration::from_secs(1));
    timer.unsubscribe();
    clock.advance(Duration::from_secs(10));

    assert_eq!(fires.load(Ordering::SeqCst), 0);
    assert!(timer.is_closed());
  }

  #[test]
  fn two_timers_fire_in_deadline_order() {
    let clock = VirtualTimeSource::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = order.clone();
    let early = clock.create_stopped_timer(Arc::new(move || first.lock().unwrap().push("early")));
    let second = order.clone();
    let late = clock.create_stopped_timer(Arc::new(move || second.lock().unwrap().push("late")));

    late.invoke_once(Duration::from_secs(3));
    early.invoke_once(Duration::from_secs(1));
    clock.advance(Duration::from_secs(5));

    assert_eq!(*order.lock().unwrap(), vec!["early", "late"]);
  }
}
