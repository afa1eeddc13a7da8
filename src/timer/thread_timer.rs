//! Wall-clock timer provider backed by one worker thread per handle.

use std::{
  sync::{Arc, Condvar, Mutex},
  thread,
};

use super::{Duration, Instant, TimeSource, TimerCallback, TimerHandle};
use crate::subscription::{DisposeGate, Subscription};

/// A [`TimeSource`] that fires callbacks from a dedicated worker thread per
/// timer handle. The worker parks until armed, fires once per arming, and
/// exits when the handle is unsubscribed or dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadTimeSource;

impl TimeSource for ThreadTimeSource {
  fn create_stopped_timer(&self, callback: TimerCallback) -> Box<dyn TimerHandle> {
    Box::new(ThreadTimer::spawn(callback))
  }
}

#[derive(Default)]
struct TimerState {
  deadline: Option<Instant>,
  shutdown: bool,
}

struct TimerShared {
  state: Mutex<TimerState>,
  wakeup: Condvar,
  callback: TimerCallback,
}

struct ThreadTimer {
  shared: Arc<TimerShared>,
  gate: DisposeGate,
}

impl ThreadTimer {
  fn spawn(callback: TimerCallback) -> Self {
    let shared = Arc::new(TimerShared {
      state: Mutex::new(TimerState::default()),
      wakeup: Condvar::new(),
      callback,
    });
    let worker = shared.clone();
    thread::Builder::new()
      .name("rivulet-timer".into())
      .spawn(move || run_worker(worker))
      .expect("failed to spawn timer thread");
    ThreadTimer { shared, gate: DisposeGate::new() }
  }
}

fn run_worker(shared: Arc<TimerShared>) {
  let mut state = shared.state.lock().unwrap();
  loop {
    if state.shutdown {
      return;
    }
    match state.deadline {
      None => {
        state = shared.wakeup.wait(state).unwrap();
      }
      Some(at) => {
        let now = Instant::now();
        if now >= at {
          state.deadline = None;
          drop(state);
          // The callback runs without the state lock held, so it may rearm
          // this timer.
          (shared.callback)();
          state = shared.state.lock().unwrap();
        } else {
          // A rearm or shutdown notification re-enters the loop and
          // re-reads the state; spurious wakeups are handled the same way.
          let (guard, _) = shared.wakeup.wait_timeout(state, at - now).unwrap();
          state = guard;
        }
      }
    }
  }
}

impl TimerHandle for ThreadTimer {
  fn invoke_once(&self, delay: Duration) {
    if self.gate.is_closed() {
      return;
    }
    let mut state = self.shared.state.lock().unwrap();
    state.deadline = Some(Instant::now() + delay);
    self.shared.wakeup.notify_one();
  }
}

impl Subscription for ThreadTimer {
  fn unsubscribe(&self) {
    self.gate.dispose(|| {
      let mut state = self.shared.state.lock().unwrap();
      state.deadline = None;
      state.shutdown = true;
      self.shared.wakeup.notify_one();
    });
  }

  fn is_closed(&self) -> bool { self.gate.is_closed() }
}

impl Drop for ThreadTimer {
  fn drop(&mut self) { self.unsubscribe() }
}
