//! Timer capability consumed by time-windowed operators.
//!
//! Operators never talk to a concrete clock; they ask a [`TimeSource`] for a
//! stopped one-shot timer and rearm it through [`TimerHandle::invoke_once`].
//! Two providers ship with the crate: [`ThreadTimeSource`] for wall-clock
//! time and [`VirtualTimeSource`] for deterministic, manually advanced tests.

use std::sync::Arc;
pub use std::time::{Duration, Instant};

use crate::subscription::Subscription;

mod thread_timer;
mod virtual_timer;

pub use thread_timer::ThreadTimeSource;
pub use virtual_timer::VirtualTimeSource;

/// Callback run on the provider's firing thread. State is captured by the
/// closure.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Creates stopped one-shot timers.
pub trait TimeSource {
  fn create_stopped_timer(&self, callback: TimerCallback) -> Box<dyn TimerHandle>;
}

/// One-shot timer. No periodic mode.
pub trait TimerHandle: Subscription {
  /// Arms the timer to fire once after `delay`. Rearming an already armed
  /// timer supersedes the earlier deadline.
  fn invoke_once(&self, delay: Duration);
}

/// Clamps a delay so the firing stays asynchronous: a zero delay becomes the
/// smallest representable positive duration instead of "fire inline".
pub fn normalize_delay(delay: Duration) -> Duration {
  if delay.is_zero() { Duration::from_nanos(1) } else { delay }
}
