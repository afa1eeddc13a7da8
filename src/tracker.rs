//! Diagnostic registry of live subscriptions.
//!
//! Process-wide, off by default. When enabled, every handle produced by a
//! successful `subscribe` is wrapped so it registers itself while alive and
//! deregisters on unsubscribe (or drop). The registry holds only weak
//! references keyed by a monotonically assigned identity, so it can never
//! extend a subscription's lifetime, and it plays no part in the correctness
//! of disposal or completion.

use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, Weak,
  },
};

use once_cell::sync::Lazy;

use crate::subscription::{DisposeGate, Subscription, SubscriptionHandle};

static ENABLED: AtomicBool = AtomicBool::new(false);
static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static ACTIVE: Lazy<Mutex<HashMap<u64, Weak<dyn Subscription>>>> =
  Lazy::new(|| Mutex::new(HashMap::new()));

/// Turns tracking on or off. Disabling clears the registry; subscriptions
/// created while disabled are never tracked retroactively.
pub fn set_enabled(enabled: bool) {
  ENABLED.store(enabled, Ordering::Release);
  if !enabled {
    ACTIVE.lock().unwrap().clear();
  }
}

pub fn is_enabled() -> bool { ENABLED.load(Ordering::Acquire) }

/// Number of tracked subscriptions still alive. Dead entries are pruned on
/// the way through.
pub fn active_count() -> usize {
  let mut active = ACTIVE.lock().unwrap();
  active.retain(|_, weak| weak.strong_count() > 0);
  active.len()
}

/// Visits the identity of every tracked live subscription.
pub fn for_each_active(mut visit: impl FnMut(u64)) {
  let mut active = ACTIVE.lock().unwrap();
  active.retain(|_, weak| weak.strong_count() > 0);
  for id in active.keys() {
    visit(*id);
  }
}

/// Wraps `handle` for tracking when the registry is enabled; otherwise
/// returns it unchanged.
pub(crate) fn try_track(handle: SubscriptionHandle) -> SubscriptionHandle {
  if !is_enabled() {
    return handle;
  }
  let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
  let tracked = Arc::new(TrackedSubscription { id, inner: handle, gate: DisposeGate::new() });
  ACTIVE
    .lock()
    .unwrap()
    .insert(id, Arc::downgrade(&tracked) as Weak<dyn Subscription>);
  tracing::trace!(id, "tracking live subscription");
  tracked
}

struct TrackedSubscription {
  id: u64,
  inner: SubscriptionHandle,
  gate: DisposeGate,
}

impl Subscription for TrackedSubscription {
  fn unsubscribe(&self) {
    self.gate.dispose(|| {
      // Release the real subscription first; the registry is only touched
      // afterwards, outside any lock held during the cascade.
      self.inner.unsubscribe();
      ACTIVE.lock().unwrap().remove(&self.id);
      tracing::trace!(id = self.id, "subscription released");
    });
  }

  fn is_closed(&self) -> bool { self.inner.is_closed() }
}

impl Drop for TrackedSubscription {
  fn drop(&mut self) {
    ACTIVE.lock().unwrap().remove(&self.id);
  }
}

// The enabled paths are exercised in `tests/tracker_diagnostics.rs`, which
// runs as its own process: the registry is process-wide state and would race
// with the parallel test runner in this binary.
#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::NopSubscription;

  #[test]
  fn disabled_registry_tracks_nothing() {
    assert!(!is_enabled());
    let handle = try_track(Arc::new(NopSubscription));
    assert_eq!(active_count(), 0);
    drop(handle);
  }
}
