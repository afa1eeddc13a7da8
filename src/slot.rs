//! Single-assignment upstream slot.
//!
//! Binds a subscriber to the one handle its producer created. Modelling the
//! slot as an explicit three-state value instead of a nullable reference
//! closes the double-unsubscribe and lost-unsubscribe races that appear when
//! producer wiring finishes on one thread while the caller cancels from
//! another.

use std::sync::Mutex;

use crate::subscription::{Subscription, SubscriptionHandle};

/// Rejects a second assignment to a [`SourceSlot`].
#[derive(Debug, thiserror::Error)]
#[error("upstream subscription already assigned")]
pub struct SlotAssignError;

enum SlotState {
  Empty,
  Assigned(SubscriptionHandle),
  Closed,
}

/// Single-assignment container for the upstream disposal handle.
///
/// State transitions are `empty → assigned`, `empty → closed` and
/// `assigned → closed` only; each happens atomically under the slot's lock,
/// while the handle's own `unsubscribe` always runs outside the critical
/// section.
pub struct SourceSlot {
  state: Mutex<SlotState>,
}

impl Default for SourceSlot {
  fn default() -> Self { Self::new() }
}

impl SourceSlot {
  pub const fn new() -> Self { SourceSlot { state: Mutex::new(SlotState::Empty) } }

  /// Stores the upstream handle.
  ///
  /// A handle arriving after the slot closed is unsubscribed immediately so
  /// it cannot leak; that call still succeeds. A second assignment is
  /// rejected and leaves both the slot and the offered handle untouched.
  pub fn assign(&self, handle: SubscriptionHandle) -> Result<(), SlotAssignError> {
    {
      let mut state = self.state.lock().unwrap();
      match *state {
        SlotState::Empty => {
          *state = SlotState::Assigned(handle);
          return Ok(());
        }
        SlotState::Assigned(_) => return Err(SlotAssignError),
        SlotState::Closed => {}
      }
    }
    handle.unsubscribe();
    Ok(())
  }
}

impl Subscription for SourceSlot {
  /// Closes the slot; if a handle was assigned it is unsubscribed exactly
  /// once.
  fn unsubscribe(&self) {
    let previous = std::mem::replace(&mut *self.state.lock().unwrap(), SlotState::Closed);
    if let SlotState::Assigned(handle) = previous {
      handle.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { matches!(*self.state.lock().unwrap(), SlotState::Closed) }
}
