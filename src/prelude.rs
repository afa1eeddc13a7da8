//! Prelude module for convenient imports
//!
//! Re-exports the types and traits most programs need.

pub use crate::error::{shared, SharedError};
pub use crate::event::{CompletableEvent, CompletableEventExt, Completion, Event};
pub use crate::interop::{subscribe_observer, Observer, ObserverSink};
pub use crate::ops::debounce::DebounceOp;
pub use crate::subject::{CompletableSubject, Subject};
pub use crate::subscriber::{CompletableSink, EventSink, FnSink, Sink, Subscriber};
pub use crate::subscription::{
  DisposeGate, FnSubscription, NopSubscription, OnceFlag, Subscription, SubscriptionGuard,
  SubscriptionHandle,
};
pub use crate::timer::{
  normalize_delay, Duration, Instant, ThreadTimeSource, TimeSource, TimerCallback, TimerHandle,
  VirtualTimeSource,
};
pub use crate::{slot::SourceSlot, tracker};
