//! # rivulet: push-based event streams
//!
//! The core engine of a push-based reactive library: a producer/consumer
//! protocol with race-free, exactly-once disposal and completion, a
//! quiescence-window operator ([`debounce`](event::CompletableEventExt::debounce))
//! built on it, and an adapter to the conventional `next`/`error`/`completed`
//! observer shape.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rivulet::prelude::*;
//!
//! let subject = Subject::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink_seen = seen.clone();
//! let subscription = subject
//!   .subscribe(FnSink(move |v: i32| sink_seen.lock().unwrap().push(v)))
//!   .unwrap();
//!
//! subject.next(1);
//! subject.next(2);
//! subscription.unsubscribe();
//! subject.next(3);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Event`] / [`CompletableEvent`] | Producer capabilities, with or without a terminal payload |
//! | [`Subscriber`] | Consumer shell owning the exactly-once dispose/complete guards |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`Subject`] / [`CompletableSubject`] | Hot multicast sources |
//! | [`VirtualTimeSource`] | Manually advanced clock for deterministic timing tests |
//!
//! Producers may invoke callbacks from any thread; consumers must process
//! synchronously and quickly. There is no backpressure: this is a pure push
//! model.
//!
//! [`Event`]: event::Event
//! [`CompletableEvent`]: event::CompletableEvent
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`Subject`]: subject::Subject
//! [`CompletableSubject`]: subject::CompletableSubject
//! [`VirtualTimeSource`]: timer::VirtualTimeSource

pub mod error;
pub mod event;
pub mod interop;
pub mod ops;
pub mod prelude;
pub mod slot;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod timer;
pub mod tracker;

pub use prelude::*;
