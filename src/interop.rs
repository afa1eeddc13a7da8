//! Bridge to the conventional three-method observer shape.
//!
//! The wider ecosystem speaks `next(value)` / `error(err)` / `completed()`
//! with no payload on the completion call. [`ObserverSink`] adapts such an
//! observer into a completable sink: a successful completion maps to
//! `completed()`, a failed one to `error(err)`, and never both.

use std::{marker::PhantomData, sync::Arc};

use crate::{
  error::SharedError,
  event::{CompletableEvent, Completion},
  subscriber::{CompletableSink, EventSink, Sink, Subscriber},
};

/// The conventional push-observer shape.
pub trait Observer<T>: Send + Sync {
  fn next(&self, value: T);
  fn error(&self, error: SharedError);
  fn completed(&self);
}

/// Adapts an [`Observer`] into a completable sink. Stateless pass-through;
/// holds nothing but the wrapped observer.
pub struct ObserverSink<O, T> {
  observer: O,
  _value: PhantomData<fn(T)>,
}

impl<O, T> ObserverSink<O, T> {
  pub fn new(observer: O) -> Self { ObserverSink { observer, _value: PhantomData } }
}

impl<O, T> Sink for ObserverSink<O, T>
where
  O: Observer<T>,
{
  fn on_error_resume(&self, error: SharedError) { self.observer.error(error) }
}

impl<O, T> EventSink<T> for ObserverSink<O, T>
where
  O: Observer<T>,
{
  fn on_next(&self, value: T) { self.observer.next(value) }
}

impl<O, T> CompletableSink<Completion> for ObserverSink<O, T>
where
  O: Observer<T>,
{
  fn on_completed(&self, completion: Completion) -> Result<(), SharedError> {
    match completion {
      Completion::Done => self.observer.completed(),
      Completion::Failed(error) => self.observer.error(error),
    }
    Ok(())
  }
}

/// Subscribes `observer` to a completable source through the adapter.
pub fn subscribe_observer<S, O, T>(
  source: &S,
  observer: O,
) -> Result<Arc<Subscriber<ObserverSink<O, T>>>, SharedError>
where
  S: CompletableEvent<T, Completion>,
  O: Observer<T> + 'static,
  T: 'static,
{
  source.subscribe(ObserverSink::new(observer))
}
