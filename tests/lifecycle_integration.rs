//! Integration tests for the subscription lifecycle.
//!
//! Exercises full chains (subject → debounce → observer adapter), disposal
//! under thread contention, and the diagnostic tracker end to end.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier, Mutex,
  },
  thread,
};

use rivulet::prelude::*;

fn init_logging() {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Clone, Default)]
struct JournalObserver {
  entries: Arc<Mutex<Vec<String>>>,
}

impl JournalObserver {
  fn entries(&self) -> Vec<String> { self.entries.lock().unwrap().clone() }
}

impl Observer<i32> for JournalObserver {
  fn next(&self, value: i32) { self.entries.lock().unwrap().push(format!("next:{value}")); }

  fn error(&self, error: SharedError) {
    self.entries.lock().unwrap().push(format!("error:{error}"));
  }

  fn completed(&self) { self.entries.lock().unwrap().push("completed".into()); }
}

#[test]
fn debounce_chain_end_to_end() {
  init_logging();

  let clock = VirtualTimeSource::new();
  let input = CompletableSubject::<i32, Completion>::new();
  let observer = JournalObserver::default();

  let debounced = input.clone().debounce(Duration::from_secs(1), clock.clone());
  subscribe_observer(&debounced, observer.clone()).unwrap();

  // A burst collapses to its last value.
  input.next(1);
  input.next(2);
  input.next(3);
  clock.advance(Duration::from_secs(1));
  assert_eq!(observer.entries(), vec!["next:3"]);

  // A pending value flushes ahead of the completion signal.
  input.next(4);
  input.complete(Completion::Done).unwrap();
  assert_eq!(observer.entries(), vec!["next:3", "next:4", "completed"]);

  // Nothing after the terminal signal.
  input.next(5);
  clock.advance(Duration::from_secs(10));
  assert_eq!(observer.entries(), vec!["next:3", "next:4", "completed"]);
}

#[test]
fn unsubscribing_the_chain_head_stops_the_whole_chain() {
  init_logging();

  let clock = VirtualTimeSource::new();
  let input = CompletableSubject::<i32, Completion>::new();
  let observer = JournalObserver::default();

  let debounced = input.clone().debounce(Duration::from_secs(1), clock.clone());
  let subscription = subscribe_observer(&debounced, observer.clone()).unwrap();

  input.next(1);
  subscription.unsubscribe();
  clock.advance(Duration::from_secs(10));
  input.next(2);
  clock.advance(Duration::from_secs(10));

  assert!(observer.entries().is_empty());
  // The subject saw the inner subscriber close and pruned it.
  input.next(3);
  assert_eq!(input.subscriber_count(), 0);
}

#[test]
fn concurrent_unsubscribe_tears_down_exactly_once() {
  init_logging();

  #[derive(Clone, Default)]
  struct CountingSink {
    teardowns: Arc<AtomicUsize>,
  }

  impl Sink for CountingSink {
    fn on_unsubscribe(&self) { self.teardowns.fetch_add(1, Ordering::SeqCst); }
  }

  impl EventSink<i32> for CountingSink {
    fn on_next(&self, _: i32) {}
  }

  for _ in 0..50 {
    let subject = Subject::new();
    let sink = CountingSink::default();
    let subscriber = subject.subscribe(sink.clone()).unwrap();
    subject.next(1);

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
      .map(|_| {
        let subscriber = subscriber.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
          barrier.wait();
          subscriber.unsubscribe();
          // Every unsubscribe call returns only after teardown completed.
          assert!(subscriber.is_closed());
        })
      })
      .collect();
    for handle in handles {
      handle.join().unwrap();
    }

    assert_eq!(sink.teardowns.load(Ordering::SeqCst), 1);
  }
}

#[test]
fn completion_and_unsubscribe_race_yields_one_teardown() {
  init_logging();

  #[derive(Clone, Default)]
  struct CountingSink {
    teardowns: Arc<AtomicUsize>,
    completions: Arc<AtomicUsize>,
  }

  impl Sink for CountingSink {
    fn on_unsubscribe(&self) { self.teardowns.fetch_add(1, Ordering::SeqCst); }
  }

  impl EventSink<i32> for CountingSink {
    fn on_next(&self, _: i32) {}
  }

  impl CompletableSink<Completion> for CountingSink {
    fn on_completed(&self, _: Completion) -> Result<(), SharedError> {
      self.completions.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  for _ in 0..50 {
    let subject = CompletableSubject::<i32, Completion>::new();
    let sink = CountingSink::default();
    let subscriber = subject.clone().subscribe(sink.clone()).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let completing = {
      let subject = subject.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        subject.complete(Completion::Done).unwrap();
      })
    };
    let disposing = {
      let subscriber = subscriber.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        subscriber.unsubscribe();
      })
    };
    completing.join().unwrap();
    disposing.join().unwrap();

    // Whatever wins the race, teardown runs exactly once and the completion
    // hook at most once.
    assert_eq!(sink.teardowns.load(Ordering::SeqCst), 1);
    assert!(sink.completions.load(Ordering::SeqCst) <= 1);
    assert!(subscriber.is_closed());
  }
}

#[test]
fn wall_clock_debounce_delivers() {
  init_logging();

  let input = CompletableSubject::<i32, Completion>::new();
  let observer = JournalObserver::default();
  let debounced = input.clone().debounce(Duration::from_millis(10), ThreadTimeSource);
  subscribe_observer(&debounced, observer.clone()).unwrap();

  input.next(1);
  input.next(2);

  let deadline = Instant::now() + Duration::from_secs(5);
  while observer.entries().is_empty() && Instant::now() < deadline {
    thread::sleep(Duration::from_millis(5));
  }
  assert_eq!(observer.entries(), vec!["next:2"]);

  input.complete(Completion::Done).unwrap();
  assert_eq!(observer.entries(), vec!["next:2", "completed"]);
}
