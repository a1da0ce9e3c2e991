use taskmill::{on_complete, on_failure, on_success, PoolError, Task, TaskPool};

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const OBSERVE: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(300);

fn setup_tracing_for_test() {
  use std::sync::Once;
  use tracing_subscriber::{fmt, EnvFilter};
  static TRACING_INIT: Once = Once::new();

  TRACING_INIT.call_once(|| {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,taskmill=trace"));

    fmt::Subscriber::builder()
      .with_env_filter(filter)
      .with_test_writer()
      .try_init()
      .ok();
  });
}

#[test]
fn test_on_success_receives_resolved_value() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(2);
  let (tx, rx) = mpsc::channel();

  let future = pool.dispatch_future(Task::new(|| 41_u32 + 1)).unwrap();
  on_success(&future, move |value| {
    tx.send(value).unwrap();
  });

  assert_eq!(rx.recv_timeout(OBSERVE), Ok(42));
}

#[test]
fn test_on_success_blocks_until_resolution() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(1);
  let (tx, rx) = mpsc::channel();

  let future = pool
    .dispatch_future(Task::new(|| {
      thread::sleep(Duration::from_millis(100));
      "slow".to_string()
    }))
    .unwrap();
  on_success(&future, move |value| {
    tx.send(value).unwrap();
  });

  assert_eq!(rx.recv_timeout(OBSERVE), Ok("slow".to_string()));
}

#[test]
fn test_on_success_discards_stored_failure() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(1);
  let (tx, rx) = mpsc::channel::<u32>();

  let future = pool
    .dispatch_future(Task::new(|| -> u32 { panic!("no value to observe") }))
    .unwrap();
  future.wait();
  on_success(&future, move |value| {
    tx.send(value).unwrap();
  });

  assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn test_on_success_swallows_callback_panic() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(1);
  let (tx, rx) = mpsc::channel();

  let future = pool.dispatch_future(Task::new(|| 7_u32)).unwrap();
  on_success(&future, move |value| {
    tx.send(value).unwrap();
    panic!("callback failure is discarded");
  });

  // The value arrives and the panicking callback harms nothing else.
  assert_eq!(rx.recv_timeout(OBSERVE), Ok(7));
}

#[test]
fn test_on_failure_receives_stored_failure() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(1);
  let (tx, rx) = mpsc::channel();

  let future = pool
    .dispatch_future(Task::new(|| -> u32 { panic!("observable failure") }))
    .unwrap();
  on_failure(&future, move |error| {
    tx.send(error).unwrap();
  });

  match rx.recv_timeout(OBSERVE) {
    Ok(PoolError::TaskPanicked(message)) => assert!(message.contains("observable failure")),
    other => panic!("expected TaskPanicked, got {:?}", other),
  }
}

#[test]
fn test_on_failure_ignores_success() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(1);
  let (tx, rx) = mpsc::channel::<PoolError>();

  let future = pool.dispatch_future(Task::new(|| 9_u32)).unwrap();
  future.wait();
  on_failure(&future, move |error| {
    tx.send(error).unwrap();
  });

  assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn test_on_complete_routes_value_to_success_callback_only() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(1);
  let (tx, rx) = mpsc::channel();
  let ok_tx = tx.clone();

  let future = pool.dispatch_future(Task::new(|| "resolved".to_string())).unwrap();
  on_complete(
    &future,
    move |value| {
      ok_tx.send(Ok(value)).unwrap();
    },
    move |error| {
      tx.send(Err(error)).unwrap();
    },
  );

  assert_eq!(rx.recv_timeout(OBSERVE), Ok(Ok("resolved".to_string())));
  // Exactly one callback fires.
  assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn test_on_complete_routes_failure_to_failure_callback_only() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(1);
  let (tx, rx) = mpsc::channel();
  let ok_tx = tx.clone();

  let future = pool
    .dispatch_future(Task::new(|| -> String { panic!("routed to failure") }))
    .unwrap();
  on_complete(
    &future,
    move |value| {
      ok_tx.send(Ok(value)).unwrap();
    },
    move |error| {
      tx.send(Err(error)).unwrap();
    },
  );

  match rx.recv_timeout(OBSERVE) {
    Ok(Err(PoolError::TaskPanicked(message))) => assert!(message.contains("routed to failure")),
    other => panic!("expected TaskPanicked routing, got {:?}", other),
  }
  assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn test_combinator_fires_on_already_resolved_future() {
  setup_tracing_for_test();
  let pool = TaskPool::with_threads(1);
  let (tx, rx) = mpsc::channel();

  let future = pool.dispatch_future(Task::new(|| 13_u32)).unwrap();
  assert_eq!(future.get(), Ok(13));

  on_success(&future, move |value| {
    tx.send(value).unwrap();
  });
  assert_eq!(rx.recv_timeout(OBSERVE), Ok(13));
}

#[test]
fn test_combinator_outlives_its_pool() {
  setup_tracing_for_test();
  let (tx, rx) = mpsc::channel();

  let future = {
    let pool = TaskPool::with_threads(1);
    let future = pool.dispatch_future(Task::new(|| 99_u32)).unwrap();
    drop(pool);
    future
  };

  on_success(&future, move |value| {
    tx.send(value).unwrap();
  });
  assert_eq!(rx.recv_timeout(OBSERVE), Ok(99));
}
