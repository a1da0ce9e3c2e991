//! Continuations for shared [`TaskFuture`]s.
//!
//! Each combinator spawns one detached thread that blocks on the future and
//! then invokes the appropriate callback. They are independent of any pool:
//! no pool thread or queue slot is consumed, and a combinator may outlive
//! the pool that produced the future.

use crate::error::PoolError;
use crate::future::TaskFuture;

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::warn;

fn detach<F>(label: &str, body: F)
where
  F: FnOnce() + Send + 'static,
{
  // The handle is dropped on purpose: continuations are fire-and-forget.
  let _ = thread::Builder::new()
    .name(format!("taskmill-{}", label))
    .spawn(body)
    .map_err(|error| warn!(%label, %error, "failed to spawn continuation thread"));
}

/// Invokes `callback` with the resolved value once `future` completes
/// successfully.
///
/// A stored failure is silently discarded, and so is a panic raised by the
/// callback itself.
pub fn on_success<R, F>(future: &TaskFuture<R>, callback: F)
where
  R: Clone + Send + 'static,
  F: FnOnce(R) + Send + 'static,
{
  let future = future.clone();
  detach("on-success", move || {
    if let Ok(value) = future.get() {
      let _ = panic::catch_unwind(AssertUnwindSafe(move || callback(value)));
    }
  });
}

/// Invokes `callback` with the stored failure once `future` completes
/// unsuccessfully.
///
/// The callback runs only for a failed resolution; its own panics are not
/// guarded.
pub fn on_failure<R, F>(future: &TaskFuture<R>, callback: F)
where
  R: Clone + Send + 'static,
  F: FnOnce(PoolError) + Send + 'static,
{
  let future = future.clone();
  detach("on-failure", move || {
    if let Err(error) = future.get() {
      callback(error);
    }
  });
}

/// Invokes exactly one of the two callbacks once `future` completes:
/// `on_ok` with the value for a successful resolution, `on_err` with the
/// stored failure otherwise.
///
/// Neither callback's own panics are guarded, and a panicking `on_ok` does
/// not reroute into `on_err`.
pub fn on_complete<R, S, F>(future: &TaskFuture<R>, on_ok: S, on_err: F)
where
  R: Clone + Send + 'static,
  S: FnOnce(R) + Send + 'static,
  F: FnOnce(PoolError) + Send + 'static,
{
  let future = future.clone();
  detach("on-complete", move || match future.get() {
    Ok(value) => on_ok(value),
    Err(error) => on_err(error),
  });
}
