use std::any::Any;

use thiserror::Error;

/// Errors that can occur within a `taskmill` pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  /// The pool has begun (or finished) shutting down and accepts no new work.
  #[error("task pool already destroyed, cannot accept new tasks")]
  AlreadyDestroyed,

  /// A dispatched task (or a task inside a dispatched batch) was empty.
  #[error("task has no callable body")]
  InvalidTask,

  /// A task body panicked while running on a worker. Only future-returning
  /// dispatch variants capture this; it is surfaced when the result is read.
  #[error("task panicked during execution: {0}")]
  TaskPanicked(String),
}

/// Extracts a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
