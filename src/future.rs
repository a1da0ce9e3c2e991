use crate::error::PoolError;

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// What a result slot eventually holds: the task's value, or the captured
/// panic from its body.
pub type TaskResult<R> = Result<R, PoolError>;

struct Slot<R> {
  cell: Mutex<Option<TaskResult<R>>>,
  resolved: Condvar,
}

/// The write side of a result slot.
///
/// Exactly one of value or failure is written, exactly once: `fulfill`
/// consumes the promise, so a second write is unrepresentable.
pub(crate) struct TaskPromise<R> {
  slot: Arc<Slot<R>>,
}

impl<R> TaskPromise<R> {
  pub(crate) fn fulfill(self, result: TaskResult<R>) {
    let mut cell = self.slot.cell.lock();
    debug_assert!(cell.is_none(), "result slot fulfilled twice");
    *cell = Some(result);
    drop(cell);
    self.slot.resolved.notify_all();
  }
}

/// The read side of a result slot, returned by future-returning dispatch.
///
/// A `TaskFuture` is shared: clones observe the same slot, and any number
/// of readers and combinators may block on it. Reading the result requires
/// `R: Clone` so every reader gets its own copy.
pub struct TaskFuture<R> {
  slot: Arc<Slot<R>>,
}

impl<R> Clone for TaskFuture<R> {
  fn clone(&self) -> Self {
    Self {
      slot: self.slot.clone(),
    }
  }
}

impl<R> fmt::Debug for TaskFuture<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskFuture")
      .field("complete", &self.is_complete())
      .finish()
  }
}

impl<R> TaskFuture<R> {
  /// Returns `true` once the task has finished and its outcome is stored.
  pub fn is_complete(&self) -> bool {
    self.slot.cell.lock().is_some()
  }

  /// Blocks until the task has finished.
  pub fn wait(&self) {
    let mut cell = self.slot.cell.lock();
    while cell.is_none() {
      self.slot.resolved.wait(&mut cell);
    }
  }
}

impl<R: Clone> TaskFuture<R> {
  /// Blocks until the task has finished, then returns its outcome. A task
  /// body that panicked surfaces here as `PoolError::TaskPanicked`.
  pub fn get(&self) -> TaskResult<R> {
    let mut cell = self.slot.cell.lock();
    loop {
      if let Some(result) = cell.as_ref() {
        return result.clone();
      }
      self.slot.resolved.wait(&mut cell);
    }
  }

  /// Returns the outcome if the task has already finished, without blocking.
  pub fn try_get(&self) -> Option<TaskResult<R>> {
    self.slot.cell.lock().as_ref().cloned()
  }
}

/// Creates a connected promise/future pair around a fresh slot.
pub(crate) fn result_slot<R>() -> (TaskPromise<R>, TaskFuture<R>) {
  let slot = Arc::new(Slot {
    cell: Mutex::new(None),
    resolved: Condvar::new(),
  });
  (
    TaskPromise { slot: slot.clone() },
    TaskFuture { slot },
  )
}
