use std::fmt;

/// The boxed body of a task: a nullary closure producing `R`.
type TaskFn<R> = Box<dyn FnOnce() -> R + Send + 'static>;

/// An owned, stored unit of deferred work returning `R`.
///
/// A task is either *present* (it holds a callable body) or *empty* (the
/// default-constructed sentinel). An empty task is never a valid unit of
/// work: dispatching one fails validation, and the pool uses emptiness
/// internally as its worker shutdown signal.
///
/// `Task` without a type parameter is a `Task<()>`, the shape the pool's
/// queue carries.
pub struct Task<R = ()> {
  body: Option<TaskFn<R>>,
}

impl<R> Task<R> {
  /// Creates a task from a closure.
  pub fn new<F>(body: F) -> Self
  where
    F: FnOnce() -> R + Send + 'static,
  {
    Self {
      body: Some(Box::new(body)),
    }
  }

  /// Creates the empty sentinel task.
  pub fn empty() -> Self {
    Self { body: None }
  }

  /// Returns `true` if this task has no callable body.
  pub fn is_empty(&self) -> bool {
    self.body.is_none()
  }

  /// Consumes the task, yielding its body, or `None` for the sentinel.
  pub(crate) fn into_fn(self) -> Option<TaskFn<R>> {
    self.body
  }
}

impl<R> Default for Task<R> {
  fn default() -> Self {
    Self::empty()
  }
}

impl<R> fmt::Debug for Task<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Task")
      .field("present", &self.body.is_some())
      .finish()
  }
}
