use crate::task::Task;

use crossbeam_channel::{Receiver, Sender};

/// The shared task queue: an unbounded, multi-producer/multi-consumer
/// channel of `Task<()>`.
///
/// This is the only resource shared across all producers and workers. The
/// pool needs exactly four operations from it: single enqueue, bulk
/// enqueue, blocking dequeue and non-blocking dequeue. Everything else
/// about the underlying channel is incidental.
///
/// Both halves are kept in every clone so the channel can never disconnect
/// while a pool or worker is alive; a disconnected `pop` degrades to the
/// empty sentinel, which a worker already treats as "stop".
#[derive(Clone)]
pub(crate) struct TaskQueue {
  tx: Sender<Task>,
  rx: Receiver<Task>,
}

impl TaskQueue {
  pub(crate) fn new() -> Self {
    let (tx, rx) = crossbeam_channel::unbounded();
    Self { tx, rx }
  }

  /// Enqueues a single task.
  pub(crate) fn push(&self, task: Task) {
    // An unbounded channel only refuses a send when disconnected, which
    // cannot happen while `self` holds the receiving half.
    let _ = self.tx.send(task);
  }

  /// Enqueues a batch of tasks in one pass, preserving their order.
  pub(crate) fn push_bulk<I>(&self, tasks: I)
  where
    I: IntoIterator<Item = Task>,
  {
    for task in tasks {
      let _ = self.tx.send(task);
    }
  }

  /// Dequeues a task, blocking until one is available.
  pub(crate) fn pop(&self) -> Task {
    self.rx.recv().unwrap_or_default()
  }

  /// Dequeues a task without blocking, or returns `None` if the queue is
  /// currently empty.
  pub(crate) fn try_pop(&self) -> Option<Task> {
    self.rx.try_recv().ok()
  }

  /// Number of tasks currently queued.
  pub(crate) fn len(&self) -> usize {
    self.rx.len()
  }
}
