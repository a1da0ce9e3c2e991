use parking_lot::{Condvar, Mutex};

/// Counts a synchronous batch down to zero.
///
/// Initialized to the batch size; every batch member calls `count_down`
/// exactly once after its body has run, and the dispatching thread blocks
/// in `wait` until the count reaches zero. The count never goes negative
/// because each wrapped task decrements once under the lock.
pub(crate) struct CompletionLatch {
  remaining: Mutex<usize>,
  done: Condvar,
}

impl CompletionLatch {
  pub(crate) fn new(count: usize) -> Self {
    Self {
      remaining: Mutex::new(count),
      done: Condvar::new(),
    }
  }

  /// Records one finished batch member, waking waiters on the last.
  pub(crate) fn count_down(&self) {
    let mut remaining = self.remaining.lock();
    *remaining -= 1;
    if *remaining == 0 {
      drop(remaining);
      self.done.notify_all();
    }
  }

  /// Blocks until every batch member has counted down.
  pub(crate) fn wait(&self) {
    let mut remaining = self.remaining.lock();
    while *remaining > 0 {
      self.done.wait(&mut remaining);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::thread;
  use std::time::Duration;

  #[test]
  fn wait_returns_immediately_at_zero() {
    let latch = CompletionLatch::new(0);
    latch.wait();
  }

  #[test]
  fn wait_blocks_until_all_members_count_down() {
    let latch = Arc::new(CompletionLatch::new(3));
    let workers: Vec<_> = (0..3u64)
      .map(|i| {
        let latch = latch.clone();
        thread::spawn(move || {
          thread::sleep(Duration::from_millis(20 * (i + 1)));
          latch.count_down();
        })
      })
      .collect();

    latch.wait();
    for worker in workers {
      worker.join().unwrap();
    }
  }
}
