use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

/// A one-shot guard for exactly-once dispatch.
///
/// The flag is owned by the caller and shared (via `Arc`) across every
/// `dispatch_once` call that should be collapsed into a single execution.
/// At most one claim ever succeeds, no matter how many claimants race; the
/// guarded body therefore runs at most once across all of them.
///
/// A claim is not released if the claimed execution panics. A panicking
/// fire-and-forget task kills its worker anyway (see [`TaskPool`]), so
/// retrying after a failed first execution is deliberately unsupported.
///
/// [`TaskPool`]: crate::TaskPool
pub struct OnceFlag {
  state: AtomicU8,
}

impl OnceFlag {
  pub const fn new() -> Self {
    Self {
      state: AtomicU8::new(IDLE),
    }
  }

  /// Returns `true` once a claimed execution has run to completion.
  pub fn is_complete(&self) -> bool {
    self.state.load(Ordering::Acquire) == DONE
  }

  /// Attempts to claim the single execution. Succeeds for exactly one
  /// claimant ever.
  pub(crate) fn try_claim(&self) -> bool {
    self
      .state
      .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  /// Marks the claimed execution as finished.
  pub(crate) fn finish(&self) {
    self.state.store(DONE, Ordering::Release);
  }
}

impl Default for OnceFlag {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for OnceFlag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match self.state.load(Ordering::Acquire) {
      IDLE => "idle",
      RUNNING => "running",
      _ => "done",
    };
    f.debug_struct("OnceFlag").field("state", &state).finish()
  }
}
