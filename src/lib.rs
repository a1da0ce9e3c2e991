//! A fixed-size worker thread pool with fire-and-forget, future-returning,
//! bulk, serial, synchronous-blocking and exactly-once dispatch, plus free
//! combinators for attaching detached continuations to task futures.

mod combinators;
mod error;
mod future;
mod latch;
mod once_flag;
mod pool;
mod queue;
mod task;

pub use combinators::{on_complete, on_failure, on_success};
pub use error::PoolError;
pub use future::{TaskFuture, TaskResult};
pub use once_flag::OnceFlag;
pub use pool::{TaskPool, TaskPoolBuilder};
pub use task::Task;
