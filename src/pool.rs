use crate::error::{panic_message, PoolError};
use crate::future::{result_slot, TaskFuture, TaskPromise};
use crate::latch::CompletionLatch;
use crate::once_flag::OnceFlag;
use crate::queue::TaskQueue;
use crate::task::Task;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

const DEFAULT_POOL_NAME: &str = "taskmill";

/// Configures and builds a [`TaskPool`].
#[derive(Debug, Default)]
pub struct TaskPoolBuilder {
  name: Option<String>,
  threads: Option<usize>,
}

impl TaskPoolBuilder {
  /// Sets the pool name, used for worker thread names and log fields.
  pub fn name<T: Into<String>>(mut self, name: T) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Sets the worker thread count. Values below 1 are raised to 1.
  pub fn threads(mut self, count: usize) -> Self {
    self.threads = Some(count);
    self
  }

  /// Builds the pool and starts its workers.
  pub fn build(self) -> TaskPool {
    let name = Arc::new(self.name.unwrap_or_else(|| DEFAULT_POOL_NAME.to_string()));
    let thread_count = self
      .threads
      .unwrap_or_else(num_cpus::get)
      .max(1);
    TaskPool::start(name, thread_count)
  }
}

/// A fixed-size pool of worker threads executing dispatched [`Task`]s.
///
/// Workers are spawned at construction and block on a shared FIFO queue.
/// The pool offers several dispatch disciplines: fire-and-forget
/// ([`dispatch`]), future-returning ([`dispatch_future`]), bulk
/// ([`dispatch_bulk`], [`dispatch_bulk_future`]), synchronous-blocking
/// ([`dispatch_sync`], [`dispatch_sync_collect`]), strictly-ordered
/// ([`dispatch_serial`], [`dispatch_serial_future`]) and exactly-once
/// ([`dispatch_once`]).
///
/// Dropping the pool (or calling [`shutdown`]) stops accepting new work,
/// runs everything already enqueued to completion, and joins all workers.
///
/// # Panics in tasks
///
/// Future-returning variants capture a task-body panic into the returned
/// future. Fire-and-forget variants do **not**: the panic unwinds the
/// worker thread, which terminates and is not replaced, permanently
/// costing the pool one worker of capacity. Callers that cannot rule out
/// panics should use a future-returning variant.
///
/// [`dispatch`]: TaskPool::dispatch
/// [`dispatch_future`]: TaskPool::dispatch_future
/// [`dispatch_bulk`]: TaskPool::dispatch_bulk
/// [`dispatch_bulk_future`]: TaskPool::dispatch_bulk_future
/// [`dispatch_sync`]: TaskPool::dispatch_sync
/// [`dispatch_sync_collect`]: TaskPool::dispatch_sync_collect
/// [`dispatch_serial`]: TaskPool::dispatch_serial
/// [`dispatch_serial_future`]: TaskPool::dispatch_serial_future
/// [`dispatch_once`]: TaskPool::dispatch_once
/// [`shutdown`]: TaskPool::shutdown
pub struct TaskPool {
  name: Arc<String>,
  thread_count: usize,
  destroyed: AtomicBool,
  queue: TaskQueue,
  workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskPool {
  /// Creates a pool with one worker per available CPU.
  pub fn new() -> Self {
    Self::builder().build()
  }

  /// Creates a pool with a specific worker count (minimum 1).
  pub fn with_threads(count: usize) -> Self {
    Self::builder().threads(count).build()
  }

  /// Returns a builder for a customized pool.
  pub fn builder() -> TaskPoolBuilder {
    TaskPoolBuilder::default()
  }

  fn start(name: Arc<String>, thread_count: usize) -> Self {
    let queue = TaskQueue::new();

    let workers = (0..thread_count)
      .map(|index| {
        let name = name.clone();
        let queue = queue.clone();
        thread::Builder::new()
          .name(format!("{}-worker-{}", name, index))
          .spawn(move || Self::run_worker(name, index, queue))
          .expect("failed to spawn pool worker thread")
      })
      .collect();

    info!(pool = %name, threads = thread_count, "task pool started");

    Self {
      name,
      thread_count,
      destroyed: AtomicBool::new(false),
      queue,
      workers: Mutex::new(workers),
    }
  }

  /// The worker loop: blocking-dequeue, stop on the empty sentinel,
  /// otherwise execute and loop.
  fn run_worker(pool_name: Arc<String>, index: usize, queue: TaskQueue) {
    trace!(pool = %pool_name, worker = index, "worker started");
    loop {
      match queue.pop().into_fn() {
        Some(job) => job(),
        None => break,
      }
    }
    trace!(pool = %pool_name, worker = index, "worker stopped");
  }

  /// The pool's name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The fixed number of worker threads.
  pub fn thread_count(&self) -> usize {
    self.thread_count
  }

  /// Number of tasks currently enqueued and not yet claimed by a worker.
  pub fn queued_task_count(&self) -> usize {
    self.queue.len()
  }

  /// Returns `true` once shutdown has begun.
  pub fn is_destroyed(&self) -> bool {
    self.destroyed.load(Ordering::SeqCst)
  }

  fn check_args<R>(&self, task: &Task<R>) -> Result<(), PoolError> {
    if self.is_destroyed() {
      return Err(PoolError::AlreadyDestroyed);
    }
    if task.is_empty() {
      return Err(PoolError::InvalidTask);
    }
    Ok(())
  }

  fn check_args_all<R>(&self, tasks: &[Task<R>]) -> Result<(), PoolError> {
    if self.is_destroyed() {
      return Err(PoolError::AlreadyDestroyed);
    }
    if tasks.iter().any(Task::is_empty) {
      return Err(PoolError::InvalidTask);
    }
    Ok(())
  }

  /// Dispatches a single fire-and-forget task.
  ///
  /// There is no completion signal and no failure signal: a panic in the
  /// task body kills the executing worker (see the type-level docs).
  pub fn dispatch(&self, task: Task) -> Result<(), PoolError> {
    self.check_args(&task)?;
    trace!(pool = %self.name, "dispatching task");
    self.queue.push(task);
    Ok(())
  }

  /// Dispatches a single task and returns a future for its result.
  ///
  /// The task body runs on a worker; its value, or the panic it raised, is
  /// recorded into the returned [`TaskFuture`].
  pub fn dispatch_future<R>(&self, task: Task<R>) -> Result<TaskFuture<R>, PoolError>
  where
    R: Send + 'static,
  {
    self.check_args(&task)?;
    trace!(pool = %self.name, "dispatching future-returning task");
    Ok(self.submit_future(task))
  }

  /// Bulk-enqueues fire-and-forget tasks in one operation.
  ///
  /// Enqueue order follows input order, but execution across workers is
  /// not globally ordered. An empty batch is a no-op, even on a destroyed
  /// pool.
  pub fn dispatch_bulk<I>(&self, tasks: I) -> Result<(), PoolError>
  where
    I: IntoIterator<Item = Task>,
  {
    let tasks: Vec<Task> = tasks.into_iter().collect();
    if tasks.is_empty() {
      return Ok(());
    }
    self.check_args_all(&tasks)?;
    debug!(pool = %self.name, count = tasks.len(), "dispatching bulk batch");
    self.queue.push_bulk(tasks);
    Ok(())
  }

  /// Dispatches a batch of result-bearing tasks individually.
  ///
  /// The i-th returned future corresponds to the i-th input task;
  /// completion order across futures is unspecified. An empty batch
  /// returns an empty list without validation.
  pub fn dispatch_bulk_future<R, I>(&self, tasks: I) -> Result<Vec<TaskFuture<R>>, PoolError>
  where
    R: Send + 'static,
    I: IntoIterator<Item = Task<R>>,
  {
    let tasks: Vec<Task<R>> = tasks.into_iter().collect();
    if tasks.is_empty() {
      return Ok(Vec::new());
    }
    self.check_args_all(&tasks)?;
    debug!(pool = %self.name, count = tasks.len(), "dispatching bulk future batch");
    Ok(tasks.into_iter().map(|task| self.submit_future(task)).collect())
  }

  /// Dispatches a batch of void tasks and blocks until every one of them
  /// has run to completion.
  ///
  /// An empty batch returns immediately. A panicking batch member kills
  /// its worker before counting down, so the caller would block forever;
  /// batch members must not panic.
  pub fn dispatch_sync<I>(&self, tasks: I) -> Result<(), PoolError>
  where
    I: IntoIterator<Item = Task>,
  {
    let tasks: Vec<Task> = tasks.into_iter().collect();
    if tasks.is_empty() {
      return Ok(());
    }
    self.check_args_all(&tasks)?;
    debug!(pool = %self.name, count = tasks.len(), "dispatching synchronous batch");

    let latch = Arc::new(CompletionLatch::new(tasks.len()));
    let wrapped = tasks.into_iter().map(|task| {
      let latch = latch.clone();
      Task::new(move || {
        if let Some(job) = task.into_fn() {
          job();
        }
        latch.count_down();
      })
    });
    self.queue.push_bulk(wrapped.collect::<Vec<_>>());

    latch.wait();
    Ok(())
  }

  /// Dispatches a batch of result-bearing tasks and blocks until all have
  /// finished, returning their values in input order.
  ///
  /// The first stored failure encountered while collecting (in input
  /// order) is propagated as the call's error.
  pub fn dispatch_sync_collect<R, I>(&self, tasks: I) -> Result<Vec<R>, PoolError>
  where
    R: Clone + Send + 'static,
    I: IntoIterator<Item = Task<R>>,
  {
    let tasks: Vec<Task<R>> = tasks.into_iter().collect();
    if tasks.is_empty() {
      return Ok(Vec::new());
    }
    self.check_args_all(&tasks)?;
    debug!(pool = %self.name, count = tasks.len(), "dispatching collecting batch");

    let futures: Vec<TaskFuture<R>> = tasks
      .into_iter()
      .map(|task| self.submit_future(task))
      .collect();
    futures.iter().map(TaskFuture::get).collect()
  }

  /// Dispatches a batch of void tasks as one serial unit: a single worker
  /// claims the whole batch and runs its members in input order, with no
  /// other tasks interleaved between them.
  pub fn dispatch_serial<I>(&self, tasks: I) -> Result<(), PoolError>
  where
    I: IntoIterator<Item = Task>,
  {
    let tasks: Vec<Task> = tasks.into_iter().collect();
    if tasks.is_empty() {
      return Ok(());
    }
    self.check_args_all(&tasks)?;
    debug!(pool = %self.name, count = tasks.len(), "dispatching serial batch");

    self.queue.push(Task::new(move || {
      for task in tasks {
        if let Some(job) = task.into_fn() {
          job();
        }
      }
    }));
    Ok(())
  }

  /// Serial dispatch for result-bearing tasks: one queue entry executes
  /// every member in order, each writing into its own pre-allocated slot.
  ///
  /// The i-th returned future resolves as the serial unit reaches the
  /// i-th member; a member's panic is captured into its own slot and does
  /// not stop the members after it.
  pub fn dispatch_serial_future<R, I>(&self, tasks: I) -> Result<Vec<TaskFuture<R>>, PoolError>
  where
    R: Send + 'static,
    I: IntoIterator<Item = Task<R>>,
  {
    let tasks: Vec<Task<R>> = tasks.into_iter().collect();
    if tasks.is_empty() {
      return Ok(Vec::new());
    }
    self.check_args_all(&tasks)?;
    debug!(pool = %self.name, count = tasks.len(), "dispatching serial future batch");

    let (promises, futures): (Vec<TaskPromise<R>>, Vec<TaskFuture<R>>) =
      tasks.iter().map(|_| result_slot()).unzip();

    self.queue.push(Task::new(move || {
      for (task, promise) in tasks.into_iter().zip(promises) {
        promise.fulfill(run_captured(task));
      }
    }));
    Ok(futures)
  }

  /// Dispatches a task guarded by a shared [`OnceFlag`].
  ///
  /// Across every `dispatch_once` call sharing the same flag, no matter
  /// how many race, the task body executes at most once. Calls that lose
  /// the claim enqueue a wrapper that does nothing.
  pub fn dispatch_once(&self, flag: &Arc<OnceFlag>, task: Task) -> Result<(), PoolError> {
    self.check_args(&task)?;
    trace!(pool = %self.name, "dispatching once-guarded task");

    let flag = Arc::clone(flag);
    self.queue.push(Task::new(move || {
      if flag.try_claim() {
        if let Some(job) = task.into_fn() {
          job();
        }
        flag.finish();
      }
    }));
    Ok(())
  }

  /// Wraps a result-bearing task so its outcome lands in a fresh slot,
  /// enqueues the wrapper, and returns the slot's read side. Validation is
  /// the caller's responsibility.
  fn submit_future<R>(&self, task: Task<R>) -> TaskFuture<R>
  where
    R: Send + 'static,
  {
    let (promise, future) = result_slot();
    self.queue.push(Task::new(move || {
      promise.fulfill(run_captured(task));
    }));
    future
  }

  /// Stops the pool: refuses new work, runs everything already enqueued,
  /// and joins all workers. Idempotent; also invoked by `Drop`.
  ///
  /// A concurrent second caller returns immediately without waiting for
  /// the first caller's shutdown to finish.
  pub fn shutdown(&self) {
    if self.destroyed.swap(true, Ordering::SeqCst) {
      debug!(pool = %self.name, "shutdown already initiated");
      return;
    }
    info!(pool = %self.name, "shutting down task pool");

    // Phase one: one sentinel per worker, then join. FIFO delivery means
    // every task enqueued ahead of a worker's sentinel runs before that
    // worker exits.
    for _ in 0..self.thread_count {
      self.queue.push(Task::empty());
    }
    let workers: Vec<JoinHandle<()>> = {
      let mut guard = self.workers.lock();
      guard.drain(..).collect()
    };
    for worker in workers {
      if worker.join().is_err() {
        warn!(pool = %self.name, "worker thread had panicked; pool ran with reduced capacity");
      }
    }

    // Phase two: a dispatch call that passed validation before the flag
    // flipped may have enqueued between the flip and the sentinels. Drain
    // until every drainer has seen the queue empty on its last pass.
    let drained = Arc::new(AtomicUsize::new(0));
    let drainers: Vec<JoinHandle<()>> = (0..self.thread_count)
      .map(|index| {
        let name = self.name.clone();
        let queue = self.queue.clone();
        let drained = drained.clone();
        let thread_count = self.thread_count;
        thread::Builder::new()
          .name(format!("{}-drain-{}", name, index))
          .spawn(move || {
            drain_pass(&queue);
            // Not the last drainer to finish: another drainer may still be
            // executing a task that enqueues, so sweep once more.
            if drained.fetch_add(1, Ordering::AcqRel) + 1 != thread_count {
              drain_pass(&queue);
            }
            trace!(pool = %name, drainer = index, "drain pass complete");
          })
          .expect("failed to spawn pool drain thread")
      })
      .collect();
    for drainer in drainers {
      if drainer.join().is_err() {
        warn!(pool = %self.name, "drain thread panicked while running a late task");
      }
    }

    info!(pool = %self.name, "task pool shut down");
  }
}

impl Default for TaskPool {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for TaskPool {
  fn drop(&mut self) {
    self.shutdown();
  }
}

/// Runs a task pulled during the shutdown drain. Sentinels left behind by
/// a panic-killed worker are skipped, not run.
fn drain_pass(queue: &TaskQueue) {
  while let Some(task) = queue.try_pop() {
    if let Some(job) = task.into_fn() {
      job();
    }
  }
}

/// Executes a task body, capturing a panic into the stored failure shape.
fn run_captured<R>(task: Task<R>) -> Result<R, PoolError> {
  match task.into_fn() {
    Some(job) => panic::catch_unwind(AssertUnwindSafe(job))
      .map_err(|payload| PoolError::TaskPanicked(panic_message(payload.as_ref()))),
    // Unreachable for validated dispatch.
    None => Err(PoolError::InvalidTask),
  }
}
