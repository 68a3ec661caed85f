//! Fixed-size worker pool with a FIFO queue and a drain barrier.
//!
//! One mutex guards the queue together with the in-flight count and the
//! shutdown flags. `work_ready` wakes idle workers; `drained` wakes threads
//! parked in [`TaskScheduler::drain`] and is only signalled while the lock is
//! held and the queue is empty with nothing in flight.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

type BoxedTask = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is not accepting new tasks (shutdown has begun)")]
    NotAccepting,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Why a task produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    /// Discarded by `stop_now` before it started.
    #[error("task was cancelled before it ran")]
    Cancelled,
}

/// Completion handle returned by [`TaskScheduler::submit`].
#[derive(Debug)]
pub struct TaskHandle<R> {
    rx: Receiver<Result<R, TaskError>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task finishes, panics, or is discarded.
    pub fn wait(self) -> Result<R, TaskError> {
        self.rx.recv().unwrap_or(Err(TaskError::Cancelled))
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<R, TaskError>> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(Err(TaskError::Cancelled)),
        }
    }

    /// Non-blocking poll. The outcome is delivered once; later polls report
    /// `Cancelled`.
    pub fn try_wait(&self) -> Option<Result<R, TaskError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TaskError::Cancelled)),
        }
    }
}

struct QueueState {
    queue: VecDeque<BoxedTask>,
    in_flight: usize,
    accepting: bool,
    stopping: bool,
    /// Some caller has taken ownership of joining the workers.
    joining: bool,
    /// Every worker thread has exited.
    joined: bool,
}

impl QueueState {
    fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }
}

struct Shared {
    state: Mutex<QueueState>,
    work_ready: Condvar,
    drained: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct TaskScheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("worker_count", &self.worker_count)
            .field("pending", &self.pending())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl TaskScheduler {
    pub fn new(workers: usize) -> Result<Self, SchedulerError> {
        Self::with_name("eventlab-worker", workers)
    }

    /// Pool whose threads are named `{name}-{i}`. At least one worker is
    /// always started.
    pub fn with_name(name: &str, workers: usize) -> Result<Self, SchedulerError> {
        let workers = workers.max(1);

        let scheduler = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    in_flight: 0,
                    accepting: true,
                    stopping: false,
                    joining: false,
                    joined: false,
                }),
                work_ready: Condvar::new(),
                drained: Condvar::new(),
            }),
            workers: Mutex::new(Vec::with_capacity(workers)),
            worker_count: workers,
        };

        for i in 0..workers {
            let shared = Arc::clone(&scheduler.shared);
            let spawned = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || worker_loop(&shared));
            match spawned {
                Ok(handle) => scheduler.lock_workers().push(handle),
                Err(e) => {
                    scheduler.stop_now();
                    return Err(SchedulerError::Spawn(e));
                }
            }
        }

        debug!(workers, "task scheduler started");
        Ok(scheduler)
    }

    /// Queue `task`. Panics inside it are captured into the handle.
    pub fn submit<F, R>(&self, task: F) -> Result<TaskHandle<R>, SchedulerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let wrapped: BoxedTask = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
            // The handle may already be gone; nobody is waiting then.
            let _ = tx.send(outcome);
        });

        {
            let mut state = self.shared.lock();
            if !state.accepting {
                return Err(SchedulerError::NotAccepting);
            }
            state.queue.push_back(wrapped);
        }
        self.shared.work_ready.notify_one();
        Ok(TaskHandle { rx })
    }

    /// Block until the queue is empty and nothing is running.
    ///
    /// A pure barrier: the pool keeps accepting work afterwards. Must not be
    /// called from inside a task.
    pub fn drain(&self) {
        let mut state = self.shared.lock();
        while !state.is_drained() {
            state = self
                .shared
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stop accepting, finish everything already queued, then join workers.
    /// Idempotent; every caller returns only after the workers have exited.
    pub fn stop_gracefully(&self) {
        self.shared.lock().accepting = false;
        self.drain();
        self.shared.lock().stopping = true;
        self.shared.work_ready.notify_all();
        self.join_workers();
    }

    /// Stop accepting and discard queued work. Running tasks still finish
    /// before this returns.
    pub fn stop_now(&self) {
        let discarded = {
            let mut state = self.shared.lock();
            state.accepting = false;
            state.stopping = true;
            std::mem::take(&mut state.queue)
        };
        if !discarded.is_empty() {
            warn!(discarded = discarded.len(), "stop_now discarded queued tasks");
        }
        // Dropping the closures closes their channels, so handles see Cancelled.
        drop(discarded);

        self.shared.work_ready.notify_all();
        self.shared.drained.notify_all();
        self.join_workers();
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.lock().accepting
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The first caller joins; concurrent and later callers wait on
    /// `drained` until it is done.
    fn join_workers(&self) {
        {
            let mut state = self.shared.lock();
            if state.joining {
                while !state.joined {
                    state = self
                        .shared
                        .drained
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                return;
            }
            state.joining = true;
        }

        let handles = std::mem::take(&mut *self.lock_workers());
        for handle in handles {
            if handle.join().is_err() {
                warn!("worker thread terminated abnormally");
            }
        }

        self.shared.lock().joined = true;
        self.shared.drained.notify_all();
        debug!("task scheduler stopped");
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop_gracefully();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut state = shared.lock();
            while state.queue.is_empty() && !state.stopping {
                state = shared
                    .work_ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            match state.queue.pop_front() {
                Some(task) => {
                    state.in_flight += 1;
                    task
                }
                // Stopping with nothing left to start.
                None => return,
            }
        };

        task();

        let mut state = shared.lock();
        state.in_flight -= 1;
        if state.is_drained() {
            shared.drained.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
