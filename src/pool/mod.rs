//! Bounded worker pool.
//!
//! A fixed set of worker threads consumes jobs from a closeable FIFO. Each
//! submitted task yields a [`TaskHandle`] that resolves to the task's return
//! value; a panicking task resolves its own handle to an error without
//! taking the worker down.

pub mod queue;

pub use self::queue::TaskQueue;

use anyhow::{anyhow, bail, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Completion handle for one submitted task.
pub struct TaskHandle<R> {
    rx: mpsc::Receiver<std::thread::Result<R>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task finishes. A task that panicked, or a pool torn
    /// down before running it, surfaces as an error.
    pub fn wait(self) -> Result<R> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(anyhow!("task panicked")),
            Err(_) => Err(anyhow!("task dropped before completion")),
        }
    }
}

/// Fixed-size worker set over a [`TaskQueue`]. Workers exit when the queue
/// is closed and drained; `shutdown` is idempotent and also runs on drop.
pub struct WorkerPool {
    queue: Arc<TaskQueue<Job>>,
    workers: Vec<JoinHandle<()>>,
    accepting: AtomicBool,
}

impl WorkerPool {
    /// Spawn `threads` workers (clamped to at least 1).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let queue: Arc<TaskQueue<Job>> = Arc::new(TaskQueue::new());

        let workers = (0..threads)
            .map(|i| {
                let queue = Arc::clone(&queue);
                std::thread::Builder::new()
                    .name(format!("pool-worker-{i}"))
                    .spawn(move || worker_loop(&queue))
                    .expect("failed to spawn pool worker")
            })
            .collect();

        Self {
            queue,
            workers,
            accepting: AtomicBool::new(true),
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a task and return its completion handle. Fails once shutdown
    /// has begun.
    pub fn submit<F, R>(&self, task: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if !self.accepting.load(Ordering::Acquire) {
            bail!("worker pool is shutting down");
        }

        let (tx, rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            // Contain panics here so the worker loop survives any task.
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            let _ = tx.send(outcome);
        });

        if !self.queue.push(job) {
            bail!("worker pool queue is closed");
        }

        Ok(TaskHandle { rx })
    }

    /// Close the queue, wait for workers to drain it, and join them.
    pub fn shutdown(&mut self) {
        if self
            .accepting
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.queue.close();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(queue: &TaskQueue<Job>) {
    while let Some(job) = queue.pop() {
        job();
    }
}
