//! Bounded worker pool
//!
//! A fixed number of scoped worker threads pull tasks from a shared queue and
//! push results onto an output channel. The calling thread is the only
//! consumer of that channel, so results are handed over one at a time in the
//! order they finish. Holding a worker is what bounds the number of toolchain
//! pipelines in flight: a worker picks up its next task only after the
//! previous one has returned or panicked.

use crossbeam_channel::unbounded;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Runs tasks with at most `jobs` in flight
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    jobs: usize,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Scheduler {
    /// `jobs == 0` is treated as 1.
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.max(1) }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run `work` on every task and hand each result to `on_result` on the
    /// calling thread as soon as it is ready.
    ///
    /// If `work` panics, `recover` turns the task and the panic message into a
    /// result so the run continues and the worker is freed.
    pub fn run<T, R, W, P, F>(&self, tasks: Vec<T>, work: W, recover: P, mut on_result: F)
    where
        T: Send,
        R: Send,
        W: Fn(&T) -> R + Sync,
        P: Fn(&T, String) -> R + Sync,
        F: FnMut(R),
    {
        if tasks.is_empty() {
            return;
        }
        let workers = self.jobs.min(tasks.len());

        let (task_tx, task_rx) = unbounded::<T>();
        let (result_tx, result_rx) = unbounded::<R>();
        for task in tasks {
            // The receiver is alive, so an unbounded send cannot fail.
            let _ = task_tx.send(task);
        }
        drop(task_tx);

        thread::scope(|scope| {
            for worker in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let work = &work;
                let recover = &recover;
                scope.spawn(move || {
                    tracing::trace!(worker, "worker started");
                    for task in task_rx.iter() {
                        let result = match panic::catch_unwind(AssertUnwindSafe(|| work(&task))) {
                            Ok(result) => result,
                            Err(payload) => {
                                let message = panic_message(payload);
                                tracing::warn!(worker, %message, "task panicked");
                                recover(&task, message)
                            }
                        };
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                    tracing::trace!(worker, "worker finished");
                });
            }
            drop(result_tx);

            for result in result_rx.iter() {
                on_result(result);
            }
        });
    }
}
