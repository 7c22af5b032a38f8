//! Thread pool running one closure per task with shared cancellation.
//!
//! Tasks are fed through a bounded queue so that a worker picks up the next
//! task as soon as it finishes its current one. Results are returned in
//! submission order.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError};
use log::debug;

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct WorkerPool {
    num_workers: usize,
    cancel: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(num_workers: usize) -> WorkerPool {
        WorkerPool::with_cancel_flag(num_workers, Arc::new(AtomicBool::new(false)))
    }

    /// Pool whose workers observe an externally owned cancellation flag.
    pub fn with_cancel_flag(num_workers: usize, cancel: Arc<AtomicBool>) -> WorkerPool {
        WorkerPool { num_workers: num_workers.max(1), cancel }
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Start processing `tasks` with `f`.
    ///
    /// `f` receives the cancellation flag and should return `Error::Cancelled`
    /// once it observes the flag. The first failing task cancels the rest.
    pub fn submit<T, R, F>(&self, tasks: Vec<T>, f: F) -> PoolHandle<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T, &AtomicBool) -> Result<R> + Send + Sync + 'static,
    {
        let num_tasks = tasks.len();
        let (task_tx, task_rx) = bounded::<(usize, T)>(self.num_workers);
        let (result_tx, result_rx) = unbounded::<(usize, Result<R>)>();
        let f = Arc::new(f);

        let mut workers = Vec::with_capacity(self.num_workers + 1);

        let cancel = Arc::clone(&self.cancel);
        workers.push(thread::spawn(move || {
            for (i, task) in tasks.into_iter().enumerate() {
                if cancel.load(Ordering::Relaxed) || task_tx.send((i, task)).is_err() {
                    break;
                }
            }
        }));

        for w in 0 .. self.num_workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = Arc::clone(&self.cancel);
            let f = Arc::clone(&f);
            workers.push(thread::spawn(move || {
                for (i, task) in task_rx.iter() {
                    let res = if cancel.load(Ordering::Relaxed) {
                        Err(Error::Cancelled)
                    } else {
                        (*f)(task, &cancel)
                    };
                    if res.is_err() {
                        cancel.store(true, Ordering::SeqCst);
                    }
                    if result_tx.send((i, res)).is_err() {
                        break;
                    }
                }
                debug!("worker {} exiting", w);
            }));
        }

        PoolHandle {
            results: result_rx,
            workers,
            cancel: Arc::clone(&self.cancel),
            collected: (0 .. num_tasks).map(|_| None).collect(),
            received: 0,
            error: None,
        }
    }
}

/// Handle to tasks submitted to a `WorkerPool`.
pub struct PoolHandle<R> {
    results: Receiver<(usize, Result<R>)>,
    workers: Vec<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    collected: Vec<Option<R>>,
    received: usize,
    /// First error other than cancellation
    error: Option<Error>,
}

impl<R> PoolHandle<R> {
    /// Wait up to `timeout` for all tasks to finish.
    ///
    /// Returns `Ok(None)` if tasks are still running when the timeout expires.
    /// Results received so far are kept for the next call.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<R>>> {
        let deadline = Instant::now() + timeout;
        while self.received < self.collected.len() {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            match self.results.recv_timeout(deadline - now) {
                Ok((i, res)) => {
                    self.received += 1;
                    match res {
                        Ok(r) => self.collected[i] = Some(r),
                        Err(Error::Cancelled) => {},
                        Err(e) => {
                            if self.error.is_none() {
                                self.error = Some(e);
                            }
                        },
                    }
                },
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.join()?;
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if self.received < self.collected.len() {
            // tasks never started after cancellation, or a worker died
            if self.cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            return Err(Error::Worker(format!("{} of {} tasks did not report", self.collected.len() - self.received, self.collected.len())));
        }

        let mut out = Vec::with_capacity(self.collected.len());
        for r in mem::take(&mut self.collected) {
            match r {
                Some(r) => out.push(r),
                None => return Err(Error::Cancelled),
            }
        }
        Ok(Some(out))
    }

    /// Block until all tasks finish.
    pub fn wait(&mut self) -> Result<Vec<R>> {
        loop {
            if let Some(out) = self.wait_timeout(POLL_INTERVAL)? {
                return Ok(out);
            }
        }
    }

    /// Stop all workers and wait for them to exit.
    pub fn cancel(&mut self) -> Result<()> {
        self.cancel.store(true, Ordering::SeqCst);
        self.join()
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn join(&mut self) -> Result<()> {
        let mut panicked = 0;
        for w in mem::take(&mut self.workers) {
            if w.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(Error::Worker(format!("{} worker threads panicked", panicked)));
        }
        Ok(())
    }
}

impl<R> Drop for PoolHandle<R> {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let _ = self.cancel();
        }
    }
}
