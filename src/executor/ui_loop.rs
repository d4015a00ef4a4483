//! Single-threaded task loop bound to the UI-affinity thread.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

/// A unit of work executed on the UI-affinity thread.
pub type UiTask = Box<dyn FnOnce() + Send>;

/// Cloneable handle for posting tasks to a [`UiLoop`] from any thread.
#[derive(Clone)]
pub struct UiHandle {
    tx: Sender<UiTask>,
}

impl UiHandle {
    /// Enqueues a task. Returns false if the loop has been dropped.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(task)).is_ok()
    }
}

/// The receiving end of the task queue.
///
/// Whichever thread drives the loop is, by definition, the UI-affinity
/// thread: every posted task runs there, in posting order.
pub struct UiLoop {
    rx: Receiver<UiTask>,
    executed: u64,
}

impl UiLoop {
    /// Creates a loop and the handle used to post to it.
    pub fn new() -> (Self, UiHandle) {
        let (tx, rx) = channel();
        (Self { rx, executed: 0 }, UiHandle { tx })
    }

    /// Runs every task already queued, without blocking.
    ///
    /// Returns the number of tasks executed.
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.rx.try_recv() {
                Ok(task) => {
                    self.execute(task);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        count
    }

    /// Pumps tasks until `done` returns true or `timeout` elapses.
    ///
    /// `done` is checked before blocking and after every task. Returns the
    /// final value of `done`.
    pub fn run_until<F>(&mut self, mut done: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if done() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return done();
            }
            match self.rx.recv_timeout(remaining) {
                Ok(task) => self.execute(task),
                Err(RecvTimeoutError::Timeout) => return done(),
                // Every handle is gone; nothing more can arrive
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }

    /// Pumps tasks for a fixed period.
    pub fn run_for(&mut self, duration: Duration) -> usize {
        let before = self.executed;
        self.run_until(|| false, duration);
        (self.executed - before) as usize
    }

    /// Total tasks executed by this loop.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    fn execute(&mut self, task: UiTask) {
        task();
        self.executed += 1;
    }
}
