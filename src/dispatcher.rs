use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::runtime::AppEvent;

/// Unit of work that must run on the UI thread.
pub struct MainTask(Box<dyn FnOnce() + Send + 'static>);

impl MainTask {
    pub fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Self(Box::new(f))
    }

    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for MainTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MainTask")
    }
}

/// Sending side of the UI thread queue. Cheap to clone and safe to move to any thread.
#[derive(Debug, Clone)]
pub struct MainHandle {
    tx: Sender<AppEvent>,
}

impl MainHandle {
    pub fn new(tx: Sender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Queues `task` for the UI thread. Returns false if the UI loop is gone,
    /// in which case the task is dropped without running.
    pub fn post(&self, task: MainTask) -> bool {
        match self.tx.send(AppEvent::Dispatch(task)) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("main loop gone, dropping dispatched task");
                false
            }
        }
    }
}

/// Receiving side of the UI thread queue, for loops that only need to run
/// dispatched work (headless runs and tests). The terminal app receives the
/// same events through `runtime::Runner` instead.
pub struct MainThread {
    rx: Receiver<AppEvent>,
}

impl MainThread {
    pub fn new() -> (Self, MainHandle) {
        let (tx, rx) = mpsc::channel();
        (Self { rx }, MainHandle::new(tx))
    }

    /// Runs every task already queued, without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(event) = self.rx.try_recv() {
            if let AppEvent::Dispatch(task) = event {
                task.run();
                ran += 1;
            }
        }
        ran
    }

    /// Waits up to `timeout` for one task and runs it.
    pub fn run_one(&self, timeout: Duration) -> Result<(), RecvTimeoutError> {
        loop {
            if let AppEvent::Dispatch(task) = self.rx.recv_timeout(timeout)? {
                task.run();
                return Ok(());
            }
        }
    }

    /// Keeps running tasks until `timeout` passes with nothing arriving.
    pub fn run_until_idle(&self, timeout: Duration) -> usize {
        let mut ran = 0;
        while self.run_one(timeout).is_ok() {
            ran += 1;
        }
        ran
    }
}
