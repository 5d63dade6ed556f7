//! Completion Contexts
//!
//! Where completion handlers run. The orchestrator and the GPU controller do
//! their blocking work on worker threads and hand the final callback to a
//! caller-chosen context:
//!
//! - [`InlineContext`] runs the callback directly on the worker thread.
//! - [`ChannelContext`] queues it; the caller's own loop drains the paired
//!   [`CompletionQueue`], so handlers run on the caller's thread.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use std::time::Duration;
use tracing::warn;

/// A unit of work handed to a completion context
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Execution context that completion handlers are delivered on
pub trait CompletionContext: Send + Sync {
    /// Schedule `task` to run exactly once
    fn dispatch(&self, task: Task);
}

/// Runs tasks immediately on the dispatching thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineContext;

impl CompletionContext for InlineContext {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Sending half of a queued completion context
#[derive(Debug, Clone)]
pub struct ChannelContext {
    sender: Sender<Task>,
}

/// Receiving half of a queued completion context; drain it on the thread that
/// should run completion handlers
#[derive(Debug)]
pub struct CompletionQueue {
    receiver: Receiver<Task>,
}

impl ChannelContext {
    /// Create a connected context/queue pair
    pub fn new() -> (Self, CompletionQueue) {
        let (sender, receiver) = unbounded();
        (Self { sender }, CompletionQueue { receiver })
    }
}

impl CompletionContext for ChannelContext {
    fn dispatch(&self, task: Task) {
        if self.sender.send(task).is_err() {
            warn!("completion queue dropped; handler discarded");
        }
    }
}

impl CompletionQueue {
    /// Run every task queued so far without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return ran,
            }
        }
    }

    /// Wait up to `timeout` for one task and run it. Returns whether a task ran.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Number of tasks waiting to run
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no task is waiting
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
