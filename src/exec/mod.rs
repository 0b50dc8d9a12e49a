// src/exec/mod.rs

//! Task execution layer.
//!
//! The executor hands [`WorkItem`]s to a [`WorkRunner`]; the bundled
//! [`WorkPool`] runs them on a fixed set of workers. The runner interface is
//! deliberately small so callers can substitute their own scheduling.

pub mod pool;

pub use pool::WorkPool;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;

/// A unit of work paired with its completion tracker.
///
/// The tracker is invoked exactly once, with the task's result, after the
/// task finishes.
pub struct WorkItem {
    pub task: BoxFuture<'static, Result<()>>,
    pub tracker: Box<dyn FnOnce(Result<()>) + Send>,
}

impl WorkItem {
    /// Run the task to completion and report its result to the tracker.
    pub async fn run(self) {
        let result = self.task.await;
        (self.tracker)(result);
    }
}

/// Something that can execute [`WorkItem`]s asynchronously.
///
/// `do_task` may apply backpressure but is expected not to block the caller
/// indefinitely; the executor buffers submissions on its side so a slow
/// runner never stalls promise chaining.
#[async_trait]
pub trait WorkRunner: Send + Sync {
    /// Accept an item for execution.
    async fn do_task(&self, item: WorkItem);

    /// Shut down, draining outstanding items. Returns once no worker is
    /// still executing.
    async fn close(&self);
}
