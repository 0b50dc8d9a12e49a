// src/events.rs

//! Build event sinks.

use tracing::{info, warn};

use crate::errors::BuildError;

/// Receives job lifecycle events during a run.
///
/// All callbacks execute on the executor's control thread, one at a time, so
/// implementations need no internal locking. They MUST NOT block, or the
/// whole run stalls.
///
/// For every runnable job, `on_queued` precedes `on_start`, and `on_start`
/// precedes the terminal `on_finish` / `on_error`. Every job reachable from
/// the targets receives exactly one terminal event.
pub trait EventHandler: Send {
    /// The job has been queued and is waiting for its dependencies.
    fn on_queued(&mut self, job: &str);

    /// A worker has picked the job up.
    fn on_start(&mut self, job: &str);

    /// The job reached a successful terminal state (ran to completion, or
    /// its `should_run` probe said there was nothing to do).
    fn on_finish(&mut self, job: &str);

    /// The job failed: resolution error, cycle, failed dependency,
    /// cancellation, or an error from the job itself.
    fn on_error(&mut self, job: &str, err: &BuildError);
}

/// An [`EventHandler`] that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventHandler;

impl EventHandler for NoopEventHandler {
    fn on_queued(&mut self, _job: &str) {}
    fn on_start(&mut self, _job: &str) {}
    fn on_finish(&mut self, _job: &str) {}
    fn on_error(&mut self, _job: &str, _err: &BuildError) {}
}

/// An [`EventHandler`] that reports events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventHandler;

impl EventHandler for TracingEventHandler {
    fn on_queued(&mut self, job: &str) {
        info!(job = %job, "job queued");
    }

    fn on_start(&mut self, job: &str) {
        info!(job = %job, "job started");
    }

    fn on_finish(&mut self, job: &str) {
        info!(job = %job, "job finished");
    }

    fn on_error(&mut self, job: &str, err: &BuildError) {
        warn!(job = %job, error = %err, "job failed");
    }
}
