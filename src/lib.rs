// src/lib.rs

//! Run named jobs as a dependency DAG.
//!
//! A [`Graph`] registers jobs (and optional on-demand generators). A
//! [`Runner`] takes target names, materializes the reachable dependency
//! forest, rejects cycles, and executes every runnable job at most once,
//! respecting dependency order, a bounded worker pool, and a cooperative
//! cancellation token. Progress and failures are reported through an
//! [`EventHandler`]; nothing is retried.

pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod graph;
pub mod job;
pub mod runner;
pub mod tree;

pub use engine::Promise;
pub use errors::BuildError;
pub use events::{EventHandler, NoopEventHandler, TracingEventHandler};
pub use exec::{WorkItem, WorkPool, WorkRunner};
pub use graph::Graph;
pub use job::{BasicJob, Job};
pub use runner::Runner;
