// src/runner.rs

//! The top-level façade for executing a graph.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::Executor;
use crate::events::EventHandler;
use crate::exec::{WorkPool, WorkRunner};
use crate::graph::Graph;
use crate::tree::{find_cycles, TreeBuilder};

/// Wires a [`Graph`], a [`WorkRunner`], and an [`EventHandler`] into a
/// single `run` call.
///
/// ```no_run
/// use jobdag::{BasicJob, Graph, NoopEventHandler, Runner};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let graph = Graph::new().add_job(
///     BasicJob::new("hello").with_run(|_ctx| async { Ok(()) }),
/// );
/// let mut runner = Runner::new(graph, NoopEventHandler);
/// runner.run(CancellationToken::new(), &["hello"]).await;
/// # }
/// ```
pub struct Runner<H: EventHandler> {
    pub graph: Graph,
    /// Pool to run jobs on. When `None`, each run creates a default-sized
    /// [`WorkPool`] and closes it before returning.
    pub work_runner: Option<Arc<dyn WorkRunner>>,
    pub event_handler: H,
}

impl<H: EventHandler> Runner<H> {
    pub fn new(graph: Graph, event_handler: H) -> Self {
        Self {
            graph,
            work_runner: None,
            event_handler,
        }
    }

    pub fn with_work_runner(mut self, work_runner: Arc<dyn WorkRunner>) -> Self {
        self.work_runner = Some(work_runner);
        self
    }

    /// Execute the targets and everything they transitively depend on.
    ///
    /// Returns once every reachable job has reached a terminal state (or,
    /// after cancellation, once every in-flight job has completed). All
    /// diagnostics flow through the event handler; the dependency graph is
    /// not mutated.
    pub async fn run(&mut self, ctx: CancellationToken, targets: &[&str]) {
        info!(?targets, "starting run");

        let (pool, owned): (Arc<dyn WorkRunner>, bool) = match &self.work_runner {
            Some(pool) => (Arc::clone(pool), false),
            None => (Arc::new(WorkPool::new(0)), true),
        };

        let mut builder = TreeBuilder::new(&self.graph);
        for target in targets {
            builder.gen_tree(target);
        }
        let mut forest = builder.into_forest();

        let cycles = find_cycles(&mut forest);
        if !cycles.is_empty() {
            debug!(nodes = cycles.len(), "cycle members will not run");
        }

        Executor::new(forest, Arc::clone(&pool), &mut self.event_handler, ctx)
            .execute()
            .await;

        if owned {
            pool.close().await;
        }

        info!("run complete");
    }
}
