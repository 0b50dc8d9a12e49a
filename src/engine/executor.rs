// src/engine/executor.rs

//! Drives a forest to quiescence.
//!
//! The executor is single-threaded in its control loop: one task reads
//! lifecycle notifications sequentially, and all promise transitions, forest
//! bookkeeping, and event-handler calls happen there. Job bodies run
//! concurrently on the work pool; workers talk back only through the
//! notification channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::promise::{join_named, Promise, Resolver};
use crate::errors::BuildError;
use crate::events::EventHandler;
use crate::exec::{WorkItem, WorkRunner};
use crate::job::Job;
use crate::tree::{Forest, NodeId};

/// Lifecycle messages flowing into the control loop.
enum Notification {
    /// A worker picked the job up and is about to run it.
    Started { name: String },
    /// The job's task finished (or was cancelled while still buffered).
    Completed {
        name: String,
        result: Result<(), BuildError>,
    },
    /// The job's promise settled; emit the terminal event.
    Resolved {
        name: String,
        err: Option<BuildError>,
    },
}

/// A job handed from the promise web to the dispatch pipeline.
struct Submission {
    name: String,
    job: Arc<dyn Job>,
}

pub(crate) struct Executor<'h, H: EventHandler> {
    forest: Forest,
    pool: Arc<dyn WorkRunner>,
    evh: &'h mut H,
    ctx: CancellationToken,

    notify_tx: mpsc::UnboundedSender<Notification>,
    notify_rx: mpsc::UnboundedReceiver<Notification>,
    submit_tx: mpsc::UnboundedSender<Submission>,
    submit_rx: Option<mpsc::UnboundedReceiver<Submission>>,

    /// One memoized promise per forest node.
    proms: Vec<Option<Promise>>,
    /// Completion resolvers for jobs handed to the pipeline, keyed by name.
    /// Shared with the promise web; entries are consumed by the control loop.
    cbset: Arc<Mutex<HashMap<String, Resolver>>>,
}

impl<'h, H: EventHandler> Executor<'h, H> {
    pub(crate) fn new(
        forest: Forest,
        pool: Arc<dyn WorkRunner>,
        evh: &'h mut H,
        ctx: CancellationToken,
    ) -> Self {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let proms = (0..forest.len()).map(|_| None).collect();
        Self {
            forest,
            pool,
            evh,
            ctx,
            notify_tx,
            notify_rx,
            submit_tx,
            submit_rx: Some(submit_rx),
            proms,
            cbset: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run every node in the forest to a terminal state.
    pub(crate) async fn execute(mut self) {
        // Announce runnable nodes before anything can start.
        for id in self.forest.ids() {
            let node = self.forest.get(id);
            if node.err().is_none() {
                self.evh.on_queued(node.name());
            }
        }

        // The dispatcher decouples promise chaining from pool backpressure:
        // submissions buffer in the unbounded channel and are forwarded one
        // at a time.
        if let Some(submit_rx) = self.submit_rx.take() {
            tokio::spawn(dispatch(
                submit_rx,
                Arc::clone(&self.pool),
                self.ctx.clone(),
                self.notify_tx.clone(),
            ));
        }

        // Subscribe a terminal handler to every node's promise. The first
        // subscription lazily starts each chain; already-failed nodes settle
        // synchronously and their events queue up behind the loop below.
        let total = self.forest.len();
        for id in 0..total {
            let promise = self.node_promise(id);
            let name = self.forest.get(id).name().to_string();
            let ok_tx = self.notify_tx.clone();
            let ok_name = name.clone();
            let fail_tx = self.notify_tx.clone();
            promise.then(
                move || {
                    let _ = ok_tx.send(Notification::Resolved {
                        name: ok_name,
                        err: None,
                    });
                },
                move |err| {
                    let _ = fail_tx.send(Notification::Resolved {
                        name,
                        err: Some(err),
                    });
                },
            );
        }

        let mut outstanding = total;
        while outstanding > 0 {
            let Some(note) = self.notify_rx.recv().await else {
                break;
            };
            match note {
                Notification::Started { name } => {
                    if let Some(id) = self.forest.lookup(&name) {
                        self.forest.get_mut(id).started = true;
                    }
                    self.evh.on_start(&name);
                }
                Notification::Completed { name, result } => {
                    let resolver = self.cbset.lock().unwrap().remove(&name);
                    match resolver {
                        Some(resolver) => resolver.resolve(result),
                        None => warn!(job = %name, "completion for unknown job; ignoring"),
                    }
                }
                Notification::Resolved { name, err } => {
                    if let Some(id) = self.forest.lookup(&name) {
                        let node = self.forest.get_mut(id);
                        node.finished = true;
                        if let Some(e) = &err {
                            node.err.get_or_insert_with(|| e.clone());
                        }
                    }
                    match err {
                        None => self.evh.on_finish(&name),
                        Some(err) => self.evh.on_error(&name, &err),
                    }
                    outstanding -= 1;
                }
            }
        }

        debug!("all jobs terminal; executor exiting");
    }

    /// The memoized promise for one node.
    ///
    /// Failing nodes settle immediately with their recorded error. Runnable
    /// nodes chain on a composite over their dependencies, probe
    /// `should_run` on dependency success, and submit themselves to the
    /// dispatch pipeline when the probe says yes.
    fn node_promise(&mut self, id: NodeId) -> Promise {
        if let Some(promise) = &self.proms[id] {
            return promise.clone();
        }

        let (name, job, err, dep_ids) = {
            let node = self.forest.get(id);
            (
                node.name().to_string(),
                node.job(),
                node.err().cloned(),
                node.deps().to_vec(),
            )
        };

        let promise = match (err, job) {
            (Some(err), _) => Promise::new(move |r| r.fail(err)),
            // A node with no error always has a resolved job; treat the
            // impossible combination as a lookup failure rather than panic.
            (None, None) => Promise::new(move |r| r.fail(BuildError::JobNotFound(name))),
            (None, Some(job)) => {
                let deps: Vec<(String, Promise)> = dep_ids
                    .iter()
                    .map(|&dep| {
                        (
                            self.forest.get(dep).name().to_string(),
                            self.node_promise(dep),
                        )
                    })
                    .collect();
                let submit_tx = self.submit_tx.clone();
                let cbset = Arc::clone(&self.cbset);
                Promise::new(move |resolver| {
                    let dep_promise = if deps.is_empty() {
                        Promise::fulfilled()
                    } else {
                        join_named(deps)
                    };
                    let fail_resolver = resolver.clone();
                    let fail_name = name.clone();
                    dep_promise.then(
                        move || match job.should_run() {
                            Err(err) => resolver.fail(BuildError::job(err)),
                            Ok(false) => resolver.finish(),
                            Ok(true) => {
                                cbset
                                    .lock()
                                    .unwrap()
                                    .insert(name.clone(), resolver.clone());
                                let _ = submit_tx.send(Submission { name, job });
                            }
                        },
                        move |err| match err {
                            BuildError::BuildDependency(failed) => {
                                fail_resolver.fail(BuildError::DepFail {
                                    job: fail_name,
                                    failed,
                                })
                            }
                            other => fail_resolver.fail(other),
                        },
                    );
                })
            }
        };

        self.proms[id] = Some(promise.clone());
        promise
    }
}

/// Forward buffered submissions into the pool until the run is cancelled or
/// the submission channel closes.
///
/// After cancellation nothing further reaches the pool; every submission
/// still buffered (or arriving later from the promise web) is failed with a
/// synthesized cancellation completion so its promise settles.
async fn dispatch(
    mut submit_rx: mpsc::UnboundedReceiver<Submission>,
    pool: Arc<dyn WorkRunner>,
    ctx: CancellationToken,
    notify_tx: mpsc::UnboundedSender<Notification>,
) {
    loop {
        // Biased: once the token fires, nothing further is forwarded even if
        // submissions are already waiting.
        tokio::select! {
            biased;
            _ = ctx.cancelled() => break,
            sub = submit_rx.recv() => match sub {
                None => return,
                Some(Submission { name, job }) => {
                    debug!(job = %name, "dispatching job to pool");
                    let item = work_item(name, job, ctx.clone(), notify_tx.clone());
                    pool.do_task(item).await;
                }
            }
        }
    }

    debug!("run cancelled; failing buffered jobs");
    while let Some(Submission { name, .. }) = submit_rx.recv().await {
        let _ = notify_tx.send(Notification::Completed {
            name,
            result: Err(BuildError::Canceled),
        });
    }
}

/// Package a job for the pool: the task announces itself, runs the job with
/// the run's cancellation token, and the tracker reports the outcome.
fn work_item(
    name: String,
    job: Arc<dyn Job>,
    ctx: CancellationToken,
    notify_tx: mpsc::UnboundedSender<Notification>,
) -> WorkItem {
    let started_tx = notify_tx.clone();
    let task_name = name.clone();
    WorkItem {
        task: Box::pin(async move {
            let _ = started_tx.send(Notification::Started { name: task_name });
            job.run(ctx).await
        }),
        tracker: Box::new(move |result| {
            let _ = notify_tx.send(Notification::Completed {
                name,
                result: result.map_err(BuildError::job),
            });
        }),
    }
}
