// src/exec/pool.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::exec::{WorkItem, WorkRunner};

/// A [`WorkRunner`] backed by a fixed set of worker tasks.
///
/// Workers share one channel; each picks up one item at a time, runs it, and
/// invokes its tracker. [`close`](WorkRunner::close) closes the channel,
/// lets the workers drain whatever is outstanding, and waits for every
/// worker to exit. A pool is reusable across runs but typically scoped to
/// one.
///
/// Must be created from within a tokio runtime.
pub struct WorkPool {
    work_tx: Mutex<Option<mpsc::Sender<WorkItem>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkPool {
    /// Spawn a pool with `parallel` workers. Zero means one worker per
    /// available CPU.
    pub fn new(parallel: usize) -> Self {
        let parallel = if parallel == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            parallel
        };

        let (work_tx, work_rx) = mpsc::channel::<WorkItem>(1);
        let work_rx = Arc::new(tokio::sync::Mutex::new(work_rx));

        let workers = (0..parallel)
            .map(|id| tokio::spawn(worker(id, Arc::clone(&work_rx))))
            .collect();

        debug!(workers = parallel, "work pool started");
        Self {
            work_tx: Mutex::new(Some(work_tx)),
            workers: tokio::sync::Mutex::new(workers),
        }
    }
}

#[async_trait]
impl WorkRunner for WorkPool {
    async fn do_task(&self, item: WorkItem) {
        let tx = { self.work_tx.lock().unwrap().clone() };
        match tx {
            Some(tx) => {
                if let Err(mpsc::error::SendError(item)) = tx.send(item).await {
                    // All workers are gone; complete the item inline so its
                    // tracker still fires exactly once.
                    error!("work channel closed; running item on caller");
                    item.run().await;
                }
            }
            None => {
                error!("do_task on a closed pool; running item on caller");
                item.run().await;
            }
        }
    }

    async fn close(&self) {
        let tx = self.work_tx.lock().unwrap().take();
        drop(tx);
        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            let _ = handle.await;
        }
        debug!("work pool closed");
    }
}

/// Worker loop: take one item at a time off the shared channel and run it.
/// Exits when the channel is closed and drained.
async fn worker(id: usize, work_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<WorkItem>>>) {
    loop {
        let item = { work_rx.lock().await.recv().await };
        match item {
            Some(item) => item.run().await,
            None => break,
        }
    }
    debug!(worker = id, "worker exiting");
}
