// src/job.rs

//! The [`Job`] trait and a callback-backed convenience implementation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// An operation in the execution graph.
///
/// Jobs are user-supplied and treated as opaque by the executor. During a
/// single run, `dependencies` and `should_run` are each called at most once,
/// and `run` is called at most once, only after every transitive dependency
/// has completed successfully and `should_run` returned `true`.
#[async_trait]
pub trait Job: Send + Sync {
    /// The job's name. Must be deterministic.
    fn name(&self) -> &str;

    /// Names of the jobs this one depends on.
    ///
    /// An error here marks the job as errored without aborting the run.
    fn dependencies(&self) -> Result<Vec<String>>;

    /// Whether the job needs to run. Dependents still run when this returns
    /// `false`. An error marks the job as errored.
    fn should_run(&self) -> Result<bool>;

    /// Execute the job. The token is the run's cancellation signal; jobs are
    /// expected to observe it and return promptly once it fires.
    async fn run(&self, ctx: CancellationToken) -> Result<()>;
}

impl std::fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("name", &self.name()).finish()
    }
}

type ShouldRunFn = Box<dyn Fn() -> Result<bool> + Send + Sync>;
type RunFn = Box<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A [`Job`] assembled from callbacks, builder style.
///
/// ```
/// use jobdag::BasicJob;
///
/// let job = BasicJob::new("compile")
///     .after(["generate"])
///     .with_run(|_ctx| async { Ok(()) });
/// ```
///
/// `should_run` defaults to `Ok(true)`. Running a `BasicJob` without a run
/// callback fails.
pub struct BasicJob {
    name: String,
    deps: Vec<String>,
    should_run: Option<ShouldRunFn>,
    run: Option<RunFn>,
}

impl BasicJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            should_run: None,
            run: None,
        }
    }

    /// Declare the jobs this one waits for.
    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn with_should_run(
        mut self,
        f: impl Fn() -> Result<bool> + Send + Sync + 'static,
    ) -> Self {
        self.should_run = Some(Box::new(f));
        self
    }

    pub fn with_run<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.run = Some(Box::new(move |ctx| Box::pin(f(ctx))));
        self
    }
}

#[async_trait]
impl Job for BasicJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Result<Vec<String>> {
        Ok(self.deps.clone())
    }

    fn should_run(&self) -> Result<bool> {
        match &self.should_run {
            Some(f) => f(),
            None => Ok(true),
        }
    }

    async fn run(&self, ctx: CancellationToken) -> Result<()> {
        match &self.run {
            Some(f) => f(ctx).await,
            None => Err(anyhow!("missing run callback for job {:?}", self.name)),
        }
    }
}
