// src/errors.rs

//! Structured error values for graph execution.
//!
//! Errors compose: [`BuildError::DependencyTree`] nests to record the path
//! from a target down to a root cause, [`BuildError::Multi`] aggregates
//! siblings at the same level, and [`flatten`] rewrites any such tree into a
//! flat list of path-shaped `DependencyTree` chains, one per root cause.

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;

/// Error produced while resolving or executing a job graph.
///
/// Cloneable so a single failure can fan out to every promise subscriber.
/// Job-supplied errors are carried as [`anyhow::Error`] behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// No registered job or generator produced the named job.
    #[error("job not found: {0:?}")]
    JobNotFound(String),

    /// The named jobs form a dependency cycle.
    #[error("dependency cycle: {}", .0.join("->"))]
    DependencyCycle(Vec<String>),

    /// A job could not run because some of its dependencies failed.
    #[error("could not run {:?} because dependencies failed (failures: {})", .job, quoted(.failed))]
    DepFail {
        job: String,
        failed: Vec<String>,
    },

    /// Aggregate failure reported by a composite dependency promise.
    /// Names are sorted and deduplicated.
    #[error("dependencies failed: ({})", .0.join(","))]
    BuildDependency(Vec<String>),

    /// Several errors at the same level.
    #[error("{}", lines(.0))]
    Multi(Vec<BuildError>),

    /// An error annotated with the job it occurred in. Nests to form a path
    /// from a target down to the root cause.
    #[error("error {:?} in {}", .inner.core_error().to_string(), chain(.job, .inner))]
    DependencyTree {
        job: String,
        inner: Box<BuildError>,
    },

    /// The run was cancelled before this job could execute.
    #[error("job canceled")]
    Canceled,

    /// An error returned by user job code, surfaced unmodified.
    #[error("{0}")]
    Job(Arc<anyhow::Error>),
}

impl BuildError {
    /// Wrap a job-supplied error.
    pub fn job(err: anyhow::Error) -> Self {
        BuildError::Job(Arc::new(err))
    }

    /// Annotate an error with the job it occurred in.
    pub fn in_job(self, job: impl Into<String>) -> Self {
        BuildError::DependencyTree {
            job: job.into(),
            inner: Box::new(self),
        }
    }

    /// Job names along a [`BuildError::DependencyTree`] path, leaf first.
    ///
    /// Empty for any other variant.
    pub fn backtrace(&self) -> Vec<String> {
        match self {
            BuildError::DependencyTree { job, inner } => {
                let mut names = inner.backtrace();
                names.push(job.clone());
                names
            }
            _ => Vec::new(),
        }
    }

    /// Peel [`BuildError::DependencyTree`] wrappers to the innermost error.
    pub fn core_error(&self) -> &BuildError {
        let mut err = self;
        while let BuildError::DependencyTree { inner, .. } = err {
            err = inner;
        }
        err
    }
}

impl From<anyhow::Error> for BuildError {
    fn from(err: anyhow::Error) -> Self {
        BuildError::job(err)
    }
}

/// Rewrite a tree of `DependencyTree` / `Multi` errors into a flat list with
/// one entry per root cause, each entry a pure `DependencyTree` path carrying
/// its ancestor chain. Idempotent: flattening a flattened list is a no-op.
pub fn flatten(err: &BuildError) -> Vec<BuildError> {
    match err {
        BuildError::DependencyTree { job, inner } => flatten(inner)
            .into_iter()
            .map(|e| e.in_job(job.clone()))
            .collect(),
        BuildError::Multi(errs) => errs.iter().flat_map(flatten).collect(),
        other => vec![other.clone()],
    }
}

/// Collect the sorted, deduplicated job names mentioned by the
/// `DependencyTree` / `Multi` structure of an error.
pub fn errored_jobs(err: &BuildError) -> Vec<String> {
    fn walk(err: &BuildError, out: &mut Vec<String>) {
        match err {
            BuildError::DependencyTree { job, inner } => {
                walk(inner, out);
                out.push(job.clone());
            }
            BuildError::Multi(errs) => {
                for e in errs {
                    walk(e, out);
                }
            }
            _ => {}
        }
    }
    let mut names = Vec::new();
    walk(err, &mut names);
    names.sort();
    names.dedup();
    names
}

fn quoted(names: &[String]) -> String {
    let mut out = String::new();
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{name:?}");
    }
    out
}

fn lines(errs: &[BuildError]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn chain(job: &str, inner: &BuildError) -> String {
    let mut names = inner.backtrace();
    names.push(job.to_string());
    names.join(" in ")
}
