// src/graph.rs

//! The job registry: named jobs plus on-demand generators.

use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;

use crate::errors::BuildError;
use crate::job::Job;

/// A fallback job source consulted when a name has no registered job.
///
/// Returning `Ok(None)` means "I don't know this name"; an error aborts the
/// lookup entirely. Generators must be pure with respect to a run: calling
/// one twice with the same name must be equivalent to calling it once.
pub type GeneratorFn = Box<dyn Fn(&str) -> Result<Option<Arc<dyn Job>>> + Send + Sync>;

/// An insertion-ordered registry of named jobs plus an ordered sequence of
/// generators. Immutable while a run is in progress.
#[derive(Default)]
pub struct Graph {
    jobs: IndexMap<String, Arc<dyn Job>>,
    generators: Vec<GeneratorFn>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job under its own name. The last writer wins for a
    /// duplicate name.
    pub fn add_job(mut self, job: impl Job + 'static) -> Self {
        let job: Arc<dyn Job> = Arc::new(job);
        self.jobs.insert(job.name().to_string(), job);
        self
    }

    /// Append a generator. Generators are consulted in registration order.
    pub fn add_generator(
        mut self,
        f: impl Fn(&str) -> Result<Option<Arc<dyn Job>>> + Send + Sync + 'static,
    ) -> Self {
        self.generators.push(Box::new(f));
        self
    }

    /// Resolve a name to a job.
    ///
    /// A direct registry hit wins; otherwise each generator is tried in
    /// order and the first `Ok(Some(job))` wins. A generator error stops the
    /// lookup without consulting later generators. If no source yields the
    /// job, the result is [`BuildError::JobNotFound`].
    pub fn get_job(&self, name: &str) -> Result<Arc<dyn Job>, BuildError> {
        if let Some(job) = self.jobs.get(name) {
            return Ok(Arc::clone(job));
        }
        for generator in &self.generators {
            match generator(name) {
                Ok(Some(job)) => return Ok(job),
                Ok(None) => continue,
                Err(err) => return Err(BuildError::job(err)),
            }
        }
        Err(BuildError::JobNotFound(name.to_string()))
    }
}
