// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use jobdag::{BasicJob, BuildError, EventHandler};

static INIT: Once = Once::new();

/// Install a tracing subscriber once for the whole test binary. Controlled
/// by `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// One observed lifecycle event.
#[derive(Debug, Clone)]
pub enum Event {
    Queued(String),
    Started(String),
    Finished(String),
    Errored(String, BuildError),
}

/// An [`EventHandler`] that records every event for later assertions.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn queued(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Queued(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Started(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Finished(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(String, BuildError)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Errored(name, err) => Some((name, err)),
                _ => None,
            })
            .collect()
    }

    /// The recorded error for one job, if any.
    pub fn error_for(&self, job: &str) -> Option<BuildError> {
        self.errors()
            .into_iter()
            .find(|(name, _)| name == job)
            .map(|(_, err)| err)
    }

    /// Position of the first matching event, for ordering assertions.
    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events().iter().position(pred)
    }
}

impl EventHandler for RecordingHandler {
    fn on_queued(&mut self, job: &str) {
        self.events.lock().unwrap().push(Event::Queued(job.to_string()));
    }

    fn on_start(&mut self, job: &str) {
        self.events.lock().unwrap().push(Event::Started(job.to_string()));
    }

    fn on_finish(&mut self, job: &str) {
        self.events.lock().unwrap().push(Event::Finished(job.to_string()));
    }

    fn on_error(&mut self, job: &str, err: &BuildError) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Errored(job.to_string(), err.clone()));
    }
}

/// Shared record of which jobs actually ran.
#[derive(Clone, Default)]
pub struct RunLog {
    runs: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.runs.lock().unwrap().push(name.to_string());
    }

    pub fn names(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }

    pub fn ran(&self, name: &str) -> bool {
        self.runs.lock().unwrap().iter().any(|n| n == name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.runs.lock().unwrap().iter().filter(|n| *n == name).count()
    }
}

/// A job that records itself in the log and succeeds.
pub fn ok_job<'a>(name: &str, deps: impl IntoIterator<Item = &'a str>, log: &RunLog) -> BasicJob {
    let log = log.clone();
    let job_name = name.to_string();
    BasicJob::new(name).after(deps).with_run(move |_ctx| {
        let log = log.clone();
        let job_name = job_name.clone();
        async move {
            log.record(&job_name);
            Ok(())
        }
    })
}

/// A job that records itself in the log and fails with `msg`.
pub fn failing_job<'a>(
    name: &str,
    deps: impl IntoIterator<Item = &'a str>,
    log: &RunLog,
    msg: &str,
) -> BasicJob {
    let log = log.clone();
    let job_name = name.to_string();
    let msg = msg.to_string();
    BasicJob::new(name).after(deps).with_run(move |_ctx| {
        let log = log.clone();
        let job_name = job_name.clone();
        let msg = msg.clone();
        async move {
            log.record(&job_name);
            Err(anyhow::anyhow!(msg))
        }
    })
}
