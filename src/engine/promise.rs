// src/engine/promise.rs

//! A single-use, memoized future with success/failure callbacks.
//!
//! Unlike a std future, a [`Promise`] is driven by callbacks: subscribing
//! with [`Promise::then`] lazily starts the producer, and resolution fires
//! every queued callback synchronously on the resolving thread. The executor
//! only ever resolves promises from its control loop, so subscribers never
//! observe concurrent callbacks.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::errors::BuildError;

type OkCallback = Box<dyn FnOnce() + Send>;
type FailCallback = Box<dyn FnOnce(BuildError) + Send>;
type Producer = Box<dyn FnOnce(Resolver) + Send>;

struct PromiseState {
    producer: Option<Producer>,
    started: bool,
    outcome: Option<Result<(), BuildError>>,
    on_ok: Vec<OkCallback>,
    on_fail: Vec<FailCallback>,
}

/// A memoized one-shot future.
///
/// The producer runs at most once, on the first [`then`](Promise::then)
/// call. At most one of success or failure is ever signalled; late signals
/// are ignored. Subscribing after resolution invokes the relevant callback
/// immediately with the stored outcome. Callback queues are released on
/// resolution so captured state can be dropped.
#[derive(Clone)]
pub struct Promise {
    state: Arc<Mutex<PromiseState>>,
}

/// Handle passed to a promise's producer (and anyone the producer hands it
/// to) for settling the promise. Cloneable; only the first signal counts.
#[derive(Clone)]
pub struct Resolver {
    state: Arc<Mutex<PromiseState>>,
}

enum Deferred {
    RunOk(OkCallback),
    RunFail(FailCallback, BuildError),
    Start(Producer, Resolver),
    Nothing,
}

impl Promise {
    pub fn new(producer: impl FnOnce(Resolver) + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(PromiseState {
                producer: Some(Box::new(producer)),
                started: false,
                outcome: None,
                on_ok: Vec::new(),
                on_fail: Vec::new(),
            })),
        }
    }

    /// A promise that succeeds as soon as it is subscribed to.
    pub fn fulfilled() -> Self {
        Self::new(|r| r.finish())
    }

    /// Register callbacks for resolution, starting the producer if it has
    /// not started yet.
    ///
    /// Callbacks registered before resolution fire in registration order
    /// when the promise settles; if the promise has already settled, the
    /// relevant callback runs immediately. The internal lock is released
    /// before any user code runs, so callbacks may freely subscribe to this
    /// or other promises.
    pub fn then(
        &self,
        on_ok: impl FnOnce() + Send + 'static,
        on_fail: impl FnOnce(BuildError) + Send + 'static,
    ) {
        let deferred = {
            let mut st = self.state.lock().unwrap();
            match st.outcome.clone() {
                Some(Ok(())) => Deferred::RunOk(Box::new(on_ok)),
                Some(Err(err)) => Deferred::RunFail(Box::new(on_fail), err),
                None => {
                    st.on_ok.push(Box::new(on_ok));
                    st.on_fail.push(Box::new(on_fail));
                    if st.started {
                        Deferred::Nothing
                    } else {
                        st.started = true;
                        match st.producer.take() {
                            Some(producer) => Deferred::Start(
                                producer,
                                Resolver {
                                    state: Arc::clone(&self.state),
                                },
                            ),
                            None => Deferred::Nothing,
                        }
                    }
                }
            }
        };

        match deferred {
            Deferred::RunOk(f) => f(),
            Deferred::RunFail(f, err) => f(err),
            Deferred::Start(producer, resolver) => producer(resolver),
            Deferred::Nothing => {}
        }
    }
}

impl Resolver {
    /// Signal success. Ignored if the promise already settled.
    pub fn finish(&self) {
        self.settle(Ok(()));
    }

    /// Signal failure. Ignored if the promise already settled.
    pub fn fail(&self, err: BuildError) {
        self.settle(Err(err));
    }

    /// Signal either outcome.
    pub fn resolve(&self, outcome: Result<(), BuildError>) {
        self.settle(outcome);
    }

    fn settle(&self, outcome: Result<(), BuildError>) {
        let (on_ok, on_fail) = {
            let mut st = self.state.lock().unwrap();
            if st.outcome.is_some() {
                return;
            }
            st.outcome = Some(outcome.clone());
            (
                std::mem::take(&mut st.on_ok),
                std::mem::take(&mut st.on_fail),
            )
        };

        match outcome {
            Ok(()) => {
                for f in on_ok {
                    f();
                }
            }
            Err(err) => {
                for f in on_fail {
                    f(err.clone());
                }
            }
        }
    }
}

/// Combine named dependency promises into one.
///
/// The composite resolves once every input has resolved. It succeeds iff all
/// inputs succeeded; otherwise it fails with
/// [`BuildError::BuildDependency`] carrying the sorted, deduplicated names
/// of the failed inputs. Failure is never reported early: every input must
/// settle first, so no in-flight work is orphaned from the caller's
/// bookkeeping.
pub fn join_named(deps: Vec<(String, Promise)>) -> Promise {
    Promise::new(move |resolver| {
        if deps.is_empty() {
            resolver.finish();
            return;
        }

        let remaining = Arc::new(Mutex::new(deps.len()));
        let failed: Arc<Mutex<BTreeSet<String>>> = Arc::new(Mutex::new(BTreeSet::new()));

        for (name, promise) in deps {
            let on_ok = {
                let remaining = Arc::clone(&remaining);
                let failed = Arc::clone(&failed);
                let resolver = resolver.clone();
                move || {
                    *remaining.lock().unwrap() -= 1;
                    settle_if_done(&remaining, &failed, &resolver);
                }
            };
            let on_fail = {
                let remaining = Arc::clone(&remaining);
                let failed = Arc::clone(&failed);
                let resolver = resolver.clone();
                move |_err: BuildError| {
                    failed.lock().unwrap().insert(name);
                    *remaining.lock().unwrap() -= 1;
                    settle_if_done(&remaining, &failed, &resolver);
                }
            };
            promise.then(on_ok, on_fail);
        }
    })
}

/// Settle a composite once its last input has resolved.
fn settle_if_done(
    remaining: &Mutex<usize>,
    failed: &Mutex<BTreeSet<String>>,
    resolver: &Resolver,
) {
    if *remaining.lock().unwrap() > 0 {
        return;
    }
    let failed: Vec<String> = failed.lock().unwrap().iter().cloned().collect();
    if failed.is_empty() {
        resolver.finish();
    } else {
        resolver.fail(BuildError::BuildDependency(failed));
    }
}
