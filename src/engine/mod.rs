// src/engine/mod.rs

//! Promise-based readiness coordination and the execution control loop.
//!
//! - [`promise`] holds the memoized completion primitive each forest node is
//!   driven by.
//! - [`executor`] composes one promise per node, feeds eligible jobs to the
//!   work pool through a buffered dispatcher, and fans lifecycle events out
//!   to the run's event handler.

mod executor;
pub mod promise;

pub use promise::{join_named, Promise, Resolver};

pub(crate) use executor::Executor;
