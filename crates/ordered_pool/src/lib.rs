//! Bounded parallel execution with submission-order output reassembly.
//!
//! `ordered_pool` runs independent work units (a deferred computation plus
//! its captured state) on up to N worker threads at once, and reassembles
//! their line-oriented outputs into a single aggregate stream whose order
//! matches submission order, not completion order. It is built for pipelines
//! that chew through large record streams in chunks: workers may finish in
//! any order, but each unit's output is emitted atomically and in sequence.
//!
//! Each worker writes its output to a provisional file inside a pool-private
//! temporary directory and atomically renames it into place when done. That
//! rename is the only synchronization primitive between a worker and the
//! consumer: a half-written file is never visible under its final name, and
//! a crash before the rename is always detectable.
//!
//! # Example
//! ```ignore
//! use ordered_pool::{OutputSink, PoolConfig, WorkPool};
//!
//! let config = PoolConfig::builder()
//!     .concurrency_limit(4)
//!     .pool_name("uppercase")
//!     .build();
//! let mut pool = WorkPool::new(config, OutputSink::lines(std::io::stdout()))?;
//!
//! for chunk in chunks {
//!     pool.submit(
//!         |lines: Vec<String>| lines.into_iter().map(|l| l.to_uppercase()),
//!         chunk,
//!     )?;
//!     pool.drain_once()?; // emit whatever is next in order, if ready
//! }
//! pool.shutdown()?; // wait out stragglers, then drain the rest
//! ```
//!
//! With `concurrency_limit = 1` the pool runs in a degraded synchronous
//! mode: tasks execute on the caller's thread and their output goes straight
//! to the sink, with no worker threads and no buffering.

pub mod config;
pub mod error;
pub mod pool;
pub mod sink;

pub(crate) mod artifact;
pub(crate) mod liveness;
pub(crate) mod scheduler;
pub(crate) mod sequencer;
pub(crate) mod unit;

pub use config::{PoolConfig, PoolConfigBuilder};
pub use error::PoolError;
pub use pool::WorkPool;
pub use sequencer::DrainStatus;
pub use sink::OutputSink;
pub use unit::UnitState;
