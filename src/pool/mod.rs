//! # Pool de Workers
//! src/pool/mod.rs
//!
//! Núcleo concurrente del servidor:
//! - `queue`: cola acotada (monitor) entre el acceptor y los workers
//! - `worker`: pool fijo de threads que drenan la cola
//!
//! ```text
//! Dispatch Loop → RequestQueue → WorkerPool → ServerLog
//! ```

pub mod queue;
pub mod worker;

pub use queue::RequestQueue;
pub use worker::{PoolReport, QueuedRequest, WorkerContext, WorkerPool};
