//! Concurrent scheduling engine: the worklist, the fixed-size worker
//! pool that drains it, and the subprocess launcher each worker calls
//! into.
//!
//! The driver builds one [`Job`](task::Job) per translation unit and
//! per whole-CDB reducer, pushes them all onto a [`worklist::Worklist`],
//! then posts exactly one [`worklist::WorklistItem::Stop`] per worker.
//! Workers pop in a loop until they see their `Stop`; the pool's `join`
//! returns once every worker has exited.

pub mod pool;
pub mod process;
pub mod task;
pub mod worklist;

pub use pool::WorkerPool;
pub use task::{Job, JobOutcome};
pub use worklist::{FifoWorklist, PriorityWorklist, Worklist, WorklistItem};
