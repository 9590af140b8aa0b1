//! Fixed-size worker pool that drains a [`Worklist`].
//!
//! Workers are spawned once, up front. The driver is responsible for
//! posting exactly one [`WorklistItem::Stop`] per worker after every
//! real task has been enqueued — posting fewer leaves workers blocked
//! forever, posting more is silently absorbed since excess stops are
//! simply never popped.

use super::worklist::{Worklist, WorklistItem};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A fixed number of tokio tasks, each looping on
/// [`Worklist::pop`](super::worklist::Worklist::pop) until it receives
/// its stop sentinel.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    failures: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `workers` loops draining `worklist`.
    pub fn spawn(workers: usize, worklist: Arc<dyn Worklist>) -> Self {
        let failures = Arc::new(AtomicUsize::new(0));
        let handles = (0..workers)
            .map(|id| {
                let worklist = Arc::clone(&worklist);
                let failures = Arc::clone(&failures);
                tokio::spawn(async move { worker_loop(id, worklist, failures).await })
            })
            .collect();
        WorkerPool { handles, failures }
    }

    /// Wait for every worker to observe its stop sentinel and exit.
    /// Returns the number of jobs that reported failure.
    pub async fn join(self) -> usize {
        for handle in self.handles {
            if let Err(e) = handle.await {
                log::error!("worker task panicked: {e}");
            }
        }
        self.failures.load(Ordering::SeqCst)
    }
}

async fn worker_loop(id: usize, worklist: Arc<dyn Worklist>, failures: Arc<AtomicUsize>) {
    loop {
        match worklist.pop().await {
            WorklistItem::Task(job) => {
                log::debug!("worker {id} running {}", job.label());
                let outcome = job.run().await;
                if outcome.success {
                    log::info!("{}", outcome.message);
                } else {
                    log::error!("{}", outcome.message);
                    failures.fetch_add(1, Ordering::SeqCst);
                }
            }
            WorklistItem::Stop => {
                log::debug!("worker {id} stopping");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parallel::task::{Job, JobOutcome};
    use crate::core::parallel::worklist::FifoWorklist;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize as Counter, Ordering as O};

    struct CountingJob {
        counter: Arc<Counter>,
        should_fail: bool,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn label(&self) -> String {
            "counting".into()
        }
        async fn run(&self) -> JobOutcome {
            self.counter.fetch_add(1, O::SeqCst);
            JobOutcome {
                success: !self.should_fail,
                message: "ran".into(),
            }
        }
    }

    #[tokio::test]
    async fn pool_runs_every_task_then_stops() {
        let worklist: Arc<dyn crate::core::parallel::worklist::Worklist> =
            Arc::new(FifoWorklist::new());
        let counter = Arc::new(Counter::new(0));

        for _ in 0..10 {
            worklist
                .push_task(
                    Arc::new(CountingJob {
                        counter: counter.clone(),
                        should_fail: false,
                    }),
                    0,
                )
                .await;
        }
        let workers = 4;
        for _ in 0..workers {
            worklist.push_stop().await;
        }

        let pool = WorkerPool::spawn(workers, worklist);
        let failures = pool.join().await;

        assert_eq!(counter.load(O::SeqCst), 10);
        assert_eq!(failures, 0);
    }

    #[tokio::test]
    async fn pool_counts_failures() {
        let worklist: Arc<dyn crate::core::parallel::worklist::Worklist> =
            Arc::new(FifoWorklist::new());
        let counter = Arc::new(Counter::new(0));

        for i in 0..5 {
            worklist
                .push_task(
                    Arc::new(CountingJob {
                        counter: counter.clone(),
                        should_fail: i % 2 == 0,
                    }),
                    0,
                )
                .await;
        }
        worklist.push_stop().await;

        let pool = WorkerPool::spawn(1, worklist);
        let failures = pool.join().await;
        assert_eq!(failures, 3);
    }
}
