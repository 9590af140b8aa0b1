//! The queue workers pull from.
//!
//! Two implementations share one trait: [`FifoWorklist`] hands jobs
//! out in submission order, [`PriorityWorklist`] hands out the
//! largest- or smallest-estimated job first. Both honor the same
//! invariant — a [`WorklistItem::Stop`] always sorts after every
//! pending task, so a worker never observes its stop sentinel before
//! draining real work that was enqueued ahead of it.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use super::task::Job;

/// One item pulled off a worklist.
pub enum WorklistItem {
    /// Run this job.
    Task(Arc<dyn Job>),
    /// This worker should exit; no more tasks remain for it.
    Stop,
}

/// A queue of work shared by every worker in the pool.
#[async_trait]
pub trait Worklist: Send + Sync {
    /// Enqueue a job with the given size estimate (used only by
    /// priority worklists; ignored by FIFO ones).
    async fn push_task(&self, job: Arc<dyn Job>, size: u64);

    /// Enqueue a stop sentinel. Callers post exactly one per worker,
    /// after every real task has been pushed.
    async fn push_stop(&self);

    /// Block until an item is available and remove it.
    async fn pop(&self) -> WorklistItem;
}

/// First-in, first-out worklist backed by a `Mutex<VecDeque>`.
pub struct FifoWorklist {
    queue: Mutex<VecDeque<WorklistItem>>,
    notify: Notify,
}

impl FifoWorklist {
    /// Create an empty FIFO worklist.
    pub fn new() -> Self {
        FifoWorklist {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }
}

impl Default for FifoWorklist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worklist for FifoWorklist {
    async fn push_task(&self, job: Arc<dyn Job>, _size: u64) {
        self.queue.lock().await.push_back(WorklistItem::Task(job));
        self.notify.notify_one();
    }

    async fn push_stop(&self) {
        self.queue.lock().await.push_back(WorklistItem::Stop);
        self.notify.notify_one();
    }

    async fn pop(&self) -> WorklistItem {
        loop {
            if let Some(item) = self.queue.lock().await.pop_front() {
                return item;
            }
            self.notify.notified().await;
        }
    }
}

/// Ordering strategy for [`PriorityWorklist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Largest estimated job first.
    LongestFirst,
    /// Smallest estimated job first.
    ShortestFirst,
}

struct Entry {
    item: WorklistItem,
    size: u64,
    seq: u64,
    direction: Direction,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Stop sentinels must sort after every task so a BinaryHeap
        // (a max-heap) never pops one while real work remains.
        let stop_rank = |e: &Entry| matches!(e.item, WorklistItem::Stop) as u8;
        match stop_rank(other).cmp(&stop_rank(self)) {
            Ordering::Equal => {}
            ord => return ord,
        }
        let size_order = match self.direction {
            Direction::LongestFirst => self.size.cmp(&other.size),
            Direction::ShortestFirst => other.size.cmp(&self.size),
        };
        size_order.then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority worklist backed by a `Mutex<BinaryHeap>`, ordered by job
/// size estimate with insertion order as a tie-break (earlier-inserted
/// jobs of equal size pop first).
pub struct PriorityWorklist {
    heap: Mutex<BinaryHeap<Entry>>,
    notify: Notify,
    seq: AtomicU64,
    direction: Direction,
}

impl PriorityWorklist {
    /// Create an empty priority worklist ordered by `direction`.
    pub fn new(direction: Direction) -> Self {
        PriorityWorklist {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            seq: AtomicU64::new(0),
            direction,
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, AtomicOrdering::Relaxed)
    }
}

#[async_trait]
impl Worklist for PriorityWorklist {
    async fn push_task(&self, job: Arc<dyn Job>, size: u64) {
        let entry = Entry {
            item: WorklistItem::Task(job),
            size,
            seq: self.next_seq(),
            direction: self.direction,
        };
        self.heap.lock().await.push(entry);
        self.notify.notify_one();
    }

    async fn push_stop(&self) {
        let entry = Entry {
            item: WorklistItem::Stop,
            size: 0,
            seq: self.next_seq(),
            direction: self.direction,
        };
        self.heap.lock().await.push(entry);
        self.notify.notify_one();
    }

    async fn pop(&self) -> WorklistItem {
        loop {
            if let Some(entry) = self.heap.lock().await.pop() {
                return entry.item;
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parallel::task::JobOutcome;
    use async_trait::async_trait;

    struct NoopJob(&'static str);

    #[async_trait]
    impl Job for NoopJob {
        fn label(&self) -> String {
            self.0.to_string()
        }
        async fn run(&self) -> JobOutcome {
            JobOutcome {
                success: true,
                message: self.0.to_string(),
            }
        }
    }

    fn job(name: &'static str) -> Arc<dyn Job> {
        Arc::new(NoopJob(name))
    }

    #[tokio::test]
    async fn fifo_pops_in_submission_order() {
        let w = FifoWorklist::new();
        w.push_task(job("a"), 0).await;
        w.push_task(job("b"), 0).await;
        w.push_stop().await;

        let labels = [pop_label(&w).await, pop_label(&w).await];
        assert_eq!(labels, ["a", "b"]);
        assert!(matches!(w.pop().await, WorklistItem::Stop));
    }

    #[tokio::test]
    async fn priority_longest_first_orders_by_size_descending() {
        let w = PriorityWorklist::new(Direction::LongestFirst);
        w.push_task(job("small"), 1).await;
        w.push_task(job("large"), 100).await;
        w.push_task(job("medium"), 50).await;
        w.push_stop().await;

        assert_eq!(pop_label(&w).await, "large");
        assert_eq!(pop_label(&w).await, "medium");
        assert_eq!(pop_label(&w).await, "small");
        assert!(matches!(w.pop().await, WorklistItem::Stop));
    }

    #[tokio::test]
    async fn priority_shortest_first_orders_by_size_ascending() {
        let w = PriorityWorklist::new(Direction::ShortestFirst);
        w.push_task(job("large"), 100).await;
        w.push_task(job("small"), 1).await;
        w.push_stop().await;

        assert_eq!(pop_label(&w).await, "small");
        assert_eq!(pop_label(&w).await, "large");
    }

    #[tokio::test]
    async fn stop_always_sorts_after_pending_tasks() {
        let w = PriorityWorklist::new(Direction::LongestFirst);
        w.push_stop().await;
        w.push_task(job("only"), 0).await;

        assert_eq!(pop_label(&w).await, "only");
        assert!(matches!(w.pop().await, WorklistItem::Stop));
    }

    #[tokio::test]
    async fn equal_size_ties_break_by_insertion_order() {
        let w = PriorityWorklist::new(Direction::LongestFirst);
        w.push_task(job("first"), 5).await;
        w.push_task(job("second"), 5).await;
        w.push_stop().await;

        assert_eq!(pop_label(&w).await, "first");
        assert_eq!(pop_label(&w).await, "second");
    }

    async fn pop_label(w: &dyn Worklist) -> String {
        match w.pop().await {
            WorklistItem::Task(job) => job.label(),
            WorklistItem::Stop => "STOP".to_string(),
        }
    }
}
