//! Bounded, newest-first store of parsed result records.
//!
//! [`ResultStore`] keeps the most recent [`RESULT_CAPACITY`] records of the
//! current job so that observers connecting late can catch up.
//! [`ResultCollector`] is the background service that feeds it from the
//! [`EventBus`](crate::bus::EventBus).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use fuzzdeck_core::event::StreamEvent;
use fuzzdeck_core::record::ResultRecord;
use fuzzdeck_core::types::JobId;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::JobEvent;

/// Maximum number of records retained; the oldest are evicted first.
pub const RESULT_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
struct StoreInner {
    job_id: Option<JobId>,
    records: VecDeque<ResultRecord>,
    /// Bus events the collector skipped while this job ran.
    missed: u64,
}

/// Insertion-ordered (newest first) collection with FIFO-tail eviction.
///
/// Shared via `Arc<ResultStore>`. Critical sections are short and never
/// cross an await point, so a std mutex is used.
#[derive(Debug)]
pub struct ResultStore {
    capacity: usize,
    inner: Mutex<StoreInner>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::with_capacity(RESULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Every mutation leaves the deque consistent, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a record at the front, evicting from the tail past capacity.
    pub fn append(&self, record: ResultRecord) {
        let mut inner = self.lock();
        inner.records.push_front(record);
        inner.records.truncate(self.capacity);
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.lock().records.clear();
    }

    /// Clear the store and bind it to a new job. Called once per job start.
    pub fn begin_job(&self, job_id: JobId) {
        let mut inner = self.lock();
        inner.records.clear();
        inner.missed = 0;
        inner.job_id = Some(job_id);
    }

    /// Job the stored records belong to.
    pub fn current_job(&self) -> Option<JobId> {
        self.lock().job_id
    }

    /// Append the record carried by `event` if it is a result of the
    /// current job. Returns whether anything was stored.
    pub fn ingest(&self, event: &JobEvent) -> bool {
        let StreamEvent::Result(record) = &event.event else {
            return false;
        };
        let mut inner = self.lock();
        if inner.job_id != Some(event.job_id) {
            return false;
        }
        inner.records.push_front(record.clone());
        inner.records.truncate(self.capacity);
        true
    }

    /// Count events the collector lost to lag. Some of them may have been
    /// results, so the store can be missing records until the next job.
    pub fn record_missed(&self, skipped: u64) {
        self.lock().missed += skipped;
    }

    /// Events skipped by the collector since the current job began.
    pub fn missed(&self) -> u64 {
        self.lock().missed
    }

    /// Newest-first copy of the retained records.
    pub fn snapshot(&self) -> Vec<ResultRecord> {
        self.lock().records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Collector service
// ---------------------------------------------------------------------------

/// Background service that copies result events from the bus into a
/// [`ResultStore`].
pub struct ResultCollector;

impl ResultCollector {
    /// Run the collector loop.
    ///
    /// Exits when the bus is dropped or `cancel` fires.
    pub async fn run(
        store: std::sync::Arc<ResultStore>,
        mut receiver: broadcast::Receiver<JobEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Result collector shutting down");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => {
                        store.ingest(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        store.record_missed(n);
                        tracing::warn!(
                            skipped = n,
                            "Result collector lagged, some results were not stored"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, result collector shutting down");
                        break;
                    }
                },
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
