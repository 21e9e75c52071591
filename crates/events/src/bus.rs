//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the fan-out hub between the job runner (sole producer)
//! and any number of live observers. It is designed to be shared via
//! `Arc<EventBus>` across the application.

use std::sync::Arc;

use chrono::Utc;
use futures::Stream;
use fuzzdeck_core::event::{StreamEvent, TerminalStatus};
use fuzzdeck_core::types::{JobId, Timestamp};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// A [`StreamEvent`] stamped with the job it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,

    /// Position of the event within its job, starting at 0.
    pub seq: u64,

    pub event: StreamEvent,

    /// When the event was published (UTC).
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use std::sync::Arc;
/// use fuzzdeck_core::event::StreamEvent;
/// use fuzzdeck_events::bus::EventBus;
///
/// let bus = Arc::new(EventBus::default());
/// let _sub = bus.subscribe();
///
/// let mut publisher = bus.publisher(uuid::Uuid::new_v4());
/// publisher.publish(StreamEvent::LogLine("hello".into()));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow subscribers skip ahead. Publishing never waits for them.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns how many subscribers the event reached. With no subscribers
    /// the event is silently dropped.
    pub fn publish(&self, event: JobEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published from now on. Earlier events are not
    /// replayed.
    ///
    /// The subscription follows whichever job its first received event
    /// belongs to.
    pub fn subscribe(&self) -> Subscription {
        self.attach(None)
    }

    /// Subscribe to the events of one job only.
    pub fn subscribe_job(&self, job_id: JobId) -> Subscription {
        self.attach(Some(job_id))
    }

    fn attach(&self, job_id: Option<JobId>) -> Subscription {
        let subscription = Subscription {
            id: uuid::Uuid::new_v4(),
            receiver: self.sender.subscribe(),
            job_id,
            next_seq: 0,
            finished: false,
            skipped: 0,
        };
        tracing::debug!(subscriber = %subscription.id, job_id = ?job_id, "Subscriber attached");
        subscription
    }

    /// Raw receiver, for background services that want every event without
    /// the terminal-status cutoff of a [`Subscription`].
    pub fn receiver(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// A sequencing publisher for one job.
    pub fn publisher(self: &Arc<Self>, job_id: JobId) -> JobPublisher {
        JobPublisher {
            bus: Arc::clone(self),
            job_id,
            next_seq: 0,
        }
    }

    /// Number of live receivers (subscriptions plus background services).
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// JobPublisher
// ---------------------------------------------------------------------------

/// Stamps events of a single job with its id and consecutive sequence
/// numbers before handing them to the bus.
pub struct JobPublisher {
    bus: Arc<EventBus>,
    job_id: JobId,
    next_seq: u64,
}

impl JobPublisher {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn publish(&mut self, event: StreamEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let kind = event.kind();
        let reached = self.bus.publish(JobEvent {
            job_id: self.job_id,
            seq,
            event,
            timestamp: Utc::now(),
        });
        tracing::trace!(job_id = %self.job_id, seq, kind, reached, "Event published");
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// One live observer's cursor into the bus.
///
/// Yields the events of a single job in publish order and ends after that
/// job's terminal status. If the observer lags past the terminal status and
/// the next event belongs to another job, a `finished` status is synthesized
/// for the followed job instead. Dropping the subscription detaches the
/// observer.
pub struct Subscription {
    id: uuid::Uuid,
    receiver: broadcast::Receiver<JobEvent>,
    job_id: Option<JobId>,
    next_seq: u64,
    finished: bool,
    skipped: u64,
}

impl Subscription {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Total number of events this subscriber missed by lagging behind.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// The job this subscription follows, once known.
    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    /// Receive the next event, or `None` once the subscription has ended
    /// (terminal status delivered, or the bus was dropped).
    pub async fn recv(&mut self) -> Option<JobEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    let followed = *self.job_id.get_or_insert(event.job_id);
                    if event.job_id != followed {
                        // The followed job's terminal status was overwritten.
                        tracing::warn!(
                            subscriber = %self.id,
                            job_id = %followed,
                            next_job_id = %event.job_id,
                            "Subscriber missed the end of its job"
                        );
                        self.finished = true;
                        return Some(JobEvent {
                            job_id: followed,
                            seq: self.next_seq,
                            event: StreamEvent::Status(TerminalStatus::Finished),
                            timestamp: Utc::now(),
                        });
                    }
                    self.next_seq = event.seq + 1;
                    if event.event.is_terminal() {
                        self.finished = true;
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.skipped += n;
                    tracing::warn!(
                        subscriber = %self.id,
                        skipped = n,
                        "Subscriber lagged, some events were dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Turn the subscription into a stream that ends with the terminal event.
    pub fn into_stream(self) -> impl Stream<Item = JobEvent> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|event| (event, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::debug!(subscriber = %self.id, "Subscriber detached");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
