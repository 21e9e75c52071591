//! fuzzdeck live-event distribution.
//!
//! - [`EventBus`] is an in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, with per-job sequencing ([`JobPublisher`]) and
//!   per-observer cursors ([`Subscription`]).
//! - [`ResultStore`] is a bounded newest-first buffer of result records for
//!   late-joining observers, fed by the [`ResultCollector`] service.

pub mod bus;
pub mod results;

pub use bus::{EventBus, JobEvent, JobPublisher, Subscription};
pub use results::{ResultCollector, ResultStore, RESULT_CAPACITY};
