//! Pure domain logic for fuzzdeck.
//!
//! Everything in this crate is free of I/O: configuration normalization,
//! argument-vector construction for the `ffuf` engine, classification of the
//! engine's output lines, and the event/state types shared by the runner and
//! the HTTP layer.

pub mod config;
pub mod error;
pub mod event;
pub mod invocation;
pub mod job_state;
pub mod record;
pub mod types;
