//! fuzzdeck HTTP server library.
//!
//! Exposes the building blocks (config, state, error handling, routes, path
//! picker) so integration tests and the binary entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod picker;
pub mod response;
pub mod router;
pub mod routes;
pub mod server;
pub mod state;
