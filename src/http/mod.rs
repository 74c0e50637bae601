//! HTTP server module.
//!
//! The listening socket is bound synchronously before any request handling
//! starts, so a port conflict fails startup without leaving a half-started
//! server behind. Serving uses an `axum_server::Handle`, which drives:
//! - Graceful shutdown on SIGTERM/SIGINT with a bounded drain window
//! - Programmatic shutdown from tests

mod server;
mod shutdown;

pub use server::{bind, serve, start_server, ServerError};
pub use shutdown::setup_shutdown_handler;
