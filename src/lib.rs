//! hello-service: a minimal HTTP service and its deployment descriptor.
//!
//! The service answers `GET /` with `Hello World` and 404 for everything else.
//! The descriptor records how an orchestrator should run it and is validated
//! against the service's own bind port.

pub mod app;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

pub use app::run;
pub use error::*;
