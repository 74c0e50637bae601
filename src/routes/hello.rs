//! Root endpoint.
//!
//! Answers `GET /` with a fixed greeting. Orchestrators and load balancers use
//! the same route as a liveness check, so it never touches shared state.

use crate::config::GREETING;

/// Greeting handler, served as `text/plain; charset=utf-8`.
pub async fn index() -> &'static str {
    GREETING
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn index_greets() {
        assert_eq!(index().await, "Hello World");
    }
}
