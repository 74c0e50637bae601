//! HTTP server startup logic.

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use hyper_util::rt::TokioTimer;

use crate::config::HttpServerConfig;

use super::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Bind the listening socket.
///
/// Fails with [`ServerError::Bind`] when the port is taken or not permitted.
/// Nothing is left listening on failure, so retrying against the same
/// occupied port fails the same way.
pub fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    let bind_err = |source| ServerError::Bind { addr, source };
    let listener = TcpListener::bind(addr).map_err(bind_err)?;
    listener.set_nonblocking(true).map_err(bind_err)?;
    Ok(listener)
}

/// Serve `app` on an already bound listener until `handle` shuts it down.
///
/// HTTP/1 connections that have not delivered a complete request head within
/// `header_read_timeout` are closed, so stalled clients cannot pin sockets.
pub async fn serve(
    app: Router,
    listener: TcpListener,
    handle: Handle,
    header_read_timeout: Duration,
) -> Result<(), ServerError> {
    let mut server = axum_server::from_tcp(listener).handle(handle);
    server
        .http_builder()
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(header_read_timeout);

    server
        .serve(app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}

/// Bind `addr`, log the listening address and serve until SIGTERM/SIGINT.
///
/// This function blocks until the server shuts down.
pub async fn start_server(
    app: Router,
    addr: SocketAddr,
    http: &HttpServerConfig,
) -> Result<(), ServerError> {
    let listener = bind(addr)?;
    let local_addr = listener.local_addr().map_err(ServerError::Serve)?;
    tracing::info!(addr = %local_addr, "Listening on http://{}", local_addr);

    let handle = Handle::new();
    shutdown::setup_shutdown_handler(
        handle.clone(),
        Duration::from_secs(http.shutdown_grace_seconds),
    );

    serve(
        app,
        listener,
        handle,
        Duration::from_secs(http.header_read_timeout_seconds),
    )
    .await?;
    tracing::info!("Server stopped");
    Ok(())
}
