//! Service startup: couples the configuration to the deployment descriptor,
//! builds the router and runs the server until shutdown.

use crate::config::AppConfig;
use crate::descriptor::DeploymentDescriptor;
use crate::error::Error;
use crate::http::start_server;
use crate::routes::create_router;

/// Run the service process until a shutdown signal arrives.
///
/// When `deployment.descriptor` is configured, the descriptor must validate
/// and its `containerPort` must equal `http.port`; otherwise startup fails
/// before any socket is bound.
pub async fn run(config: AppConfig) -> Result<(), Error> {
    let addr = config.http.bind_addr()?;

    if let Some(path) = &config.deployment.descriptor {
        let descriptor = DeploymentDescriptor::load(path)?;
        descriptor.ensure_port_matches(addr.port())?;
        tracing::info!(
            path = %path.display(),
            replicas = descriptor.replicas(),
            container_port = descriptor.container_port(),
            "Deployment descriptor matches bind port"
        );
    }

    let app = create_router(&config.http);
    start_server(app, addr, &config.http).await?;

    Ok(())
}
