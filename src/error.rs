use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::process::ExitCode;

use crate::config::ConfigError;
use crate::descriptor::DescriptorError;
use crate::http::ServerError;

/// Errors produced while answering a request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No route for {method} {path}")]
    NotFound { method: Method, path: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound { method, path } => {
                tracing::debug!(%method, %path, "No matching route");
                StatusCode::NOT_FOUND
            }
        };

        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}

/// Errors that stop the process before or while serving.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl Error {
    /// Process exit status: 1 when the socket could not be bound or served,
    /// 2 when the configuration or descriptor was rejected.
    pub fn exit_status(&self) -> u8 {
        match self {
            Error::Server(_) => 1,
            Error::Config(_) | Error::Descriptor(_) => 2,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_failures_exit_1_and_bad_input_exits_2() {
        let bind = Error::from(ServerError::Bind {
            addr: "127.0.0.1:3000".parse().unwrap(),
            source: std::io::ErrorKind::AddrInUse.into(),
        });
        assert_eq!(bind.exit_status(), 1);

        let config = Error::from(ConfigError::InvalidHost("localhost".to_string()));
        assert_eq!(config.exit_status(), 2);

        let descriptor = Error::from(DescriptorError::PortMismatch {
            descriptor: 3000,
            bound: 8080,
        });
        assert_eq!(descriptor.exit_status(), 2);
    }

    #[test]
    fn not_found_is_plain_404() {
        let response = AppError::NotFound {
            method: Method::POST,
            path: "/".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
