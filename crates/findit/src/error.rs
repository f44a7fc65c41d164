use std::fmt;
use std::io;
use std::net::SocketAddr;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::WorkflowError;

/// Failures that end a `findit-api` command.
///
/// Request-level failures never reach this type; handlers turn [`WorkflowError`] into a
/// response. `Workflow` only carries errors from the offline demo run.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Bind { addr: SocketAddr, source: io::Error },
    Serve(io::Error),
    Workflow(WorkflowError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "invalid configuration: {err}"),
            AppError::Telemetry(err) => write!(f, "could not start logging: {err}"),
            AppError::Bind { addr, source } => write!(f, "could not listen on {addr}: {source}"),
            AppError::Serve(err) => write!(f, "http server stopped: {err}"),
            AppError::Workflow(err) => write!(f, "claim workflow failed: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Bind { source, .. } => Some(source),
            AppError::Serve(err) => Some(err),
            AppError::Workflow(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<WorkflowError> for AppError {
    fn from(value: WorkflowError) -> Self {
        Self::Workflow(value)
    }
}
