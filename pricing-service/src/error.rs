//! Reconciliation errors and their mapping onto gRPC statuses.

use service_core::error::AppError;
use service_core::grpc::IntoStatus;
use std::fmt;
use thiserror::Error;
use tonic::Status;

/// Metadata key carrying the debug detail of a rejected validation.
pub const DEBUG_INFO_METADATA_KEY: &str = "debug-info";

/// Coarse category of a [`PricingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lookup or stamping failure.
    Internal,
    /// Business rule violation.
    FailedPrecondition,
}

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("{message}")]
    FailedPrecondition {
        message: String,
        debug_detail: Option<String>,
    },

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<AppError>,
    },
}

impl PricingError {
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        PricingError::FailedPrecondition {
            message: message.into(),
            debug_detail: None,
        }
    }

    pub fn failed_precondition_with_detail(
        message: impl Into<String>,
        debug_detail: impl Into<String>,
    ) -> Self {
        PricingError::FailedPrecondition {
            message: message.into(),
            debug_detail: Some(debug_detail.into()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PricingError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Internal error caused by a repository failure.
    pub fn repository(message: impl Into<String>, source: AppError) -> Self {
        PricingError::Internal {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PricingError::FailedPrecondition { .. } => ErrorKind::FailedPrecondition,
            PricingError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PricingError::FailedPrecondition { message, .. }
            | PricingError::Internal { message, .. } => message,
        }
    }

    pub fn debug_detail(&self) -> Option<&str> {
        match self {
            PricingError::FailedPrecondition { debug_detail, .. } => debug_detail.as_deref(),
            PricingError::Internal { .. } => None,
        }
    }

    /// Prefixes the message with `context`, keeping kind, detail and source.
    pub fn wrap(self, context: impl fmt::Display) -> Self {
        match self {
            PricingError::FailedPrecondition {
                message,
                debug_detail,
            } => PricingError::FailedPrecondition {
                message: format!("{context}: {message}"),
                debug_detail,
            },
            PricingError::Internal { message, source } => PricingError::Internal {
                message: format!("{context}: {message}"),
                source,
            },
        }
    }
}

impl IntoStatus for PricingError {
    fn into_status(self) -> Status {
        match self {
            PricingError::FailedPrecondition {
                message,
                debug_detail,
            } => {
                let mut status = Status::failed_precondition(message);
                if let Some(detail) = debug_detail {
                    if let Ok(value) = detail.parse() {
                        status
                            .metadata_mut()
                            .insert(DEBUG_INFO_METADATA_KEY, value);
                    }
                }
                status
            }
            PricingError::Internal { message, source } => {
                match &source {
                    Some(err) => tracing::error!(error = %err, "{}", message),
                    None => tracing::error!("{}", message),
                }
                Status::internal(message)
            }
        }
    }
}

impl From<PricingError> for Status {
    fn from(err: PricingError) -> Self {
        err.into_status()
    }
}
