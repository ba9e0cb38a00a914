//! Errors surfaced by the provisioning and teardown orchestrations

use thiserror::Error;

use crate::backend::{BackendError, SetupError};
use crate::resources::ResourceKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("cannot delete NIC '{nic}' because it is attached to VM '{vm}'")]
    NicAttached { nic: String, vm: String },

    #[error("{operation} failed for {kind} '{name}': {source}")]
    Backend {
        kind: ResourceKind,
        name: String,
        operation: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("invalid image URN '{0}', expected publisher:offer:sku:version")]
    InvalidImageUrn(String),

    #[error("teardown failed for {} resource(s): {}", .0.len(), join_failures(.0))]
    Teardown(Vec<ResourceFailure>),

    #[error("client setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("cancelled during {step}")]
    Cancelled { step: String },

    #[error("deadline exceeded during {step}")]
    DeadlineExceeded { step: String },
}

/// One failed deletion inside an aggregated teardown error
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFailure {
    pub kind: ResourceKind,
    pub name: String,
    pub error: Box<Error>,
}

impl std::fmt::Display for ResourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}': {}", self.kind, self.name, self.error)
    }
}

fn join_failures(failures: &[ResourceFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Coarse classification the caller maps onto its own status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    AlreadyExists,
    QuotaOrPermission,
    Transient,
    NotFound,
    Conflict,
    InvalidRequest,
    Internal,
}

impl Error {
    pub fn backend(kind: ResourceKind, name: impl Into<String>, operation: &'static str, source: BackendError) -> Self {
        Error::Backend {
            kind,
            name: name.into(),
            operation,
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::NotFound { .. } => ErrorClass::NotFound,
            Error::NicAttached { .. } => ErrorClass::Conflict,
            Error::Backend { source, .. } => classify_backend(source),
            Error::InvalidImageUrn(_) => ErrorClass::InvalidRequest,
            Error::Teardown(failures) => {
                // a conflict anywhere in the batch dominates, then transient
                let classes: Vec<ErrorClass> = failures.iter().map(|f| f.error.class()).collect();
                if classes.contains(&ErrorClass::Conflict) {
                    ErrorClass::Conflict
                } else if classes.iter().all(|c| *c == ErrorClass::Transient) && !classes.is_empty() {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Internal
                }
            }
            Error::Setup(SetupError::Authentication(_)) => ErrorClass::QuotaOrPermission,
            Error::Setup(_) => ErrorClass::InvalidRequest,
            Error::Cancelled { .. } | Error::DeadlineExceeded { .. } => ErrorClass::Transient,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Backend { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

fn classify_backend(error: &BackendError) -> ErrorClass {
    match error {
        BackendError::NotFound(_) => ErrorClass::NotFound,
        BackendError::Api { status, code, .. } => {
            if *status == 409 && code.contains("AlreadyExists") {
                ErrorClass::AlreadyExists
            } else if *status == 401
                || *status == 403
                || code.contains("Quota")
                || code.contains("Authorization")
                || code.contains("OperationNotAllowed")
            {
                ErrorClass::QuotaOrPermission
            } else if *status == 404 {
                ErrorClass::NotFound
            } else if *status == 408 || *status == 429 || *status >= 500 {
                ErrorClass::Transient
            } else if *status == 409 {
                ErrorClass::Conflict
            } else {
                ErrorClass::Internal
            }
        }
        BackendError::Transport(_) => ErrorClass::Transient,
        BackendError::OperationFailed { message, .. } => {
            if message.contains("Quota") || message.contains("quota") {
                ErrorClass::QuotaOrPermission
            } else {
                ErrorClass::Internal
            }
        }
        BackendError::Decode(_) => ErrorClass::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str) -> Error {
        Error::backend(
            ResourceKind::VirtualMachine,
            "vm-1",
            "create",
            BackendError::Api {
                status,
                code: code.to_string(),
                message: "boom".to_string(),
            },
        )
    }

    #[test]
    fn test_backend_classification() {
        assert_eq!(api(409, "ResourceAlreadyExists").class(), ErrorClass::AlreadyExists);
        assert_eq!(api(403, "AuthorizationFailed").class(), ErrorClass::QuotaOrPermission);
        assert_eq!(api(409, "OperationNotAllowed").class(), ErrorClass::QuotaOrPermission);
        assert_eq!(api(400, "QuotaExceeded").class(), ErrorClass::QuotaOrPermission);
        assert_eq!(api(429, "TooManyRequests").class(), ErrorClass::Transient);
        assert_eq!(api(503, "ServiceUnavailable").class(), ErrorClass::Transient);
        assert_eq!(api(409, "NicInUse").class(), ErrorClass::Conflict);
        assert_eq!(api(400, "InvalidParameter").class(), ErrorClass::Internal);
    }

    #[test]
    fn test_teardown_classification() {
        let conflict = ResourceFailure {
            kind: ResourceKind::NetworkInterface,
            name: "vm-1-nic".to_string(),
            error: Box::new(Error::NicAttached {
                nic: "vm-1-nic".to_string(),
                vm: "vm-2".to_string(),
            }),
        };
        let transient = ResourceFailure {
            kind: ResourceKind::Disk,
            name: "vm-1-os-disk".to_string(),
            error: Box::new(api(503, "ServiceUnavailable")),
        };

        assert_eq!(Error::Teardown(vec![transient.clone()]).class(), ErrorClass::Transient);
        assert_eq!(
            Error::Teardown(vec![transient, conflict]).class(),
            ErrorClass::Conflict
        );
    }

    #[test]
    fn test_teardown_message_lists_every_resource() {
        let err = Error::Teardown(vec![
            ResourceFailure {
                kind: ResourceKind::Disk,
                name: "vm-1-os-disk".to_string(),
                error: Box::new(api(500, "InternalError")),
            },
            ResourceFailure {
                kind: ResourceKind::Disk,
                name: "vm-1-0-data-disk".to_string(),
                error: Box::new(api(500, "InternalError")),
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("teardown failed for 2 resource(s)"));
        assert!(message.contains("vm-1-os-disk"));
        assert!(message.contains("vm-1-0-data-disk"));
    }

    #[test]
    fn test_cancellation_is_transient() {
        let err = Error::Cancelled {
            step: "create VM".to_string(),
        };
        assert_eq!(err.class(), ErrorClass::Transient);
    }
}
