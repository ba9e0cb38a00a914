//! Success/failure counters for backend API calls
//!
//! Recording goes through the `metrics` facade, so it is a no-op until the
//! host process installs a recorder and can never fail the caller.

use metrics::counter;

use crate::backend::BackendError;
use crate::resources::ResourceKind;

pub const API_SUCCESS: &str = "azmachine.arm_api.success";
pub const API_FAILURE: &str = "azmachine.arm_api.failure";

pub fn on_api_success(kind: ResourceKind, operation: &'static str) {
    counter!(API_SUCCESS, "service" => kind.service_label(), "operation" => operation).increment(1);
}

pub fn on_api_failure(kind: ResourceKind, operation: &'static str) {
    counter!(API_FAILURE, "service" => kind.service_label(), "operation" => operation).increment(1);
}

/// Records the outcome of `result` and hands it back untouched
pub fn observe<T, E>(kind: ResourceKind, operation: &'static str, result: Result<T, E>) -> Result<T, E> {
    match &result {
        Ok(_) => on_api_success(kind, operation),
        Err(_) => on_api_failure(kind, operation),
    }
    result
}

/// Like [`observe`], but a not-found answer counts as success. Used where
/// an already-missing resource is the desired outcome.
pub fn observe_deletion<T>(
    kind: ResourceKind,
    operation: &'static str,
    result: Result<T, BackendError>,
) -> Result<T, BackendError> {
    if deletion_succeeded(&result) {
        on_api_success(kind, operation);
    } else {
        on_api_failure(kind, operation);
    }
    result
}

fn deletion_succeeded<T>(result: &Result<T, BackendError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => e.is_not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_counts_as_deletion_success() {
        assert!(deletion_succeeded(&Ok::<(), BackendError>(())));
        assert!(deletion_succeeded::<()>(&Err(BackendError::NotFound("vm-1".to_string()))));
        assert!(deletion_succeeded::<()>(&Err(BackendError::Api {
            status: 404,
            code: "ResourceNotFound".to_string(),
            message: String::new(),
        })));
        assert!(!deletion_succeeded::<()>(&Err(BackendError::Transport("reset".to_string()))));
    }

    #[test]
    fn test_observe_deletion_hands_result_back() {
        let result = observe_deletion::<()>(
            ResourceKind::Disk,
            "delete",
            Err(BackendError::NotFound("vm-1-os-disk".to_string())),
        );
        assert_eq!(result, Err(BackendError::NotFound("vm-1-os-disk".to_string())));
    }
}
