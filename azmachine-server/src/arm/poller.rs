//! Long-running operation polling
//!
//! ARM answers a mutating request with `201`/`202` and points at a status
//! monitor through `Azure-AsyncOperation` or `Location`. The operation is
//! done when the monitor reports a terminal status.

use std::time::Duration;

use azmachine_orchestrations::backend::BackendError;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use serde::Deserialize;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Where to look for the operation's progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Monitor {
    /// Status document with a `status` field
    AsyncOperation(String),
    /// Returns 202 until done, then the final resource or 200/204
    Location(String),
}

/// Picks the monitor URL out of a response, preferring `Azure-AsyncOperation`
pub fn monitor_from_headers(headers: &HeaderMap) -> Option<Monitor> {
    if let Some(url) = header_str(headers, AZURE_ASYNC_OPERATION) {
        return Some(Monitor::AsyncOperation(url.to_string()));
    }
    header_str(headers, LOCATION.as_str()).map(|url| Monitor::Location(url.to_string()))
}

/// Delay requested by `Retry-After` (seconds form only), else `default`
pub fn retry_after(headers: &HeaderMap, default: Duration) -> Duration {
    header_str(headers, RETRY_AFTER.as_str())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct OperationStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Progress {
    Running,
    Succeeded,
    Failed(BackendError),
}

/// Interprets an `Azure-AsyncOperation` status document
pub fn progress_of(status: &OperationStatus) -> Progress {
    match status.status.to_ascii_lowercase().as_str() {
        "succeeded" => Progress::Succeeded,
        "failed" | "canceled" | "cancelled" => {
            let message = match &status.error {
                Some(err) if !err.code.is_empty() => format!("{}: {}", err.code, err.message),
                Some(err) => err.message.clone(),
                None => String::new(),
            };
            Progress::Failed(BackendError::OperationFailed {
                status: status.status.clone(),
                message,
            })
        }
        _ => Progress::Running,
    }
}
