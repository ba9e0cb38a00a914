//! Per-call context threaded through every backend step
//!
//! Carries the caller's cancellation token and optional deadline. Each step
//! runs under [`ProvisionContext::run`], which turns a fired signal into
//! [`Error::Cancelled`] or [`Error::DeadlineExceeded`].

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ProvisionContext {
    machine: String,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ProvisionContext {
    pub fn new(machine: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn machine(&self) -> &str {
        &self.machine
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Same machine, but free of the caller's cancellation and deadline.
    /// Rollback runs under this so that cleanup still happens after the
    /// creation itself was cancelled.
    pub fn detached(&self) -> Self {
        Self::new(self.machine.clone())
    }

    /// Drives `step` to completion unless the context is cancelled or its
    /// deadline passes first
    pub async fn run<T, F>(&self, step: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled { step: step.to_string() }),
            _ = deadline => Err(Error::DeadlineExceeded { step: step.to_string() }),
            result = fut => result,
        }
    }

    pub fn trace_info(&self, message: impl Display) {
        tracing::info!(vm = %self.machine, "{}", message);
    }

    pub fn trace_warn(&self, message: impl Display) {
        tracing::warn!(vm = %self.machine, "{}", message);
    }

    pub fn trace_error(&self, message: impl Display) {
        tracing::error!(vm = %self.machine, "{}", message);
    }
}
