//! Backend client facade
//!
//! One trait per resource kind. Mutating calls return an [`Operation`] that
//! resolves once the backend reports the long-running operation as finished.
//! [`AzureClients`] bundles one client of each kind; a [`ClientFactory`]
//! builds that bundle from a [`MachineSecret`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use azmachine_models::MachineSecret;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::resources::{
    DataDisk, Disk, ImageUrn, MarketplaceAgreement, NetworkInterface, NetworkInterfaceParams, Plan,
    Subnet, VirtualMachine, VirtualMachineImage, VirtualMachineParams,
};

/// Errors reported by a backend client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("operation finished with status {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::NotFound(_) => true,
            BackendError::Api { status, .. } => *status == 404,
            _ => false,
        }
    }
}

/// Handle on a long-running backend operation
#[must_use = "an operation does nothing unless waited on"]
pub struct Operation {
    completion: BoxFuture<'static, Result<(), BackendError>>,
}

impl Operation {
    pub fn new<F>(completion: F) -> Self
    where
        F: Future<Output = Result<(), BackendError>> + Send + 'static,
    {
        Self {
            completion: Box::pin(completion),
        }
    }

    /// An operation the backend finished synchronously
    pub fn done() -> Self {
        Self::new(futures::future::ready(Ok(())))
    }

    pub async fn wait(self) -> Result<(), BackendError> {
        self.completion.await
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Operation { .. }")
    }
}

#[async_trait]
pub trait SubnetClient: Send + Sync {
    async fn get(&self, resource_group: &str, vnet_name: &str, subnet_name: &str) -> Result<Subnet, BackendError>;
}

#[async_trait]
pub trait NetworkInterfaceClient: Send + Sync {
    async fn get(&self, resource_group: &str, name: &str) -> Result<NetworkInterface, BackendError>;

    async fn begin_create_or_update(
        &self,
        resource_group: &str,
        params: &NetworkInterfaceParams,
    ) -> Result<Operation, BackendError>;

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError>;
}

#[async_trait]
pub trait VirtualMachineClient: Send + Sync {
    async fn get(&self, resource_group: &str, name: &str) -> Result<VirtualMachine, BackendError>;

    async fn begin_create_or_update(
        &self,
        resource_group: &str,
        params: &VirtualMachineParams,
    ) -> Result<Operation, BackendError>;

    /// Replaces the VM's data disk attachments with `data_disks`
    async fn begin_update_data_disks(
        &self,
        resource_group: &str,
        name: &str,
        data_disks: Vec<DataDisk>,
    ) -> Result<Operation, BackendError>;

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError>;
}

#[async_trait]
pub trait DiskClient: Send + Sync {
    async fn get(&self, resource_group: &str, name: &str) -> Result<Disk, BackendError>;

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError>;
}

#[async_trait]
pub trait ImageClient: Send + Sync {
    async fn get(&self, location: &str, urn: &ImageUrn) -> Result<VirtualMachineImage, BackendError>;
}

#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    async fn get(&self, plan: &Plan) -> Result<MarketplaceAgreement, BackendError>;

    async fn create(
        &self,
        plan: &Plan,
        agreement: &MarketplaceAgreement,
    ) -> Result<MarketplaceAgreement, BackendError>;
}

/// One client per resource kind, sharing a single session
#[derive(Clone)]
pub struct AzureClients {
    pub subnet: Arc<dyn SubnetClient>,
    pub nic: Arc<dyn NetworkInterfaceClient>,
    pub vm: Arc<dyn VirtualMachineClient>,
    pub disk: Arc<dyn DiskClient>,
    pub images: Arc<dyn ImageClient>,
    pub marketplace: Arc<dyn MarketplaceClient>,
}

impl std::fmt::Debug for AzureClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AzureClients { .. }")
    }
}

/// Failure to turn a secret into a client bundle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("missing credential field: {0}")]
    MissingField(&'static str),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Builds authenticated clients from a secret
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn setup(&self, secret: &MachineSecret) -> Result<AzureClients, SetupError>;
}

/// Checks the fields every session needs before any network call
pub fn validate_secret(secret: &MachineSecret) -> Result<(), SetupError> {
    let fields = [
        ("subscriptionId", &secret.subscription_id),
        ("tenantId", &secret.tenant_id),
        ("clientId", &secret.client_id),
        ("clientSecret", &secret.client_secret),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(SetupError::MissingField(field));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operation_resolves_inner_future() {
        assert_eq!(Operation::done().wait().await, Ok(()));

        let failing = Operation::new(async { Err(BackendError::Transport("reset".to_string())) });
        assert_eq!(
            failing.wait().await,
            Err(BackendError::Transport("reset".to_string()))
        );
    }

    #[test]
    fn test_not_found_detection() {
        assert!(BackendError::NotFound("x".to_string()).is_not_found());
        assert!(BackendError::Api {
            status: 404,
            code: "ResourceNotFound".to_string(),
            message: String::new(),
        }
        .is_not_found());
        assert!(!BackendError::Transport("x".to_string()).is_not_found());
    }

    #[test]
    fn test_validate_secret() {
        let mut secret = MachineSecret {
            subscription_id: "sub".to_string(),
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            user_data: String::new(),
        };
        assert_eq!(validate_secret(&secret), Ok(()));

        secret.client_secret = "  ".to_string();
        assert_eq!(validate_secret(&secret), Err(SetupError::MissingField("clientSecret")));
    }
}
