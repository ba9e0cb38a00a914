//! Backend selection for the server process

use anyhow::Result;
use azmachine_models::{ImageReference, ProvisioningSpec};
use azmachine_orchestrations::backend::ClientFactory;
use azmachine_orchestrations::fake::FakeCloud;

use crate::arm::ArmClientFactory;
use crate::config::{BackendKind, Config};

#[derive(Clone)]
pub enum Backend {
    Arm(ArmClientFactory),
    Memory(FakeCloud),
}

impl Backend {
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.backend {
            BackendKind::Arm => Ok(Backend::Arm(ArmClientFactory::new(
                &config.arm_endpoint,
                &config.authority_host,
                config.poll_interval,
            )?)),
            BackendKind::Memory => {
                tracing::warn!("Using the in-memory backend, nothing is provisioned in Azure");
                Ok(Backend::Memory(FakeCloud::new()))
            }
        }
    }

    pub fn factory(&self) -> &dyn ClientFactory {
        match self {
            Backend::Arm(factory) => factory,
            Backend::Memory(cloud) => cloud,
        }
    }

    /// The in-memory cloud starts empty; make the network and image a spec
    /// refers to exist before provisioning against it
    pub async fn prepare(&self, spec: &ProvisioningSpec) {
        let Backend::Memory(cloud) = self else {
            return;
        };

        cloud
            .add_subnet(
                spec.vnet_resource_group(),
                &spec.subnet_info.vnet_name,
                &spec.subnet_info.subnet_name,
            )
            .await;

        if let ImageReference::Urn(urn) = &spec.image_reference {
            cloud.add_image(urn, None).await;
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Arm(_) => "arm",
            Backend::Memory(_) => "memory",
        }
    }
}
