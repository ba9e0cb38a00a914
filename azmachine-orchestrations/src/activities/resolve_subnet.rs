//! Resolve subnet activity

use crate::backend::AzureClients;
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::metrics::observe;
use crate::resources::{ResourceKind, Subnet};

pub async fn activity(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    vnet_resource_group: &str,
    vnet_name: &str,
    subnet_name: &str,
) -> Result<Subnet> {
    ctx.trace_info(format!(
        "Resolving subnet {}/{} (resource group: {})",
        vnet_name, subnet_name, vnet_resource_group
    ));

    let subnet = observe(
        ResourceKind::Subnet,
        "get",
        clients.subnet.get(vnet_resource_group, vnet_name, subnet_name).await,
    )
    .map_err(|e| Error::backend(ResourceKind::Subnet, subnet_name, "get", e))?;

    Ok(subnet)
}
