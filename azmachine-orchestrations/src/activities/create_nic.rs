//! Create network interface activity

use azmachine_models::ProvisioningSpec;

use crate::backend::AzureClients;
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::metrics::observe;
use crate::resources::{NetworkInterface, NetworkInterfaceParams, ResourceKind, Subnet};

/// NIC definition: dynamic private IP in `subnet`, IP forwarding on
pub fn nic_parameters(nic_name: &str, spec: &ProvisioningSpec, subnet: &Subnet) -> NetworkInterfaceParams {
    NetworkInterfaceParams {
        name: nic_name.to_string(),
        location: spec.location.clone(),
        subnet_id: subnet.id.clone(),
        enable_ip_forwarding: true,
        enable_accelerated_networking: spec.accelerated_networking,
        tags: spec.tags.clone(),
    }
}

pub async fn activity(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    spec: &ProvisioningSpec,
    nic_name: &str,
    subnet: &Subnet,
) -> Result<NetworkInterface> {
    let params = nic_parameters(nic_name, spec, subnet);
    let resource_group = spec.resource_group.as_str();

    ctx.trace_info(format!("Creating NIC {}", nic_name));
    let operation = observe(
        ResourceKind::NetworkInterface,
        "create_or_update",
        clients.nic.begin_create_or_update(resource_group, &params).await,
    )
    .map_err(|e| Error::backend(ResourceKind::NetworkInterface, nic_name, "create_or_update", e))?;
    tracing::debug!(vm = %ctx.machine(), resource_group, nic = nic_name, "NIC create submitted");

    observe(
        ResourceKind::NetworkInterface,
        "wait_for_completion",
        operation.wait().await,
    )
    .map_err(|e| Error::backend(ResourceKind::NetworkInterface, nic_name, "wait_for_completion", e))?;

    let nic = observe(
        ResourceKind::NetworkInterface,
        "get",
        clients.nic.get(resource_group, nic_name).await,
    )
    .map_err(|e| Error::backend(ResourceKind::NetworkInterface, nic_name, "get", e))?;

    ctx.trace_info(format!("NIC {} created ({})", nic_name, nic.id));
    Ok(nic)
}
