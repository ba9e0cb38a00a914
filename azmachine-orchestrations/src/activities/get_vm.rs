//! Read a virtual machine for status queries

use crate::backend::AzureClients;
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::metrics::observe;
use crate::resources::{ResourceKind, VirtualMachine};

pub async fn activity(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    resource_group: &str,
    vm_name: &str,
) -> Result<VirtualMachine> {
    match observe(
        ResourceKind::VirtualMachine,
        "get",
        clients.vm.get(resource_group, vm_name).await,
    ) {
        Ok(vm) => {
            ctx.trace_info(format!(
                "VM {} provisioning state: {}",
                vm_name,
                vm.provisioning_state.as_deref().unwrap_or("unknown")
            ));
            Ok(vm)
        }
        Err(e) if e.is_not_found() => Err(Error::NotFound {
            kind: ResourceKind::VirtualMachine,
            name: vm_name.to_string(),
        }),
        Err(e) => Err(Error::backend(ResourceKind::VirtualMachine, vm_name, "get", e)),
    }
}
