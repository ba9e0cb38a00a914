//! Delete network interface activity

use crate::backend::AzureClients;
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::metrics::observe_deletion;
use crate::resources::{resource_name_from_id, ResourceKind};

pub async fn activity(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    resource_group: &str,
    nic_name: &str,
) -> Result<()> {
    let nic = match observe_deletion(
        ResourceKind::NetworkInterface,
        "get",
        clients.nic.get(resource_group, nic_name).await,
    ) {
        Ok(nic) => nic,
        Err(e) if e.is_not_found() => {
            ctx.trace_info(format!("NIC {} not found, nothing to delete", nic_name));
            return Ok(());
        }
        Err(e) => return Err(Error::backend(ResourceKind::NetworkInterface, nic_name, "get", e)),
    };

    // Never pull a NIC out from under a VM, including one we did not create
    if let Some(vm_id) = nic.virtual_machine_id.as_deref().filter(|id| !id.is_empty()) {
        let vm = resource_name_from_id(vm_id).to_string();
        ctx.trace_warn(format!("NIC {} is still attached to VM {}", nic_name, vm));
        return Err(Error::NicAttached {
            nic: nic_name.to_string(),
            vm,
        });
    }

    ctx.trace_info(format!("Deleting NIC {}", nic_name));
    let deleted = async {
        let operation = clients.nic.begin_delete(resource_group, nic_name).await?;
        tracing::debug!(vm = %ctx.machine(), resource_group, nic = nic_name, "NIC delete submitted");
        operation.wait().await
    };
    match observe_deletion(ResourceKind::NetworkInterface, "delete", deleted.await) {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(Error::backend(ResourceKind::NetworkInterface, nic_name, "delete", e)),
    }
}
