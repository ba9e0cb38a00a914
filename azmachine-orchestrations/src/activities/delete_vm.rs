//! Delete virtual machine activity
//!
//! Data disks are detached before the VM is deleted.

use crate::backend::AzureClients;
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::metrics::observe_deletion;
use crate::resources::ResourceKind;

/// Returns `false` when the VM was already gone
pub async fn activity(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    resource_group: &str,
    vm_name: &str,
) -> Result<bool> {
    let vm = match observe_deletion(
        ResourceKind::VirtualMachine,
        "get",
        clients.vm.get(resource_group, vm_name).await,
    ) {
        Ok(vm) => vm,
        Err(e) if e.is_not_found() => {
            ctx.trace_info(format!("VM {} not found, nothing to delete", vm_name));
            return Ok(false);
        }
        Err(e) => return Err(Error::backend(ResourceKind::VirtualMachine, vm_name, "get", e)),
    };

    if !vm.data_disks.is_empty() {
        ctx.trace_info(format!("Detaching {} data disk(s) from VM {}", vm.data_disks.len(), vm_name));
        detach_data_disks(ctx, clients, resource_group, vm_name).await?;
    }

    ctx.trace_info(format!("Deleting VM {}", vm_name));
    let deleted = async {
        let operation = clients.vm.begin_delete(resource_group, vm_name).await?;
        operation.wait().await
    };
    match observe_deletion(ResourceKind::VirtualMachine, "delete", deleted.await) {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            ctx.trace_warn(format!("VM {} disappeared during delete", vm_name));
        }
        Err(e) => return Err(Error::backend(ResourceKind::VirtualMachine, vm_name, "delete", e)),
    }

    Ok(true)
}

/// A VM that vanishes mid-detach is left to the delete below, which
/// tolerates not-found as well
async fn detach_data_disks(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    resource_group: &str,
    vm_name: &str,
) -> Result<()> {
    let operation = match observe_deletion(
        ResourceKind::VirtualMachine,
        "update_data_disks",
        clients.vm.begin_update_data_disks(resource_group, vm_name, Vec::new()).await,
    ) {
        Ok(operation) => operation,
        Err(e) if e.is_not_found() => {
            ctx.trace_warn(format!("VM {} disappeared before its data disks were detached", vm_name));
            return Ok(());
        }
        Err(e) => return Err(Error::backend(ResourceKind::VirtualMachine, vm_name, "update_data_disks", e)),
    };

    match observe_deletion(
        ResourceKind::VirtualMachine,
        "wait_for_completion",
        operation.wait().await,
    ) {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            ctx.trace_warn(format!("VM {} disappeared while its data disks were detached", vm_name));
            Ok(())
        }
        Err(e) => Err(Error::backend(ResourceKind::VirtualMachine, vm_name, "wait_for_completion", e)),
    }
}
