//! Delete managed disk activity

use crate::backend::AzureClients;
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::metrics::observe_deletion;
use crate::resources::ResourceKind;

pub async fn activity(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    resource_group: &str,
    disk_name: &str,
) -> Result<()> {
    ctx.trace_info(format!("Deleting disk {}", disk_name));
    let deleted = async {
        let operation = clients.disk.begin_delete(resource_group, disk_name).await?;
        tracing::debug!(vm = %ctx.machine(), resource_group, disk = disk_name, "disk delete submitted");
        operation.wait().await
    };
    match observe_deletion(ResourceKind::Disk, "delete", deleted.await) {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            ctx.trace_info(format!("Disk {} not found, nothing to delete", disk_name));
            Ok(())
        }
        Err(e) => Err(Error::backend(ResourceKind::Disk, disk_name, "delete", e)),
    }
}
