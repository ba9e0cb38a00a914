//! Delete machine orchestration
//!
//! The VM goes first: a NIC or disk cannot be deleted while the VM still
//! references it. Once the VM is gone the NIC, the OS disk and every data
//! disk are deleted concurrently and their failures collected into a single
//! [`Error::Teardown`].

use std::future::Future;

use futures::future::join_all;

use crate::activities::{delete_disk, delete_nic, delete_vm};
use crate::activity_names::activities;
use crate::backend::{AzureClients, ClientFactory};
use crate::context::ProvisionContext;
use crate::error::{Error, ResourceFailure, Result};
use crate::names::{normalize_machine_name, DependentResourceNames};
use crate::resources::ResourceKind;
use crate::types::{DeleteMachineOutput, DeleteMachineRequest};

pub async fn delete_machine(
    ctx: &ProvisionContext,
    factory: &dyn ClientFactory,
    request: &DeleteMachineRequest,
) -> Result<DeleteMachineOutput> {
    let vm_name = normalize_machine_name(&request.machine_name);
    ctx.trace_info(format!(
        "Deleting machine: {} (resource group: {})",
        vm_name, request.spec.resource_group
    ));

    let clients = ctx
        .run(activities::SETUP_CLIENTS, async {
            factory.setup(&request.secret).await.map_err(Error::from)
        })
        .await?;

    let names = DependentResourceNames::new(&vm_name, &request.spec.data_disks);
    let vm_deleted = teardown(ctx, &clients, &request.spec.resource_group, &names).await?;

    ctx.trace_info(format!("Machine deletion complete (VM deleted: {})", vm_deleted));
    Ok(DeleteMachineOutput {
        machine_name: vm_name,
        vm_deleted,
    })
}

/// Removes the VM and everything named after it. Resources that are already
/// gone count as deleted, so calling this twice is safe.
///
/// Returns whether the VM itself existed.
pub async fn teardown(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    resource_group: &str,
    names: &DependentResourceNames,
) -> Result<bool> {
    // Step 1: the VM, with its data disks detached first
    ctx.trace_info(format!("Step 1: Deleting VM {}", names.vm_name));
    let vm_deleted = ctx
        .run(
            activities::DELETE_VM,
            delete_vm::activity(ctx, clients, resource_group, &names.vm_name),
        )
        .await?;

    // Step 2: everything that hung off it
    ctx.trace_info(format!(
        "Step 2: Deleting NIC {}, OS disk {} and {} data disk(s)",
        names.nic_name,
        names.os_disk_name,
        names.data_disk_names.len()
    ));
    let (nic_failure, os_disk_failure, data_disk_failures) = futures::join!(
        failure_of(
            ResourceKind::NetworkInterface,
            &names.nic_name,
            ctx.run(
                activities::DELETE_NIC,
                delete_nic::activity(ctx, clients, resource_group, &names.nic_name),
            ),
        ),
        failure_of(
            ResourceKind::Disk,
            &names.os_disk_name,
            ctx.run(
                activities::DELETE_DISK,
                delete_disk::activity(ctx, clients, resource_group, &names.os_disk_name),
            ),
        ),
        join_all(names.data_disk_names.iter().map(|disk_name| {
            failure_of(
                ResourceKind::Disk,
                disk_name,
                ctx.run(
                    activities::DELETE_DISK,
                    delete_disk::activity(ctx, clients, resource_group, disk_name),
                ),
            )
        })),
    );

    let failures: Vec<ResourceFailure> = nic_failure
        .into_iter()
        .chain(os_disk_failure)
        .chain(data_disk_failures.into_iter().flatten())
        .collect();

    if !failures.is_empty() {
        for failure in &failures {
            ctx.trace_error(format!("Teardown step failed: {}", failure));
        }
        return Err(Error::Teardown(failures));
    }

    ctx.trace_info("Teardown complete");
    Ok(vm_deleted)
}

async fn failure_of<F>(kind: ResourceKind, name: &str, deletion: F) -> Option<ResourceFailure>
where
    F: Future<Output = Result<()>>,
{
    deletion.await.err().map(|error| ResourceFailure {
        kind,
        name: name.to_string(),
        error: Box::new(error),
    })
}
