//! Create machine orchestration

use azmachine_models::{InstanceHandle, ProvisioningSpec};
use chrono::Utc;
use tokio::time::Instant;

use crate::activities::{create_nic, create_vm, resolve_image, resolve_subnet};
use crate::activity_names::activities;
use crate::backend::{AzureClients, ClientFactory};
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::names::{normalize_machine_name, DependentResourceNames};
use crate::orchestrations::delete_machine::teardown;
use crate::resources::Subnet;
use crate::types::{CreateMachineOutput, CreateMachineRequest};

pub async fn create_machine(
    ctx: &ProvisionContext,
    factory: &dyn ClientFactory,
    request: &CreateMachineRequest,
) -> Result<CreateMachineOutput> {
    let vm_name = normalize_machine_name(&request.machine_name);
    ctx.trace_info(format!(
        "Creating machine: {} (resource group: {}, location: {})",
        vm_name, request.spec.resource_group, request.spec.location
    ));

    let clients = ctx
        .run(activities::SETUP_CLIENTS, async {
            factory.setup(&request.secret).await.map_err(Error::from)
        })
        .await?;

    provision_machine(ctx, &clients, &vm_name, &request.spec, &request.secret.user_data).await
}

/// Creates the NIC, resolves the image and creates the VM. Any failure after
/// the subnet lookup tears down whatever was created before the error is
/// returned.
pub async fn provision_machine(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    vm_name: &str,
    spec: &ProvisioningSpec,
    user_data: &str,
) -> Result<CreateMachineOutput> {
    let names = DependentResourceNames::new(vm_name, &spec.data_disks);
    let vnet_resource_group = spec.vnet_resource_group();

    // Nothing exists yet, so a failed lookup needs no cleanup
    ctx.trace_info("Step 1: Resolving subnet");
    let subnet = ctx
        .run(
            activities::RESOLVE_SUBNET,
            resolve_subnet::activity(
                ctx,
                clients,
                vnet_resource_group,
                &spec.subnet_info.vnet_name,
                &spec.subnet_info.subnet_name,
            ),
        )
        .await?;

    match create_machine_impl(ctx, clients, &names, spec, user_data, &subnet).await {
        Ok(output) => {
            ctx.trace_info(format!(
                "Machine {} created in {} seconds",
                vm_name, output.provisioning_time_seconds
            ));
            Ok(output)
        }
        Err(e) => {
            ctx.trace_error(format!("Failed to create machine: {}", e));
            ctx.trace_info("Cleaning up partial deployment");

            if let Err(cleanup_err) = cleanup_on_failure(ctx, clients, &spec.resource_group, &names).await {
                ctx.trace_warn(format!("Cleanup failed: {}", cleanup_err));
            } else {
                ctx.trace_info("Cleanup complete, no resources left behind");
            }

            Err(e)
        }
    }
}

async fn create_machine_impl(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    names: &DependentResourceNames,
    spec: &ProvisioningSpec,
    user_data: &str,
    subnet: &Subnet,
) -> Result<CreateMachineOutput> {
    let start_time = Instant::now();

    ctx.trace_info("Step 2: Creating network interface");
    let nic = ctx
        .run(
            activities::CREATE_NIC,
            create_nic::activity(ctx, clients, spec, &names.nic_name, subnet),
        )
        .await?;

    ctx.trace_info("Step 3: Resolving image");
    let image = ctx
        .run(activities::RESOLVE_IMAGE, resolve_image::activity(ctx, clients, spec))
        .await?;

    ctx.trace_info("Step 4: Creating virtual machine");
    let params = create_vm::vm_parameters(names, spec, user_data, &image, &nic.id);
    let vm = ctx
        .run(
            activities::CREATE_VM,
            create_vm::activity(ctx, clients, &spec.resource_group, &params),
        )
        .await?;

    let location = if vm.location.is_empty() {
        spec.location.as_str()
    } else {
        vm.location.as_str()
    };

    Ok(CreateMachineOutput {
        handle: InstanceHandle::new(location, &names.vm_name, vm.id),
        nic_name: names.nic_name.clone(),
        os_disk_name: names.os_disk_name.clone(),
        data_disk_names: names.data_disk_names.clone(),
        provisioning_time_seconds: start_time.elapsed().as_secs(),
        created_at: Utc::now(),
    })
}

/// Runs the full teardown for the machine, detached from the caller's
/// cancellation and deadline
async fn cleanup_on_failure(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    resource_group: &str,
    names: &DependentResourceNames,
) -> Result<()> {
    ctx.trace_info("Executing cleanup via machine teardown");

    let rollback_ctx = ctx.detached();
    let vm_deleted = teardown(&rollback_ctx, clients, resource_group, names).await?;

    ctx.trace_info(format!("Cleanup teardown finished (VM deleted: {})", vm_deleted));
    Ok(())
}
