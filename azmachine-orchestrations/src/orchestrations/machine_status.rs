//! Machine status query

use azmachine_models::{InstanceHandle, MachineStatus};
use chrono::Utc;

use crate::activities::get_vm;
use crate::activity_names::activities;
use crate::backend::ClientFactory;
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::names::normalize_machine_name;
use crate::types::MachineStatusRequest;

/// Reads the VM back and reports its handle. A missing VM is
/// [`crate::Error::NotFound`].
pub async fn get_machine_status(
    ctx: &ProvisionContext,
    factory: &dyn ClientFactory,
    request: &MachineStatusRequest,
) -> Result<MachineStatus> {
    let vm_name = normalize_machine_name(&request.machine_name);

    let clients = ctx
        .run(activities::SETUP_CLIENTS, async {
            factory.setup(&request.secret).await.map_err(Error::from)
        })
        .await?;

    let vm = ctx
        .run(
            activities::GET_VM,
            get_vm::activity(ctx, &clients, &request.spec.resource_group, &vm_name),
        )
        .await?;

    let location = if vm.location.is_empty() {
        request.spec.location.as_str()
    } else {
        vm.location.as_str()
    };

    Ok(MachineStatus {
        handle: InstanceHandle::new(location, &vm_name, vm.id.clone()),
        provisioning_state: vm.provisioning_state,
        checked_at: Utc::now(),
    })
}
