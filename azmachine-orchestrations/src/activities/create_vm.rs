//! Create virtual machine activity

use azmachine_models::ProvisioningSpec;
use base64::Engine;

use crate::activities::resolve_image::ResolvedImage;
use crate::backend::AzureClients;
use crate::context::ProvisionContext;
use crate::disks::generate_data_disks;
use crate::error::{Error, Result};
use crate::metrics::observe;
use crate::names::{suffixes, DependentResourceNames};
use crate::resources::{OsDiskParams, OsProfileParams, ResourceKind, VirtualMachine, VirtualMachineParams};

/// VM definition for `names.vm_name`. A zone, when set, wins over the
/// availability set; the two are never both placed on the definition.
pub fn vm_parameters(
    names: &DependentResourceNames,
    spec: &ProvisioningSpec,
    user_data: &str,
    image: &ResolvedImage,
    network_interface_id: &str,
) -> VirtualMachineParams {
    let vm_name = names.vm_name.as_str();

    let (zones, availability_set_id) = match (spec.zone, &spec.availability_set) {
        (Some(zone), _) => (vec![zone.to_string()], None),
        (None, Some(set)) => (Vec::new(), Some(set.clone())),
        (None, None) => (Vec::new(), None),
    };

    let identity_id = spec.identity_id.clone().filter(|id| !id.is_empty());

    VirtualMachineParams {
        name: vm_name.to_string(),
        location: spec.location.clone(),
        plan: image.plan().cloned(),
        vm_size: spec.vm_size.clone(),
        image_reference: image.reference.clone(),
        os_disk: OsDiskParams {
            name: names.os_disk_name.clone(),
            caching: spec.os_disk.caching.unwrap_or_default(),
            storage_account_type: spec.os_disk.storage_account_type.clone(),
            disk_size_gb: spec.os_disk.disk_size_gb,
            create_option: spec.os_disk.create_option,
        },
        data_disks: generate_data_disks(vm_name, suffixes::DATA_DISK, &spec.data_disks),
        os_profile: OsProfileParams {
            computer_name: vm_name.to_string(),
            admin_username: spec.os_profile.admin_username.clone(),
            custom_data: base64::engine::general_purpose::STANDARD.encode(user_data),
            disable_password_authentication: spec.os_profile.disable_password_authentication,
            ssh_key_path: spec.os_profile.ssh_public_key.path.clone(),
            ssh_key_data: spec.os_profile.ssh_public_key.key_data.clone(),
        },
        network_interface_id: network_interface_id.to_string(),
        zones,
        availability_set_id,
        identity_id,
        tags: spec.tags.clone(),
    }
}

pub async fn activity(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    resource_group: &str,
    params: &VirtualMachineParams,
) -> Result<VirtualMachine> {
    let vm_name = params.name.as_str();

    if params.plan.is_some() {
        ctx.trace_info(format!("Attaching image plan to VM {}", vm_name));
    }
    ctx.trace_info(format!(
        "Creating VM {} (size: {}, data disks: {})",
        vm_name,
        params.vm_size,
        params.data_disks.len()
    ));

    let operation = observe(
        ResourceKind::VirtualMachine,
        "create_or_update",
        clients.vm.begin_create_or_update(resource_group, params).await,
    )
    .map_err(|e| Error::backend(ResourceKind::VirtualMachine, vm_name, "create_or_update", e))?;

    observe(
        ResourceKind::VirtualMachine,
        "wait_for_completion",
        operation.wait().await,
    )
    .map_err(|e| Error::backend(ResourceKind::VirtualMachine, vm_name, "wait_for_completion", e))?;

    let vm = observe(
        ResourceKind::VirtualMachine,
        "get",
        clients.vm.get(resource_group, vm_name).await,
    )
    .map_err(|e| Error::backend(ResourceKind::VirtualMachine, vm_name, "get", e))?;

    Ok(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Plan, VirtualMachineImage, VmImageReference};
    use azmachine_models::{
        CachingType, DataDiskDescriptor, DiskCreateOption, ImageReference, OsDisk, OsProfile, SshPublicKey,
        SubnetReference,
    };
    use std::collections::BTreeMap;

    fn spec() -> ProvisioningSpec {
        ProvisioningSpec {
            location: "westeurope".to_string(),
            resource_group: "rg".to_string(),
            subnet_info: SubnetReference {
                vnet_name: "vnet".to_string(),
                subnet_name: "subnet-a".to_string(),
                vnet_resource_group: None,
            },
            vm_size: "Standard_D2s_v3".to_string(),
            image_reference: ImageReference::Urn("Canonical:UbuntuServer:18.04-LTS:latest".to_string()),
            os_disk: OsDisk {
                caching: None,
                storage_account_type: "Premium_LRS".to_string(),
                disk_size_gb: 30,
                create_option: DiskCreateOption::FromImage,
            },
            data_disks: vec![DataDiskDescriptor {
                name: None,
                lun: None,
                disk_size_gb: 50,
                caching: None,
                storage_account_type: "Standard_LRS".to_string(),
            }],
            os_profile: OsProfile {
                admin_username: "core".to_string(),
                disable_password_authentication: true,
                ssh_public_key: SshPublicKey {
                    path: "/home/core/.ssh/authorized_keys".to_string(),
                    key_data: "ssh-rsa AAAA".to_string(),
                },
            },
            zone: None,
            availability_set: None,
            identity_id: None,
            accelerated_networking: None,
            tags: BTreeMap::from([("role".to_string(), "worker".to_string())]),
        }
    }

    fn marketplace_image(plan: Option<Plan>) -> ResolvedImage {
        ResolvedImage {
            reference: VmImageReference::Id("/images/custom".to_string()),
            image: Some(VirtualMachineImage {
                id: "/images/custom".to_string(),
                plan,
            }),
        }
    }

    #[test]
    fn test_zone_wins_over_availability_set() {
        let mut spec = spec();
        spec.zone = Some(2);
        spec.availability_set = Some("/availabilitySets/as-1".to_string());
        let names = DependentResourceNames::new("vm-1", &spec.data_disks);

        let params = vm_parameters(&names, &spec, "", &marketplace_image(None), "/nics/vm-1-nic");
        assert_eq!(params.zones, vec!["2".to_string()]);
        assert_eq!(params.availability_set_id, None);
    }

    #[test]
    fn test_availability_set_used_without_zone() {
        let mut spec = spec();
        spec.availability_set = Some("/availabilitySets/as-1".to_string());
        let names = DependentResourceNames::new("vm-1", &spec.data_disks);

        let params = vm_parameters(&names, &spec, "", &marketplace_image(None), "/nics/vm-1-nic");
        assert!(params.zones.is_empty());
        assert_eq!(params.availability_set_id.as_deref(), Some("/availabilitySets/as-1"));
    }

    #[test]
    fn test_definition_carries_names_plan_and_custom_data() {
        let spec = spec();
        let names = DependentResourceNames::new("vm-1", &spec.data_disks);
        let plan = Plan {
            name: "plan".to_string(),
            product: "product".to_string(),
            publisher: "publisher".to_string(),
        };

        let params = vm_parameters(
            &names,
            &spec,
            "#cloud-config",
            &marketplace_image(Some(plan.clone())),
            "/nics/vm-1-nic",
        );
        assert_eq!(params.plan, Some(plan));
        assert_eq!(params.os_disk.name, "vm-1-os-disk");
        assert_eq!(params.os_disk.caching, CachingType::None);
        assert_eq!(params.data_disks.len(), 1);
        assert_eq!(params.data_disks[0].name, "vm-1-0-data-disk");
        assert_eq!(params.network_interface_id, "/nics/vm-1-nic");
        assert_eq!(params.os_profile.custom_data, "I2Nsb3VkLWNvbmZpZw==");
        assert_eq!(params.os_profile.computer_name, "vm-1");
    }

    #[test]
    fn test_empty_identity_is_dropped() {
        let mut spec = spec();
        spec.identity_id = Some(String::new());
        let names = DependentResourceNames::new("vm-1", &spec.data_disks);

        let params = vm_parameters(&names, &spec, "", &marketplace_image(None), "/nics/vm-1-nic");
        assert_eq!(params.identity_id, None);
    }
}
