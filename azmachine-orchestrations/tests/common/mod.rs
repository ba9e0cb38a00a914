//! Shared fixtures for the machine orchestration tests

#![allow(dead_code)]

use std::collections::BTreeMap;

use azmachine_models::{
    DataDiskDescriptor, DiskCreateOption, ImageReference, MachineSecret, OsDisk, OsProfile, ProvisioningSpec,
    SshPublicKey, SubnetReference,
};
use azmachine_orchestrations::fake::FakeCloud;
use azmachine_orchestrations::{CreateMachineRequest, DeleteMachineRequest, MachineStatusRequest};

pub const RESOURCE_GROUP: &str = "rg";
pub const LOCATION: &str = "westeurope";
pub const VNET: &str = "vnet";
pub const SUBNET: &str = "subnet-a";
pub const IMAGE_URN: &str = "Canonical:UbuntuServer:18.04-LTS:latest";

pub fn data_disk(name: Option<&str>, lun: Option<i32>) -> DataDiskDescriptor {
    DataDiskDescriptor {
        name: name.map(str::to_string),
        lun,
        disk_size_gb: 50,
        caching: None,
        storage_account_type: "Standard_LRS".to_string(),
    }
}

/// One unnamed data disk, marketplace image without a plan
pub fn spec() -> ProvisioningSpec {
    ProvisioningSpec {
        location: LOCATION.to_string(),
        resource_group: RESOURCE_GROUP.to_string(),
        subnet_info: SubnetReference {
            vnet_name: VNET.to_string(),
            subnet_name: SUBNET.to_string(),
            vnet_resource_group: None,
        },
        vm_size: "Standard_D2s_v3".to_string(),
        image_reference: ImageReference::Urn(IMAGE_URN.to_string()),
        os_disk: OsDisk {
            caching: None,
            storage_account_type: "Premium_LRS".to_string(),
            disk_size_gb: 30,
            create_option: DiskCreateOption::FromImage,
        },
        data_disks: vec![data_disk(None, None)],
        os_profile: OsProfile {
            admin_username: "core".to_string(),
            disable_password_authentication: true,
            ssh_public_key: SshPublicKey {
                path: "/home/core/.ssh/authorized_keys".to_string(),
                key_data: "ssh-rsa AAAAB3NzaC1yc2E".to_string(),
            },
        },
        zone: None,
        availability_set: None,
        identity_id: None,
        accelerated_networking: Some(true),
        tags: BTreeMap::from([("cluster".to_string(), "test".to_string())]),
    }
}

pub fn secret() -> MachineSecret {
    MachineSecret {
        subscription_id: "sub".to_string(),
        tenant_id: "tenant".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        user_data: "#cloud-config\n".to_string(),
    }
}

pub fn create_request(machine_name: &str, spec: ProvisioningSpec) -> CreateMachineRequest {
    CreateMachineRequest {
        machine_name: machine_name.to_string(),
        spec,
        secret: secret(),
    }
}

pub fn delete_request(machine_name: &str, spec: ProvisioningSpec) -> DeleteMachineRequest {
    DeleteMachineRequest {
        machine_name: machine_name.to_string(),
        spec,
        secret: secret(),
    }
}

pub fn status_request(machine_name: &str) -> MachineStatusRequest {
    MachineStatusRequest {
        machine_name: machine_name.to_string(),
        spec: spec(),
        secret: secret(),
    }
}

/// A cloud with the subnet and the marketplace image in place
pub async fn cloud() -> FakeCloud {
    let cloud = FakeCloud::new();
    cloud.add_subnet(RESOURCE_GROUP, VNET, SUBNET).await;
    cloud.add_image(IMAGE_URN, None).await;
    cloud
}
