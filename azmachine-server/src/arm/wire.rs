//! ARM JSON payloads
//!
//! Request bodies are built with `json!`; responses are decoded into the
//! minimal structs below and then mapped onto the orchestration resource
//! types.

use azmachine_models::{CachingType, DiskCreateOption};
use azmachine_orchestrations::resources::{
    DataDisk, Disk, MarketplaceAgreement, NetworkInterface, NetworkInterfaceParams, Plan, Subnet,
    VirtualMachine, VirtualMachineImage, VirtualMachineParams, VmImageReference,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

// ============================================================================
// Request bodies
// ============================================================================

pub fn network_interface_body(params: &NetworkInterfaceParams) -> Value {
    let mut properties = json!({
        "enableIPForwarding": params.enable_ip_forwarding,
        "ipConfigurations": [{
            "name": "pipConfig",
            "properties": {
                "privateIPAllocationMethod": "Dynamic",
                "subnet": { "id": params.subnet_id },
            },
        }],
    });
    if let Some(accelerated) = params.enable_accelerated_networking {
        properties["enableAcceleratedNetworking"] = json!(accelerated);
    }

    json!({
        "location": params.location,
        "tags": params.tags,
        "properties": properties,
    })
}

fn data_disk_body(disk: &DataDisk) -> Value {
    json!({
        "lun": disk.lun,
        "name": disk.name,
        "caching": disk.caching.as_str(),
        "createOption": disk.create_option.as_str(),
        "diskSizeGB": disk.disk_size_gb,
        "managedDisk": { "storageAccountType": disk.storage_account_type },
    })
}

pub fn virtual_machine_body(params: &VirtualMachineParams) -> Value {
    let image_reference = match &params.image_reference {
        VmImageReference::Id(id) => json!({ "id": id }),
        VmImageReference::Marketplace(urn) => json!({
            "publisher": urn.publisher,
            "offer": urn.offer,
            "sku": urn.sku,
            "version": urn.version,
        }),
    };

    let profile = &params.os_profile;
    let mut os_profile = json!({
        "computerName": profile.computer_name,
        "adminUsername": profile.admin_username,
        "linuxConfiguration": {
            "disablePasswordAuthentication": profile.disable_password_authentication,
            "ssh": {
                "publicKeys": [{
                    "path": profile.ssh_key_path,
                    "keyData": profile.ssh_key_data,
                }],
            },
        },
    });
    if !profile.custom_data.is_empty() {
        os_profile["customData"] = json!(profile.custom_data);
    }

    let mut properties = json!({
        "hardwareProfile": { "vmSize": params.vm_size },
        "storageProfile": {
            "imageReference": image_reference,
            "osDisk": {
                "name": params.os_disk.name,
                "caching": params.os_disk.caching.as_str(),
                "createOption": params.os_disk.create_option.as_str(),
                "diskSizeGB": params.os_disk.disk_size_gb,
                "managedDisk": { "storageAccountType": params.os_disk.storage_account_type },
            },
            "dataDisks": params.data_disks.iter().map(data_disk_body).collect::<Vec<_>>(),
        },
        "osProfile": os_profile,
        "networkProfile": {
            "networkInterfaces": [{
                "id": params.network_interface_id,
                "properties": { "primary": true },
            }],
        },
    });
    if let Some(availability_set) = &params.availability_set_id {
        properties["availabilitySet"] = json!({ "id": availability_set });
    }

    let mut body = json!({
        "location": params.location,
        "tags": params.tags,
        "properties": properties,
    });
    if let Some(plan) = &params.plan {
        body["plan"] = plan_body(plan);
    }
    if !params.zones.is_empty() {
        body["zones"] = json!(params.zones);
    }
    if let Some(identity) = &params.identity_id {
        let mut identities = Map::new();
        identities.insert(identity.clone(), json!({}));
        body["identity"] = json!({
            "type": "UserAssigned",
            "userAssignedIdentities": identities,
        });
    }
    body
}

/// PATCH body replacing the VM's data disk attachments
pub fn data_disks_patch(data_disks: &[DataDisk]) -> Value {
    json!({
        "properties": {
            "storageProfile": {
                "dataDisks": data_disks.iter().map(data_disk_body).collect::<Vec<_>>(),
            },
        },
    })
}

fn plan_body(plan: &Plan) -> Value {
    json!({
        "name": plan.name,
        "product": plan.product,
        "publisher": plan.publisher,
    })
}

pub fn agreement_body(agreement: &MarketplaceAgreement) -> Value {
    json!({
        "properties": {
            "accepted": agreement.accepted,
            "licenseTextLink": agreement.license_text_link,
            "privacyPolicyLink": agreement.privacy_policy_link,
            "signature": agreement.signature,
            "marketplaceTermsLink": agreement.marketplace_terms_link,
            "retrieveDatetime": agreement.retrieve_datetime,
        },
    })
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SubnetResponse {
    pub id: String,
    pub name: String,
}

impl From<SubnetResponse> for Subnet {
    fn from(subnet: SubnetResponse) -> Self {
        Subnet {
            id: subnet.id,
            name: subnet.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubResource {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct NetworkInterfaceResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: NetworkInterfaceProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    #[serde(default)]
    pub virtual_machine: Option<SubResource>,
}

impl From<NetworkInterfaceResponse> for NetworkInterface {
    fn from(nic: NetworkInterfaceResponse) -> Self {
        NetworkInterface {
            id: nic.id,
            name: nic.name,
            virtual_machine_id: nic.properties.virtual_machine.map(|vm| vm.id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VirtualMachineResponse {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: VirtualMachineProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub storage_profile: StorageProfile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(default)]
    pub data_disks: Vec<DataDiskResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDiskResponse {
    pub lun: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub caching: Option<CachingType>,
    pub create_option: DiskCreateOption,
    #[serde(rename = "diskSizeGB", default)]
    pub disk_size_gb: i32,
    #[serde(default)]
    pub managed_disk: Option<ManagedDisk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDisk {
    #[serde(default)]
    pub storage_account_type: Option<String>,
}

impl From<DataDiskResponse> for DataDisk {
    fn from(disk: DataDiskResponse) -> Self {
        DataDisk {
            lun: disk.lun,
            name: disk.name,
            caching: disk.caching.unwrap_or_default(),
            storage_account_type: disk
                .managed_disk
                .and_then(|managed| managed.storage_account_type)
                .unwrap_or_default(),
            disk_size_gb: disk.disk_size_gb,
            create_option: disk.create_option,
        }
    }
}

impl From<VirtualMachineResponse> for VirtualMachine {
    fn from(vm: VirtualMachineResponse) -> Self {
        VirtualMachine {
            id: vm.id,
            name: vm.name,
            location: vm.location,
            data_disks: vm
                .properties
                .storage_profile
                .data_disks
                .into_iter()
                .map(DataDisk::from)
                .collect(),
            provisioning_state: vm.properties.provisioning_state,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub managed_by: Option<String>,
}

impl From<DiskResponse> for Disk {
    fn from(disk: DiskResponse) -> Self {
        Disk {
            id: disk.id,
            name: disk.name,
            managed_by: disk.managed_by.filter(|id| !id.is_empty()),
        }
    }
}

/// Entry of the image versions listing
#[derive(Debug, Deserialize)]
pub struct ImageVersionEntry {
    pub name: String,
}

/// Picks the highest version from a listing. Versions are dotted and compared
/// component by component, numerically where both sides are numbers.
pub fn newest_image_version(entries: Vec<ImageVersionEntry>) -> Option<String> {
    entries
        .into_iter()
        .map(|entry| entry.name)
        .max_by(|a, b| compare_versions(a, b))
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    pub id: String,
    #[serde(default)]
    pub properties: ImageProperties,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageProperties {
    #[serde(default)]
    pub plan: Option<PlanResponse>,
}

#[derive(Debug, Deserialize)]
pub struct PlanResponse {
    pub name: String,
    pub product: String,
    pub publisher: String,
}

impl From<ImageResponse> for VirtualMachineImage {
    fn from(image: ImageResponse) -> Self {
        VirtualMachineImage {
            id: image.id,
            plan: image.properties.plan.map(|plan| Plan {
                name: plan.name,
                product: plan.product,
                publisher: plan.publisher,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgreementResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: AgreementProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementProperties {
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub license_text_link: Option<String>,
    #[serde(default)]
    pub privacy_policy_link: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub marketplace_terms_link: Option<String>,
    #[serde(default)]
    pub retrieve_datetime: Option<String>,
}

impl From<AgreementResponse> for MarketplaceAgreement {
    fn from(agreement: AgreementResponse) -> Self {
        let properties = agreement.properties;
        MarketplaceAgreement {
            id: agreement.id,
            accepted: properties.accepted,
            license_text_link: properties.license_text_link,
            privacy_policy_link: properties.privacy_policy_link,
            signature: properties.signature,
            marketplace_terms_link: properties.marketplace_terms_link,
            retrieve_datetime: properties.retrieve_datetime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmachine_orchestrations::resources::{ImageUrn, OsDiskParams, OsProfileParams};
    use std::collections::BTreeMap;

    fn vm_params() -> VirtualMachineParams {
        VirtualMachineParams {
            name: "vm-1".to_string(),
            location: "westeurope".to_string(),
            plan: None,
            vm_size: "Standard_D2s_v3".to_string(),
            image_reference: VmImageReference::Marketplace(
                ImageUrn::parse("Canonical:UbuntuServer:18.04-LTS:latest").unwrap(),
            ),
            os_disk: OsDiskParams {
                name: "vm-1-os-disk".to_string(),
                caching: CachingType::ReadWrite,
                storage_account_type: "Premium_LRS".to_string(),
                disk_size_gb: 30,
                create_option: DiskCreateOption::FromImage,
            },
            data_disks: vec![DataDisk {
                lun: 0,
                name: "vm-1-0-data-disk".to_string(),
                caching: CachingType::None,
                storage_account_type: "Standard_LRS".to_string(),
                disk_size_gb: 100,
                create_option: DiskCreateOption::Empty,
            }],
            os_profile: OsProfileParams {
                computer_name: "vm-1".to_string(),
                admin_username: "capi".to_string(),
                custom_data: String::new(),
                disable_password_authentication: true,
                ssh_key_path: "/home/capi/.ssh/authorized_keys".to_string(),
                ssh_key_data: "ssh-rsa AAAA".to_string(),
            },
            network_interface_id: "/nics/vm-1-nic".to_string(),
            zones: vec!["2".to_string()],
            availability_set_id: None,
            identity_id: Some("/identities/id-1".to_string()),
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn test_virtual_machine_body() {
        let body = virtual_machine_body(&vm_params());

        assert_eq!(body["zones"], json!(["2"]));
        assert!(body.get("plan").is_none());
        assert!(body["properties"].get("availabilitySet").is_none());
        assert!(body["properties"]["osProfile"].get("customData").is_none());
        assert_eq!(body["identity"]["type"], "UserAssigned");
        assert!(body["identity"]["userAssignedIdentities"]
            .get("/identities/id-1")
            .is_some());
        assert_eq!(
            body["properties"]["storageProfile"]["imageReference"]["version"],
            "latest"
        );
        assert_eq!(
            body["properties"]["storageProfile"]["dataDisks"][0],
            json!({
                "lun": 0,
                "name": "vm-1-0-data-disk",
                "caching": "None",
                "createOption": "Empty",
                "diskSizeGB": 100,
                "managedDisk": { "storageAccountType": "Standard_LRS" },
            })
        );
        assert_eq!(
            body["properties"]["networkProfile"]["networkInterfaces"][0]["id"],
            "/nics/vm-1-nic"
        );
    }

    #[test]
    fn test_network_interface_body() {
        let params = NetworkInterfaceParams {
            name: "vm-1-nic".to_string(),
            location: "westeurope".to_string(),
            subnet_id: "/subnets/subnet-a".to_string(),
            enable_ip_forwarding: true,
            enable_accelerated_networking: None,
            tags: BTreeMap::new(),
        };
        let body = network_interface_body(&params);

        assert_eq!(body["properties"]["enableIPForwarding"], true);
        assert!(body["properties"].get("enableAcceleratedNetworking").is_none());
        assert_eq!(
            body["properties"]["ipConfigurations"][0]["properties"]["subnet"]["id"],
            "/subnets/subnet-a"
        );
    }

    #[test]
    fn test_decode_attached_nic() {
        let raw = r#"{
            "id": "/nics/vm-1-nic",
            "name": "vm-1-nic",
            "properties": { "virtualMachine": { "id": "/vms/vm-2" }, "provisioningState": "Succeeded" }
        }"#;
        let nic: NetworkInterface = serde_json::from_str::<NetworkInterfaceResponse>(raw).unwrap().into();
        assert_eq!(nic.virtual_machine_id.as_deref(), Some("/vms/vm-2"));
    }

    #[test]
    fn test_decode_virtual_machine() {
        let raw = r#"{
            "id": "/vms/vm-1",
            "name": "vm-1",
            "location": "westeurope",
            "properties": {
                "provisioningState": "Succeeded",
                "storageProfile": {
                    "dataDisks": [{
                        "lun": 0,
                        "name": "vm-1-0-data-disk",
                        "createOption": "Empty",
                        "caching": "ReadOnly",
                        "diskSizeGB": 100,
                        "managedDisk": { "storageAccountType": "Premium_LRS", "id": "/disks/vm-1-0-data-disk" }
                    }]
                }
            }
        }"#;
        let vm: VirtualMachine = serde_json::from_str::<VirtualMachineResponse>(raw).unwrap().into();
        assert_eq!(vm.provisioning_state.as_deref(), Some("Succeeded"));
        assert_eq!(vm.data_disks.len(), 1);
        assert_eq!(vm.data_disks[0].caching, CachingType::ReadOnly);
        assert_eq!(vm.data_disks[0].storage_account_type, "Premium_LRS");
    }

    #[test]
    fn test_decode_image_plan_and_agreement() {
        let raw = r#"{
            "id": "/images/flatcar",
            "name": "3510.2.0",
            "location": "westeurope",
            "properties": { "plan": { "name": "stable", "product": "flatcar", "publisher": "kinvolk" } }
        }"#;
        let image: VirtualMachineImage = serde_json::from_str::<ImageResponse>(raw).unwrap().into();
        assert_eq!(image.plan.map(|plan| plan.publisher), Some("kinvolk".to_string()));

        let agreement: MarketplaceAgreement = serde_json::from_str::<AgreementResponse>(
            r#"{"id":"/agreements/current","properties":{"accepted":false,"signature":"abc"}}"#,
        )
        .unwrap()
        .into();
        assert!(!agreement.accepted);
        assert_eq!(agreement_body(&agreement)["properties"]["signature"], "abc");
    }

    #[test]
    fn test_newest_image_version_compares_numerically() {
        let listing = r#"[
            {"name": "18.04.202309010"},
            {"name": "1.10.0"},
            {"name": "18.04.202401010"},
            {"name": "1.9.0"},
            {"name": "18.04.202312140"}
        ]"#;
        let entries: Vec<ImageVersionEntry> = serde_json::from_str(listing).unwrap();
        assert_eq!(newest_image_version(entries), Some("18.04.202401010".to_string()));

        let entries = ["1.9.0", "1.10.0", "1.2.30"]
            .into_iter()
            .map(|name| ImageVersionEntry { name: name.to_string() })
            .collect();
        assert_eq!(newest_image_version(entries), Some("1.10.0".to_string()));
        assert_eq!(newest_image_version(Vec::new()), None);
    }

    #[test]
    fn test_compare_versions_by_component() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0.1"), Ordering::Less);
        assert_eq!(compare_versions("3.1.4", "3.1.4"), Ordering::Equal);
    }
}
