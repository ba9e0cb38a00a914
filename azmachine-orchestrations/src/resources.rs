//! Resource shapes exchanged with the backend client facade

use azmachine_models::{CachingType, DiskCreateOption};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Resource kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Subnet,
    NetworkInterface,
    VirtualMachine,
    Disk,
    VirtualMachineImage,
    MarketplaceAgreement,
}

impl ResourceKind {
    /// Label under which API calls for this kind are counted
    pub fn service_label(&self) -> &'static str {
        match self {
            ResourceKind::Subnet => "subnet",
            ResourceKind::NetworkInterface => "network_interfaces",
            ResourceKind::VirtualMachine => "virtual_machine",
            ResourceKind::Disk => "disks",
            ResourceKind::VirtualMachineImage => "virtual_machine_images",
            ResourceKind::MarketplaceAgreement => "marketplace_agreements",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Subnet => "subnet",
            ResourceKind::NetworkInterface => "NIC",
            ResourceKind::VirtualMachine => "VM",
            ResourceKind::Disk => "disk",
            ResourceKind::VirtualMachineImage => "VM image",
            ResourceKind::MarketplaceAgreement => "marketplace agreement",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub name: String,
}

/// Desired state of a network interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterfaceParams {
    pub name: String,
    pub location: String,
    pub subnet_id: String,
    pub enable_ip_forwarding: bool,
    pub enable_accelerated_networking: Option<bool>,
    pub tags: BTreeMap<String, String>,
}

/// Realized network interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: String,
    pub name: String,
    /// Resource ID of the VM currently holding this NIC
    pub virtual_machine_id: Option<String>,
}

// ============================================================================
// Compute
// ============================================================================

/// Image reference as placed on the VM definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmImageReference {
    Id(String),
    Marketplace(ImageUrn),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrn {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

impl ImageUrn {
    /// Parses `publisher:offer:sku:version`
    pub fn parse(urn: &str) -> Option<Self> {
        let parts: Vec<&str> = urn.split(':').collect();
        match parts.as_slice() {
            [publisher, offer, sku, version]
                if parts.iter().all(|p| !p.is_empty()) =>
            {
                Some(Self {
                    publisher: publisher.to_string(),
                    offer: offer.to_string(),
                    sku: sku.to_string(),
                    version: version.to_string(),
                })
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageUrn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}:{}", self.publisher, self.offer, self.sku, self.version)
    }
}

/// Commercial plan attached to a marketplace image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub product: String,
    pub publisher: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineImage {
    pub id: String,
    pub plan: Option<Plan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceAgreement {
    pub id: Option<String>,
    pub accepted: bool,
    pub license_text_link: Option<String>,
    pub privacy_policy_link: Option<String>,
    pub signature: Option<String>,
    pub marketplace_terms_link: Option<String>,
    pub retrieve_datetime: Option<String>,
}

/// Data disk attachment on a VM definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDisk {
    pub lun: i32,
    pub name: String,
    pub caching: CachingType,
    pub storage_account_type: String,
    pub disk_size_gb: i32,
    pub create_option: DiskCreateOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsDiskParams {
    pub name: String,
    pub caching: CachingType,
    pub storage_account_type: String,
    pub disk_size_gb: i32,
    pub create_option: DiskCreateOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsProfileParams {
    pub computer_name: String,
    pub admin_username: String,
    /// Base64-encoded user data
    pub custom_data: String,
    pub disable_password_authentication: bool,
    pub ssh_key_path: String,
    pub ssh_key_data: String,
}

/// Desired state of a virtual machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachineParams {
    pub name: String,
    pub location: String,
    pub plan: Option<Plan>,
    pub vm_size: String,
    pub image_reference: VmImageReference,
    pub os_disk: OsDiskParams,
    pub data_disks: Vec<DataDisk>,
    pub os_profile: OsProfileParams,
    /// Resource ID of the primary NIC
    pub network_interface_id: String,
    pub zones: Vec<String>,
    pub availability_set_id: Option<String>,
    /// User-assigned identity resource ID
    pub identity_id: Option<String>,
    pub tags: BTreeMap<String, String>,
}

/// Realized virtual machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    pub location: String,
    pub data_disks: Vec<DataDisk>,
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub id: String,
    pub name: String,
    /// Resource ID of the VM the disk is attached to
    pub managed_by: Option<String>,
}

/// Last path segment of an ARM resource ID
pub fn resource_name_from_id(id: &str) -> &str {
    id.trim_end_matches('/').rsplit('/').next().unwrap_or(id)
}
