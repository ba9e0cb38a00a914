use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scheme prefix of every provider ID handed back to the cluster orchestrator
pub const PROVIDER_ID_SCHEME: &str = "azure://";

/// Desired shape of a single virtual machine and its dependent resources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningSpec {
    pub location: String,
    pub resource_group: String,
    pub subnet_info: SubnetReference,
    pub vm_size: String,
    pub image_reference: ImageReference,
    pub os_disk: OsDisk,
    #[serde(default)]
    pub data_disks: Vec<DataDiskDescriptor>,
    pub os_profile: OsProfile,
    /// Availability zone. Takes precedence over `availability_set`
    #[serde(default)]
    pub zone: Option<u32>,
    /// Resource ID of a legacy availability set
    #[serde(default)]
    pub availability_set: Option<String>,
    /// Resource ID of a user-assigned managed identity
    #[serde(default)]
    pub identity_id: Option<String>,
    #[serde(default)]
    pub accelerated_networking: Option<bool>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ProvisioningSpec {
    /// Decodes the raw provider spec attached to a machine request
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Resource group holding the VNet; the machine's own unless overridden
    pub fn vnet_resource_group(&self) -> &str {
        self.subnet_info
            .vnet_resource_group
            .as_deref()
            .filter(|rg| !rg.is_empty())
            .unwrap_or(&self.resource_group)
    }
}

/// Where the machine's NIC is plugged in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubnetReference {
    pub vnet_name: String,
    pub subnet_name: String,
    /// Resource group of the VNet when it differs from the machine's
    #[serde(default)]
    pub vnet_resource_group: Option<String>,
}

/// Image to boot from: either a custom image resource ID or a marketplace URN
/// (`publisher:offer:sku:version`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageReference {
    Id(String),
    Urn(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(default)]
    pub caching: Option<CachingType>,
    pub storage_account_type: String,
    pub disk_size_gb: i32,
    #[serde(default = "default_os_disk_create_option")]
    pub create_option: DiskCreateOption,
}

fn default_os_disk_create_option() -> DiskCreateOption {
    DiskCreateOption::FromImage
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    pub admin_username: String,
    #[serde(default = "default_true")]
    pub disable_password_authentication: bool,
    pub ssh_public_key: SshPublicKey,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    pub path: String,
    pub key_data: String,
}

/// Declarative description of one extra volume
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataDiskDescriptor {
    /// Optional name prefix; absent or empty means the LUN alone names the disk
    #[serde(default)]
    pub name: Option<String>,
    /// Logical unit number; absent means "use the list position"
    #[serde(default)]
    pub lun: Option<i32>,
    pub disk_size_gb: i32,
    #[serde(default)]
    pub caching: Option<CachingType>,
    pub storage_account_type: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CachingType {
    #[default]
    None,
    ReadOnly,
    ReadWrite,
}

impl CachingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachingType::None => "None",
            CachingType::ReadOnly => "ReadOnly",
            CachingType::ReadWrite => "ReadWrite",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DiskCreateOption {
    Empty,
    FromImage,
    Attach,
}

impl DiskCreateOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskCreateOption::Empty => "Empty",
            DiskCreateOption::FromImage => "FromImage",
            DiskCreateOption::Attach => "Attach",
        }
    }
}

/// Service principal credentials plus the machine's bootstrap payload
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineSecret {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Cloud-init payload, base64-encoded into the VM's custom data
    #[serde(default)]
    pub user_data: String,
}

impl std::fmt::Debug for MachineSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineSecret")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_data", &format!("<{} bytes>", self.user_data.len()))
            .finish()
    }
}

/// Identity of a machine that is confirmed to exist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHandle {
    /// `azure:///<location>/<vm-name>`
    pub provider_id: String,
    /// Full ARM resource ID of the virtual machine
    pub resource_id: String,
    pub node_name: String,
}

impl InstanceHandle {
    pub fn new(location: &str, vm_name: &str, resource_id: impl Into<String>) -> Self {
        Self {
            provider_id: encode_provider_id(location, vm_name),
            resource_id: resource_id.into(),
            node_name: vm_name.to_string(),
        }
    }
}

/// Current state of an existing machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    pub handle: InstanceHandle,
    pub provisioning_state: Option<String>,
    pub checked_at: DateTime<Utc>,
}

pub fn encode_provider_id(location: &str, vm_name: &str) -> String {
    format!("{}/{}/{}", PROVIDER_ID_SCHEME, location, vm_name)
}

/// Splits a provider ID back into `(location, vm_name)`
pub fn decode_provider_id(provider_id: &str) -> Option<(String, String)> {
    let rest = provider_id.strip_prefix(PROVIDER_ID_SCHEME)?.strip_prefix('/')?;
    let (location, vm_name) = rest.split_once('/')?;
    if location.is_empty() || vm_name.is_empty() || vm_name.contains('/') {
        return None;
    }
    Some((location.to_string(), vm_name.to_string()))
}
