//! Input and output types for azmachine orchestrations

use azmachine_models::{InstanceHandle, MachineSecret, ProvisioningSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Create Machine Orchestration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateMachineRequest {
    /// Machine name; lower-cased before any resource name is derived
    pub machine_name: String,
    pub spec: ProvisioningSpec,
    pub secret: MachineSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateMachineOutput {
    pub handle: InstanceHandle,
    pub nic_name: String,
    pub os_disk_name: String,
    pub data_disk_names: Vec<String>,
    /// Time taken from NIC creation to realized VM (seconds)
    pub provisioning_time_seconds: u64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Delete Machine Orchestration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMachineRequest {
    pub machine_name: String,
    /// Needed for the resource group and the data disk names
    pub spec: ProvisioningSpec,
    pub secret: MachineSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMachineOutput {
    pub machine_name: String,
    /// Whether the VM itself was deleted (false if it didn't exist)
    pub vm_deleted: bool,
}

// ============================================================================
// Machine Status
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatusRequest {
    pub machine_name: String,
    pub spec: ProvisioningSpec,
    pub secret: MachineSecret,
}
