//! In-memory cloud implementing every backend client trait
//!
//! Mutations land when an operation is submitted; waiting on the returned
//! [`Operation`] only reports the outcome. A fault injected at a wait stage
//! therefore leaves the resource behind, which is what a real control plane
//! does when a long-running operation fails half-way.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use azmachine_models::MachineSecret;
use tokio::sync::Mutex;

use crate::backend::{
    validate_secret, AzureClients, BackendError, ClientFactory, DiskClient, ImageClient, MarketplaceClient,
    NetworkInterfaceClient, Operation, SetupError, SubnetClient, VirtualMachineClient,
};
use crate::resources::{
    DataDisk, Disk, ImageUrn, MarketplaceAgreement, NetworkInterface, NetworkInterfaceParams, Plan, ResourceKind,
    Subnet, VirtualMachine, VirtualMachineImage, VirtualMachineParams,
};

pub const FAKE_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Point in a backend call where a fault can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultStage {
    Get,
    /// Submitting a create or an agreement acceptance
    Create,
    CreateWait,
    /// Submitting a change to a VM's data disk attachments
    Update,
    UpdateWait,
    Delete,
    DeleteWait,
}

#[derive(Debug, Clone)]
enum Fault {
    Fail(BackendError),
    /// Never completes
    Stall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: ResourceKind,
    pub stage: FaultStage,
    pub name: String,
}

type Key = (String, String);

fn key(resource_group: &str, name: &str) -> Key {
    (resource_group.to_string(), name.to_string())
}

#[derive(Debug, Default)]
struct CloudState {
    subnets: HashMap<(String, String, String), Subnet>,
    nics: HashMap<Key, NetworkInterface>,
    vms: HashMap<Key, VirtualMachine>,
    disks: HashMap<Key, Disk>,
    images: HashMap<String, VirtualMachineImage>,
    agreements: HashMap<Plan, MarketplaceAgreement>,
    faults: HashMap<(ResourceKind, FaultStage), Fault>,
    setup_error: Option<SetupError>,
    calls: Vec<RecordedCall>,
    vm_params: Vec<VirtualMachineParams>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

pub fn resource_id(resource_group: &str, provider: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
        FAKE_SUBSCRIPTION_ID, resource_group, provider, name
    )
}

pub fn vm_id(resource_group: &str, name: &str) -> String {
    resource_id(resource_group, "Microsoft.Compute/virtualMachines", name)
}

pub fn nic_id(resource_group: &str, name: &str) -> String {
    resource_id(resource_group, "Microsoft.Network/networkInterfaces", name)
}

pub fn disk_id(resource_group: &str, name: &str) -> String {
    resource_id(resource_group, "Microsoft.Compute/disks", name)
}

fn in_use(code: &str, message: String) -> BackendError {
    BackendError::Api {
        status: 400,
        code: code.to_string(),
        message,
    }
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client bundle backed by this cloud
    pub fn clients(&self) -> AzureClients {
        AzureClients {
            subnet: Arc::new(self.clone()),
            nic: Arc::new(self.clone()),
            vm: Arc::new(self.clone()),
            disk: Arc::new(self.clone()),
            images: Arc::new(self.clone()),
            marketplace: Arc::new(self.clone()),
        }
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    pub async fn add_subnet(&self, resource_group: &str, vnet_name: &str, subnet_name: &str) -> Subnet {
        let subnet = Subnet {
            id: resource_id(
                resource_group,
                "Microsoft.Network/virtualNetworks",
                &format!("{}/subnets/{}", vnet_name, subnet_name),
            ),
            name: subnet_name.to_string(),
        };
        self.state.lock().await.subnets.insert(
            (resource_group.to_string(), vnet_name.to_string(), subnet_name.to_string()),
            subnet.clone(),
        );
        subnet
    }

    pub async fn add_image(&self, urn: &str, plan: Option<Plan>) {
        let image = VirtualMachineImage {
            id: format!("/providers/Microsoft.Compute/images/{}", urn.replace(':', "/")),
            plan,
        };
        self.state.lock().await.images.insert(urn.to_string(), image);
    }

    /// Seeds a NIC, optionally already held by VM `attached_to`
    pub async fn add_nic(&self, resource_group: &str, name: &str, attached_to: Option<&str>) {
        let nic = NetworkInterface {
            id: nic_id(resource_group, name),
            name: name.to_string(),
            virtual_machine_id: attached_to.map(|vm| vm_id(resource_group, vm)),
        };
        self.state.lock().await.nics.insert(key(resource_group, name), nic);
    }

    pub async fn add_disk(&self, resource_group: &str, name: &str) {
        let disk = Disk {
            id: disk_id(resource_group, name),
            name: name.to_string(),
            managed_by: None,
        };
        self.state.lock().await.disks.insert(key(resource_group, name), disk);
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    pub async fn fail(&self, kind: ResourceKind, stage: FaultStage, error: BackendError) {
        self.state.lock().await.faults.insert((kind, stage), Fault::Fail(error));
    }

    /// Makes every call of `kind` at `stage` hang until cancelled
    pub async fn stall(&self, kind: ResourceKind, stage: FaultStage) {
        self.state.lock().await.faults.insert((kind, stage), Fault::Stall);
    }

    pub async fn fail_setup(&self, error: SetupError) {
        self.state.lock().await.setup_error = Some(error);
    }

    pub async fn clear_faults(&self) {
        let mut state = self.state.lock().await;
        state.faults.clear();
        state.setup_error = None;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub async fn nic(&self, resource_group: &str, name: &str) -> Option<NetworkInterface> {
        self.state.lock().await.nics.get(&key(resource_group, name)).cloned()
    }

    pub async fn vm(&self, resource_group: &str, name: &str) -> Option<VirtualMachine> {
        self.state.lock().await.vms.get(&key(resource_group, name)).cloned()
    }

    pub async fn disk(&self, resource_group: &str, name: &str) -> Option<Disk> {
        self.state.lock().await.disks.get(&key(resource_group, name)).cloned()
    }

    /// Number of NICs, VMs and disks currently in the cloud
    pub async fn resource_count(&self) -> usize {
        let state = self.state.lock().await;
        state.nics.len() + state.vms.len() + state.disks.len()
    }

    pub async fn agreement_accepted(&self, plan: &Plan) -> bool {
        self.state
            .lock()
            .await
            .agreements
            .get(plan)
            .map(|agreement| agreement.accepted)
            .unwrap_or(false)
    }

    /// Every VM definition submitted so far, oldest first
    pub async fn vm_params(&self) -> Vec<VirtualMachineParams> {
        self.state.lock().await.vm_params.clone()
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, kind: ResourceKind, stage: FaultStage) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.kind == kind && call.stage == stage)
            .count()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Records the call and applies any fault injected at that point
    async fn enter(&self, kind: ResourceKind, stage: FaultStage, name: &str) -> Result<(), BackendError> {
        let fault = {
            let mut state = self.state.lock().await;
            state.calls.push(RecordedCall {
                kind,
                stage,
                name: name.to_string(),
            });
            state.faults.get(&(kind, stage)).cloned()
        };
        resolve(fault).await
    }

    fn operation(&self, kind: ResourceKind, stage: FaultStage) -> Operation {
        let state = self.state.clone();
        Operation::new(async move {
            let fault = state.lock().await.faults.get(&(kind, stage)).cloned();
            resolve(fault).await
        })
    }
}

async fn resolve(fault: Option<Fault>) -> Result<(), BackendError> {
    match fault {
        None => Ok(()),
        Some(Fault::Fail(error)) => Err(error),
        Some(Fault::Stall) => std::future::pending::<Result<(), BackendError>>().await,
    }
}

#[async_trait]
impl SubnetClient for FakeCloud {
    async fn get(&self, resource_group: &str, vnet_name: &str, subnet_name: &str) -> Result<Subnet, BackendError> {
        self.enter(ResourceKind::Subnet, FaultStage::Get, subnet_name).await?;
        self.state
            .lock()
            .await
            .subnets
            .get(&(resource_group.to_string(), vnet_name.to_string(), subnet_name.to_string()))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("{}/{}", vnet_name, subnet_name)))
    }
}

#[async_trait]
impl NetworkInterfaceClient for FakeCloud {
    async fn get(&self, resource_group: &str, name: &str) -> Result<NetworkInterface, BackendError> {
        self.enter(ResourceKind::NetworkInterface, FaultStage::Get, name).await?;
        self.state
            .lock()
            .await
            .nics
            .get(&key(resource_group, name))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    async fn begin_create_or_update(
        &self,
        resource_group: &str,
        params: &NetworkInterfaceParams,
    ) -> Result<Operation, BackendError> {
        self.enter(ResourceKind::NetworkInterface, FaultStage::Create, &params.name).await?;

        let mut state = self.state.lock().await;
        let holder = state
            .nics
            .get(&key(resource_group, &params.name))
            .and_then(|nic| nic.virtual_machine_id.clone());
        state.nics.insert(
            key(resource_group, &params.name),
            NetworkInterface {
                id: nic_id(resource_group, &params.name),
                name: params.name.clone(),
                virtual_machine_id: holder,
            },
        );

        Ok(self.operation(ResourceKind::NetworkInterface, FaultStage::CreateWait))
    }

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError> {
        self.enter(ResourceKind::NetworkInterface, FaultStage::Delete, name).await?;

        let mut state = self.state.lock().await;
        let nic = state
            .nics
            .get(&key(resource_group, name))
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        if let Some(vm) = &nic.virtual_machine_id {
            return Err(in_use(
                "NicInUse",
                format!("network interface {} is in use by {}", name, vm),
            ));
        }
        state.nics.remove(&key(resource_group, name));

        Ok(self.operation(ResourceKind::NetworkInterface, FaultStage::DeleteWait))
    }
}

#[async_trait]
impl VirtualMachineClient for FakeCloud {
    async fn get(&self, resource_group: &str, name: &str) -> Result<VirtualMachine, BackendError> {
        self.enter(ResourceKind::VirtualMachine, FaultStage::Get, name).await?;
        self.state
            .lock()
            .await
            .vms
            .get(&key(resource_group, name))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    async fn begin_create_or_update(
        &self,
        resource_group: &str,
        params: &VirtualMachineParams,
    ) -> Result<Operation, BackendError> {
        self.enter(ResourceKind::VirtualMachine, FaultStage::Create, &params.name).await?;

        let mut state = self.state.lock().await;
        state.vm_params.push(params.clone());

        let id = vm_id(resource_group, &params.name);
        let nic = state
            .nics
            .values_mut()
            .find(|nic| nic.id == params.network_interface_id)
            .ok_or_else(|| BackendError::Api {
                status: 400,
                code: "InvalidResourceReference".to_string(),
                message: format!("network interface {} not found", params.network_interface_id),
            })?;
        if let Some(holder) = nic.virtual_machine_id.as_ref().filter(|holder| **holder != id) {
            return Err(in_use(
                "NicInUse",
                format!("network interface {} is in use by {}", nic.name, holder),
            ));
        }
        nic.virtual_machine_id = Some(id.clone());

        let disk_names =
            std::iter::once(params.os_disk.name.clone()).chain(params.data_disks.iter().map(|d| d.name.clone()));
        for disk_name in disk_names {
            state.disks.insert(
                key(resource_group, &disk_name),
                Disk {
                    id: disk_id(resource_group, &disk_name),
                    name: disk_name,
                    managed_by: Some(id.clone()),
                },
            );
        }

        state.vms.insert(
            key(resource_group, &params.name),
            VirtualMachine {
                id,
                name: params.name.clone(),
                location: params.location.clone(),
                data_disks: params.data_disks.clone(),
                provisioning_state: Some("Succeeded".to_string()),
            },
        );

        Ok(self.operation(ResourceKind::VirtualMachine, FaultStage::CreateWait))
    }

    async fn begin_update_data_disks(
        &self,
        resource_group: &str,
        name: &str,
        data_disks: Vec<DataDisk>,
    ) -> Result<Operation, BackendError> {
        self.enter(ResourceKind::VirtualMachine, FaultStage::Update, name).await?;

        let mut state = self.state.lock().await;
        let vm = state
            .vms
            .get_mut(&key(resource_group, name))
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        let detached: Vec<String> = vm
            .data_disks
            .iter()
            .filter(|old| !data_disks.iter().any(|new| new.name == old.name))
            .map(|old| old.name.clone())
            .collect();
        vm.data_disks = data_disks;

        for disk_name in detached {
            if let Some(disk) = state.disks.get_mut(&key(resource_group, &disk_name)) {
                disk.managed_by = None;
            }
        }

        Ok(self.operation(ResourceKind::VirtualMachine, FaultStage::UpdateWait))
    }

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError> {
        self.enter(ResourceKind::VirtualMachine, FaultStage::Delete, name).await?;

        let mut state = self.state.lock().await;
        let vm = state
            .vms
            .remove(&key(resource_group, name))
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;

        // Only the compute resource goes; its NIC and disks are released
        for nic in state.nics.values_mut() {
            if nic.virtual_machine_id.as_deref() == Some(vm.id.as_str()) {
                nic.virtual_machine_id = None;
            }
        }
        for disk in state.disks.values_mut() {
            if disk.managed_by.as_deref() == Some(vm.id.as_str()) {
                disk.managed_by = None;
            }
        }

        Ok(self.operation(ResourceKind::VirtualMachine, FaultStage::DeleteWait))
    }
}

#[async_trait]
impl DiskClient for FakeCloud {
    async fn get(&self, resource_group: &str, name: &str) -> Result<Disk, BackendError> {
        self.enter(ResourceKind::Disk, FaultStage::Get, name).await?;
        self.state
            .lock()
            .await
            .disks
            .get(&key(resource_group, name))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError> {
        self.enter(ResourceKind::Disk, FaultStage::Delete, name).await?;

        let mut state = self.state.lock().await;
        let disk = state
            .disks
            .get(&key(resource_group, name))
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        if let Some(vm) = &disk.managed_by {
            return Err(BackendError::Api {
                status: 409,
                code: "OperationNotAllowed".to_string(),
                message: format!("disk {} is attached to {}", name, vm),
            });
        }
        state.disks.remove(&key(resource_group, name));

        Ok(self.operation(ResourceKind::Disk, FaultStage::DeleteWait))
    }
}

#[async_trait]
impl ImageClient for FakeCloud {
    async fn get(&self, _location: &str, urn: &ImageUrn) -> Result<VirtualMachineImage, BackendError> {
        let urn = urn.to_string();
        self.enter(ResourceKind::VirtualMachineImage, FaultStage::Get, &urn).await?;
        self.state
            .lock()
            .await
            .images
            .get(&urn)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(urn.clone()))
    }
}

#[async_trait]
impl MarketplaceClient for FakeCloud {
    async fn get(&self, plan: &Plan) -> Result<MarketplaceAgreement, BackendError> {
        self.enter(ResourceKind::MarketplaceAgreement, FaultStage::Get, &plan.name).await?;

        let state = self.state.lock().await;
        let agreement = state.agreements.get(plan).cloned().unwrap_or_else(|| MarketplaceAgreement {
            id: Some(format!(
                "/subscriptions/{}/providers/Microsoft.MarketplaceOrdering/offerTypes/VirtualMachine/publishers/{}/offers/{}/plans/{}/agreements/current",
                FAKE_SUBSCRIPTION_ID, plan.publisher, plan.product, plan.name
            )),
            accepted: false,
            license_text_link: None,
            privacy_policy_link: None,
            signature: Some("fake-signature".to_string()),
            marketplace_terms_link: None,
            retrieve_datetime: None,
        });
        Ok(agreement)
    }

    async fn create(
        &self,
        plan: &Plan,
        agreement: &MarketplaceAgreement,
    ) -> Result<MarketplaceAgreement, BackendError> {
        self.enter(ResourceKind::MarketplaceAgreement, FaultStage::Create, &plan.name).await?;
        self.state.lock().await.agreements.insert(plan.clone(), agreement.clone());
        Ok(agreement.clone())
    }
}

#[async_trait]
impl ClientFactory for FakeCloud {
    async fn setup(&self, secret: &MachineSecret) -> Result<AzureClients, SetupError> {
        validate_secret(secret)?;
        if let Some(error) = self.state.lock().await.setup_error.clone() {
            return Err(error);
        }
        Ok(self.clients())
    }
}
