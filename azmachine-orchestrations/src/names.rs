//! Deterministic names for the resources that hang off a virtual machine
//!
//! Creation and teardown both derive names from the VM name alone, so nothing
//! has to be persisted to find a machine's NIC and disks again.

use azmachine_models::DataDiskDescriptor;

/// Suffixes appended to the VM name
pub mod suffixes {
    /// Network interface: `<vm>-nic`
    pub const NIC: &str = "-nic";

    /// OS disk: `<vm>-os-disk`
    pub const OS_DISK: &str = "-os-disk";

    /// Data disk: `<vm>-<prefix>-data-disk`
    pub const DATA_DISK: &str = "-data-disk";
}

pub fn dependency_name_from_vm_name(vm_name: &str, suffix: &str) -> String {
    format!("{}{}", vm_name, suffix)
}

pub fn dependency_name_from_vm_name_and_dependency(
    dependency: &str,
    vm_name: &str,
    suffix: &str,
) -> String {
    format!("{}-{}{}", vm_name, dependency, suffix)
}

/// `<name>-<lun>` when an explicit name is given, otherwise just `<lun>`
pub fn data_disk_prefix(name: Option<&str>, lun: i32) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{}-{}", name, lun),
        _ => lun.to_string(),
    }
}

/// LUN for the descriptor at `position`: the explicit one, else the position
pub fn effective_lun(disk: &DataDiskDescriptor, position: usize) -> i32 {
    disk.lun.unwrap_or(position as i32)
}

pub fn data_disk_names(data_disks: &[DataDiskDescriptor], vm_name: &str, suffix: &str) -> Vec<String> {
    data_disks
        .iter()
        .enumerate()
        .map(|(i, disk)| {
            let prefix = data_disk_prefix(disk.name.as_deref(), effective_lun(disk, i));
            dependency_name_from_vm_name_and_dependency(&prefix, vm_name, suffix)
        })
        .collect()
}

/// Names of everything a VM depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentResourceNames {
    pub vm_name: String,
    pub nic_name: String,
    pub os_disk_name: String,
    pub data_disk_names: Vec<String>,
}

impl DependentResourceNames {
    pub fn new(vm_name: &str, data_disks: &[DataDiskDescriptor]) -> Self {
        Self {
            vm_name: vm_name.to_string(),
            nic_name: dependency_name_from_vm_name(vm_name, suffixes::NIC),
            os_disk_name: dependency_name_from_vm_name(vm_name, suffixes::OS_DISK),
            data_disk_names: data_disk_names(data_disks, vm_name, suffixes::DATA_DISK),
        }
    }
}

/// Azure resource names are case-insensitive; the driver always works with
/// the lower-cased machine name
pub fn normalize_machine_name(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn disk(name: Option<&str>, lun: Option<i32>) -> DataDiskDescriptor {
        DataDiskDescriptor {
            name: name.map(str::to_string),
            lun,
            disk_size_gb: 50,
            caching: None,
            storage_account_type: "Standard_LRS".to_string(),
        }
    }

    #[test]
    fn test_dependency_names_are_stable() {
        for _ in 0..3 {
            assert_eq!(dependency_name_from_vm_name("vm-1", suffixes::NIC), "vm-1-nic");
            assert_eq!(dependency_name_from_vm_name("vm-1", suffixes::OS_DISK), "vm-1-os-disk");
            assert_eq!(
                dependency_name_from_vm_name_and_dependency("0", "vm-1", suffixes::DATA_DISK),
                "vm-1-0-data-disk"
            );
        }
    }

    #[test]
    fn test_data_disk_prefix() {
        assert_eq!(data_disk_prefix(Some("logs"), 3), "logs-3");
        assert_eq!(data_disk_prefix(None, 3), "3");
        assert_eq!(data_disk_prefix(Some(""), 3), "3");
    }

    #[test]
    fn test_dependent_resource_names() {
        let names = DependentResourceNames::new("vm-1", &[disk(None, None), disk(Some("etcd"), Some(7))]);
        assert_eq!(names.nic_name, "vm-1-nic");
        assert_eq!(names.os_disk_name, "vm-1-os-disk");
        assert_eq!(names.data_disk_names, vec!["vm-1-0-data-disk", "vm-1-etcd-7-data-disk"]);
    }

    #[test]
    fn test_positional_luns_fill_only_unset_entries() {
        let disks = [disk(None, Some(5)), disk(None, None), disk(None, None)];
        let luns: Vec<i32> = disks.iter().enumerate().map(|(i, d)| effective_lun(d, i)).collect();
        assert_eq!(luns, vec![5, 1, 2]);
    }

    #[test]
    fn test_distinct_name_lun_pairs_yield_distinct_names() {
        let disks = [
            disk(None, Some(0)),
            disk(None, Some(1)),
            disk(Some("a"), Some(0)),
            disk(Some("a"), Some(1)),
            disk(Some("b"), Some(0)),
        ];
        let names = data_disk_names(&disks, "vm-1", suffixes::DATA_DISK);
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_normalize_machine_name() {
        assert_eq!(normalize_machine_name("Shoot-Worker-ABC"), "shoot-worker-abc");
    }
}
