//! Turns data disk descriptors into attachments for the VM definition

use azmachine_models::{DataDiskDescriptor, DiskCreateOption};

use crate::names::{data_disk_prefix, dependency_name_from_vm_name_and_dependency, effective_lun};
use crate::resources::DataDisk;

/// Builds one attachment per descriptor, in order. Disks are always created
/// empty; attaching existing disks or restoring from snapshots is not supported.
pub fn generate_data_disks(vm_name: &str, suffix: &str, descriptors: &[DataDiskDescriptor]) -> Vec<DataDisk> {
    descriptors
        .iter()
        .enumerate()
        .map(|(i, descriptor)| {
            let lun = effective_lun(descriptor, i);
            let prefix = data_disk_prefix(descriptor.name.as_deref(), lun);

            DataDisk {
                lun,
                name: dependency_name_from_vm_name_and_dependency(&prefix, vm_name, suffix),
                caching: descriptor.caching.unwrap_or_default(),
                storage_account_type: descriptor.storage_account_type.clone(),
                disk_size_gb: descriptor.disk_size_gb,
                create_option: DiskCreateOption::Empty,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{suffixes, DependentResourceNames};
    use azmachine_models::CachingType;

    fn descriptor(name: Option<&str>, lun: Option<i32>, caching: Option<CachingType>) -> DataDiskDescriptor {
        DataDiskDescriptor {
            name: name.map(str::to_string),
            lun,
            disk_size_gb: 50,
            caching,
            storage_account_type: "StandardSSD_LRS".to_string(),
        }
    }

    #[test]
    fn test_empty_input_yields_no_disks() {
        assert!(generate_data_disks("vm-1", suffixes::DATA_DISK, &[]).is_empty());
    }

    #[test]
    fn test_positional_luns() {
        let disks = generate_data_disks(
            "vm-1",
            suffixes::DATA_DISK,
            &[descriptor(None, None, None), descriptor(None, None, None), descriptor(None, None, None)],
        );
        let luns: Vec<i32> = disks.iter().map(|d| d.lun).collect();
        assert_eq!(luns, vec![0, 1, 2]);
        assert_eq!(disks[0].name, "vm-1-0-data-disk");
        assert_eq!(disks[2].name, "vm-1-2-data-disk");
    }

    #[test]
    fn test_explicit_and_mixed_luns() {
        let disks = generate_data_disks(
            "vm-1",
            suffixes::DATA_DISK,
            &[
                descriptor(Some("etcd"), Some(9), None),
                descriptor(None, None, None),
                descriptor(None, Some(4), None),
            ],
        );
        let luns: Vec<i32> = disks.iter().map(|d| d.lun).collect();
        assert_eq!(luns, vec![9, 1, 4]);
        assert_eq!(disks[0].name, "vm-1-etcd-9-data-disk");
        assert_eq!(disks[1].name, "vm-1-1-data-disk");
        assert_eq!(disks[2].name, "vm-1-4-data-disk");
    }

    #[test]
    fn test_caching_defaults_and_pass_through() {
        let disks = generate_data_disks(
            "vm-1",
            suffixes::DATA_DISK,
            &[
                descriptor(None, None, None),
                descriptor(None, None, Some(CachingType::ReadOnly)),
            ],
        );
        assert_eq!(disks[0].caching, CachingType::None);
        assert_eq!(disks[1].caching, CachingType::ReadOnly);
        assert!(disks.iter().all(|d| d.create_option == DiskCreateOption::Empty));
        assert!(disks.iter().all(|d| d.disk_size_gb == 50 && d.storage_account_type == "StandardSSD_LRS"));
    }

    #[test]
    fn test_names_agree_with_teardown_names() {
        let descriptors = [descriptor(Some("logs"), None, None), descriptor(None, Some(3), None)];
        let built: Vec<String> = generate_data_disks("vm-1", suffixes::DATA_DISK, &descriptors)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(built, DependentResourceNames::new("vm-1", &descriptors).data_disk_names);
    }
}
