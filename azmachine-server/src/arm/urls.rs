//! Resource URLs for the Azure Resource Manager REST API

use azmachine_orchestrations::resources::{ImageUrn, Plan};

pub const COMPUTE_API_VERSION: &str = "2023-03-01";
pub const DISK_API_VERSION: &str = "2023-04-02";
pub const NETWORK_API_VERSION: &str = "2023-05-01";
pub const MARKETPLACE_API_VERSION: &str = "2021-01-01";

#[derive(Debug, Clone)]
pub struct ArmUrls {
    endpoint: String,
    subscription_id: String,
}

impl ArmUrls {
    pub fn new(endpoint: &str, subscription_id: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_id: subscription_id.to_string(),
        }
    }

    fn subscription(&self) -> String {
        format!("{}/subscriptions/{}", self.endpoint, self.subscription_id)
    }

    fn resource(&self, resource_group: &str, provider_path: &str, api_version: &str) -> String {
        format!(
            "{}/resourceGroups/{}/providers/{}?api-version={}",
            self.subscription(),
            resource_group,
            provider_path,
            api_version
        )
    }

    pub fn subnet(&self, resource_group: &str, vnet_name: &str, subnet_name: &str) -> String {
        self.resource(
            resource_group,
            &format!("Microsoft.Network/virtualNetworks/{}/subnets/{}", vnet_name, subnet_name),
            NETWORK_API_VERSION,
        )
    }

    pub fn network_interface(&self, resource_group: &str, name: &str) -> String {
        self.resource(
            resource_group,
            &format!("Microsoft.Network/networkInterfaces/{}", name),
            NETWORK_API_VERSION,
        )
    }

    pub fn virtual_machine(&self, resource_group: &str, name: &str) -> String {
        self.resource(
            resource_group,
            &format!("Microsoft.Compute/virtualMachines/{}", name),
            COMPUTE_API_VERSION,
        )
    }

    pub fn disk(&self, resource_group: &str, name: &str) -> String {
        self.resource(
            resource_group,
            &format!("Microsoft.Compute/disks/{}", name),
            DISK_API_VERSION,
        )
    }

    fn image_versions_path(&self, location: &str, urn: &ImageUrn) -> String {
        format!(
            "{}/providers/Microsoft.Compute/locations/{}/publishers/{}/artifacttypes/vmimage/offers/{}/skus/{}/versions",
            self.subscription(),
            location,
            urn.publisher,
            urn.offer,
            urn.sku
        )
    }

    /// A single image version. `latest` must be resolved first.
    pub fn image_version(&self, location: &str, urn: &ImageUrn, version: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.image_versions_path(location, urn),
            version,
            COMPUTE_API_VERSION
        )
    }

    /// Every published version of the image, in no particular order
    pub fn image_versions(&self, location: &str, urn: &ImageUrn) -> String {
        format!(
            "{}?api-version={}",
            self.image_versions_path(location, urn),
            COMPUTE_API_VERSION
        )
    }

    pub fn marketplace_agreement(&self, plan: &Plan) -> String {
        format!(
            "{}/providers/Microsoft.MarketplaceOrdering/offerTypes/virtualmachine/publishers/{}/offers/{}/plans/{}/agreements/current?api-version={}",
            self.subscription(),
            plan.publisher,
            plan.product,
            plan.name,
            MARKETPLACE_API_VERSION
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> ArmUrls {
        ArmUrls::new("https://management.azure.com/", "sub-1")
    }

    #[test]
    fn test_network_urls() {
        assert_eq!(
            urls().subnet("net-rg", "vnet", "subnet-a"),
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/net-rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/subnet-a?api-version=2023-05-01"
        );
        assert_eq!(
            urls().network_interface("rg", "vm-1-nic"),
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/vm-1-nic?api-version=2023-05-01"
        );
    }

    #[test]
    fn test_compute_urls() {
        assert_eq!(
            urls().virtual_machine("rg", "vm-1"),
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm-1?api-version=2023-03-01"
        );
        assert_eq!(
            urls().disk("rg", "vm-1-os-disk"),
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/disks/vm-1-os-disk?api-version=2023-04-02"
        );
    }

    #[test]
    fn test_image_urls() {
        let urn = ImageUrn::parse("Canonical:UbuntuServer:18.04-LTS:latest").unwrap();
        assert_eq!(
            urls().image_version("westeurope", &urn, "18.04.202401010"),
            "https://management.azure.com/subscriptions/sub-1/providers/Microsoft.Compute/locations/westeurope/publishers/Canonical/artifacttypes/vmimage/offers/UbuntuServer/skus/18.04-LTS/versions/18.04.202401010?api-version=2023-03-01"
        );
        assert!(urls()
            .image_versions("westeurope", &urn)
            .ends_with("/skus/18.04-LTS/versions?api-version=2023-03-01"));
    }

    #[test]
    fn test_marketplace_url() {
        let plan = Plan {
            name: "flatcar-pro".to_string(),
            product: "flatcar-container-linux".to_string(),
            publisher: "kinvolk".to_string(),
        };
        assert_eq!(
            urls().marketplace_agreement(&plan),
            "https://management.azure.com/subscriptions/sub-1/providers/Microsoft.MarketplaceOrdering/offerTypes/virtualmachine/publishers/kinvolk/offers/flatcar-container-linux/plans/flatcar-pro/agreements/current?api-version=2021-01-01"
        );
    }
}
