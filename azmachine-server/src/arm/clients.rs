//! ARM implementations of the backend client traits

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use azmachine_models::MachineSecret;
use azmachine_orchestrations::backend::{
    validate_secret, AzureClients, BackendError, ClientFactory, DiskClient, ImageClient,
    MarketplaceClient, NetworkInterfaceClient, Operation, SetupError, SubnetClient,
    VirtualMachineClient,
};
use azmachine_orchestrations::resources::{
    DataDisk, Disk, ImageUrn, MarketplaceAgreement, NetworkInterface, NetworkInterfaceParams, Plan,
    Subnet, VirtualMachine, VirtualMachineImage, VirtualMachineParams,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::auth::{acquire_token, AccessToken};
use super::poller::{monitor_from_headers, progress_of, retry_after, Monitor, OperationStatus, Progress};
use super::urls::ArmUrls;
use super::wire;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Authenticated connection to one subscription
#[derive(Clone)]
pub struct ArmSession {
    http: reqwest::Client,
    token: AccessToken,
    urls: ArmUrls,
    poll_interval: Duration,
}

impl ArmSession {
    pub fn new(http: reqwest::Client, token: AccessToken, urls: ArmUrls, poll_interval: Duration) -> Self {
        Self {
            http,
            token,
            urls,
            poll_interval,
        }
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response, BackendError> {
        debug!("ARM {} {}", method, url);
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.token.token)
            .timeout(REQUEST_TIMEOUT);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let response = self.send(Method::GET, url, None).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn put_json<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T, BackendError> {
        let response = self.send(Method::PUT, url, Some(body)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Starts a long-running operation and hands back its completion
    async fn begin(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Operation, BackendError> {
        let response = self.send(method, url, body).await?;
        let headers = response.headers();

        match monitor_from_headers(headers) {
            Some(monitor) => {
                let delay = retry_after(headers, self.poll_interval);
                Ok(self.track(monitor, delay))
            }
            None => Ok(Operation::done()),
        }
    }

    fn track(&self, monitor: Monitor, first_delay: Duration) -> Operation {
        let session = self.clone();
        Operation::new(async move { session.poll(monitor, first_delay).await })
    }

    async fn poll(&self, monitor: Monitor, first_delay: Duration) -> Result<(), BackendError> {
        let mut delay = first_delay;
        loop {
            tokio::time::sleep(delay).await;

            match &monitor {
                Monitor::AsyncOperation(url) => {
                    let response = self.send(Method::GET, url, None).await?;
                    delay = retry_after(response.headers(), self.poll_interval);
                    let status: OperationStatus = response
                        .json()
                        .await
                        .map_err(|e| BackendError::Decode(e.to_string()))?;
                    match progress_of(&status) {
                        Progress::Running => continue,
                        Progress::Succeeded => return Ok(()),
                        Progress::Failed(err) => return Err(err),
                    }
                }
                Monitor::Location(url) => {
                    let response = self.send(Method::GET, url, None).await?;
                    if response.status() != StatusCode::ACCEPTED {
                        return Ok(());
                    }
                    delay = retry_after(response.headers(), self.poll_interval);
                }
            }
        }
    }

    async fn latest_image_version(&self, location: &str, urn: &ImageUrn) -> Result<String, BackendError> {
        let versions: Vec<wire::ImageVersionEntry> = self
            .get_json(&self.urls.image_versions(location, urn))
            .await?;
        wire::newest_image_version(versions)
            .ok_or_else(|| BackendError::NotFound(format!("no versions published for image {}", urn)))
    }
}

async fn api_error(response: Response) -> BackendError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<wire::ErrorResponse>(&body) {
        Ok(err) => BackendError::Api {
            status: status.as_u16(),
            code: err.error.code,
            message: err.error.message,
        },
        Err(_) => BackendError::Api {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: String::from_utf8_lossy(&body).into_owned(),
        },
    }
}

#[async_trait]
impl SubnetClient for ArmSession {
    async fn get(&self, resource_group: &str, vnet_name: &str, subnet_name: &str) -> Result<Subnet, BackendError> {
        let subnet: wire::SubnetResponse = self
            .get_json(&self.urls.subnet(resource_group, vnet_name, subnet_name))
            .await?;
        Ok(subnet.into())
    }
}

#[async_trait]
impl NetworkInterfaceClient for ArmSession {
    async fn get(&self, resource_group: &str, name: &str) -> Result<NetworkInterface, BackendError> {
        let nic: wire::NetworkInterfaceResponse = self
            .get_json(&self.urls.network_interface(resource_group, name))
            .await?;
        Ok(nic.into())
    }

    async fn begin_create_or_update(
        &self,
        resource_group: &str,
        params: &NetworkInterfaceParams,
    ) -> Result<Operation, BackendError> {
        let body = wire::network_interface_body(params);
        self.begin(
            Method::PUT,
            &self.urls.network_interface(resource_group, &params.name),
            Some(&body),
        )
        .await
    }

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError> {
        self.begin(Method::DELETE, &self.urls.network_interface(resource_group, name), None)
            .await
    }
}

#[async_trait]
impl VirtualMachineClient for ArmSession {
    async fn get(&self, resource_group: &str, name: &str) -> Result<VirtualMachine, BackendError> {
        let vm: wire::VirtualMachineResponse = self
            .get_json(&self.urls.virtual_machine(resource_group, name))
            .await?;
        Ok(vm.into())
    }

    async fn begin_create_or_update(
        &self,
        resource_group: &str,
        params: &VirtualMachineParams,
    ) -> Result<Operation, BackendError> {
        let body = wire::virtual_machine_body(params);
        self.begin(
            Method::PUT,
            &self.urls.virtual_machine(resource_group, &params.name),
            Some(&body),
        )
        .await
    }

    async fn begin_update_data_disks(
        &self,
        resource_group: &str,
        name: &str,
        data_disks: Vec<DataDisk>,
    ) -> Result<Operation, BackendError> {
        let body = wire::data_disks_patch(&data_disks);
        self.begin(
            Method::PATCH,
            &self.urls.virtual_machine(resource_group, name),
            Some(&body),
        )
        .await
    }

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError> {
        self.begin(Method::DELETE, &self.urls.virtual_machine(resource_group, name), None)
            .await
    }
}

#[async_trait]
impl DiskClient for ArmSession {
    async fn get(&self, resource_group: &str, name: &str) -> Result<Disk, BackendError> {
        let disk: wire::DiskResponse = self.get_json(&self.urls.disk(resource_group, name)).await?;
        Ok(disk.into())
    }

    async fn begin_delete(&self, resource_group: &str, name: &str) -> Result<Operation, BackendError> {
        self.begin(Method::DELETE, &self.urls.disk(resource_group, name), None)
            .await
    }
}

#[async_trait]
impl ImageClient for ArmSession {
    async fn get(&self, location: &str, urn: &ImageUrn) -> Result<VirtualMachineImage, BackendError> {
        let version = if urn.version.eq_ignore_ascii_case("latest") {
            self.latest_image_version(location, urn).await?
        } else {
            urn.version.clone()
        };
        let image: wire::ImageResponse = self
            .get_json(&self.urls.image_version(location, urn, &version))
            .await?;
        Ok(image.into())
    }
}

#[async_trait]
impl MarketplaceClient for ArmSession {
    async fn get(&self, plan: &Plan) -> Result<MarketplaceAgreement, BackendError> {
        let agreement: wire::AgreementResponse = self
            .get_json(&self.urls.marketplace_agreement(plan))
            .await?;
        Ok(agreement.into())
    }

    async fn create(
        &self,
        plan: &Plan,
        agreement: &MarketplaceAgreement,
    ) -> Result<MarketplaceAgreement, BackendError> {
        let body = wire::agreement_body(agreement);
        let created: wire::AgreementResponse = self
            .put_json(&self.urls.marketplace_agreement(plan), &body)
            .await?;
        Ok(created.into())
    }
}

/// Builds ARM sessions from service principal secrets
#[derive(Clone)]
pub struct ArmClientFactory {
    http: reqwest::Client,
    arm_endpoint: String,
    authority_host: String,
    poll_interval: Duration,
}

impl ArmClientFactory {
    pub fn new(arm_endpoint: &str, authority_host: &str, poll_interval: Duration) -> Result<Self, SetupError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("azmachine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SetupError::Config(e.to_string()))?;

        Ok(Self {
            http,
            arm_endpoint: arm_endpoint.trim_end_matches('/').to_string(),
            authority_host: authority_host.trim_end_matches('/').to_string(),
            poll_interval,
        })
    }
}

#[async_trait]
impl ClientFactory for ArmClientFactory {
    async fn setup(&self, secret: &MachineSecret) -> Result<AzureClients, SetupError> {
        validate_secret(secret)?;

        let token = acquire_token(&self.http, &self.authority_host, &self.arm_endpoint, secret).await?;
        debug!("Acquired ARM token for subscription {}", secret.subscription_id);

        let session = Arc::new(ArmSession::new(
            self.http.clone(),
            token,
            ArmUrls::new(&self.arm_endpoint, &secret.subscription_id),
            self.poll_interval,
        ));

        Ok(AzureClients {
            subnet: session.clone(),
            nic: session.clone(),
            vm: session.clone(),
            disk: session.clone(),
            images: session.clone(),
            marketplace: session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_rejects_incomplete_secret_before_network() {
        let factory = ArmClientFactory::new(
            "https://management.azure.com",
            "https://login.microsoftonline.com",
            Duration::from_secs(5),
        )
        .unwrap();
        let secret = MachineSecret {
            subscription_id: "sub".to_string(),
            tenant_id: String::new(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            user_data: String::new(),
        };

        let err = factory.setup(&secret).await.unwrap_err();
        assert_eq!(err, SetupError::MissingField("tenantId"));
    }
}
