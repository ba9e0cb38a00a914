use std::time::Duration;

use anyhow::{bail, Context, Result};
use azmachine_models::MachineSecret;

/// Which backend the orchestrations talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Azure Resource Manager
    Arm,
    /// In-process fake cloud
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "arm" | "azure" => Ok(BackendKind::Arm),
            "memory" | "fake" => Ok(BackendKind::Memory),
            other => bail!("unknown backend '{}', expected 'arm' or 'memory'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub backend: BackendKind,
    pub arm_endpoint: String,
    pub authority_host: String,
    pub poll_interval: Duration,
    pub api_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server_host: std::env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            backend: std::env::var("AZMACHINE_BACKEND")
                .unwrap_or_else(|_| "arm".to_string())
                .parse()
                .context("AZMACHINE_BACKEND is invalid")?,
            arm_endpoint: std::env::var("ARM_ENDPOINT")
                .unwrap_or_else(|_| "https://management.azure.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            authority_host: std::env::var("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|_| "https://login.microsoftonline.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            poll_interval: Duration::from_secs(
                std::env::var("ARM_POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("ARM_POLL_INTERVAL_SECS must be a number of seconds")?,
            ),
            api_url: std::env::var("AZMACHINE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        })
    }
}

/// Reads the credential bundle from the environment
pub fn secret_from_env() -> Result<MachineSecret> {
    Ok(MachineSecret {
        subscription_id: std::env::var("AZURE_SUBSCRIPTION_ID")
            .context("AZURE_SUBSCRIPTION_ID must be set")?,
        tenant_id: std::env::var("AZURE_TENANT_ID")
            .context("AZURE_TENANT_ID must be set")?,
        client_id: std::env::var("AZURE_CLIENT_ID")
            .context("AZURE_CLIENT_ID must be set")?,
        client_secret: std::env::var("AZURE_CLIENT_SECRET")
            .context("AZURE_CLIENT_SECRET must be set")?,
        user_data: std::env::var("AZMACHINE_USER_DATA").unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("arm".parse::<BackendKind>().unwrap(), BackendKind::Arm);
        assert_eq!("Memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("gcp".parse::<BackendKind>().is_err());
    }
}
