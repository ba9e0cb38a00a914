use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use azmachine_models::{MachineSecret, MachineStatus, ProvisioningSpec};
use azmachine_orchestrations::{
    create_machine, delete_machine, get_machine_status, CreateMachineOutput, CreateMachineRequest,
    DeleteMachineOutput, DeleteMachineRequest, MachineStatusRequest, ProvisionContext,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::backend::Backend;
use crate::config::{secret_from_env, Config};

fn read_spec(path: &Path) -> Result<ProvisioningSpec> {
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read spec file {}", path.display()))?;
    ProvisioningSpec::from_json(&raw)
        .with_context(|| format!("Invalid provisioning spec in {}", path.display()))
}

/// Token cancelled on the first Ctrl+C; rollback still runs afterwards
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, rolling back...");
            token.cancel();
        }
    });
    cancel
}

async fn call_api<T: DeserializeOwned>(
    config: &Config,
    method: Method,
    path: &str,
    body: serde_json::Value,
) -> Result<T> {
    let url = format!("{}{}", config.api_url.trim_end_matches('/'), path);
    let response = reqwest::Client::new()
        .request(method, &url)
        .json(&body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to API: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        let error: serde_json::Value = response.json().await.unwrap_or_default();
        let message = error["error"].as_str().unwrap_or("no details");
        anyhow::bail!("API error: {} ({})", status, message);
    }

    Ok(response.json().await?)
}

fn machine_body(spec: &ProvisioningSpec, secret: &MachineSecret) -> serde_json::Value {
    json!({ "spec": spec, "secret": secret })
}

pub async fn run_create(
    name: String,
    spec_path: &Path,
    remote: bool,
    timeout: Option<u64>,
    output: String,
) -> Result<()> {
    let config = Config::load()?;
    let request = CreateMachineRequest {
        machine_name: name,
        spec: read_spec(spec_path)?,
        secret: secret_from_env()?,
    };

    println!("Creating machine '{}' in {}...", request.machine_name, request.spec.location);

    let created: CreateMachineOutput = if remote {
        call_api(
            &config,
            Method::POST,
            "/api/machines",
            serde_json::to_value(&request)?,
        )
        .await?
    } else {
        let backend = Backend::from_config(&config)?;
        backend.prepare(&request.spec).await;

        let mut ctx = ProvisionContext::new(&request.machine_name).with_cancellation(cancel_on_ctrl_c());
        if let Some(secs) = timeout {
            ctx = ctx.with_timeout(Duration::from_secs(secs));
        }

        create_machine(&ctx, backend.factory(), &request)
            .await
            .with_context(|| format!("Failed to create machine '{}'", request.machine_name))?
    };

    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!("✓ Machine created in {}s", created.provisioning_time_seconds);
        println!();
        println!("  Provider ID:  {}", created.handle.provider_id);
        println!("  Resource ID:  {}", created.handle.resource_id);
        println!("  NIC:          {}", created.nic_name);
        println!("  OS disk:      {}", created.os_disk_name);
        if !created.data_disk_names.is_empty() {
            println!("  Data disks:   {}", created.data_disk_names.join(", "));
        }
    }

    Ok(())
}

pub async fn run_delete(name: String, spec_path: &Path, remote: bool) -> Result<()> {
    let config = Config::load()?;
    let request = DeleteMachineRequest {
        machine_name: name,
        spec: read_spec(spec_path)?,
        secret: secret_from_env()?,
    };

    println!("Deleting machine '{}'...", request.machine_name);

    let deleted: DeleteMachineOutput = if remote {
        call_api(
            &config,
            Method::DELETE,
            &format!("/api/machines/{}", request.machine_name),
            machine_body(&request.spec, &request.secret),
        )
        .await?
    } else {
        let backend = Backend::from_config(&config)?;
        let ctx = ProvisionContext::new(&request.machine_name).with_cancellation(cancel_on_ctrl_c());
        delete_machine(&ctx, backend.factory(), &request)
            .await
            .with_context(|| format!("Failed to delete machine '{}'", request.machine_name))?
    };

    if deleted.vm_deleted {
        println!("✓ Machine '{}' and its resources deleted", deleted.machine_name);
    } else {
        println!("✓ No VM named '{}', leftover resources cleaned up", deleted.machine_name);
    }

    Ok(())
}

pub async fn run_status(name: String, spec_path: &Path, remote: bool, output: String) -> Result<()> {
    let config = Config::load()?;
    let request = MachineStatusRequest {
        machine_name: name,
        spec: read_spec(spec_path)?,
        secret: secret_from_env()?,
    };

    let status: MachineStatus = if remote {
        call_api(
            &config,
            Method::POST,
            &format!("/api/machines/{}/status", request.machine_name),
            machine_body(&request.spec, &request.secret),
        )
        .await?
    } else {
        let backend = Backend::from_config(&config)?;
        let ctx = ProvisionContext::new(&request.machine_name);
        get_machine_status(&ctx, backend.factory(), &request)
            .await
            .with_context(|| format!("Failed to get status of machine '{}'", request.machine_name))?
    };

    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Machine: {}", status.handle.node_name);
        println!("{}", "=".repeat(60));
        println!("  Provider ID:         {}", status.handle.provider_id);
        println!("  Resource ID:         {}", status.handle.resource_id);
        println!(
            "  Provisioning state:  {}",
            status.provisioning_state.as_deref().unwrap_or("-")
        );
        println!("  Checked at:          {}", status.checked_at.to_rfc3339());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_spec_reports_path() {
        let err = read_spec(Path::new("/nonexistent/spec.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/spec.json"));
    }
}
