//! Client-credentials token acquisition against Microsoft Entra ID

use std::time::Duration;

use azmachine_models::MachineSecret;
use azmachine_orchestrations::backend::SetupError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Bearer token scoped to the ARM endpoint
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Duration,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

pub fn token_url(authority_host: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/'),
        tenant_id
    )
}

pub fn scope(arm_endpoint: &str) -> String {
    format!("{}/.default", arm_endpoint.trim_end_matches('/'))
}

pub async fn acquire_token(
    http: &reqwest::Client,
    authority_host: &str,
    arm_endpoint: &str,
    secret: &MachineSecret,
) -> Result<AccessToken, SetupError> {
    let scope = scope(arm_endpoint);
    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", secret.client_id.as_str()),
        ("client_secret", secret.client_secret.as_str()),
        ("scope", scope.as_str()),
    ];

    let response = http
        .post(token_url(authority_host, &secret.tenant_id))
        .form(&form)
        .send()
        .await
        .map_err(|e| SetupError::Authentication(format!("token request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| SetupError::Authentication(format!("token response unreadable: {}", e)))?;

    if !status.is_success() {
        return Err(SetupError::Authentication(describe_failure(status.as_u16(), &body)));
    }

    let token: TokenResponse = serde_json::from_slice(&body)
        .map_err(|e| SetupError::Authentication(format!("malformed token response: {}", e)))?;

    Ok(AccessToken {
        token: token.access_token,
        expires_in: Duration::from_secs(token.expires_in.unwrap_or(3600)),
    })
}

fn describe_failure(status: u16, body: &[u8]) -> String {
    match serde_json::from_slice::<TokenError>(body) {
        Ok(err) => match err.error_description {
            Some(description) => format!("HTTP {} ({}): {}", status, err.error, description),
            None => format!("HTTP {} ({})", status, err.error),
        },
        Err(_) => format!("HTTP {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_and_scope() {
        assert_eq!(
            token_url("https://login.microsoftonline.com/", "tenant-1"),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
        assert_eq!(
            scope("https://management.azure.com"),
            "https://management.azure.com/.default"
        );
    }

    #[test]
    fn test_failure_description() {
        let body = br#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret"}"#;
        assert_eq!(
            describe_failure(401, body),
            "HTTP 401 (invalid_client): AADSTS7000215: Invalid client secret"
        );
        assert_eq!(describe_failure(502, b"<html>"), "HTTP 502");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken {
            token: "eyJ0eXAi".to_string(),
            expires_in: Duration::from_secs(60),
        };
        assert!(!format!("{:?}", token).contains("eyJ0eXAi"));
    }
}
