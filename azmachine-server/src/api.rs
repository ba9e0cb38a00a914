use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use azmachine_models::{MachineSecret, MachineStatus, ProvisioningSpec};
use azmachine_orchestrations::{
    create_machine, delete_machine, get_machine_status, CreateMachineOutput, CreateMachineRequest,
    DeleteMachineOutput, DeleteMachineRequest, ErrorClass, MachineStatusRequest, ProvisionContext,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::Backend;

/// Shared API state
#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    /// Parent of every request's cancellation token; fired on shutdown
    pub shutdown: CancellationToken,
    pub metrics: PrometheusHandle,
}

/// Body of the per-machine routes; the name comes from the path
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineBody {
    pub spec: ProvisioningSpec,
    pub secret: MachineSecret,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .route("/api/machines", post(create_handler))
        .route("/api/machines/:name", delete(delete_handler))
        .route("/api/machines/:name/status", post(status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn start_server(
    host: &str,
    port: u16,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("✓ API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

// ============================================================================
// Health and metrics
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "azmachine",
        "backend": state.backend.name(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render()
}

// ============================================================================
// Machines
// ============================================================================

/// Runs `work` on its own task so a dropped connection cannot abort it
/// halfway through a rollback
async fn run_detached<T, F>(work: F) -> Result<T, AppError>
where
    F: Future<Output = azmachine_orchestrations::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::info_span!("request", id = %Uuid::new_v4());
    match tokio::spawn(work.instrument(span)).await {
        Ok(result) => result.map_err(AppError::from),
        Err(e) => Err(AppError::Internal(format!("worker task failed: {}", e))),
    }
}

fn request_context(state: &AppState, machine: &str) -> ProvisionContext {
    ProvisionContext::new(machine).with_cancellation(state.shutdown.child_token())
}

async fn create_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateMachineRequest>,
) -> Result<(StatusCode, Json<CreateMachineOutput>), AppError> {
    tracing::info!("Create requested for machine {}", request.machine_name);
    let ctx = request_context(&state, &request.machine_name);
    let backend = state.backend.clone();

    let output = run_detached(async move {
        backend.prepare(&request.spec).await;
        create_machine(&ctx, backend.factory(), &request).await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(output)))
}

async fn delete_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<MachineBody>,
) -> Result<Json<DeleteMachineOutput>, AppError> {
    tracing::info!("Delete requested for machine {}", name);
    let ctx = request_context(&state, &name);
    let backend = state.backend.clone();
    let request = DeleteMachineRequest {
        machine_name: name,
        spec: body.spec,
        secret: body.secret,
    };

    let output = run_detached(async move { delete_machine(&ctx, backend.factory(), &request).await }).await?;

    Ok(Json(output))
}

async fn status_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<MachineBody>,
) -> Result<Json<MachineStatus>, AppError> {
    let ctx = request_context(&state, &name);
    let backend = state.backend.clone();
    let request = MachineStatusRequest {
        machine_name: name,
        spec: body.spec,
        secret: body.secret,
    };

    let status = run_detached(async move { get_machine_status(&ctx, backend.factory(), &request).await }).await?;

    Ok(Json(status))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Machine { class: ErrorClass, message: String },
    Internal(String),
}

impl From<azmachine_orchestrations::Error> for AppError {
    fn from(err: azmachine_orchestrations::Error) -> Self {
        AppError::Machine {
            class: err.class(),
            message: err.to_string(),
        }
    }
}

fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::AlreadyExists => StatusCode::CONFLICT,
        ErrorClass::QuotaOrPermission => StatusCode::FORBIDDEN,
        ErrorClass::Transient => StatusCode::SERVICE_UNAVAILABLE,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Machine { class, message } => (status_for(class), message),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use azmachine_orchestrations::fake::FakeCloud;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            backend: Backend::Memory(FakeCloud::new()),
            shutdown: CancellationToken::new(),
            metrics: PrometheusBuilder::new().build_recorder().handle(),
        }
    }

    fn spec() -> Value {
        json!({
            "location": "westeurope",
            "resourceGroup": "rg",
            "subnetInfo": { "vnetName": "vnet", "subnetName": "subnet-a" },
            "vmSize": "Standard_D2s_v3",
            "imageReference": { "urn": "Canonical:UbuntuServer:18.04-LTS:latest" },
            "osDisk": { "storageAccountType": "Premium_LRS", "diskSizeGb": 30 },
            "osProfile": {
                "adminUsername": "core",
                "sshPublicKey": { "path": "/home/core/.ssh/authorized_keys", "keyData": "ssh-rsa AAA" }
            },
            "dataDisks": [{ "diskSizeGb": 50, "storageAccountType": "Standard_LRS" }]
        })
    }

    fn secret() -> Value {
        json!({
            "subscriptionId": "sub",
            "tenantId": "tenant",
            "clientId": "client",
            "clientSecret": "secret",
            "userData": "#cloud-config"
        })
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_class_status_codes() {
        assert_eq!(status_for(ErrorClass::AlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorClass::QuotaOrPermission), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorClass::Transient), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorClass::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorClass::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorClass::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorClass::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health() {
        let response = create_router(state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["backend"], "memory");
    }

    #[tokio::test]
    async fn test_machine_lifecycle() {
        let app = create_router(state());

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/machines",
                json!({ "machineName": "VM-1", "spec": spec(), "secret": secret() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["handle"]["providerId"], "azure:///westeurope/vm-1");
        assert_eq!(created["dataDiskNames"], json!(["vm-1-0-data-disk"]));

        let body = json!({ "spec": spec(), "secret": secret() });
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/machines/vm-1/status", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(Method::DELETE, "/api/machines/vm-1", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["vmDeleted"], true);

        let response = app
            .oneshot(json_request(Method::POST, "/api/machines/vm-1/status", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("vm-1"));
    }

    #[tokio::test]
    async fn test_incomplete_secret_is_a_bad_request() {
        let mut secret = secret();
        secret["clientSecret"] = json!("");

        let response = create_router(state())
            .oneshot(json_request(
                Method::POST,
                "/api/machines",
                json!({ "machineName": "vm-1", "spec": spec(), "secret": secret }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
