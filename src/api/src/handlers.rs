//! HTTP handlers for configuration, roles, credentials and leases

use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use boundary_secrets_engine::{CredentialKind, EngineError};
use tracing::{debug, info};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

// ============================================================================
// Configuration
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/config",
    responses(
        (status = 200, description = "Current configuration", body = ConfigResponse),
        (status = 404, description = "Backend is not configured"),
    ),
    tag = "config"
)]
pub async fn read_config(State(state): State<AppState>) -> ApiResult<Json<ConfigResponse>> {
    let view = state
        .backend
        .read_config()
        .await?
        .ok_or_else(|| ApiError::NotFound("backend is not configured".to_string()))?;
    Ok(Json(view.into()))
}

/// Create the configuration, or update it if one already exists
#[utoipa::path(
    post,
    path = "/v1/config",
    request_body = ConfigRequest,
    responses(
        (status = 200, description = "Configuration written", body = ConfigResponse),
        (status = 400, description = "Missing or invalid field"),
    ),
    tag = "config"
)]
pub async fn write_config(
    State(state): State<AppState>,
    Json(req): Json<ConfigRequest>,
) -> ApiResult<Json<ConfigResponse>> {
    let config = state.backend.upsert_config(req.into()).await?;
    Ok(Json(config.to_view().into()))
}

/// Update an existing configuration
#[utoipa::path(
    put,
    path = "/v1/config",
    request_body = ConfigRequest,
    responses(
        (status = 200, description = "Configuration updated", body = ConfigResponse),
        (status = 400, description = "No configuration to update or invalid field"),
    ),
    tag = "config"
)]
pub async fn update_config(
    State(state): State<AppState>,
    Json(req): Json<ConfigRequest>,
) -> ApiResult<Json<ConfigResponse>> {
    let config = state.backend.write_config(req.into(), false).await?;
    Ok(Json(config.to_view().into()))
}

#[utoipa::path(
    delete,
    path = "/v1/config",
    responses((status = 204, description = "Configuration deleted")),
    tag = "config"
)]
pub async fn delete_config(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.backend.delete_config().await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Roles
// ============================================================================

#[utoipa::path(
    get,
    path = "/v1/roles",
    responses((status = 200, description = "Role names in sorted order", body = RoleListResponse)),
    tag = "roles"
)]
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Json<RoleListResponse>> {
    let keys = state.backend.list_roles().await?;
    Ok(Json(RoleListResponse { keys }))
}

#[utoipa::path(
    get,
    path = "/v1/roles/{name}",
    params(("name" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Role definition", body = RoleResponse),
        (status = 404, description = "Role not found"),
    ),
    tag = "roles"
)]
pub async fn read_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .backend
        .read_role(&name)
        .await?
        .ok_or(EngineError::RoleNotFound(name))?;
    Ok(Json(role.into()))
}

/// Create a role, merging into it if it already exists
#[utoipa::path(
    post,
    path = "/v1/roles/{name}",
    params(("name" = String, Path, description = "Role name")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role written", body = RoleResponse),
        (status = 400, description = "Invalid role"),
    ),
    tag = "roles"
)]
pub async fn write_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state.backend.write_role(&name, req.into(), true).await?;
    Ok(Json(role.into()))
}

#[utoipa::path(
    put,
    path = "/v1/roles/{name}",
    params(("name" = String, Path, description = "Role name")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 400, description = "Invalid role"),
        (status = 404, description = "Role not found"),
    ),
    tag = "roles"
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state.backend.write_role(&name, req.into(), false).await?;
    Ok(Json(role.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/roles/{name}",
    params(("name" = String, Path, description = "Role name")),
    responses((status = 204, description = "Role deleted")),
    tag = "roles"
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.backend.delete_role(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Credentials and Leases
// ============================================================================

/// Issue a credential for a role
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8200/v1/creds/dev
/// ```
#[utoipa::path(
    post,
    path = "/v1/creds/{name}",
    params(("name" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Credential issued", body = CredentialResponse),
        (status = 404, description = "Role not found"),
        (status = 502, description = "Boundary controller request failed"),
    ),
    tag = "creds"
)]
pub async fn issue_credential(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<CredentialResponse>> {
    debug!(role = %name, "Issuing credential");
    let issued = state.backend.issue_credential(&name).await?;
    let response = CredentialResponse::from_issued(&issued).map_err(EngineError::from)?;
    info!(role = %name, kind = %response.kind, "Credential issued");
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/v1/leases/renew",
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Lease renewed", body = LeaseResponse),
        (status = 400, description = "Invalid internal data"),
        (status = 404, description = "Role no longer exists"),
    ),
    tag = "leases"
)]
pub async fn renew_lease(
    State(state): State<AppState>,
    Json(req): Json<RenewRequest>,
) -> ApiResult<Json<LeaseResponse>> {
    let kind = match req.kind {
        Some(kind) => kind,
        None => req
            .internal_data
            .get("kind")
            .cloned()
            .and_then(|tag| serde_json::from_value::<CredentialKind>(tag).ok())
            .ok_or_else(|| ApiError::BadRequest("missing credential kind".to_string()))?,
    };
    let lease = state.backend.renew(kind, &req.internal_data).await?;
    Ok(Json(lease.into()))
}

#[utoipa::path(
    post,
    path = "/v1/leases/revoke",
    request_body = RevokeRequest,
    responses(
        (status = 204, description = "Lease revoked"),
        (status = 400, description = "Invalid internal data"),
        (status = 502, description = "Boundary controller request failed"),
    ),
    tag = "leases"
)]
pub async fn revoke_lease(
    State(state): State<AppState>,
    Json(req): Json<RevokeRequest>,
) -> ApiResult<StatusCode> {
    state.backend.revoke(req.kind, &req.internal_data).await?;
    Ok(StatusCode::NO_CONTENT)
}
