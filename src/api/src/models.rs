//! API request and response models

use boundary_secrets_engine::roles::BoundaryRoles;
use boundary_secrets_engine::{
    ConfigUpdate, ConfigView, CredentialKind, CredentialType, IssuedCredential, LeaseTtl,
    RoleEntry, RoleUpdate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ============================================================================
// Health Model
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,

    /// API version
    pub version: String,

    /// Seconds since the server started
    pub uptime_seconds: u64,
}

// ============================================================================
// Configuration Models
// ============================================================================

/// Configuration write; every field is required on create
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConfigRequest {
    pub login_name: Option<String>,
    pub password: Option<String>,
    /// Controller address, e.g. `https://boundary.example.com:9200`
    pub addr: Option<String>,
    /// Password auth method id (`ampw_...`)
    pub auth_method_id: Option<String>,
}

impl From<ConfigRequest> for ConfigUpdate {
    fn from(req: ConfigRequest) -> Self {
        ConfigUpdate {
            login_name: req.login_name,
            password: req.password,
            addr: req.addr,
            auth_method_id: req.auth_method_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigResponse {
    pub login_name: String,
    pub addr: String,
    pub auth_method_id: String,
}

impl From<ConfigView> for ConfigResponse {
    fn from(view: ConfigView) -> Self {
        Self {
            login_name: view.login_name,
            addr: view.addr,
            auth_method_id: view.auth_method_id,
        }
    }
}

// ============================================================================
// Role Models
// ============================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RoleRequest {
    /// Boundary role ids as a list or a comma-separated string
    #[schema(value_type = Option<Vec<String>>)]
    pub boundary_roles: Option<BoundaryRoles>,
    pub auth_method_id: Option<String>,
    pub scope_id: Option<String>,
    /// Default lease in seconds
    pub ttl: Option<u64>,
    /// Maximum lease in seconds
    pub max_ttl: Option<u64>,
    /// `userpass` or `worker`
    #[schema(value_type = Option<String>)]
    pub credential_type: Option<CredentialType>,
    /// Description attached to generated workers
    pub description: Option<String>,
}

impl From<RoleRequest> for RoleUpdate {
    fn from(req: RoleRequest) -> Self {
        RoleUpdate {
            boundary_roles: req.boundary_roles,
            auth_method_id: req.auth_method_id,
            scope_id: req.scope_id,
            ttl: req.ttl,
            max_ttl: req.max_ttl,
            credential_type: req.credential_type,
            description: req.description,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub name: String,
    pub boundary_roles: String,
    pub auth_method_id: String,
    pub scope_id: String,
    pub ttl: u64,
    pub max_ttl: u64,
    pub credential_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<RoleEntry> for RoleResponse {
    fn from(role: RoleEntry) -> Self {
        let credential_type = match role.credential_type {
            CredentialType::UserPass => "userpass",
            CredentialType::Worker => "worker",
        };
        Self {
            boundary_roles: role.boundary_roles_string(),
            name: role.name,
            auth_method_id: role.auth_method_id,
            scope_id: role.scope_id,
            ttl: role.ttl.as_secs(),
            max_ttl: role.max_ttl.as_secs(),
            credential_type: credential_type.to_string(),
            description: role.description,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleListResponse {
    pub keys: Vec<String>,
}

// ============================================================================
// Credential and Lease Models
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaseResponse {
    /// Lease in seconds; zero means the system default
    pub ttl: u64,
    /// Maximum lease in seconds; zero means the system default
    pub max_ttl: u64,
}

impl From<LeaseTtl> for LeaseResponse {
    fn from(lease: LeaseTtl) -> Self {
        Self {
            ttl: lease.ttl.as_secs(),
            max_ttl: lease.max_ttl.as_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialResponse {
    /// `account` or `worker`
    pub kind: String,

    /// Credential fields handed to the caller
    pub data: Value,

    pub lease: LeaseResponse,

    /// Opaque data to pass back on renew and revoke
    pub internal_data: Value,
}

impl CredentialResponse {
    pub fn from_issued(issued: &IssuedCredential) -> serde_json::Result<Self> {
        let data = match issued {
            IssuedCredential::Account(secret) => serde_json::to_value(&secret.data)?,
            IssuedCredential::Worker(secret) => serde_json::to_value(&secret.data)?,
        };
        Ok(Self {
            kind: issued.kind().to_string(),
            data,
            lease: issued.lease().into(),
            internal_data: issued.handle().to_internal_data(),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewRequest {
    /// Taken from `internal_data.kind` when omitted
    #[schema(value_type = Option<String>)]
    pub kind: Option<CredentialKind>,
    pub internal_data: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeRequest {
    #[schema(value_type = String)]
    pub kind: CredentialKind,
    pub internal_data: Value,
}
