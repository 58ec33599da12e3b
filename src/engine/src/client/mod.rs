//! Boundary controller API client
//!
//! [`BoundaryApi`] is the subset of the controller API the engine drives.
//! [`http::HttpBoundaryClient`] talks to a real controller;
//! [`memory::InMemoryBoundary`] keeps the same resources in process.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

pub use http::{HttpBoundaryClient, HttpClientFactory};
pub use memory::{InMemoryBoundary, InMemoryClientFactory};

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors returned by the controller API
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The addressed resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The controller rejected the request
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Transport failures and server-side errors may succeed on retry
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result of the login handshake
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthenticationResult {
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub auth_method_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub scope_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub account_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub principal_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    #[serde(default)]
    pub scope_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub controller_generated_activation_token: String,
}

/// Controller operations used by the engine
///
/// Calls made after [`BoundaryApi::set_token`] are authenticated with that
/// token.
#[async_trait]
pub trait BoundaryApi: Send + Sync {
    /// Run the password `login` command against an auth method
    async fn authenticate(
        &self,
        auth_method_id: &str,
        login_name: &str,
        password: &str,
    ) -> ClientResult<AuthenticationResult>;

    /// Attach the token used by subsequent calls
    fn set_token(&self, token: &str);

    async fn create_account(
        &self,
        auth_method_id: &str,
        login_name: &str,
        password: &str,
    ) -> ClientResult<Account>;

    async fn delete_account(&self, account_id: &str) -> ClientResult<()>;

    async fn create_user(&self, scope_id: &str, name: &str) -> ClientResult<User>;

    /// Associate accounts with a user; `version` must match the user's current version
    async fn add_accounts(
        &self,
        user_id: &str,
        version: u32,
        account_ids: &[String],
    ) -> ClientResult<User>;

    async fn delete_user(&self, user_id: &str) -> ClientResult<()>;

    async fn read_role(&self, role_id: &str) -> ClientResult<Role>;

    /// Add principals to a role; `version` must match the role's current version
    async fn add_principals(
        &self,
        role_id: &str,
        version: u32,
        principal_ids: &[String],
    ) -> ClientResult<Role>;

    async fn create_controller_led_worker(
        &self,
        scope_id: &str,
        name: &str,
        description: &str,
    ) -> ClientResult<Worker>;

    async fn delete_worker(&self, worker_id: &str) -> ClientResult<()>;
}

/// Builds unauthenticated clients bound to a controller address
pub trait ClientFactory: Send + Sync {
    fn build(&self, addr: &str) -> ClientResult<Arc<dyn BoundaryApi>>;
}
