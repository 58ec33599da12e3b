//! Secrets backend
//!
//! Ties the config and role stores, the session cache and the provisioners
//! together behind the operations the HTTP layer and lease layer call.

use crate::account::{self, IssuedAccountCredential};
use crate::client::ClientFactory;
use crate::config::{BoundaryConfig, ConfigStore, ConfigUpdate, ConfigView};
use crate::error::{EngineError, Result};
use crate::generator;
use crate::lease::{self, CredentialHandle, CredentialKind, LeaseTtl};
use crate::roles::{normalize_role_name, CredentialType, RoleEntry, RoleStore, RoleUpdate};
use crate::session::SessionCache;
use crate::storage::Storage;
use crate::worker::{self, IssuedWorkerCredential};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// A credential plus what the lease layer needs to track it
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSecret<T> {
    pub data: T,
    pub handle: CredentialHandle,
    pub lease: LeaseTtl,
}

impl<T> IssuedSecret<T> {
    /// Internal data to store with the lease
    pub fn internal_data(&self) -> Value {
        self.handle.to_internal_data()
    }
}

/// Credential issued for a role of either kind
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IssuedCredential {
    Account(IssuedSecret<IssuedAccountCredential>),
    Worker(IssuedSecret<IssuedWorkerCredential>),
}

impl IssuedCredential {
    pub fn kind(&self) -> CredentialKind {
        match self {
            IssuedCredential::Account(_) => CredentialKind::Account,
            IssuedCredential::Worker(_) => CredentialKind::Worker,
        }
    }

    pub fn handle(&self) -> &CredentialHandle {
        match self {
            IssuedCredential::Account(secret) => &secret.handle,
            IssuedCredential::Worker(secret) => &secret.handle,
        }
    }

    pub fn lease(&self) -> LeaseTtl {
        match self {
            IssuedCredential::Account(secret) => secret.lease,
            IssuedCredential::Worker(secret) => secret.lease,
        }
    }
}

/// Boundary secrets backend
pub struct BoundaryBackend {
    configs: ConfigStore,
    roles: RoleStore,
    sessions: SessionCache,
    /// Serializes config writers so each decides from the record it read
    config_write: Mutex<()>,
}

impl BoundaryBackend {
    pub fn new(storage: Arc<dyn Storage>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            configs: ConfigStore::new(Arc::clone(&storage)),
            roles: RoleStore::new(storage),
            sessions: SessionCache::new(factory),
            config_write: Mutex::new(()),
        }
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub async fn read_config(&self) -> Result<Option<ConfigView>> {
        Ok(self.configs.get().await?.map(|config| config.to_view()))
    }

    /// Create (`create = true`) or update the configuration.
    ///
    /// The cached session is dropped before this returns.
    pub async fn write_config(&self, update: ConfigUpdate, create: bool) -> Result<BoundaryConfig> {
        self.store_config(update, Some(create)).await
    }

    /// Update the configuration if one exists, otherwise create it
    pub async fn upsert_config(&self, update: ConfigUpdate) -> Result<BoundaryConfig> {
        self.store_config(update, None).await
    }

    /// `create = None` creates exactly when no record was read
    async fn store_config(&self, update: ConfigUpdate, create: Option<bool>) -> Result<BoundaryConfig> {
        let _guard = self.config_write.lock().await;
        let existing = self.configs.get().await?;
        let create = create.unwrap_or(existing.is_none());
        let config = update.apply(existing, create)?;
        self.configs.put(&config).await?;
        self.sessions.invalidate().await;

        info!(addr = %config.addr, auth_method = %config.auth_method_id, "Configuration written");
        Ok(config)
    }

    /// Delete the configuration and drop the cached session
    pub async fn delete_config(&self) -> Result<()> {
        let _guard = self.config_write.lock().await;
        self.configs.delete().await?;
        self.sessions.invalidate().await;
        info!("Configuration deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    pub async fn read_role(&self, name: &str) -> Result<Option<RoleEntry>> {
        self.roles.get(name).await
    }

    /// Create or update a role. Creation fails if required fields are missing;
    /// an invalid result is rejected before anything is stored.
    pub async fn write_role(&self, name: &str, update: RoleUpdate, create: bool) -> Result<RoleEntry> {
        let name = normalize_role_name(name)?;
        let existing = self.roles.get(&name).await?;
        if existing.is_none() && !create {
            return Err(EngineError::RoleNotFound(name));
        }

        let role = update.apply(&name, existing)?;
        self.roles.put(&role).await?;

        info!(role = %role.name, kind = ?role.credential_type, "Role written");
        Ok(role)
    }

    pub async fn delete_role(&self, name: &str) -> Result<()> {
        self.roles.delete(name).await?;
        info!(role = name, "Role deleted");
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<String>> {
        self.roles.list().await
    }

    async fn require_role(&self, name: &str) -> Result<RoleEntry> {
        self.roles
            .get(name)
            .await?
            .ok_or_else(|| EngineError::RoleNotFound(name.to_string()))
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    /// Issue a credential of whatever kind the role produces
    pub async fn issue_credential(&self, role_name: &str) -> Result<IssuedCredential> {
        let role = self.require_role(role_name).await?;
        match role.credential_type {
            CredentialType::UserPass => self.issue_account(&role).await.map(IssuedCredential::Account),
            CredentialType::Worker => self.issue_worker(&role).await.map(IssuedCredential::Worker),
        }
    }

    pub async fn issue_account_credential(
        &self,
        role_name: &str,
    ) -> Result<IssuedSecret<IssuedAccountCredential>> {
        let role = self.require_role(role_name).await?;
        if role.credential_type != CredentialType::UserPass {
            return Err(EngineError::InvalidRole(format!(
                "role {} does not issue accounts",
                role.name
            )));
        }
        self.issue_account(&role).await
    }

    pub async fn issue_worker_credential(
        &self,
        role_name: &str,
    ) -> Result<IssuedSecret<IssuedWorkerCredential>> {
        let role = self.require_role(role_name).await?;
        if role.credential_type != CredentialType::Worker {
            return Err(EngineError::InvalidRole(format!(
                "role {} does not issue workers",
                role.name
            )));
        }
        self.issue_worker(&role).await
    }

    async fn issue_account(&self, role: &RoleEntry) -> Result<IssuedSecret<IssuedAccountCredential>> {
        let session = self.sessions.acquire(&self.configs).await?;
        let credential = account::create_account(
            &session,
            &role.name,
            &role.auth_method_id,
            &role.boundary_roles,
            &role.scope_id,
        )
        .await?;

        Ok(IssuedSecret {
            handle: CredentialHandle::Account {
                role: role.name.clone(),
                account_id: credential.account_id.clone(),
                user_id: credential.user_id.clone(),
            },
            lease: LeaseTtl::from(role),
            data: credential,
        })
    }

    async fn issue_worker(&self, role: &RoleEntry) -> Result<IssuedSecret<IssuedWorkerCredential>> {
        let session = self.sessions.acquire(&self.configs).await?;
        let name = generator::worker_name(&role.name);
        let description = role
            .description
            .clone()
            .unwrap_or_else(|| format!("Worker issued for role {}", role.name));

        let credential = worker::create_worker(&session, &role.scope_id, &name, &description).await?;

        Ok(IssuedSecret {
            handle: CredentialHandle::Worker {
                role: role.name.clone(),
                worker_id: credential.worker_id.clone(),
            },
            lease: LeaseTtl::from(role),
            data: credential,
        })
    }

    // ------------------------------------------------------------------
    // Leases
    // ------------------------------------------------------------------

    /// Renew a lease with the TTLs of its role as currently defined.
    /// Fails if the role has been deleted.
    pub async fn renew(&self, kind: CredentialKind, internal_data: &Value) -> Result<LeaseTtl> {
        let handle = CredentialHandle::decode(kind, internal_data)?;
        lease::renew(&self.roles, &handle).await
    }

    /// Revoke a lease, deleting its remote resources
    pub async fn revoke(&self, kind: CredentialKind, internal_data: &Value) -> Result<()> {
        let handle = CredentialHandle::decode(kind, internal_data)?;
        lease::revoke(&self.sessions, &self.configs, &handle).await
    }
}
