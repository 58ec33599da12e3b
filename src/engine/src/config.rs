//! Backend configuration record
//!
//! Holds the credentials the engine uses to log in to the Boundary controller.

use crate::error::{EngineError, Result};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Storage key of the configuration record
pub const CONFIG_STORAGE_KEY: &str = "config";

/// Prefix of password auth-method ids
pub const PASSWORD_AUTH_METHOD_PREFIX: &str = "ampw_";

/// Minimum configuration required to authenticate against Boundary
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Login name of the managing account
    pub login_name: String,

    /// Password of the managing account
    pub password: String,

    /// Address of the Boundary controller
    pub addr: String,

    /// Password auth-method used to sign in
    pub auth_method_id: String,
}

impl fmt::Debug for BoundaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryConfig")
            .field("login_name", &self.login_name)
            .field("password", &"<redacted>")
            .field("addr", &self.addr)
            .field("auth_method_id", &self.auth_method_id)
            .finish()
    }
}

impl BoundaryConfig {
    /// Ensure every field needed for the login handshake is present
    pub fn validate(&self) -> Result<()> {
        if self.login_name.is_empty() {
            return Err(EngineError::Configuration("login name was not defined".to_string()));
        }
        if self.password.is_empty() {
            return Err(EngineError::Configuration("password was not defined".to_string()));
        }
        if self.addr.is_empty() {
            return Err(EngineError::Configuration(
                "boundary address was not defined".to_string(),
            ));
        }
        if self.auth_method_id.is_empty() {
            return Err(EngineError::Configuration(
                "auth-method ID was not defined".to_string(),
            ));
        }
        Ok(())
    }

    /// Configuration as it may be shown to operators
    pub fn to_view(&self) -> ConfigView {
        ConfigView {
            login_name: self.login_name.clone(),
            addr: self.addr.clone(),
            auth_method_id: self.auth_method_id.clone(),
        }
    }
}

/// Readable configuration (the password is never returned)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigView {
    pub login_name: String,
    pub addr: String,
    pub auth_method_id: String,
}

/// Fields supplied by a configuration write
#[derive(Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    pub login_name: Option<String>,
    pub password: Option<String>,
    pub addr: Option<String>,
    pub auth_method_id: Option<String>,
}

impl ConfigUpdate {
    /// Merge into `existing`, or build a new record when `create` is set.
    ///
    /// Creation requires every field. Updates require an existing record.
    pub fn apply(self, existing: Option<BoundaryConfig>, create: bool) -> Result<BoundaryConfig> {
        let mut config = match existing {
            Some(config) => config,
            None if create => BoundaryConfig::default(),
            None => {
                return Err(EngineError::Configuration(
                    "config not found during update operation".to_string(),
                ))
            }
        };

        match self.login_name {
            Some(login_name) => config.login_name = login_name,
            None if create => return Err(missing("login_name")),
            None => {}
        }

        match self.addr {
            Some(addr) => config.addr = addr,
            None if create => return Err(missing("addr")),
            None => {}
        }

        match self.password {
            Some(password) => config.password = password,
            None if create => return Err(missing("password")),
            None => {}
        }

        match self.auth_method_id {
            Some(id) if id.starts_with(PASSWORD_AUTH_METHOD_PREFIX) => config.auth_method_id = id,
            Some(_) => {
                return Err(EngineError::Configuration(
                    "invalid auth_method_id type, must be a password auth method".to_string(),
                ))
            }
            None if create => return Err(missing("auth_method_id")),
            None => {}
        }

        Ok(config)
    }
}

fn missing(field: &str) -> EngineError {
    EngineError::Configuration(format!("missing {} in configuration", field))
}

/// Typed access to the configuration record
#[derive(Clone)]
pub struct ConfigStore {
    storage: Arc<dyn Storage>,
}

impl ConfigStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn get(&self) -> Result<Option<BoundaryConfig>> {
        match self.storage.get(CONFIG_STORAGE_KEY).await? {
            Some(bytes) => {
                let config = serde_json::from_slice(&bytes).map_err(|e| {
                    EngineError::Storage(format!("error reading root configuration: {}", e))
                })?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    pub async fn put(&self, config: &BoundaryConfig) -> Result<()> {
        let bytes = serde_json::to_vec(config)?;
        self.storage.put(CONFIG_STORAGE_KEY, bytes).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.storage.delete(CONFIG_STORAGE_KEY).await
    }
}
