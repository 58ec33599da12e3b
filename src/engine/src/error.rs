//! Error types for the secrets engine

use crate::client::ClientError;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Step of a remote provisioning sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CreateAccount,
    CreateUser,
    AddAccountToUser,
    ReadRole,
    AddPrincipalToRole,
    CreateWorker,
    DeleteUser,
    DeleteAccount,
    DeleteWorker,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionStep::CreateAccount => "create account",
            ProvisionStep::CreateUser => "create user",
            ProvisionStep::AddAccountToUser => "add account to user",
            ProvisionStep::ReadRole => "read role",
            ProvisionStep::AddPrincipalToRole => "add principal to role",
            ProvisionStep::CreateWorker => "create worker",
            ProvisionStep::DeleteUser => "delete user",
            ProvisionStep::DeleteAccount => "delete account",
            ProvisionStep::DeleteWorker => "delete worker",
        };
        f.write_str(name)
    }
}

/// A remote resource left behind by a partially failed provisioning sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrphanedResource {
    Account(String),
    User(String),
    RoleGrant { role_id: String, user_id: String },
}

impl fmt::Display for OrphanedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrphanedResource::Account(id) => write!(f, "account {}", id),
            OrphanedResource::User(id) => write!(f, "user {}", id),
            OrphanedResource::RoleGrant { role_id, user_id } => {
                write!(f, "principal {} on role {}", user_id, role_id)
            }
        }
    }
}

struct OrphanList<'a>(&'a [OrphanedResource]);

impl fmt::Display for OrphanList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str(" (remote resources may be orphaned: ")?;
        for (i, orphan) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", orphan)?;
        }
        f.write_str(")")
    }
}

/// Secrets engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or invalid backend configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Login rejected or handshake response malformed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A remote create/read/delete step failed
    #[error("Remote step '{step}' failed: {source}{}", OrphanList(.orphaned))]
    RemoteResource {
        step: ProvisionStep,
        #[source]
        source: ClientError,
        orphaned: Vec<OrphanedResource>,
    },

    /// Config or role storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Role does not exist
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Role definition rejected or unusable for the request
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Secret internal data could not be decoded
    #[error("Invalid secret internal data: {0}")]
    InvalidInternalData(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn remote(step: ProvisionStep, source: ClientError) -> Self {
        EngineError::RemoteResource {
            step,
            source,
            orphaned: Vec::new(),
        }
    }

    /// Whether a caller may retry the operation later
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Storage(_) => true,
            EngineError::RemoteResource { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Remote resources that may have been left behind by this failure
    pub fn orphaned(&self) -> &[OrphanedResource] {
        match self {
            EngineError::RemoteResource { orphaned, .. } => orphaned,
            _ => &[],
        }
    }
}

impl From<sled::Error> for EngineError {
    fn from(err: sled::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}
