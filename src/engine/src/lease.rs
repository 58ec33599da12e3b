//! Lease renew and revoke handlers
//!
//! Issued credentials carry a [`CredentialHandle`] as their internal data. It
//! is decoded once here; renewal re-reads the role for fresh TTLs and
//! revocation deletes the remote resources it names.

use crate::account;
use crate::config::ConfigStore;
use crate::error::{EngineError, Result};
use crate::roles::{RoleEntry, RoleStore};
use crate::session::SessionCache;
use crate::worker;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Secret type of an issued credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Account,
    Worker,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::Account => f.write_str("account"),
            CredentialKind::Worker => f.write_str("worker"),
        }
    }
}

/// Identifiers needed to renew or revoke an issued credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CredentialHandle {
    Account {
        role: String,
        account_id: String,
        user_id: String,
    },
    Worker {
        role: String,
        worker_id: String,
    },
}

impl CredentialHandle {
    pub fn kind(&self) -> CredentialKind {
        match self {
            CredentialHandle::Account { .. } => CredentialKind::Account,
            CredentialHandle::Worker { .. } => CredentialKind::Worker,
        }
    }

    /// Role the credential was issued under
    pub fn role(&self) -> &str {
        match self {
            CredentialHandle::Account { role, .. } | CredentialHandle::Worker { role, .. } => role,
        }
    }

    pub fn to_internal_data(&self) -> Value {
        // A tagged enum of plain strings always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode internal data for a secret of type `kind`.
    ///
    /// Missing, empty or wrong-typed fields are an error, as is internal data
    /// tagged with a different kind.
    pub fn decode(kind: CredentialKind, internal_data: &Value) -> Result<Self> {
        let mut object = internal_data
            .as_object()
            .cloned()
            .ok_or_else(|| EngineError::InvalidInternalData("expected an object".to_string()))?;

        match object.get("kind") {
            None => {
                object.insert("kind".to_string(), serde_json::to_value(kind)?);
            }
            Some(tag) if tag == &serde_json::to_value(kind)? => {}
            Some(tag) => {
                return Err(EngineError::InvalidInternalData(format!(
                    "secret of type {} carries internal data of kind {}",
                    kind, tag
                )))
            }
        }

        let handle: CredentialHandle = serde_json::from_value(Value::Object(object))
            .map_err(|e| EngineError::InvalidInternalData(e.to_string()))?;

        let (role, ids) = match &handle {
            CredentialHandle::Account {
                role,
                account_id,
                user_id,
            } => (role, vec![("account_id", account_id), ("user_id", user_id)]),
            CredentialHandle::Worker { role, worker_id } => (role, vec![("worker_id", worker_id)]),
        };
        if role.is_empty() {
            return Err(EngineError::InvalidInternalData("role is empty".to_string()));
        }
        for (field, id) in ids {
            if id.is_empty() {
                return Err(EngineError::InvalidInternalData(format!("{} is empty", field)));
            }
            if !is_resource_id(id) {
                return Err(EngineError::InvalidInternalData(format!(
                    "{} {:?} is not a boundary resource id",
                    field, id
                )));
            }
        }

        Ok(handle)
    }
}

/// Boundary ids are a type prefix and a suffix joined by `_`, e.g. `u_1234567890`
fn is_resource_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lease durations handed back to the lease layer; zero means system default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseTtl {
    pub ttl: Duration,
    pub max_ttl: Duration,
}

impl From<&RoleEntry> for LeaseTtl {
    fn from(role: &RoleEntry) -> Self {
        Self {
            ttl: role.ttl,
            max_ttl: role.max_ttl,
        }
    }
}

/// TTLs for a renewal, taken from the role as it is now
pub async fn renew(roles: &RoleStore, handle: &CredentialHandle) -> Result<LeaseTtl> {
    let role = roles
        .get(handle.role())
        .await?
        .ok_or_else(|| EngineError::RoleNotFound(handle.role().to_string()))?;

    Ok(LeaseTtl::from(&role))
}

/// Delete the remote resources named by `handle`
pub async fn revoke(
    sessions: &SessionCache,
    configs: &ConfigStore,
    handle: &CredentialHandle,
) -> Result<()> {
    let session = sessions.acquire(configs).await?;

    match handle {
        CredentialHandle::Account {
            account_id,
            user_id,
            ..
        } => account::delete_account(&session, account_id, user_id).await?,
        CredentialHandle::Worker { worker_id, .. } => {
            worker::delete_worker(&session, worker_id).await?
        }
    }

    info!(kind = %handle.kind(), role = handle.role(), "Lease revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handle_round_trip() {
        let handle = CredentialHandle::Account {
            role: "r1".into(),
            account_id: "acctpw_1".into(),
            user_id: "u_1".into(),
        };
        let data = handle.to_internal_data();
        assert_eq!(data["kind"], "account");
        assert_eq!(
            CredentialHandle::decode(CredentialKind::Account, &data).unwrap(),
            handle
        );
    }

    #[test]
    fn test_decode_fills_missing_tag() {
        let data = json!({ "role": "w", "worker_id": "w_1" });
        let handle = CredentialHandle::decode(CredentialKind::Worker, &data).unwrap();
        assert_eq!(handle.kind(), CredentialKind::Worker);
        assert_eq!(handle.role(), "w");
    }

    #[test]
    fn test_decode_rejects_bad_data() {
        let cases = [
            (CredentialKind::Account, json!({ "role": "r1", "user_id": "u_1" })),
            (CredentialKind::Account, json!({ "role": "r1", "account_id": 7, "user_id": "u_1" })),
            (CredentialKind::Account, json!({ "role": "r1", "account_id": "", "user_id": "u_1" })),
            (CredentialKind::Worker, json!({ "kind": "account", "role": "r1", "worker_id": "w" })),
            (CredentialKind::Worker, json!("w_1")),
            (CredentialKind::Worker, json!({ "role": "r1", "worker_id": "w_1?x=1#" })),
            (
                CredentialKind::Account,
                json!({ "role": "r1", "account_id": "acctpw_1", "user_id": "u_1/../../roles/r_admin" }),
            ),
            (
                CredentialKind::Account,
                json!({ "role": "r1", "account_id": "acctpw 1", "user_id": "u_1" }),
            ),
        ];

        for (kind, data) in cases {
            let err = CredentialHandle::decode(kind, &data).unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidInternalData(_)),
                "unexpected error for {}: {:?}",
                data,
                err
            );
        }
    }
}
