//! Role definitions
//!
//! A role is the local template describing how credentials are provisioned in
//! Boundary: which scope and auth method they land in, which Boundary roles the
//! generated user is granted, and the lease TTLs handed back to callers.

use crate::error::{EngineError, Result};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Storage prefix of role records
pub const ROLE_STORAGE_PREFIX: &str = "role/";

/// Kind of credential a role produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    /// Account + user bound to Boundary roles
    #[default]
    #[serde(rename = "userpass")]
    UserPass,

    /// Controller-led worker registration
    Worker,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Stored role definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub name: String,

    /// Auth method the generated account is created under
    #[serde(default)]
    pub auth_method_id: String,

    /// Scope the generated user or worker is created in
    pub scope_id: String,

    /// Boundary role ids granted to the generated user, in order
    #[serde(default)]
    pub boundary_roles: Vec<String>,

    /// Default lease; zero means the system default
    #[serde(with = "duration_secs", default)]
    pub ttl: Duration,

    /// Maximum lease; zero means the system default
    #[serde(with = "duration_secs", default)]
    pub max_ttl: Duration,

    #[serde(default)]
    pub credential_type: CredentialType,

    /// Description attached to generated workers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RoleEntry {
    /// Check invariants that must hold before the role is persisted
    pub fn validate(&self) -> Result<()> {
        if !self.max_ttl.is_zero() && self.ttl > self.max_ttl {
            return Err(EngineError::InvalidRole(
                "ttl cannot be greater than max_ttl".to_string(),
            ));
        }
        if self.scope_id.is_empty() {
            return Err(EngineError::InvalidRole("missing scope_id in role".to_string()));
        }
        if self.credential_type == CredentialType::UserPass {
            if self.auth_method_id.is_empty() {
                return Err(EngineError::InvalidRole(
                    "missing auth_method_id in role".to_string(),
                ));
            }
            if self.boundary_roles.is_empty() {
                return Err(EngineError::InvalidRole(
                    "missing boundary_roles in role".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Boundary role ids joined the way they are reported back to callers
    pub fn boundary_roles_string(&self) -> String {
        self.boundary_roles.join(",")
    }
}

/// Boundary role ids as accepted on input: `"r1,r2"` or `["r1", "r2"]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BoundaryRoles {
    Joined(String),
    List(Vec<String>),
}

impl BoundaryRoles {
    pub fn into_vec(self) -> Vec<String> {
        let items = match self {
            BoundaryRoles::Joined(joined) => {
                joined.split(',').map(str::to_string).collect::<Vec<_>>()
            }
            BoundaryRoles::List(list) => list,
        };
        items
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

/// Fields supplied by a role write
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleUpdate {
    pub boundary_roles: Option<BoundaryRoles>,
    pub auth_method_id: Option<String>,
    pub scope_id: Option<String>,
    /// Seconds
    pub ttl: Option<u64>,
    /// Seconds
    pub max_ttl: Option<u64>,
    pub credential_type: Option<CredentialType>,
    pub description: Option<String>,
}

impl RoleUpdate {
    /// Merge into `existing` (or a fresh role) and validate the result
    pub fn apply(self, name: &str, existing: Option<RoleEntry>) -> Result<RoleEntry> {
        let mut role = existing.unwrap_or_else(|| RoleEntry {
            name: name.to_string(),
            auth_method_id: String::new(),
            scope_id: String::new(),
            boundary_roles: Vec::new(),
            ttl: Duration::ZERO,
            max_ttl: Duration::ZERO,
            credential_type: CredentialType::default(),
            description: None,
        });
        role.name = name.to_string();

        if let Some(roles) = self.boundary_roles {
            role.boundary_roles = roles.into_vec();
        }
        if let Some(auth_method_id) = self.auth_method_id {
            role.auth_method_id = auth_method_id.to_lowercase();
        }
        if let Some(scope_id) = self.scope_id {
            role.scope_id = scope_id.to_lowercase();
        }
        if let Some(ttl) = self.ttl {
            role.ttl = Duration::from_secs(ttl);
        }
        if let Some(max_ttl) = self.max_ttl {
            role.max_ttl = Duration::from_secs(max_ttl);
        }
        if let Some(credential_type) = self.credential_type {
            role.credential_type = credential_type;
        }
        if let Some(description) = self.description {
            role.description = Some(description);
        }

        role.validate()?;
        Ok(role)
    }
}

/// Normalise a role name: lower-cased, `[a-z0-9_.-]+`
pub fn normalize_role_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(EngineError::InvalidRole("missing role name".to_string()));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid {
        return Err(EngineError::InvalidRole(format!("invalid role name: {}", name)));
    }
    Ok(name.to_ascii_lowercase())
}

/// Typed access to role records
#[derive(Clone)]
pub struct RoleStore {
    storage: Arc<dyn Storage>,
}

impl RoleStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn key(name: &str) -> String {
        format!("{}{}", ROLE_STORAGE_PREFIX, name)
    }

    pub async fn get(&self, name: &str) -> Result<Option<RoleEntry>> {
        let name = normalize_role_name(name)?;
        match self.storage.get(&Self::key(&name)).await? {
            Some(bytes) => {
                let role = serde_json::from_slice(&bytes)
                    .map_err(|e| EngineError::Storage(format!("error decoding role {}: {}", name, e)))?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }

    /// Persist a role. The entry is validated first; nothing is written if
    /// validation fails.
    pub async fn put(&self, role: &RoleEntry) -> Result<()> {
        role.validate()?;
        let name = normalize_role_name(&role.name)?;
        let bytes = serde_json::to_vec(role)?;
        self.storage.put(&Self::key(&name), bytes).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = normalize_role_name(name)?;
        self.storage.delete(&Self::key(&name)).await
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.storage.list(ROLE_STORAGE_PREFIX).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use proptest::prelude::*;

    fn user_role_update() -> RoleUpdate {
        RoleUpdate {
            boundary_roles: Some(BoundaryRoles::Joined("role_abc".to_string())),
            auth_method_id: Some("ampw_1".to_string()),
            scope_id: Some("global".to_string()),
            ttl: Some(120),
            max_ttl: Some(3600),
            ..Default::default()
        }
    }

    #[test]
    fn test_boundary_roles_parsing() {
        let joined = BoundaryRoles::Joined("r_1, r_2,,r_3".to_string()).into_vec();
        assert_eq!(joined, vec!["r_1", "r_2", "r_3"]);

        let list = BoundaryRoles::List(vec!["r_1".into(), " ".into()]).into_vec();
        assert_eq!(list, vec!["r_1"]);
    }

    #[test]
    fn test_boundary_roles_deserialize_either_shape() {
        let joined: RoleUpdate = serde_json::from_str(r#"{"boundary_roles":"a,b"}"#).unwrap();
        assert_eq!(joined.boundary_roles.unwrap().into_vec(), vec!["a", "b"]);

        let list: RoleUpdate = serde_json::from_str(r#"{"boundary_roles":["a","b"]}"#).unwrap();
        assert_eq!(list.boundary_roles.unwrap().into_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_create_user_role_requires_fields() {
        let update = RoleUpdate {
            boundary_roles: None,
            ..user_role_update()
        };
        assert!(update.apply("r1", None).is_err());

        let update = RoleUpdate {
            scope_id: None,
            ..user_role_update()
        };
        assert!(update.apply("r1", None).is_err());
    }

    #[test]
    fn test_worker_role_needs_only_scope() {
        let update = RoleUpdate {
            scope_id: Some("global".to_string()),
            credential_type: Some(CredentialType::Worker),
            ..Default::default()
        };
        let role = update.apply("workers", None).unwrap();
        assert_eq!(role.credential_type, CredentialType::Worker);
    }

    #[test]
    fn test_update_merges_into_existing() {
        let role = user_role_update().apply("r1", None).unwrap();
        let update = RoleUpdate {
            ttl: Some(60),
            ..Default::default()
        };
        let updated = update.apply("r1", Some(role.clone())).unwrap();
        assert_eq!(updated.ttl, Duration::from_secs(60));
        assert_eq!(updated.max_ttl, role.max_ttl);
        assert_eq!(updated.boundary_roles, role.boundary_roles);
    }

    #[test]
    fn test_role_name_normalization() {
        assert_eq!(normalize_role_name("Dev-Ops_1.x").unwrap(), "dev-ops_1.x");
        assert!(normalize_role_name("").is_err());
        assert!(normalize_role_name("a/b").is_err());
    }

    #[test]
    fn test_credential_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&CredentialType::UserPass).unwrap(),
            "\"userpass\""
        );
        assert_eq!(serde_json::to_string(&CredentialType::Worker).unwrap(), "\"worker\"");
    }

    #[tokio::test]
    async fn test_role_store_round_trip() {
        let store = RoleStore::new(Arc::new(InMemoryStorage::new()));
        let role = user_role_update().apply("r1", None).unwrap();
        store.put(&role).await.unwrap();

        let read = store.get("r1").await.unwrap().unwrap();
        assert_eq!(read.ttl, role.ttl);
        assert_eq!(read.max_ttl, role.max_ttl);
        assert_eq!(read.scope_id, role.scope_id);
        assert_eq!(read.auth_method_id, role.auth_method_id);
        assert_eq!(read.boundary_roles, role.boundary_roles);

        assert_eq!(store.list().await.unwrap(), vec!["r1"]);
        store.delete("r1").await.unwrap();
        assert!(store.get("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_role_store_rejects_invalid_ttl_before_write() {
        let store = RoleStore::new(Arc::new(InMemoryStorage::new()));
        let mut role = user_role_update().apply("r1", None).unwrap();
        role.ttl = Duration::from_secs(7200);

        assert!(matches!(store.put(&role).await, Err(EngineError::InvalidRole(_))));
        assert!(store.get("r1").await.unwrap().is_none());
    }

    proptest! {
        #[test]
        fn prop_ttl_bound_enforced(ttl in 0u64..10_000, max_ttl in 0u64..10_000) {
            let update = RoleUpdate {
                ttl: Some(ttl),
                max_ttl: Some(max_ttl),
                ..user_role_update()
            };
            let result = update.apply("r1", None);
            if max_ttl != 0 && ttl > max_ttl {
                prop_assert!(result.is_err());
            } else {
                prop_assert!(result.is_ok());
            }
        }
    }
}
