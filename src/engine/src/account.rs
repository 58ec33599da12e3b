//! Account provisioning
//!
//! A generated credential is four linked controller resources: a password
//! account, a user, the account-to-user binding, and the user's membership in
//! each configured Boundary role. The controller has no transactions, so a
//! failure part-way leaves earlier resources in place; the returned error
//! lists them.

use crate::client::ClientError;
use crate::error::{EngineError, OrphanedResource, ProvisionStep, Result};
use crate::generator;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Credential returned for a user role
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAccountCredential {
    pub account_id: String,
    pub user_id: String,
    pub auth_method_id: String,
    pub login_name: String,
    pub password: String,
    /// Comma-joined ids of the roles the user was added to
    pub boundary_roles: String,
}

impl fmt::Debug for IssuedAccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedAccountCredential")
            .field("account_id", &self.account_id)
            .field("user_id", &self.user_id)
            .field("auth_method_id", &self.auth_method_id)
            .field("login_name", &self.login_name)
            .field("password", &"<redacted>")
            .field("boundary_roles", &self.boundary_roles)
            .finish()
    }
}

/// Resources created so far; these are what a rollback would have to delete
#[derive(Default)]
struct Created(Vec<OrphanedResource>);

impl Created {
    fn fail(&self, step: ProvisionStep, source: ClientError) -> EngineError {
        EngineError::RemoteResource {
            step,
            source,
            orphaned: self.0.clone(),
        }
    }
}

/// Create an account, a user, bind them, and add the user to every role in
/// `boundary_roles`, in that order.
pub async fn create_account(
    session: &Session,
    role_name: &str,
    auth_method_id: &str,
    boundary_roles: &[String],
    scope_id: &str,
) -> Result<IssuedAccountCredential> {
    let client = session.client();
    let mut created = Created::default();

    let login_name = generator::login_name(role_name);
    let password = generator::password();

    let account = client
        .create_account(auth_method_id, &login_name, &password)
        .await
        .map_err(|e| created.fail(ProvisionStep::CreateAccount, e))?;
    created.0.push(OrphanedResource::Account(account.id.clone()));
    debug!(account = %account.id, role = role_name, "Created account");

    let user = client
        .create_user(scope_id, &login_name)
        .await
        .map_err(|e| created.fail(ProvisionStep::CreateUser, e))?;
    created.0.push(OrphanedResource::User(user.id.clone()));
    debug!(user = %user.id, scope = scope_id, "Created user");

    client
        .add_accounts(&user.id, user.version, std::slice::from_ref(&account.id))
        .await
        .map_err(|e| created.fail(ProvisionStep::AddAccountToUser, e))?;

    let principal_ids = vec![user.id.clone()];
    let mut granted = Vec::with_capacity(boundary_roles.len());
    for role_id in boundary_roles {
        let role = client
            .read_role(role_id)
            .await
            .map_err(|e| created.fail(ProvisionStep::ReadRole, e))?;

        let updated = client
            .add_principals(role_id, role.version, &principal_ids)
            .await
            .map_err(|e| created.fail(ProvisionStep::AddPrincipalToRole, e))?;
        created.0.push(OrphanedResource::RoleGrant {
            role_id: updated.id.clone(),
            user_id: user.id.clone(),
        });
        granted.push(updated.id);
    }

    info!(
        account = %account.id,
        user = %user.id,
        role = role_name,
        grants = granted.len(),
        "Provisioned boundary account"
    );

    Ok(IssuedAccountCredential {
        account_id: account.id,
        user_id: user.id,
        auth_method_id: if account.auth_method_id.is_empty() {
            auth_method_id.to_string()
        } else {
            account.auth_method_id
        },
        login_name: if account.name.is_empty() {
            login_name
        } else {
            account.name
        },
        password,
        boundary_roles: granted.join(","),
    })
}

/// Delete the user, then the account. A resource that is already gone counts
/// as deleted, so revocation can be retried.
pub async fn delete_account(session: &Session, account_id: &str, user_id: &str) -> Result<()> {
    let client = session.client();

    match client.delete_user(user_id).await {
        Ok(()) => debug!(user = user_id, "Deleted user"),
        Err(e) if e.is_not_found() => debug!(user = user_id, "User already deleted"),
        Err(e) => return Err(EngineError::remote(ProvisionStep::DeleteUser, e)),
    }

    match client.delete_account(account_id).await {
        Ok(()) => debug!(account = account_id, "Deleted account"),
        Err(e) if e.is_not_found() => debug!(account = account_id, "Account already deleted"),
        Err(e) => return Err(EngineError::remote(ProvisionStep::DeleteAccount, e)),
    }

    info!(account = account_id, user = user_id, "Revoked boundary account");
    Ok(())
}
