//! In-process Boundary controller
//!
//! Keeps accounts, users, roles and workers in memory with the same id,
//! version and not-found semantics the controller API has. Used for local
//! development servers and tests.

use super::{
    Account, AuthenticationResult, BoundaryApi, ClientError, ClientFactory, ClientResult, Role,
    User, Worker,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Controller operations, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Authenticate,
    CreateAccount,
    DeleteAccount,
    CreateUser,
    AddAccounts,
    DeleteUser,
    ReadRole,
    AddPrincipals,
    CreateWorker,
    DeleteWorker,
}

#[derive(Default)]
struct State {
    logins: HashMap<String, (String, String)>,
    tokens: Vec<String>,
    accounts: HashMap<String, (Account, String)>,
    users: HashMap<String, User>,
    roles: HashMap<String, Role>,
    workers: HashMap<String, Worker>,
    failures: HashMap<Operation, ClientError>,
    expiration_override: Option<Value>,
    next_id: u64,
    auth_calls: usize,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{:010}", prefix, self.next_id)
    }

    fn take_failure(&mut self, op: Operation) -> ClientResult<()> {
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct Settings {
    token_ttl: chrono::Duration,
    auth_delay: Option<Duration>,
    min_password_length: usize,
}

/// Shared in-memory controller; clone to share
#[derive(Clone)]
pub struct InMemoryBoundary {
    state: Arc<Mutex<State>>,
    settings: Arc<RwLock<Settings>>,
}

impl Default for InMemoryBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBoundary {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            settings: Arc::new(RwLock::new(Settings {
                token_ttl: chrono::Duration::hours(8),
                auth_delay: None,
                min_password_length: 8,
            })),
        }
    }

    /// Register a login accepted by a password auth method
    pub fn with_login(self, auth_method_id: &str, login_name: &str, password: &str) -> Self {
        self.state.lock().logins.insert(
            auth_method_id.to_string(),
            (login_name.to_string(), password.to_string()),
        );
        self
    }

    /// Create a role that generated users can be added to
    pub fn with_role(self, role_id: &str) -> Self {
        self.state.lock().roles.insert(
            role_id.to_string(),
            Role {
                id: role_id.to_string(),
                version: 1,
                principal_ids: Vec::new(),
            },
        );
        self
    }

    /// Lifetime of tokens issued by `authenticate`
    pub fn with_token_ttl(self, ttl: chrono::Duration) -> Self {
        self.settings.write().token_ttl = ttl;
        self
    }

    /// Delay every login handshake
    pub fn with_auth_delay(self, delay: Duration) -> Self {
        self.settings.write().auth_delay = Some(delay);
        self
    }

    pub fn with_min_password_length(self, len: usize) -> Self {
        self.settings.write().min_password_length = len;
        self
    }

    /// Replace the `expiration_time` attribute returned by logins.
    /// `Value::Null` removes the attribute.
    pub fn set_expiration_override(&self, value: Option<Value>) {
        self.state.lock().expiration_override = value;
    }

    /// Fail the next call of `op` with `err`
    pub fn fail_next(&self, op: Operation, err: ClientError) {
        self.state.lock().failures.insert(op, err);
    }

    /// Number of login handshakes performed
    pub fn auth_calls(&self) -> usize {
        self.state.lock().auth_calls
    }

    pub fn account(&self, id: &str) -> Option<Account> {
        self.state.lock().accounts.get(id).map(|(a, _)| a.clone())
    }

    pub fn account_password(&self, id: &str) -> Option<String> {
        self.state.lock().accounts.get(id).map(|(_, p)| p.clone())
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.state.lock().users.get(id).cloned()
    }

    pub fn role(&self, id: &str) -> Option<Role> {
        self.state.lock().roles.get(id).cloned()
    }

    pub fn worker(&self, id: &str) -> Option<Worker> {
        self.state.lock().workers.get(id).cloned()
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().accounts.len()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().users.len()
    }

    /// A client handle with no token attached
    pub fn client(&self) -> InMemoryClient {
        InMemoryClient {
            server: self.clone(),
            token: RwLock::new(None),
        }
    }
}

/// Client handle bound to an [`InMemoryBoundary`]
pub struct InMemoryClient {
    server: InMemoryBoundary,
    token: RwLock<Option<String>>,
}

impl InMemoryClient {
    /// Lock the controller state after checking the caller's token
    fn authorized(&self) -> ClientResult<parking_lot::MutexGuard<'_, State>> {
        let state = self.server.state.lock();
        let token = self.token.read();
        match token.as_ref() {
            Some(t) if state.tokens.contains(t) => Ok(state),
            _ => Err(ClientError::Api {
                status: 401,
                message: "Unauthenticated.".to_string(),
            }),
        }
    }
}

#[async_trait]
impl BoundaryApi for InMemoryClient {
    async fn authenticate(
        &self,
        auth_method_id: &str,
        login_name: &str,
        password: &str,
    ) -> ClientResult<AuthenticationResult> {
        let (delay, ttl) = {
            let settings = self.server.settings.read();
            (settings.auth_delay, settings.token_ttl)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.server.state.lock();
        state.auth_calls += 1;
        state.take_failure(Operation::Authenticate)?;

        match state.logins.get(auth_method_id) {
            Some((login, pw)) if login == login_name && pw == password => {}
            Some(_) => {
                return Err(ClientError::Api {
                    status: 401,
                    message: "Unauthenticated.".to_string(),
                })
            }
            None => return Err(ClientError::NotFound(auth_method_id.to_string())),
        }

        let token = format!("at_{}", uuid::Uuid::new_v4().simple());
        state.tokens.push(token.clone());

        let mut attributes = Map::new();
        attributes.insert("token".to_string(), json!(token));
        match state.expiration_override.clone() {
            Some(Value::Null) => {}
            Some(value) => {
                attributes.insert("expiration_time".to_string(), value);
            }
            None => {
                let expiry = (Utc::now() + ttl).to_rfc3339();
                attributes.insert("expiration_time".to_string(), json!(expiry));
            }
        }

        Ok(AuthenticationResult { attributes })
    }

    fn set_token(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    async fn create_account(
        &self,
        auth_method_id: &str,
        login_name: &str,
        password: &str,
    ) -> ClientResult<Account> {
        let min_len = self.server.settings.read().min_password_length;
        let mut state = self.authorized()?;
        state.take_failure(Operation::CreateAccount)?;

        if password.len() < min_len {
            return Err(ClientError::Api {
                status: 400,
                message: format!("password must be at least {} characters", min_len),
            });
        }

        let account = Account {
            id: state.next_id("acctpw"),
            auth_method_id: auth_method_id.to_string(),
            name: login_name.to_string(),
            version: 1,
        };
        state
            .accounts
            .insert(account.id.clone(), (account.clone(), password.to_string()));
        Ok(account)
    }

    async fn delete_account(&self, account_id: &str) -> ClientResult<()> {
        let mut state = self.authorized()?;
        state.take_failure(Operation::DeleteAccount)?;
        state
            .accounts
            .remove(account_id)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(account_id.to_string()))
    }

    async fn create_user(&self, scope_id: &str, name: &str) -> ClientResult<User> {
        let mut state = self.authorized()?;
        state.take_failure(Operation::CreateUser)?;

        let user = User {
            id: state.next_id("u"),
            scope_id: scope_id.to_string(),
            name: name.to_string(),
            version: 1,
            account_ids: Vec::new(),
        };
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn add_accounts(
        &self,
        user_id: &str,
        version: u32,
        account_ids: &[String],
    ) -> ClientResult<User> {
        let mut state = self.authorized()?;
        state.take_failure(Operation::AddAccounts)?;

        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| ClientError::NotFound(user_id.to_string()))?;
        if user.version != version {
            return Err(version_mismatch(user.version, version));
        }
        user.account_ids.extend(account_ids.iter().cloned());
        user.version += 1;
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: &str) -> ClientResult<()> {
        let mut state = self.authorized()?;
        state.take_failure(Operation::DeleteUser)?;

        state
            .users
            .remove(user_id)
            .ok_or_else(|| ClientError::NotFound(user_id.to_string()))?;
        for role in state.roles.values_mut() {
            role.principal_ids.retain(|id| id != user_id);
        }
        Ok(())
    }

    async fn read_role(&self, role_id: &str) -> ClientResult<Role> {
        let mut state = self.authorized()?;
        state.take_failure(Operation::ReadRole)?;
        state
            .roles
            .get(role_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(role_id.to_string()))
    }

    async fn add_principals(
        &self,
        role_id: &str,
        version: u32,
        principal_ids: &[String],
    ) -> ClientResult<Role> {
        let mut state = self.authorized()?;
        state.take_failure(Operation::AddPrincipals)?;

        let role = state
            .roles
            .get_mut(role_id)
            .ok_or_else(|| ClientError::NotFound(role_id.to_string()))?;
        if role.version != version {
            return Err(version_mismatch(role.version, version));
        }
        role.principal_ids.extend(principal_ids.iter().cloned());
        role.version += 1;
        Ok(role.clone())
    }

    async fn create_controller_led_worker(
        &self,
        scope_id: &str,
        name: &str,
        description: &str,
    ) -> ClientResult<Worker> {
        let mut state = self.authorized()?;
        state.take_failure(Operation::CreateWorker)?;

        let worker = Worker {
            id: state.next_id("w"),
            scope_id: scope_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            controller_generated_activation_token: format!(
                "neslat_{}",
                uuid::Uuid::new_v4().simple()
            ),
        };
        state.workers.insert(worker.id.clone(), worker.clone());
        Ok(worker)
    }

    async fn delete_worker(&self, worker_id: &str) -> ClientResult<()> {
        let mut state = self.authorized()?;
        state.take_failure(Operation::DeleteWorker)?;
        state
            .workers
            .remove(worker_id)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(worker_id.to_string()))
    }
}

fn version_mismatch(current: u32, given: u32) -> ClientError {
    ClientError::Api {
        status: 400,
        message: format!(
            "version mismatch: resource is at version {}, request used {}",
            current, given
        ),
    }
}

/// Builds [`InMemoryClient`]s against one shared controller, for any address
#[derive(Clone)]
pub struct InMemoryClientFactory {
    server: InMemoryBoundary,
}

impl InMemoryClientFactory {
    pub fn new(server: InMemoryBoundary) -> Self {
        Self { server }
    }
}

impl ClientFactory for InMemoryClientFactory {
    fn build(&self, _addr: &str) -> ClientResult<Arc<dyn BoundaryApi>> {
        Ok(Arc::new(self.server.client()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_calls_require_token() {
        let server = InMemoryBoundary::new()
            .with_login("ampw_1", "admin", "pw")
            .with_role("r_1");
        let client = server.client();

        let err = client.read_role("r_1").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 401, .. }));

        let auth = client.authenticate("ampw_1", "admin", "pw").await.unwrap();
        let token = auth.attributes["token"].as_str().unwrap().to_string();
        client.set_token(&token);
        assert_eq!(client.read_role("r_1").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_password() {
        let server = InMemoryBoundary::new().with_login("ampw_1", "admin", "pw");
        let err = server
            .client()
            .authenticate("ampw_1", "admin", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 401, .. }));
        assert_eq!(server.auth_calls(), 1);
    }

    #[tokio::test]
    async fn test_version_checked_on_add_principals() {
        let server = InMemoryBoundary::new()
            .with_login("ampw_1", "admin", "pw")
            .with_role("r_1");
        let client = server.client();
        let auth = client.authenticate("ampw_1", "admin", "pw").await.unwrap();
        client.set_token(auth.attributes["token"].as_str().unwrap());

        let ids = vec!["u_1".to_string()];
        client.add_principals("r_1", 1, &ids).await.unwrap();
        let stale = client.add_principals("r_1", 1, &ids).await;
        assert!(matches!(stale, Err(ClientError::Api { status: 400, .. })));
    }
}
