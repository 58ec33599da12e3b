//! HTTP client for the Boundary controller API

use super::{
    Account, AuthenticationResult, BoundaryApi, ClientError, ClientFactory, ClientResult, Role,
    User, Worker,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Client for one controller address
pub struct HttpBoundaryClient {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl HttpBoundaryClient {
    pub fn new(addr: &str, timeout: Option<Duration>) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let mut base_url = Url::parse(addr)
            .map_err(|e| ClientError::Transport(format!("invalid address {:?}: {}", addr, e)))?;
        base_url
            .path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("address {:?} cannot be a base", addr)))?
            .pop_if_empty()
            .push("v1");

        Ok(Self {
            http,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Append path segments to the API base. Each segment is percent-encoded
    /// on its own, so ids cannot introduce `/`, `?` or `#`.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.http.request(method, self.url(segments));
        match self.token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = Self::execute(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> ClientResult<()> {
        Self::execute(builder).await.map(|_| ())
    }

    async fn execute(builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }
}

/// Map a non-success response to a client error, preferring the API's `message` field
fn error_from_response(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::NOT_FOUND {
        ClientError::NotFound(message)
    } else {
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl BoundaryApi for HttpBoundaryClient {
    async fn authenticate(
        &self,
        auth_method_id: &str,
        login_name: &str,
        password: &str,
    ) -> ClientResult<AuthenticationResult> {
        let body = json!({
            "command": "login",
            "attributes": {
                "login_name": login_name,
                "password": password,
            },
        });
        let action = format!("{}:authenticate", auth_method_id);
        self.send(self.request(Method::POST, &["auth-methods", &action]).json(&body))
            .await
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
        let body = json!({
            "auth_method_id": auth_method_id,
            "name": login_name,
            "type": "password",
            "attributes": {
                "login_name": login_name,
                "password": password,
            },
        });
        self.send(self.request(Method::POST, &["accounts"]).json(&body)).await
    }

    async fn delete_account(&self, account_id: &str) -> ClientResult<()> {
        self.send_empty(self.request(Method::DELETE, &["accounts", account_id]))
            .await
    }

    async fn create_user(&self, scope_id: &str, name: &str) -> ClientResult<User> {
        let body = json!({ "scope_id": scope_id, "name": name });
        self.send(self.request(Method::POST, &["users"]).json(&body)).await
    }

    async fn add_accounts(
        &self,
        user_id: &str,
        version: u32,
        account_ids: &[String],
    ) -> ClientResult<User> {
        let body = json!({ "version": version, "account_ids": account_ids });
        let action = format!("{}:add-accounts", user_id);
        self.send(self.request(Method::POST, &["users", &action]).json(&body))
            .await
    }

    async fn delete_user(&self, user_id: &str) -> ClientResult<()> {
        self.send_empty(self.request(Method::DELETE, &["users", user_id]))
            .await
    }

    async fn read_role(&self, role_id: &str) -> ClientResult<Role> {
        self.send(self.request(Method::GET, &["roles", role_id])).await
    }

    async fn add_principals(
        &self,
        role_id: &str,
        version: u32,
        principal_ids: &[String],
    ) -> ClientResult<Role> {
        let body = json!({ "version": version, "principal_ids": principal_ids });
        let action = format!("{}:add-principals", role_id);
        self.send(self.request(Method::POST, &["roles", &action]).json(&body))
            .await
    }

    async fn create_controller_led_worker(
        &self,
        scope_id: &str,
        name: &str,
        description: &str,
    ) -> ClientResult<Worker> {
        let body = json!({
            "scope_id": scope_id,
            "name": name,
            "description": description,
        });
        self.send(self.request(Method::POST, &["workers:create:controller-led"]).json(&body))
            .await
    }

    async fn delete_worker(&self, worker_id: &str) -> ClientResult<()> {
        self.send_empty(self.request(Method::DELETE, &["workers", worker_id]))
            .await
    }
}

/// Builds [`HttpBoundaryClient`]s with a shared transport timeout
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    timeout: Option<Duration>,
}

impl HttpClientFactory {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, addr: &str) -> ClientResult<Arc<dyn BoundaryApi>> {
        Ok(Arc::new(HttpBoundaryClient::new(addr, self.timeout)?))
    }
}
