//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use boundary_secrets_engine::client::{InMemoryBoundary, InMemoryClientFactory};
use boundary_secrets_engine::config::ConfigStore;
use boundary_secrets_engine::{
    BoundaryBackend, BoundaryConfig, ConfigUpdate, InMemoryStorage, Session, SessionCache,
};
use std::sync::Arc;

pub fn admin_config() -> BoundaryConfig {
    BoundaryConfig {
        login_name: "admin".to_string(),
        password: "pw".to_string(),
        addr: "https://svc".to_string(),
        auth_method_id: "ampw_1".to_string(),
    }
}

pub fn admin_update() -> ConfigUpdate {
    let config = admin_config();
    ConfigUpdate {
        login_name: Some(config.login_name),
        password: Some(config.password),
        addr: Some(config.addr),
        auth_method_id: Some(config.auth_method_id),
    }
}

/// Controller with the admin login and the given roles
pub fn controller(roles: &[&str]) -> InMemoryBoundary {
    roles.iter().fold(
        InMemoryBoundary::new().with_login("ampw_1", "admin", "pw"),
        |server, role| server.with_role(role),
    )
}

/// An authenticated session against `server`
pub async fn session(server: &InMemoryBoundary) -> Arc<Session> {
    let configs = ConfigStore::new(Arc::new(InMemoryStorage::new()));
    configs.put(&admin_config()).await.unwrap();
    let cache = SessionCache::new(Arc::new(InMemoryClientFactory::new(server.clone())));
    cache.acquire(&configs).await.unwrap()
}

/// A configured backend talking to `server`
pub async fn backend(server: &InMemoryBoundary) -> BoundaryBackend {
    let backend = BoundaryBackend::new(
        Arc::new(InMemoryStorage::new()),
        Arc::new(InMemoryClientFactory::new(server.clone())),
    );
    backend.write_config(admin_update(), true).await.unwrap();
    backend
}
