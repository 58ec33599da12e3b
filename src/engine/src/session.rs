//! Authenticated controller session and its cache
//!
//! The backend keeps at most one authenticated session. Readers share it under
//! a read lock; building, refreshing and invalidating it happen under the
//! write lock, so at most one login handshake runs per configuration epoch.
//! Provisioning calls run outside the lock on the shared client handle.

use crate::client::{BoundaryApi, ClientFactory};
use crate::config::{BoundaryConfig, ConfigStore};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const TOKEN_ATTRIBUTE: &str = "token";
const EXPIRATION_TIME_ATTRIBUTE: &str = "expiration_time";

/// Tokens are treated as expired this long before the controller expires them
pub fn expiry_margin() -> chrono::Duration {
    chrono::Duration::minutes(1)
}

/// An authenticated client handle plus its token expiry
pub struct Session {
    id: Uuid,
    client: Arc<dyn BoundaryApi>,
    token_expiry: DateTime<Utc>,
    config: BoundaryConfig,
}

impl Session {
    /// Identifier used in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn client(&self) -> &dyn BoundaryApi {
        self.client.as_ref()
    }

    pub fn token_expiry(&self) -> DateTime<Utc> {
        self.token_expiry
    }

    /// Configuration the session was authenticated with
    pub fn config(&self) -> &BoundaryConfig {
        &self.config
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// True once `now` is within the expiry margin of the token expiry
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.token_expiry - expiry_margin()
    }
}

/// Performs the login handshake
pub struct Authenticator {
    factory: Arc<dyn ClientFactory>,
}

impl Authenticator {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    /// Build a client for `config.addr` and log in with the configured account.
    ///
    /// Fails with a configuration error, before any network call, if a
    /// required field is empty.
    pub async fn login(&self, config: &BoundaryConfig) -> Result<Session> {
        config.validate()?;

        let client = self.factory.build(&config.addr).map_err(|e| {
            EngineError::Configuration(format!("unable to build boundary client: {}", e))
        })?;

        let result = client
            .authenticate(&config.auth_method_id, &config.login_name, &config.password)
            .await
            .map_err(|e| {
                EngineError::Authentication(format!("unable to authenticate new client: {}", e))
            })?;

        let token = result
            .attributes
            .get(TOKEN_ATTRIBUTE)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| EngineError::Authentication("token was not defined".to_string()))?;

        let raw_expiry = result.attributes.get(EXPIRATION_TIME_ATTRIBUTE).ok_or_else(|| {
            EngineError::Authentication("expiration_time was not defined".to_string())
        })?;
        let expiry = raw_expiry.as_str().ok_or_else(|| {
            EngineError::Authentication("expiration_time was not a string".to_string())
        })?;
        let token_expiry = DateTime::parse_from_rfc3339(expiry)
            .map_err(|e| {
                EngineError::Authentication(format!("expiration_time is not RFC 3339: {}", e))
            })?
            .with_timezone(&Utc);

        client.set_token(token);

        Ok(Session {
            id: Uuid::new_v4(),
            client,
            token_expiry,
            config: config.clone(),
        })
    }
}

/// Holds the backend's single authenticated session
pub struct SessionCache {
    authenticator: Authenticator,
    session: RwLock<Option<Arc<Session>>>,
}

impl SessionCache {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            authenticator: Authenticator::new(factory),
            session: RwLock::new(None),
        }
    }

    /// Return the cached session, authenticating first if there is none or
    /// its token is about to expire.
    ///
    /// On failure the cache stays empty and the next call starts over.
    pub async fn acquire(&self, configs: &ConfigStore) -> Result<Arc<Session>> {
        {
            let cached = self.session.read().await;
            if let Some(session) = cached.as_ref() {
                if !session.is_expired() {
                    return Ok(Arc::clone(session));
                }
            }
        }

        let mut cached = self.session.write().await;
        if let Some(session) = cached.as_ref() {
            if !session.is_expired() {
                debug!(session = %session.id(), "Session established by concurrent caller");
                return Ok(Arc::clone(session));
            }
            info!(
                session = %session.id(),
                expiry = %session.token_expiry(),
                "Session token expiring, re-authenticating"
            );
            *cached = None;
        }

        let config = configs.get().await?.ok_or_else(|| {
            EngineError::Configuration("boundary backend is not configured".to_string())
        })?;

        let session = Arc::new(self.authenticator.login(&config).await?);
        info!(
            session = %session.id(),
            addr = %config.addr,
            expiry = %session.token_expiry(),
            "Authenticated to boundary"
        );

        *cached = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Drop the cached session. Returns once no caller can obtain it anymore.
    pub async fn invalidate(&self) {
        let mut cached = self.session.write().await;
        if let Some(session) = cached.take() {
            info!(session = %session.id(), "Session invalidated");
        }
    }

    /// The cached session, without authenticating
    pub async fn current(&self) -> Option<Arc<Session>> {
        self.session.read().await.clone()
    }
}
