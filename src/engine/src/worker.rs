//! Controller-led worker provisioning

use crate::error::{EngineError, ProvisionStep, Result};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Credential returned for a worker role
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedWorkerCredential {
    pub worker_id: String,
    /// Single-use token the worker presents to activate itself
    pub activation_token: String,
    pub worker_name: String,
    pub description: String,
}

impl fmt::Debug for IssuedWorkerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedWorkerCredential")
            .field("worker_id", &self.worker_id)
            .field("activation_token", &"<redacted>")
            .field("worker_name", &self.worker_name)
            .field("description", &self.description)
            .finish()
    }
}

/// Register a controller-led worker. The activation token is passed through
/// as returned by the controller.
pub async fn create_worker(
    session: &Session,
    scope_id: &str,
    worker_name: &str,
    description: &str,
) -> Result<IssuedWorkerCredential> {
    let worker = session
        .client()
        .create_controller_led_worker(scope_id, worker_name, description)
        .await
        .map_err(|e| EngineError::remote(ProvisionStep::CreateWorker, e))?;

    info!(worker = %worker.id, scope = scope_id, "Registered controller-led worker");

    Ok(IssuedWorkerCredential {
        worker_id: worker.id,
        activation_token: worker.controller_generated_activation_token,
        worker_name: if worker.name.is_empty() {
            worker_name.to_string()
        } else {
            worker.name
        },
        description: worker.description,
    })
}

/// Delete a worker; one that is already gone counts as deleted
pub async fn delete_worker(session: &Session, worker_id: &str) -> Result<()> {
    match session.client().delete_worker(worker_id).await {
        Ok(()) => {
            info!(worker = worker_id, "Revoked boundary worker");
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!(worker = worker_id, "Worker already deleted");
            Ok(())
        }
        Err(e) => Err(EngineError::remote(ProvisionStep::DeleteWorker, e)),
    }
}
