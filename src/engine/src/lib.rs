//! # Boundary Secrets Engine
//!
//! Issues and revokes short-lived Boundary identities on behalf of callers
//! that only know a role name.
//!
//! ## Features
//!
//! - **Accounts**: password account + user + Boundary role grants per request
//! - **Workers**: controller-led worker registrations with activation tokens
//! - **Session Cache**: one shared, lazily authenticated controller session
//!   refreshed before its token expires
//! - **Leases**: renew with current role TTLs, idempotent revoke
//!
//! ## Module Structure
//!
//! ```text
//! engine/
//! ├── backend/     - Operations exposed to the HTTP and lease layers
//! ├── session/     - Authenticator and session cache
//! ├── account/     - Account provisioning
//! ├── worker/      - Worker provisioning
//! ├── lease/       - Renew/revoke handlers and credential handles
//! ├── config/      - Backend configuration record
//! ├── roles/       - Role definitions
//! ├── storage/     - Key/value storage (memory, sled)
//! └── client/      - Boundary controller API (HTTP, in-memory)
//! ```

pub mod account;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod lease;
pub mod roles;
pub mod session;
pub mod storage;
pub mod worker;

pub use account::IssuedAccountCredential;
pub use backend::{BoundaryBackend, IssuedCredential, IssuedSecret};
pub use config::{BoundaryConfig, ConfigUpdate, ConfigView};
pub use error::{EngineError, OrphanedResource, ProvisionStep, Result};
pub use lease::{CredentialHandle, CredentialKind, LeaseTtl};
pub use roles::{CredentialType, RoleEntry, RoleUpdate};
pub use session::{Session, SessionCache};
pub use storage::{InMemoryStorage, SledStorage, Storage};
pub use worker::IssuedWorkerCredential;
