//! Boundary Secrets REST API
//!
//! HTTP surface over the Boundary secrets engine.
//!
//! ## Features
//!
//! - **Configuration**: controller address and managing login
//! - **Roles**: user and worker role definitions
//! - **Credentials**: issue accounts or workers for a role
//! - **Leases**: renew and revoke issued credentials
//! - **OpenAPI Documentation**: Swagger UI at `/swagger-ui`

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
