//! Router assembly and OpenAPI document

use crate::handlers;
use crate::models;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::read_config,
        handlers::write_config,
        handlers::update_config,
        handlers::delete_config,
        handlers::list_roles,
        handlers::read_role,
        handlers::write_role,
        handlers::update_role,
        handlers::delete_role,
        handlers::issue_credential,
        handlers::renew_lease,
        handlers::revoke_lease,
    ),
    components(
        schemas(
            models::HealthResponse,
            models::ConfigRequest,
            models::ConfigResponse,
            models::RoleRequest,
            models::RoleResponse,
            models::RoleListResponse,
            models::CredentialResponse,
            models::LeaseResponse,
            models::RenewRequest,
            models::RevokeRequest,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "config", description = "Boundary controller connection"),
        (name = "roles", description = "Role definitions"),
        (name = "creds", description = "Credential issuance"),
        (name = "leases", description = "Lease renewal and revocation"),
    )
)]
pub struct ApiDoc;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/v1/config",
            get(handlers::read_config)
                .post(handlers::write_config)
                .put(handlers::update_config)
                .delete(handlers::delete_config),
        )
        .route("/v1/roles", get(handlers::list_roles))
        .route(
            "/v1/roles/:name",
            get(handlers::read_role)
                .post(handlers::write_role)
                .put(handlers::update_role)
                .delete(handlers::delete_role),
        )
        .route(
            "/v1/creds/:name",
            get(handlers::issue_credential).post(handlers::issue_credential),
        )
        .route("/v1/leases/renew", post(handlers::renew_lease))
        .route("/v1/leases/revoke", post(handlers::revoke_lease))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
