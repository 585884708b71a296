use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::openapi::ApiDoc;

pub mod auth;
pub mod generate;
pub mod group_users;
pub mod groups;
pub mod users;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// `/admin/*`: every route needs a valid token and an admin role; some methods need a super admin.
fn admin_router(state: auth::ServerState) -> Router<auth::ServerState> {
    let super_admin = || middleware::from_fn(auth::require_super_admin);

    Router::new()
        .route(
            "/admin/generate_user",
            post(generate::generate).get(generate::download).route_layer(super_admin()),
        )
        .route(
            "/admin/user",
            post(users::import)
                .put(users::edit)
                .delete(users::delete)
                .route_layer(super_admin())
                .get(users::get),
        )
        .route(
            "/admin/group",
            get(groups::get).post(groups::create).put(groups::edit).delete(groups::delete),
        )
        .route(
            "/admin/group_user",
            get(group_users::list)
                .post(group_users::add)
                .put(group_users::set_type)
                .delete(group_users::remove),
        )
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth::require_bearer_token))
}

/// Build the full application router: health, API docs and the admin surface.
pub fn build_router(state: auth::ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public
        .merge(admin_router(state.clone()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
