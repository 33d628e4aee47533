//! Velund API - HTTP server for the metal-trading marketplace
//!
//! Provides the chat-assistant, natural-language search, authentication,
//! file-intake, and supplier-management endpoints.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::http::{header, Method};
use axum::{routing::get, Router};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use velund_core::config::ServerConfig;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_handler,
        handlers::chat::chat_handler,
        handlers::search::search_handler,
        handlers::auth::auth_handler,
        handlers::uploads::upload_handler,
        handlers::suppliers::list_suppliers,
        handlers::suppliers::create_supplier,
        handlers::suppliers::moderate_supplier,
        handlers::suppliers::delete_supplier,
    ),
    components(schemas(
        handlers::chat::ChatRequest,
        handlers::chat::ChatResponse,
        handlers::search::SearchRequest,
        handlers::search::SearchResponse,
        handlers::auth::AuthAction,
        handlers::auth::AuthRequest,
        handlers::auth::AuthResponse,
        handlers::uploads::UploadRequest,
        handlers::uploads::UploadResponse,
        handlers::suppliers::ModerationRequest,
        handlers::suppliers::ModerationResponse,
    )),
    tags(
        (name = "chat", description = "AI chat assistant"),
        (name = "search", description = "Natural-language product search"),
        (name = "auth", description = "Login and registration"),
        (name = "uploads", description = "Price-list intake"),
        (name = "suppliers", description = "Supplier submissions and moderation"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Permissive-by-default CORS: every response carries the marketplace's
/// CORS headers, and preflight requests short-circuit with 200.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = if config.cors_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86400))
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Router wired to injected store/LLM doubles, for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing(
    store: Arc<dyn velund_core::MarketStore>,
    llm: Arc<dyn velund_core::LlmClient>,
) -> Router {
    let config = velund_core::AppConfig::default();
    let state = Arc::new(AppState::new(config, store, llm));
    create_router(state)
}
