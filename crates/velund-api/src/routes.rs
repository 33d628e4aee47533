//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, chat, search, suppliers, uploads};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/chat", post(chat::chat_handler))
        .route("/search", post(search::search_handler))
        .route("/auth", post(auth::auth_handler))
        .route("/uploads", post(uploads::upload_handler));

    // Supplier management requires a verified identity
    let protected_routes = Router::new()
        .route(
            "/suppliers",
            get(suppliers::list_suppliers)
                .post(suppliers::create_supplier)
                .put(suppliers::moderate_supplier)
                .delete(suppliers::delete_supplier),
        )
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
