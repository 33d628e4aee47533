//! Natural-language supplier/product search
//!
//! The external model turns a free-text query into structured filters;
//! the store builds a parameterized query from whatever came back. A
//! failed call or unparseable output degrades to a fixed fallback filter
//! instead of failing the request.

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use velund_core::{CompletionRequest, LlmClient, ProductHit, SearchFilters};

const EXTRACTION_SYSTEM_PROMPT: &str = "Ты - AI-ассистент для поиска металлопроката. \
    Извлекай из запроса: название товара, город, максимальную цену, минимальное количество. \
    Верни JSON: {\"product\": \"...\", \"city\": \"...\", \"max_price\": число или null, \
    \"min_quantity\": число или null, \"category\": \"...\"}";

/// Search request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// Free-text query
    #[schema(example = "труба 57х3.5 в Москве до 1000 руб")]
    pub query: String,

    /// Optional user id; presence enables search logging
    pub user_id: Option<i32>,
}

/// Search response body
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// Echoed query
    pub query: String,

    /// Filters the model extracted (or the fallback)
    #[schema(value_type = Object)]
    pub parsed: SearchFilters,

    /// Matching products, price ascending
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<ProductHit>,

    /// Number of results
    pub count: usize,
}

/// Parse the model's output into filters; `None` when it is not the
/// expected JSON object.
fn parse_filters(text: &str) -> Option<SearchFilters> {
    serde_json::from_str(text.trim()).ok()
}

/// Ask the model for filters, degrading to the fallback on any failure
async fn extract_filters(llm: &dyn LlmClient, query: &str) -> SearchFilters {
    let completion = CompletionRequest::new(query)
        .with_system(EXTRACTION_SYSTEM_PROMPT)
        .with_temperature(0.3);

    match llm.complete(completion).await {
        Ok(text) => parse_filters(&text).unwrap_or_else(|| {
            tracing::warn!("filter extraction returned non-JSON, using fallback");
            SearchFilters::fallback(query)
        }),
        Err(e) => {
            tracing::warn!(error = %e, "filter extraction failed, using fallback");
            SearchFilters::fallback(query)
        }
    }
}

/// Handle natural-language search requests
#[utoipa::path(
    post,
    path = "/api/v1/search",
    tag = "search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Empty query")
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query is required".to_string()));
    }

    let parsed = extract_filters(state.llm.as_ref(), &req.query).await;
    let results = state.store.search_products(&parsed).await?;

    if let Some(user_id) = req.user_id {
        state
            .store
            .log_search(user_id, &req.query, results.len() as i32)
            .await?;
    }

    let count = results.len();
    Ok(Json(SearchResponse {
        query: req.query,
        parsed,
        results,
        count,
    }))
}
