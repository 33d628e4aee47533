//! Chat assistant handler
//!
//! Free-text consultation about the metal market. Coarse database
//! statistics feed the system prompt as context; the exchange is
//! persisted only when the caller identifies themselves.

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use velund_core::{CategoryStat, CityStat, CompletionRequest};

/// Chat request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// User's message
    #[schema(example = "Сколько стоит труба?")]
    pub message: String,

    /// Optional user id; presence enables chat-history persistence
    pub user_id: Option<i32>,
}

/// Chat response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    /// Echoed user message
    pub message: String,

    /// Model's reply
    pub response: String,

    /// Server-side response timestamp
    pub timestamp: DateTime<Utc>,
}

fn build_context(categories: &[CategoryStat], cities: &[CityStat]) -> String {
    let city_names: Vec<&str> = cities
        .iter()
        .filter_map(|c| c.city.as_deref())
        .collect();

    format!(
        "Статистика базы: {} категорий товаров. Города: {}.",
        categories.len(),
        city_names.join(", ")
    )
}

fn system_prompt(context: &str) -> String {
    format!(
        "Ты - AI-консультант Velund AI для металлопроката. \
         Помогаешь с поиском, консультируешь по ГОСТам, рассчитываешь массу, подбираешь аналоги. \
         Контекст базы данных: {context} \
         Отвечай кратко и по делу. Если не знаешь точно - предложи найти в базе."
    )
}

/// Handle chat assistant requests
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Empty message"),
        (status = 502, description = "LLM unavailable")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }

    let categories = state.store.category_stats().await?;
    let cities = state.store.top_cities().await?;
    let context = build_context(&categories, &cities);

    let completion = CompletionRequest::new(req.message.clone())
        .with_system(system_prompt(&context))
        .with_temperature(0.7)
        .with_max_tokens(500);

    // No fallback here: an LLM failure is fatal to the request
    let response = state.llm.complete(completion).await?;

    if let Some(user_id) = req.user_id {
        let snapshot = json!({ "market_data": categories });
        state
            .store
            .insert_chat_turn(user_id, &req.message, &response, &snapshot)
            .await?;
    }

    Ok(Json(ChatResponse {
        message: req.message,
        response,
        timestamp: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_lists_cities_and_category_count() {
        let categories = vec![
            CategoryStat {
                category: Some("трубы".to_string()),
                count: 12,
                avg_price: Some(1500.0),
            },
            CategoryStat {
                category: Some("листы".to_string()),
                count: 7,
                avg_price: None,
            },
        ];
        let cities = vec![
            CityStat {
                city: Some("Москва".to_string()),
                suppliers_count: 30,
            },
            CityStat {
                city: None,
                suppliers_count: 2,
            },
            CityStat {
                city: Some("Екатеринбург".to_string()),
                suppliers_count: 11,
            },
        ];

        let context = build_context(&categories, &cities);
        assert!(context.contains("2 категорий"));
        assert!(context.contains("Москва, Екатеринбург"));
    }

    #[test]
    fn system_prompt_embeds_context() {
        let prompt = system_prompt("Статистика базы: 3 категорий товаров.");
        assert!(prompt.contains("Velund AI"));
        assert!(prompt.contains("Статистика базы: 3 категорий товаров."));
    }
}
