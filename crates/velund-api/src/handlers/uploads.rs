//! File-intake analysis handler
//!
//! The uploaded file is never downloaded or parsed: the model is asked
//! to hypothesize document metadata from the file name alone. A failed
//! call substitutes a fixed placeholder report so intake always records
//! something reviewable.

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use velund_core::{AiReport, CompletionRequest, LlmClient, SubmissionStatus};

/// Upload analysis request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadRequest {
    /// Name of the uploaded file
    #[schema(example = "прайс_металл_май.xlsx")]
    pub file_name: String,

    /// Where the file was stored, if anywhere
    pub file_url: Option<String>,

    /// Optional user id for the upload and notification records
    pub user_id: Option<i32>,
}

/// Upload analysis response body
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Id of the recorded upload
    pub upload_id: i32,

    /// The (real or placeholder) AI report
    #[schema(value_type = Object)]
    pub ai_report: AiReport,

    /// Always `pending`: a moderator reviews every intake
    #[schema(value_type = String)]
    pub status: SubmissionStatus,
}

fn analysis_prompt(file_name: &str) -> String {
    format!(
        "Проанализируй файл прайс-листа: {file_name}\n\n\
         Определи:\n\
         1. Тип документа (прайс-лист, каталог, коммерческое предложение)\n\
         2. Категория товаров (трубы, листы, круги, швеллеры, балки и т.д.)\n\
         3. Примерное количество позиций\n\
         4. Качество данных (отлично/хорошо/плохо)\n\
         5. Рекомендация (добавить в базу / требуется уточнение / отклонить)\n\
         6. Подробное описание содержимого\n\n\
         Верни JSON в формате:\n\
         {{\n\
             \"type\": \"...\",\n\
             \"category\": \"...\",\n\
             \"items_found\": число,\n\
             \"quality\": \"...\",\n\
             \"recommendation\": \"...\",\n\
             \"details\": \"...\",\n\
             \"score\": число от 0 до 100\n\
         }}"
    )
}

/// Ask the model for a document report, degrading to the placeholder on
/// any failure
async fn analyze_file(llm: &dyn LlmClient, file_name: &str) -> AiReport {
    let completion = CompletionRequest::new(analysis_prompt(file_name))
        .with_system("Ты - AI-анализатор документов для металлопроката.")
        .with_temperature(0.3);

    match llm.complete(completion).await {
        Ok(text) => serde_json::from_str(text.trim()).unwrap_or_else(|_| {
            tracing::warn!(file_name, "analysis returned non-JSON, using placeholder");
            AiReport::placeholder(file_name)
        }),
        Err(e) => {
            tracing::warn!(file_name, error = %e, "analysis failed, using placeholder");
            AiReport::placeholder(file_name)
        }
    }
}

/// Handle price-list intake
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    tag = "uploads",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Upload recorded", body = UploadResponse),
        (status = 400, description = "Missing file name")
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.file_name.trim().is_empty() {
        return Err(AppError::BadRequest("File name is required".to_string()));
    }

    let report = analyze_file(state.llm.as_ref(), &req.file_name).await;

    let upload_id = state
        .store
        .insert_upload(req.user_id, &req.file_name, req.file_url.as_deref(), &report)
        .await?;

    state
        .store
        .insert_notification(
            req.user_id,
            "upload_received",
            "Файл отправлен на модерацию",
            &format!(
                "Файл {} успешно загружен. AI-оценка: {}%. Ожидайте проверки модератора.",
                req.file_name, report.score
            ),
        )
        .await?;

    Ok(Json(UploadResponse {
        upload_id,
        ai_report: report,
        status: SubmissionStatus::Pending,
    }))
}
