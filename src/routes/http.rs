//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures map to status codes via `QuizError`.

use std::sync::Arc;
use axum::{extract::{Path, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::QuizError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(rows = body.annotations.len(), text_len = body.source_text.len()))]
pub async fn http_create_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateSessionIn>,
) -> impl IntoResponse {
  let out = create_session(&state, body).await;
  info!(target: "session", id = %out.session_id, skipped = out.skipped_rows.len(), "HTTP session created");
  Json(out)
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionOut>, QuizError> {
  Ok(Json(session_overview(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_generate_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<GenerateOut>, QuizError> {
  let (quiz_text, questions) = generate_quiz(&state, &id).await?;
  info!(target: "session", %id, questions = questions.len(), "HTTP quiz generated");
  Ok(Json(GenerateOut { quiz_text, questions }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_open_editor(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionOut>, QuizError> {
  Ok(Json(open_editor(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_add_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<AddQuestionOut>, QuizError> {
  let (index, question) = add_question(&state, &id).await?;
  Ok(Json(AddQuestionOut { index, question }))
}

#[instrument(level = "info", skip(state, patch), fields(%id, index))]
pub async fn http_update_question(
  State(state): State<Arc<AppState>>,
  Path((id, index)): Path<(String, usize)>,
  Json(patch): Json<crate::document::QuestionPatch>,
) -> Result<Json<UpdateQuestionOut>, QuizError> {
  let validation_scheduled = update_question(&state, &id, index, patch).await?;
  Ok(Json(UpdateQuestionOut { validation_scheduled }))
}

#[instrument(level = "info", skip(state), fields(%id, index))]
pub async fn http_delete_question(
  State(state): State<Arc<AppState>>,
  Path((id, index)): Path<(String, usize)>,
) -> Result<Json<DeleteQuestionOut>, QuizError> {
  delete_question(&state, &id, index).await?;
  Ok(Json(DeleteQuestionOut { index }))
}

#[instrument(level = "info", skip(state), fields(%id, index))]
pub async fn http_validate_question(
  State(state): State<Arc<AppState>>,
  Path((id, index)): Path<(String, usize)>,
) -> Result<Json<VerdictOut>, QuizError> {
  let verdict = run_validation(&state, &id, index).await?;
  info!(target: "validation", %id, index, is_valid = verdict.is_valid, "HTTP validation recorded");
  Ok(Json(VerdictOut { index, verdict }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_validate_all(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ValidationSummaryOut>, QuizError> {
  Ok(Json(validate_all(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_save(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<TransitionOut>, QuizError> {
  let (outcome, phase, quiz_text) = save(&state, &id).await?;
  Ok(Json(TransitionOut { outcome, phase, quiz_text }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_request_exit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<TransitionOut>, QuizError> {
  let (outcome, phase, quiz_text) = request_exit(&state, &id).await?;
  Ok(Json(TransitionOut { outcome, phase, quiz_text }))
}

#[instrument(level = "info", skip(state, body), fields(%id, action = ?body.action))]
pub async fn http_confirm(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ConfirmIn>,
) -> Result<Json<TransitionOut>, QuizError> {
  let (phase, quiz_text) = confirm(&state, &id, body.action).await?;
  Ok(Json(TransitionOut { outcome: crate::session::TransitionOutcome::Completed, phase, quiz_text }))
}

#[instrument(level = "info", skip(state, body), fields(%id, index = body.index, answer_len = body.student_answer.len()))]
pub async fn http_feedback(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<FeedbackIn>,
) -> Result<Json<FeedbackOut>, QuizError> {
  let feedback = student_feedback(&state, &id, body.index, &body.student_answer).await?;
  Ok(Json(FeedbackOut { feedback }))
}
