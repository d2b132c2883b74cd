//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Creating sessions from uploaded text + annotation rows
//!   - Generating a quiz via the activity's prompt and the OpenRouter client
//!   - Editor operations (update/add/delete) with the auto-validation trigger
//!   - Explicit per-question and validate-all AI validation
//!   - Save/exit/confirm transitions of the edit session
//!   - Student-answer feedback
//!
//! All session mutation happens synchronously under the store lock; AI calls
//! run outside the lock and re-acquire it to record their results.

use tracing::{error, info, instrument};

use crate::activity::FeedbackRequest;
use crate::annotations::group_annotations;
use crate::document::QuestionPatch;
use crate::domain::{Question, ValidationVerdict};
use crate::error::QuizError;
use crate::protocol::{ConfirmAction, CreateSessionIn, CreateSessionOut, SessionOut, ValidationSummaryOut};
use crate::session::{EditSession, SessionPhase, TransitionOutcome};
use crate::state::AppState;

/// Group the uploaded rows, store a fresh session, report skipped rows.
#[instrument(level = "info", skip(state, input), fields(activity = input.activity.label(), rows = input.annotations.len()))]
pub async fn create_session(state: &AppState, input: CreateSessionIn) -> CreateSessionOut {
  let outcome = group_annotations(&input.annotations);
  let skipped_rows: Vec<String> = outcome.skipped.iter().map(ToString::to_string).collect();
  if !skipped_rows.is_empty() {
    info!(target: "annotations", skipped = skipped_rows.len(), "Some annotation rows were skipped");
  }

  let id = AppState::fresh_session_id();
  let session = EditSession::new(id.clone(), input.activity, input.source_text, outcome.groups.clone());
  state.insert_session(session).await;
  info!(target: "session", %id, "Session created");

  CreateSessionOut { session_id: id, annotations: outcome.groups, skipped_rows }
}

/// Public view of one session.
#[instrument(level = "debug", skip(state), fields(%session_id))]
pub async fn session_overview(state: &AppState, session_id: &str) -> Result<SessionOut, QuizError> {
  state.read_session(session_id, crate::protocol::to_session_out).await
}

/// Ask the generator for a fresh quiz and install it as the session's
/// canonical text + working document.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn generate_quiz(state: &AppState, session_id: &str) -> Result<(String, Vec<Question>), QuizError> {
  let prompt = state
    .read_session(session_id, |s| s.activity.build_quiz_prompt(&s.source_text, &s.annotations))
    .await?;

  let client = state
    .client
    .as_ref()
    .ok_or_else(|| QuizError::GenerationFailed("OpenRouter non configurato".into()))?;
  let completion = client.generate(&prompt).await.map_err(QuizError::GenerationFailed)?;
  if completion.trim().is_empty() {
    return Err(QuizError::GenerationFailed("empty completion".into()));
  }

  state.with_session(session_id, |s| s.install_generated_quiz(&completion)).await??;
  let (quiz_text, questions) = state
    .read_session(session_id, |s| (s.canonical_text().to_string(), s.document().questions().to_vec()))
    .await?;
  info!(target: "session", %session_id, questions = questions.len(), "Quiz generated");
  Ok((quiz_text, questions))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn open_editor(state: &AppState, session_id: &str) -> Result<SessionOut, QuizError> {
  state.with_session(session_id, |s| s.open_editor()).await??;
  session_overview(state, session_id).await
}

/// Update one question. When the answer change crosses the session's
/// auto-validation thresholds (and a client is configured), a best-effort
/// validation task is spawned; its result lands in the ledger by index.
#[instrument(level = "info", skip(state, patch), fields(%session_id, index))]
pub async fn update_question(
  state: &AppState,
  session_id: &str,
  index: usize,
  patch: QuestionPatch,
) -> Result<bool, QuizError> {
  let triggered = state.with_session(session_id, |s| s.update_question(index, patch)).await??;
  let scheduled = triggered && state.client.is_some();
  if scheduled {
    let state = state.clone();
    let session_id = session_id.to_string();
    tokio::spawn(async move {
      match run_validation(&state, &session_id, index).await {
        Ok(v) => {
          info!(target: "validation", session = %session_id, index, is_valid = v.is_valid, "Auto-validation recorded");
        }
        Err(e) => {
          error!(target: "validation", session = %session_id, index, error = %e, "Auto-validation failed; question remains unvalidated");
        }
      }
    });
  }
  Ok(scheduled)
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn add_question(state: &AppState, session_id: &str) -> Result<(usize, Question), QuizError> {
  let index = state.with_session(session_id, |s| s.add_question()).await??;
  let question = state.read_session(session_id, |s| s.document().get(index).cloned()).await??;
  Ok((index, question))
}

#[instrument(level = "info", skip(state), fields(%session_id, index))]
pub async fn delete_question(state: &AppState, session_id: &str, index: usize) -> Result<(), QuizError> {
  state.with_session(session_id, |s| s.delete_question(index)).await??;
  info!(target: "session", %session_id, index, "Question deleted");
  Ok(())
}

/// Validate one question with the external validator and record the verdict.
/// Transport failure leaves the ledger untouched and surfaces as
/// `ValidationUnavailable`, never as a negative verdict.
#[instrument(level = "info", skip(state), fields(%session_id, index))]
pub async fn run_validation(
  state: &AppState,
  session_id: &str,
  index: usize,
) -> Result<ValidationVerdict, QuizError> {
  let (question, source_text, annotations, activity) = state
    .read_session(session_id, |s| {
      s.document()
        .get(index)
        .map(|q| (q.clone(), s.source_text.clone(), s.annotations.clone(), s.activity))
    })
    .await??;

  let client = state
    .client
    .as_ref()
    .ok_or_else(|| QuizError::ValidationUnavailable("OpenRouter non configurato".into()))?;
  let verdict = client
    .validate_question(&state.prompts, &question, &source_text, &annotations, activity)
    .await
    .map_err(QuizError::ValidationUnavailable)?;

  state.with_session(session_id, |s| s.set_verdict(index, verdict.clone())).await??;
  Ok(verdict)
}

/// Validate every non-template question in order, one call at a time.
/// The first transport failure aborts the sweep (verdicts recorded so far
/// are kept); a completed sweep returns the summary banner counts.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn validate_all(state: &AppState, session_id: &str) -> Result<ValidationSummaryOut, QuizError> {
  let indices: Vec<usize> = state
    .read_session(session_id, |s| {
      s.document()
        .questions()
        .iter()
        .enumerate()
        .filter(|(_, q)| !q.is_template())
        .map(|(i, _)| i)
        .collect()
    })
    .await?;

  let mut valid = 0usize;
  let mut invalid = 0usize;
  for index in indices {
    let verdict = run_validation(state, session_id, index).await?;
    if verdict.is_valid {
      valid += 1;
    } else {
      invalid += 1;
    }
  }
  let summary = ValidationSummaryOut { total: valid + invalid, valid, invalid };
  info!(target: "validation", %session_id, total = summary.total, valid, invalid, "Validation sweep completed");
  Ok(summary)
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn save(state: &AppState, session_id: &str) -> Result<(TransitionOutcome, SessionPhase, String), QuizError> {
  state
    .with_session(session_id, |s| {
      s.save().map(|outcome| (outcome, s.phase(), s.canonical_text().to_string()))
    })
    .await?
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn request_exit(state: &AppState, session_id: &str) -> Result<(TransitionOutcome, SessionPhase, String), QuizError> {
  state
    .with_session(session_id, |s| {
      s.request_exit().map(|outcome| (outcome, s.phase(), s.canonical_text().to_string()))
    })
    .await?
}

#[instrument(level = "info", skip(state), fields(%session_id, ?action))]
pub async fn confirm(
  state: &AppState,
  session_id: &str,
  action: ConfirmAction,
) -> Result<(SessionPhase, String), QuizError> {
  state
    .with_session(session_id, |s| {
      let applied = match action {
        ConfirmAction::SaveWithoutValidation => s.confirm_save_without_validation(),
        ConfirmAction::Discard => s.confirm_discard(),
        ConfirmAction::Stay => s.confirm_stay(),
      };
      applied.map(|()| (s.phase(), s.canonical_text().to_string()))
    })
    .await?
}

/// Generate tutor feedback for one student answer to one quiz question.
#[instrument(level = "info", skip(state, student_answer), fields(%session_id, index, answer_len = student_answer.len()))]
pub async fn student_feedback(
  state: &AppState,
  session_id: &str,
  index: usize,
  student_answer: &str,
) -> Result<String, QuizError> {
  let (question, source_text, annotations, activity) = state
    .read_session(session_id, |s| {
      s.document()
        .get(index)
        .map(|q| (q.clone(), s.source_text.clone(), s.annotations.clone(), s.activity))
    })
    .await??;

  let req = FeedbackRequest {
    kind: question.kind,
    question_text: &question.text,
    options: &question.options,
    correct_answer: &question.correct_answer,
    student_answer,
    annotations: &annotations,
    source_text: &source_text,
  };
  let prompt = activity.build_feedback_prompt(&req);

  let client = state
    .client
    .as_ref()
    .ok_or_else(|| QuizError::GenerationFailed("OpenRouter non configurato".into()))?;
  let feedback = client
    .generate_feedback(&prompt, question.kind)
    .await
    .map_err(QuizError::GenerationFailed)?;
  if feedback.trim().is_empty() {
    return Err(QuizError::GenerationFailed("empty completion".into()));
  }
  Ok(feedback)
}
