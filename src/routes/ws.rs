//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::TransitionOutcome;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quaderno_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quaderno_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "quaderno_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "quaderno_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "quaderno_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::GenerateQuiz { session_id } => {
      match generate_quiz(state, &session_id).await {
        Ok((quiz_text, questions)) => {
          tracing::info!(target: "session", id = %session_id, questions = questions.len(), "WS quiz generated");
          ServerWsMessage::Quiz { quiz_text, questions }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::OpenEditor { session_id } => {
      match open_editor(state, &session_id).await {
        Ok(session) => ServerWsMessage::Session { session },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::UpdateQuestion { session_id, index, patch } => {
      match update_question(state, &session_id, index, patch).await {
        Ok(validation_scheduled) => ServerWsMessage::QuestionUpdated { index, validation_scheduled },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::AddQuestion { session_id } => {
      match add_question(state, &session_id).await {
        Ok((index, question)) => ServerWsMessage::QuestionAdded { index, question },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::DeleteQuestion { session_id, index } => {
      match delete_question(state, &session_id, index).await {
        Ok(()) => ServerWsMessage::QuestionDeleted { index },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::ValidateQuestion { session_id, index } => {
      match run_validation(state, &session_id, index).await {
        Ok(verdict) => {
          tracing::info!(target: "validation", id = %session_id, index, is_valid = verdict.is_valid, "WS validation recorded");
          ServerWsMessage::Verdict { index, verdict }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::ValidateAll { session_id } => {
      match validate_all(state, &session_id).await {
        Ok(summary) => ServerWsMessage::ValidationSummary {
          total: summary.total,
          valid: summary.valid,
          invalid: summary.invalid,
        },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Save { session_id } => {
      match save(state, &session_id).await {
        Ok((outcome, phase, quiz_text)) => ServerWsMessage::Transition { outcome, phase, quiz_text },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::RequestExit { session_id } => {
      match request_exit(state, &session_id).await {
        Ok((outcome, phase, quiz_text)) => ServerWsMessage::Transition { outcome, phase, quiz_text },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Confirm { session_id, action } => {
      match confirm(state, &session_id, action).await {
        Ok((phase, quiz_text)) => ServerWsMessage::Transition {
          outcome: TransitionOutcome::Completed,
          phase,
          quiz_text,
        },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Feedback { session_id, index, student_answer } => {
      match student_feedback(state, &session_id, index, &student_answer).await {
        Ok(text) => ServerWsMessage::Feedback { text },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }
  }
}
