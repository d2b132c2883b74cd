//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::annotations::{AnnotationGroups, AnnotationRow};
use crate::document::QuestionPatch;
use crate::domain::{Activity, Question, ValidationVerdict};
use crate::session::{EditSession, SessionPhase, TransitionOutcome};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GenerateQuiz {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    OpenEditor {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    UpdateQuestion {
        #[serde(rename = "sessionId")]
        session_id: String,
        index: usize,
        patch: QuestionPatch,
    },
    AddQuestion {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    DeleteQuestion {
        #[serde(rename = "sessionId")]
        session_id: String,
        index: usize,
    },
    ValidateQuestion {
        #[serde(rename = "sessionId")]
        session_id: String,
        index: usize,
    },
    ValidateAll {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Save {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    RequestExit {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Confirm {
        #[serde(rename = "sessionId")]
        session_id: String,
        action: ConfirmAction,
    },
    Feedback {
        #[serde(rename = "sessionId")]
        session_id: String,
        index: usize,
        #[serde(rename = "studentAnswer")]
        student_answer: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionOut,
    },
    Quiz {
        #[serde(rename = "quizText")]
        quiz_text: String,
        questions: Vec<Question>,
    },
    QuestionUpdated {
        index: usize,
        #[serde(rename = "validationScheduled")]
        validation_scheduled: bool,
    },
    QuestionAdded {
        index: usize,
        question: Question,
    },
    QuestionDeleted {
        index: usize,
    },
    Verdict {
        index: usize,
        verdict: ValidationVerdict,
    },
    ValidationSummary {
        total: usize,
        valid: usize,
        invalid: usize,
    },
    Transition {
        outcome: TransitionOutcome,
        phase: SessionPhase,
        #[serde(rename = "quizText")]
        quiz_text: String,
    },
    Feedback {
        text: String,
    },
    Error {
        message: String,
    },
}

/// Resolution of a pending unsaved-exit confirmation.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmAction {
    SaveWithoutValidation,
    Discard,
    Stay,
}

/// Full session view used by both WS and HTTP.
#[derive(Debug, Serialize)]
pub struct SessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub activity: Activity,
    pub phase: SessionPhase,
    #[serde(rename = "quizText")]
    pub quiz_text: String,
    pub questions: Vec<Question>,
    pub verdicts: Vec<VerdictEntryOut>,
    #[serde(rename = "hasUnvalidated")]
    pub has_unvalidated: bool,
}

#[derive(Debug, Serialize)]
pub struct VerdictEntryOut {
    pub index: usize,
    pub verdict: ValidationVerdict,
}

/// Build the public session view from the internal session.
pub fn to_session_out(s: &EditSession) -> SessionOut {
    let mut verdicts: Vec<VerdictEntryOut> = s
        .ledger()
        .iter()
        .map(|(index, verdict)| VerdictEntryOut { index, verdict: verdict.clone() })
        .collect();
    verdicts.sort_by_key(|v| v.index);
    SessionOut {
        session_id: s.id.clone(),
        activity: s.activity,
        phase: s.phase(),
        quiz_text: s.canonical_text().to_string(),
        questions: s.document().questions().to_vec(),
        verdicts,
        has_unvalidated: s.has_unvalidated(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct CreateSessionIn {
    #[serde(rename = "sourceText")]
    pub source_text: String,
    pub annotations: Vec<AnnotationRow>,
    pub activity: Activity,
}

#[derive(Serialize)]
pub struct CreateSessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub annotations: AnnotationGroups,
    #[serde(rename = "skippedRows")]
    pub skipped_rows: Vec<String>,
}

#[derive(Serialize)]
pub struct GenerateOut {
    #[serde(rename = "quizText")]
    pub quiz_text: String,
    pub questions: Vec<Question>,
}

#[derive(Serialize)]
pub struct UpdateQuestionOut {
    #[serde(rename = "validationScheduled")]
    pub validation_scheduled: bool,
}

#[derive(Serialize)]
pub struct AddQuestionOut {
    pub index: usize,
    pub question: Question,
}

#[derive(Serialize)]
pub struct DeleteQuestionOut {
    pub index: usize,
}

#[derive(Serialize)]
pub struct VerdictOut {
    pub index: usize,
    pub verdict: ValidationVerdict,
}

/// Mirror of the editor's "Validation Complete" banner.
#[derive(Serialize)]
pub struct ValidationSummaryOut {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

#[derive(Serialize)]
pub struct TransitionOut {
    pub outcome: TransitionOutcome,
    pub phase: SessionPhase,
    #[serde(rename = "quizText")]
    pub quiz_text: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmIn {
    pub action: ConfirmAction,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackIn {
    pub index: usize,
    #[serde(rename = "studentAnswer")]
    pub student_answer: String,
}

#[derive(Serialize)]
pub struct FeedbackOut {
    pub feedback: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
