//! Editing session: one uploaded text + its annotations + the quiz being
//! edited, coordinated by a small state machine.
//!
//! Phases: `Viewing` (initial), `Editing`, `ConfirmingUnsavedExit`. The
//! canonical quiz text — the system of record — changes ONLY on a save-path
//! transition into `Viewing`; `discard` rebuilds it from the snapshot taken
//! when the editor was opened. Document mutation and ledger reindexing happen
//! inside the same call, so the ledger can never point outside the document.

use serde::Serialize;
use tracing::info;

use crate::annotations::AnnotationGroups;
use crate::document::{QuestionPatch, QuizDocument};
use crate::domain::{Activity, QuestionKind, ValidationVerdict};
use crate::error::QuizError;
use crate::ledger::ValidationLedger;

/// Open-ended answers: a change of more than this many characters in length
/// re-triggers validation.
const OPEN_ANSWER_LEN_DELTA: usize = 20;
/// Open-ended answers: diverging from this long a prefix of the previous
/// answer re-triggers validation (only checked when the previous answer was
/// longer than the prefix).
const OPEN_ANSWER_PREFIX_CHARS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
  Viewing,
  Editing,
  ConfirmingUnsavedExit,
}

impl SessionPhase {
  pub fn name(&self) -> &'static str {
    match self {
      SessionPhase::Viewing => "viewing",
      SessionPhase::Editing => "editing",
      SessionPhase::ConfirmingUnsavedExit => "confirming_unsaved_exit",
    }
  }
}

/// Restore point taken when the editor opens.
#[derive(Clone, Debug)]
struct Snapshot {
  document: QuizDocument,
  ledger: ValidationLedger,
}

/// Outcome of `save` / `request_exit`: either the transition completed, or
/// unvalidated questions exist and the caller must confirm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
  Completed,
  NeedsConfirmation,
}

pub struct EditSession {
  pub id: String,
  pub activity: Activity,
  pub source_text: String,
  pub annotations: AnnotationGroups,
  canonical_text: String,
  document: QuizDocument,
  ledger: ValidationLedger,
  phase: SessionPhase,
  snapshot: Option<Snapshot>,
}

impl EditSession {
  pub fn new(id: String, activity: Activity, source_text: String, annotations: AnnotationGroups) -> Self {
    Self {
      id,
      activity,
      source_text,
      annotations,
      canonical_text: String::new(),
      document: QuizDocument::new(),
      ledger: ValidationLedger::new(),
      phase: SessionPhase::Viewing,
      snapshot: None,
    }
  }

  pub fn phase(&self) -> SessionPhase {
    self.phase
  }

  pub fn canonical_text(&self) -> &str {
    &self.canonical_text
  }

  pub fn document(&self) -> &QuizDocument {
    &self.document
  }

  pub fn ledger(&self) -> &ValidationLedger {
    &self.ledger
  }

  fn require_phase(&self, phase: SessionPhase, operation: &'static str) -> Result<(), QuizError> {
    if self.phase == phase {
      Ok(())
    } else {
      Err(QuizError::InvalidPhase { phase: self.phase.name(), operation })
    }
  }

  /// Install a freshly generated quiz: the raw completion becomes the
  /// canonical text and the parsed form becomes the working document.
  /// Previous verdicts refer to questions that no longer exist, so the
  /// ledger is cleared.
  pub fn install_generated_quiz(&mut self, completion: &str) -> Result<(), QuizError> {
    self.require_phase(SessionPhase::Viewing, "install_generated_quiz")?;
    self.canonical_text = completion.to_string();
    self.document = QuizDocument::from_quiz_text(completion);
    self.ledger.clear();
    self.snapshot = None;
    info!(target: "session", id = %self.id, questions = self.document.len(), "Generated quiz installed");
    Ok(())
  }

  /// Viewing -> Editing, taking the restore point.
  pub fn open_editor(&mut self) -> Result<(), QuizError> {
    self.require_phase(SessionPhase::Viewing, "open_editor")?;
    self.snapshot = Some(Snapshot { document: self.document.clone(), ledger: self.ledger.clone() });
    self.phase = SessionPhase::Editing;
    Ok(())
  }

  /// True while any non-template question has no ledger entry.
  pub fn has_unvalidated(&self) -> bool {
    self
      .document
      .questions()
      .iter()
      .enumerate()
      .any(|(i, q)| !q.is_template() && !self.ledger.is_set(i))
  }

  /// Update one question in place. Returns whether the change should
  /// schedule a best-effort validation call (never for template questions).
  pub fn update_question(&mut self, index: usize, patch: QuestionPatch) -> Result<bool, QuizError> {
    self.require_phase(SessionPhase::Editing, "update_question")?;
    let prev = self.document.get(index)?;
    let was_template = prev.is_template();
    let prev_answer = prev.correct_answer.clone();
    let new_answer = patch.correct_answer.clone();
    let new_kind = patch.kind;
    self.document.update(index, patch)?;
    Ok(!was_template && answer_change_triggers_validation(new_kind, &prev_answer, &new_answer))
  }

  /// Append a template question at the end.
  pub fn add_question(&mut self) -> Result<usize, QuizError> {
    self.require_phase(SessionPhase::Editing, "add_question")?;
    let index = self.document.push_template();
    self.ledger.on_insert_at_end();
    Ok(index)
  }

  /// Delete a question and shift the ledger in the same step.
  pub fn delete_question(&mut self, index: usize) -> Result<(), QuizError> {
    self.require_phase(SessionPhase::Editing, "delete_question")?;
    self.document.delete(index)?;
    self.ledger.on_delete(index);
    Ok(())
  }

  /// Record a validation verdict for the question at `index`.
  /// Bounds-checked so a late result for a deleted question is rejected
  /// rather than dangling past the end of the document.
  pub fn set_verdict(&mut self, index: usize, verdict: ValidationVerdict) -> Result<(), QuizError> {
    if index >= self.document.len() {
      return Err(QuizError::IndexOutOfRange { index, len: self.document.len() });
    }
    self.ledger.set(index, verdict);
    Ok(())
  }

  /// Editing -> Viewing when everything non-template is validated;
  /// otherwise Editing -> ConfirmingUnsavedExit.
  pub fn save(&mut self) -> Result<TransitionOutcome, QuizError> {
    self.require_phase(SessionPhase::Editing, "save")?;
    if self.has_unvalidated() {
      self.phase = SessionPhase::ConfirmingUnsavedExit;
      return Ok(TransitionOutcome::NeedsConfirmation);
    }
    self.commit();
    Ok(TransitionOutcome::Completed)
  }

  /// Editing -> Viewing without touching the canonical text, unless
  /// unvalidated questions force a confirmation first.
  pub fn request_exit(&mut self) -> Result<TransitionOutcome, QuizError> {
    self.require_phase(SessionPhase::Editing, "request_exit")?;
    if self.has_unvalidated() {
      self.phase = SessionPhase::ConfirmingUnsavedExit;
      return Ok(TransitionOutcome::NeedsConfirmation);
    }
    self.snapshot = None;
    self.phase = SessionPhase::Viewing;
    Ok(TransitionOutcome::Completed)
  }

  /// ConfirmingUnsavedExit -> Viewing, committing despite validation gaps.
  pub fn confirm_save_without_validation(&mut self) -> Result<(), QuizError> {
    self.require_phase(SessionPhase::ConfirmingUnsavedExit, "save_without_validation")?;
    self.commit();
    Ok(())
  }

  /// ConfirmingUnsavedExit -> Viewing, restoring document and ledger from
  /// the snapshot and rebuilding the canonical text from the restored
  /// document.
  pub fn confirm_discard(&mut self) -> Result<(), QuizError> {
    self.require_phase(SessionPhase::ConfirmingUnsavedExit, "discard")?;
    if let Some(snapshot) = self.snapshot.take() {
      self.document = snapshot.document;
      self.ledger = snapshot.ledger;
      self.canonical_text = self.document.to_quiz_text();
    }
    self.phase = SessionPhase::Viewing;
    info!(target: "session", id = %self.id, "Edits discarded, snapshot restored");
    Ok(())
  }

  /// ConfirmingUnsavedExit -> Editing, no mutation.
  pub fn confirm_stay(&mut self) -> Result<(), QuizError> {
    self.require_phase(SessionPhase::ConfirmingUnsavedExit, "stay")?;
    self.phase = SessionPhase::Editing;
    Ok(())
  }

  /// The single save path: renumber, serialize, commit, drop the snapshot.
  fn commit(&mut self) {
    self.document.renumber();
    self.canonical_text = self.document.to_quiz_text();
    self.snapshot = None;
    self.phase = SessionPhase::Viewing;
    info!(target: "session", id = %self.id, questions = self.document.len(), "Quiz committed");
  }
}

/// Should an answer edit re-trigger validation?
///
/// Multiple choice: any change of the correct letter. Open-ended: a length
/// change beyond `OPEN_ANSWER_LEN_DELTA` characters, or divergence from the
/// first `OPEN_ANSWER_PREFIX_CHARS` characters of the previous answer.
pub fn answer_change_triggers_validation(kind: QuestionKind, prev: &str, new: &str) -> bool {
  match kind {
    QuestionKind::MultipleChoice => prev != new,
    QuestionKind::OpenEnded => {
      let prev_len = prev.chars().count();
      let new_len = new.chars().count();
      if prev_len.abs_diff(new_len) > OPEN_ANSWER_LEN_DELTA {
        return true;
      }
      if prev_len > OPEN_ANSWER_PREFIX_CHARS {
        let prefix: String = prev.chars().take(OPEN_ANSWER_PREFIX_CHARS).collect();
        return !new.starts_with(&prefix);
      }
      false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::TEMPLATE_QUESTION_TEXT;

  const QUIZ: &str = "1. [Scelta Multipla] Capitale della Francia?\n\
                      - A) Parigi\n- B) Lione\n- C) Nizza\n- D) Roma\n\
                      ✅ Risposta corretta: A\n\n\
                      2. [Risposta Aperta] Spiega perché.\n\
                      ✅ Risposta: Perché è la sede del governo.\n";

  fn verdict(ok: bool) -> ValidationVerdict {
    ValidationVerdict { is_valid: ok, suggestion: "s".into(), motivation: "m".into() }
  }

  fn session_with_quiz() -> EditSession {
    let mut s = EditSession::new("t1".into(), Activity::FiveW, "testo".into(), AnnotationGroups::default());
    s.install_generated_quiz(QUIZ).unwrap();
    s
  }

  fn patch_of(session: &EditSession, index: usize) -> QuestionPatch {
    let q = session.document().get(index).unwrap().clone();
    QuestionPatch { kind: q.kind, text: q.text, options: q.options, correct_answer: q.correct_answer }
  }

  #[test]
  fn editing_requires_an_open_editor() {
    let mut s = session_with_quiz();
    assert!(matches!(s.delete_question(0), Err(QuizError::InvalidPhase { .. })));
    s.open_editor().unwrap();
    s.delete_question(0).unwrap();
    assert_eq!(s.document().len(), 1);
  }

  #[test]
  fn discard_restores_document_ledger_and_canonical_exactly() {
    let mut s = session_with_quiz();
    s.set_verdict(0, verdict(true)).unwrap();
    let doc_before = s.document().clone();
    let ledger_before = s.ledger().clone();

    s.open_editor().unwrap();
    s.delete_question(1).unwrap();
    s.add_question().unwrap();
    s.set_verdict(0, verdict(false)).unwrap();
    assert_ne!(s.document(), &doc_before);

    // Drop the validated question and author the template so an
    // unvalidated question remains: exit must then ask for confirmation.
    s.delete_question(0).unwrap();
    let mut patch = patch_of(&s, 0);
    patch.text = "Domanda scritta a mano".into();
    s.update_question(0, patch).unwrap();
    assert!(s.has_unvalidated());

    assert_eq!(s.request_exit().unwrap(), TransitionOutcome::NeedsConfirmation);
    s.confirm_discard().unwrap();

    assert_eq!(s.document(), &doc_before);
    assert_eq!(s.ledger(), &ledger_before);
    assert_eq!(s.canonical_text(), doc_before.to_quiz_text());
    assert_eq!(s.phase(), SessionPhase::Viewing);
  }

  #[test]
  fn canonical_text_changes_only_on_a_save_path() {
    let mut s = session_with_quiz();
    let canonical_before = s.canonical_text().to_string();

    s.open_editor().unwrap();
    let mut patch = patch_of(&s, 0);
    patch.correct_answer = "B".into();
    s.update_question(0, patch).unwrap();
    assert_eq!(s.canonical_text(), canonical_before);

    // Exit without saving: edits stay in the working document, canonical
    // text untouched.
    s.set_verdict(0, verdict(true)).unwrap();
    s.set_verdict(1, verdict(true)).unwrap();
    assert_eq!(s.request_exit().unwrap(), TransitionOutcome::Completed);
    assert_eq!(s.canonical_text(), canonical_before);

    s.open_editor().unwrap();
    assert_eq!(s.save().unwrap(), TransitionOutcome::Completed);
    assert_ne!(s.canonical_text(), canonical_before);
    assert!(s.canonical_text().contains("✅ Risposta corretta: B"));
  }

  #[test]
  fn unvalidated_questions_force_confirmation_and_stay_keeps_editing() {
    let mut s = session_with_quiz();
    s.open_editor().unwrap();
    assert!(s.has_unvalidated());
    assert_eq!(s.save().unwrap(), TransitionOutcome::NeedsConfirmation);
    assert_eq!(s.phase(), SessionPhase::ConfirmingUnsavedExit);

    s.confirm_stay().unwrap();
    assert_eq!(s.phase(), SessionPhase::Editing);

    assert_eq!(s.request_exit().unwrap(), TransitionOutcome::NeedsConfirmation);
    s.confirm_save_without_validation().unwrap();
    assert_eq!(s.phase(), SessionPhase::Viewing);
    assert!(!s.canonical_text().is_empty());
  }

  #[test]
  fn template_questions_are_exempt_from_the_unvalidated_check() {
    let mut s = session_with_quiz();
    s.set_verdict(0, verdict(true)).unwrap();
    s.set_verdict(1, verdict(true)).unwrap();
    s.open_editor().unwrap();
    s.add_question().unwrap();
    assert!(!s.has_unvalidated());
    assert_eq!(s.save().unwrap(), TransitionOutcome::Completed);
  }

  #[test]
  fn save_renumbers_before_serializing() {
    let mut s = EditSession::new("t2".into(), Activity::Thesis, "testo".into(), AnnotationGroups::default());
    s.install_generated_quiz("4. [Risposta Aperta] Prima.\n✅ Risposta: a\n\n9. [Risposta Aperta] Seconda.\n✅ Risposta: b\n")
      .unwrap();
    s.set_verdict(0, verdict(true)).unwrap();
    s.set_verdict(1, verdict(true)).unwrap();
    s.open_editor().unwrap();
    s.save().unwrap();
    assert!(s.canonical_text().starts_with("1. [Risposta Aperta]"));
    assert!(s.canonical_text().contains("\n2. [Risposta Aperta]"));
  }

  #[test]
  fn late_verdict_for_a_deleted_question_is_rejected() {
    let mut s = session_with_quiz();
    s.open_editor().unwrap();
    s.delete_question(1).unwrap();
    assert!(matches!(s.set_verdict(1, verdict(true)), Err(QuizError::IndexOutOfRange { .. })));
  }

  #[test]
  fn updating_a_template_question_never_triggers_validation() {
    let mut s = session_with_quiz();
    s.open_editor().unwrap();
    let index = s.add_question().unwrap();
    let mut patch = patch_of(&s, index);
    patch.correct_answer = "D".into();
    assert!(!s.update_question(index, patch).unwrap());
    // Once authored (text no longer the sentinel), changes trigger again.
    let mut patch = patch_of(&s, index);
    patch.text = "Domanda vera?".into();
    s.update_question(index, patch).unwrap();
    let mut patch = patch_of(&s, index);
    patch.correct_answer = "B".into();
    assert!(s.update_question(index, patch).unwrap());
    assert_ne!(s.document().get(index).unwrap().text, TEMPLATE_QUESTION_TEXT);
  }

  #[test]
  fn answer_change_policy_matches_the_thresholds() {
    use QuestionKind::*;
    assert!(answer_change_triggers_validation(MultipleChoice, "A", "B"));
    assert!(!answer_change_triggers_validation(MultipleChoice, "A", "A"));

    // Length delta beyond 20 chars.
    assert!(answer_change_triggers_validation(OpenEnded, "corta", &"x".repeat(40)));
    assert!(!answer_change_triggers_validation(OpenEnded, "corta", "corta e poco più"));

    // Prefix divergence only counts when the previous answer is long enough.
    let prev = "una risposta piuttosto articolata";
    assert!(answer_change_triggers_validation(OpenEnded, prev, "tutta un'altra risposta lun"));
    assert!(!answer_change_triggers_validation(OpenEnded, prev, "una rispos… variante corta"));
  }
}
