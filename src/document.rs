//! The editable quiz: an ordered sequence of questions with contiguous
//! 1-based numbering enforced after every structural mutation.

use serde::{Deserialize, Serialize};

use crate::domain::{AnswerOption, Question, QuestionKind};
use crate::error::QuizError;
use crate::quiz_text;

/// Mutable fields of a question, applied in place by `update`.
/// Position and `number` are never touched by an update.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuestionPatch {
  pub kind: QuestionKind,
  pub text: String,
  #[serde(default)]
  pub options: Vec<AnswerOption>,
  #[serde(default)]
  pub correct_answer: String,
}

/// Ordered question sequence. Invariant: outside an in-progress mutation,
/// `number` values are exactly `1..=len` in sequence order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDocument {
  questions: Vec<Question>,
}

impl QuizDocument {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a document from generator output. Numbers are kept verbatim by
  /// the parser, so generator quirks (gaps, restarts) survive until the
  /// first mutation renumbers them.
  pub fn from_quiz_text(text: &str) -> Self {
    Self { questions: quiz_text::parse_quiz_text(text) }
  }

  /// Serialize to the canonical text form.
  pub fn to_quiz_text(&self) -> String {
    quiz_text::format_quiz(&self.questions)
  }

  pub fn len(&self) -> usize {
    self.questions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.questions.is_empty()
  }

  pub fn questions(&self) -> &[Question] {
    &self.questions
  }

  pub fn get(&self, index: usize) -> Result<&Question, QuizError> {
    self.questions.get(index).ok_or(QuizError::IndexOutOfRange { index, len: self.questions.len() })
  }

  /// Append a question and renumber the whole sequence.
  pub fn push(&mut self, question: Question) {
    self.questions.push(question);
    self.renumber();
  }

  /// Append a fresh template question; returns its index.
  pub fn push_template(&mut self) -> usize {
    self.push(Question::template(self.questions.len() as u32 + 1));
    self.questions.len() - 1
  }

  /// Remove the question at `index` and renumber the remaining ones.
  pub fn delete(&mut self, index: usize) -> Result<Question, QuizError> {
    if index >= self.questions.len() {
      return Err(QuizError::IndexOutOfRange { index, len: self.questions.len() });
    }
    let removed = self.questions.remove(index);
    self.renumber();
    Ok(removed)
  }

  /// Replace the mutable fields of the question at `index` in place.
  pub fn update(&mut self, index: usize, patch: QuestionPatch) -> Result<(), QuizError> {
    let len = self.questions.len();
    let q = self.questions.get_mut(index).ok_or(QuizError::IndexOutOfRange { index, len })?;
    q.kind = patch.kind;
    q.text = patch.text;
    q.options = match patch.kind {
      QuestionKind::MultipleChoice => patch.options,
      QuestionKind::OpenEnded => Vec::new(),
    };
    q.correct_answer = patch.correct_answer;
    Ok(())
  }

  /// Idempotent: the i-th question (0-based) gets number i+1.
  pub fn renumber(&mut self) {
    for (i, q) in self.questions.iter_mut().enumerate() {
      q.number = i as u32 + 1;
    }
  }

  #[cfg(test)]
  fn numbers(&self) -> Vec<u32> {
    self.questions.iter().map(|q| q.number).collect()
  }

  #[cfg(test)]
  pub fn numbers_are_contiguous(&self) -> bool {
    self.numbers() == (1..=self.questions.len() as u32).collect::<Vec<_>>()
  }
}
