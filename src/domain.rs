//! Domain models: question kinds, answer options, validation verdicts, and
//! the closed set of annotation activities.

use serde::{Deserialize, Serialize};

/// Prompt text of a freshly inserted question that has not been authored yet.
/// Questions carrying this text are exempt from validation requirements.
pub const TEMPLATE_QUESTION_TEXT: &str = "New question text";

/// What kind of question is presented to the student?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  /// Four lettered options, one correct letter.
  MultipleChoice,
  /// Free text answer, graded against a model answer.
  OpenEnded,
}

/// One lettered option of a multiple-choice question.
/// `letter` is one of A-D, unique within a question; `text` may be empty
/// while the option is being edited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
  pub letter: char,
  pub text: String,
}

impl AnswerOption {
  pub fn new(letter: char, text: impl Into<String>) -> Self {
    Self { letter, text: text.into() }
  }
}

/// One assessment item of a quiz.
///
/// `number` is 1-based and display-ordered; it is renumbered to `1..=N` by
/// `QuizDocument` after every structural mutation. For multiple choice,
/// `correct_answer` holds a letter A-D; for open-ended it holds the model
/// answer as free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub number: u32,
  pub kind: QuestionKind,
  pub text: String,
  #[serde(default)]
  pub options: Vec<AnswerOption>,
  #[serde(default)]
  pub correct_answer: String,
}

impl Question {
  /// Template question appended by the editor's "add question" action.
  pub fn template(number: u32) -> Self {
    Self {
      number,
      kind: QuestionKind::MultipleChoice,
      text: TEMPLATE_QUESTION_TEXT.to_string(),
      options: vec![
        AnswerOption::new('A', "Option A"),
        AnswerOption::new('B', "Option B"),
        AnswerOption::new('C', "Option C"),
        AnswerOption::new('D', "Option D"),
      ],
      correct_answer: "A".to_string(),
    }
  }

  pub fn is_template(&self) -> bool {
    self.text == TEMPLATE_QUESTION_TEXT
  }

  /// Text of the option matching `correct_answer`, if any.
  pub fn correct_option_text(&self) -> Option<&str> {
    let letter = self.correct_answer.chars().next()?;
    self.options.iter().find(|o| o.letter == letter).map(|o| o.text.as_str())
  }
}

/// Outcome of one AI validation call for one question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
  pub is_valid: bool,
  pub suggestion: String,
  pub motivation: String,
}

/// Annotation activity the uploaded text was tagged with. Selected once at
/// session creation; each variant carries its own quiz and feedback prompt
/// builders (see `activity.rs`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
  FiveW,
  Thesis,
  Argument,
  Connective,
}

impl Activity {
  /// Label shown to teachers and embedded in validation prompts.
  pub fn label(&self) -> &'static str {
    match self {
      Activity::FiveW => "5W",
      Activity::Thesis => "Thesis",
      Activity::Argument => "Argument",
      Activity::Connective => "Connective",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_question_is_recognized() {
    let q = Question::template(3);
    assert!(q.is_template());
    assert_eq!(q.number, 3);
    assert_eq!(q.options.len(), 4);
    assert_eq!(q.correct_answer, "A");
  }

  #[test]
  fn correct_option_text_follows_the_answer_letter() {
    let mut q = Question::template(1);
    q.correct_answer = "C".into();
    assert_eq!(q.correct_option_text(), Some("Option C"));
    q.correct_answer = "Z".into();
    assert_eq!(q.correct_option_text(), None);
  }
}
