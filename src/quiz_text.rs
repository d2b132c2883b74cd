//! Canonical quiz text: the line-oriented grammar produced by the generator
//! and persisted as the system of record, plus its parser and formatter.
//!
//! The parser is deliberately lenient: the input is AI-generated text of
//! variable formatting quality, so any line that matches none of the grammar
//! rules is dropped silently instead of failing the whole document. The
//! formatter is the right inverse of the parser for documents produced
//! through the normal editing contract.
//!
//! The structural markers below are protocol tokens, not prose. They stay
//! exactly as-is even when the question content is in another language.

use crate::domain::{AnswerOption, Question, QuestionKind};

pub const MULTIPLE_CHOICE_LABEL: &str = "Scelta Multipla";
pub const OPEN_ENDED_LABEL: &str = "Risposta Aperta";
pub const ANSWER_KEY_MARKER: &str = "✅ Risposta corretta:";
pub const FREE_ANSWER_MARKER: &str = "✅ Risposta:";

/// Parse a quiz text into structured questions.
///
/// Question numbers are read verbatim and are NOT assumed contiguous here;
/// contiguity is a `QuizDocument` invariant enforced after mutations, not a
/// property of generator output. A multiple-choice question with no matched
/// answer-key line keeps the default answer "A"; an open-ended question with
/// no matched answer line keeps an empty answer.
pub fn parse_quiz_text(quiz_text: &str) -> Vec<Question> {
  let mut questions: Vec<Question> = Vec::new();
  let mut current: Option<Question> = None;

  for raw in quiz_text.trim().lines() {
    let line = raw.trim();

    if let Some((number, kind, text)) = parse_header(line) {
      if let Some(done) = current.take() {
        questions.push(done);
      }
      let correct_answer = match kind {
        QuestionKind::MultipleChoice => "A".to_string(),
        QuestionKind::OpenEnded => String::new(),
      };
      current = Some(Question { number, kind, text, options: Vec::new(), correct_answer });
      continue;
    }

    let Some(q) = current.as_mut() else { continue };

    if q.kind == QuestionKind::MultipleChoice {
      if let Some((letter, text)) = parse_option_line(line) {
        q.options.push(AnswerOption { letter, text });
        continue;
      }
    }

    if let Some(rest) = line.strip_prefix(ANSWER_KEY_MARKER) {
      match q.kind {
        QuestionKind::MultipleChoice => {
          // A malformed letter leaves the prior/default value in place.
          if let Some(letter) = parse_answer_letter(rest) {
            q.correct_answer = letter;
          }
        }
        QuestionKind::OpenEnded => q.correct_answer = rest.trim().to_string(),
      }
    } else if q.kind == QuestionKind::OpenEnded {
      if let Some(rest) = line.strip_prefix(FREE_ANSWER_MARKER) {
        q.correct_answer = rest.trim().to_string();
      }
    }
  }

  if let Some(done) = current.take() {
    questions.push(done);
  }
  questions
}

/// Serialize questions back to the canonical text form.
pub fn format_quiz(questions: &[Question]) -> String {
  let mut out = String::new();
  for q in questions {
    let label = match q.kind {
      QuestionKind::MultipleChoice => MULTIPLE_CHOICE_LABEL,
      QuestionKind::OpenEnded => OPEN_ENDED_LABEL,
    };
    out.push_str(&format!("{}. [{}] {}\n\n", q.number, label, q.text));
    match q.kind {
      QuestionKind::MultipleChoice => {
        for opt in &q.options {
          out.push_str(&format!("- {}) {}\n", opt.letter, opt.text));
        }
        out.push_str(&format!("{} {}\n\n", ANSWER_KEY_MARKER, q.correct_answer));
      }
      QuestionKind::OpenEnded => {
        out.push_str(&format!("{} {}\n\n", FREE_ANSWER_MARKER, q.correct_answer));
      }
    }
  }
  out
}

/// `<digits>. [<label>] <text>` with at least one whitespace after the dot
/// and after the closing bracket.
fn parse_header(line: &str) -> Option<(u32, QuestionKind, String)> {
  let (digits, rest) = line.split_once('.')?;
  if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
    return None;
  }
  let number: u32 = digits.parse().ok()?;

  let after_dot = rest.trim_start();
  if after_dot.len() == rest.len() {
    return None;
  }
  let (label, tail) = after_dot.strip_prefix('[')?.split_once(']')?;
  let kind = match label {
    MULTIPLE_CHOICE_LABEL => QuestionKind::MultipleChoice,
    OPEN_ENDED_LABEL => QuestionKind::OpenEnded,
    _ => return None,
  };

  let text = tail.trim_start();
  if text.len() == tail.len() || text.is_empty() {
    return None;
  }
  Some((number, kind, text.to_string()))
}

/// `- <Letter>) <text>` with Letter in A-D.
fn parse_option_line(line: &str) -> Option<(char, String)> {
  if !line.starts_with("- ") {
    return None;
  }
  let rest = line[1..].trim_start();
  let mut chars = rest.chars();
  let letter = chars.next()?;
  if !('A'..='D').contains(&letter) || chars.next()? != ')' {
    return None;
  }
  let tail = chars.as_str();
  let text = tail.trim_start();
  if text.len() == tail.len() || text.is_empty() {
    return None;
  }
  Some((letter, text.to_string()))
}

/// At least one whitespace after the colon, then a bare letter A-D.
/// Anything after the letter is tolerated.
fn parse_answer_letter(rest: &str) -> Option<String> {
  let trimmed = rest.trim_start();
  if trimmed.len() == rest.len() {
    return None;
  }
  let letter = trimmed.chars().next()?;
  if ('A'..='D').contains(&letter) {
    Some(letter.to_string())
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mc(number: u32, text: &str, options: &[(char, &str)], answer: &str) -> Question {
    Question {
      number,
      kind: QuestionKind::MultipleChoice,
      text: text.into(),
      options: options.iter().map(|(l, t)| AnswerOption::new(*l, *t)).collect(),
      correct_answer: answer.into(),
    }
  }

  fn oe(number: u32, text: &str, answer: &str) -> Question {
    Question {
      number,
      kind: QuestionKind::OpenEnded,
      text: text.into(),
      options: vec![],
      correct_answer: answer.into(),
    }
  }

  #[test]
  fn two_question_scenario_parses_and_reformats() {
    let text = "1. [Scelta Multipla] Capital of France?\n\
                - A) Paris\n\
                - B) Lyon\n\
                - C) Nice\n\
                - D) Rome\n\
                ✅ Risposta corretta: A\n\
                \n\
                2. [Risposta Aperta] Explain why.\n\
                ✅ Risposta: Because it is the seat of government.\n";
    let parsed = parse_quiz_text(text);
    assert_eq!(parsed.len(), 2);

    assert_eq!(parsed[0].kind, QuestionKind::MultipleChoice);
    assert_eq!(parsed[0].options.len(), 4);
    assert_eq!(parsed[0].correct_answer, "A");
    assert_eq!(parsed[1].kind, QuestionKind::OpenEnded);
    assert_eq!(parsed[1].correct_answer, "Because it is the seat of government.");

    let reparsed = parse_quiz_text(&format_quiz(&parsed));
    assert_eq!(reparsed, parsed);
  }

  #[test]
  fn round_trip_preserves_every_field() {
    let doc = vec![
      mc(1, "Chi guidò la spedizione?", &[('A', "Magellano"), ('B', "Colombo"), ('C', "Vespucci"), ('D', "Caboto")], "B"),
      oe(2, "Perché la spedizione partì in autunno?", "Per sfruttare i venti favorevoli."),
      mc(3, "Dove approdò la flotta?", &[('A', "Cuba"), ('B', "Hispaniola")], "A"),
      oe(4, "Collega il chi e il dove della vicenda.", ""),
    ];
    assert_eq!(parse_quiz_text(&format_quiz(&doc)), doc);
  }

  #[test]
  fn missing_answer_key_defaults_to_a_for_multiple_choice() {
    let parsed = parse_quiz_text("1. [Scelta Multipla] Q1?\n- A) x\n- B) y\n");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].options.len(), 2);
    assert_eq!(parsed[0].correct_answer, "A");
  }

  #[test]
  fn missing_answer_defaults_to_empty_for_open_ended() {
    let parsed = parse_quiz_text("1. [Risposta Aperta] Spiega il concetto.\n");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].correct_answer, "");
  }

  #[test]
  fn malformed_answer_letter_keeps_the_default() {
    let parsed = parse_quiz_text(
      "1. [Scelta Multipla] Q?\n- A) x\n- B) y\n✅ Risposta corretta: E\n",
    );
    assert_eq!(parsed[0].correct_answer, "A");
    let parsed = parse_quiz_text(
      "1. [Scelta Multipla] Q?\n- A) x\n✅ Risposta corretta:B\n",
    );
    // No whitespace after the colon: the marker line is not a valid key.
    assert_eq!(parsed[0].correct_answer, "A");
  }

  #[test]
  fn stray_generator_prose_is_ignored() {
    let text = "Ecco il quiz richiesto:\n\
                \n\
                1. [Scelta Multipla] Quando avvenne la battaglia?\n\
                Le opzioni sono le seguenti:\n\
                - A) 1812\n\
                - B) 1815\n\
                ✅ Risposta corretta: B\n\
                Spero che il quiz sia utile!\n";
    let parsed = parse_quiz_text(text);
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].options.len(), 2);
    assert_eq!(parsed[0].correct_answer, "B");
  }

  #[test]
  fn question_numbers_are_read_verbatim() {
    let text = "3. [Risposta Aperta] Prima domanda.\n✅ Risposta: a\n\n7. [Risposta Aperta] Seconda domanda.\n✅ Risposta: b\n";
    let parsed = parse_quiz_text(text);
    assert_eq!(parsed[0].number, 3);
    assert_eq!(parsed[1].number, 7);
  }

  #[test]
  fn answer_key_marker_feeds_the_free_text_of_an_open_ended_question() {
    let parsed = parse_quiz_text(
      "1. [Risposta Aperta] Perché?\n✅ Risposta corretta: Perché il testo lo afferma.\n",
    );
    assert_eq!(parsed[0].correct_answer, "Perché il testo lo afferma.");
  }

  #[test]
  fn option_lines_are_ignored_for_open_ended_questions() {
    let parsed = parse_quiz_text(
      "1. [Risposta Aperta] Perché?\n- A) non pertinente\n✅ Risposta: Testo.\n",
    );
    assert!(parsed[0].options.is_empty());
    assert_eq!(parsed[0].correct_answer, "Testo.");
  }

  #[test]
  fn header_requires_whitespace_around_the_label() {
    assert!(parse_quiz_text("1.[Scelta Multipla] Q?\n").is_empty());
    assert!(parse_quiz_text("1. [Scelta Multipla]Q?\n").is_empty());
    assert!(parse_quiz_text("x1. [Scelta Multipla] Q?\n").is_empty());
  }

  #[test]
  fn blank_line_between_header_and_options_is_tolerated() {
    // The formatter itself emits a blank line after the header.
    let text = "1. [Scelta Multipla] Q?\n\n- A) x\n- B) y\n\n✅ Risposta corretta: B\n";
    let parsed = parse_quiz_text(text);
    assert_eq!(parsed[0].options.len(), 2);
    assert_eq!(parsed[0].correct_answer, "B");
  }
}
