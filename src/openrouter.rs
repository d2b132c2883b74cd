//! Minimal OpenRouter client for our use-cases.
//!
//! We only call chat.completions and request plain text. Calls are
//! instrumented and log model names, latencies, and response sizes (not
//! contents). Every request is bounded by the client-wide timeout, and the
//! source text embedded in validation prompts is capped at
//! `SOURCE_TEXT_PROMPT_BUDGET` characters.
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::annotations::AnnotationGroups;
use crate::config::Prompts;
use crate::domain::{Activity, Question, QuestionKind, ValidationVerdict};
use crate::util::{fill_template, truncate_chars};

/// Fixed character budget for the source text sent to the validator.
/// Longer texts are truncated, never sent unbounded.
pub const SOURCE_TEXT_PROMPT_BUDGET: usize = 3000;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "mistralai/mistral-7b-instruct";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct OpenRouter {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenRouter {
  /// Construct the client if we find OPENROUTER_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENROUTER_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENROUTER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

    let client = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// Plain-text chat completion. Transport and HTTP failures come back as
  /// `Err(String)`; the caller decides what an empty completion means.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  pub async fn chat_plain(
    &self,
    system: Option<&str>,
    user: &str,
    temperature: f32,
    max_tokens: u32,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
      messages.push(ChatMessageReq { role: "system".into(), content: system.into() });
    }
    messages.push(ChatMessageReq { role: "user".into(), content: user.into() });

    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages,
      temperature,
      max_tokens: Some(max_tokens),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "quaderno-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      return Err(format!("OpenRouter HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenRouter usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  /// Quiz generation call: one user prompt, creative temperature.
  #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len()))]
  pub async fn generate(&self, prompt: &str) -> Result<String, String> {
    let start = std::time::Instant::now();
    let result = self.chat_plain(None, prompt, 0.7, 2048).await;
    let elapsed = start.elapsed();
    match &result {
      Ok(text) => info!(?elapsed, completion_len = text.len(), "Generation completed"),
      Err(e) => info!(?elapsed, error = %e, "Generation failed"),
    }
    result
  }

  /// Feedback call: creative for open-ended answers, conservative for
  /// multiple choice (the original rubric wants precision there).
  #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len()))]
  pub async fn generate_feedback(&self, prompt: &str, kind: QuestionKind) -> Result<String, String> {
    let temperature = match kind {
      QuestionKind::MultipleChoice => 0.3,
      QuestionKind::OpenEnded => 0.7,
    };
    self.chat_plain(None, prompt, temperature, 1024).await
  }

  /// Ask the validator whether a question's answer holds against the text
  /// and annotations. Transport failure surfaces as `Err` and the caller
  /// must NOT record any verdict for it.
  #[instrument(
    level = "info",
    skip(self, prompts, question, source_text, annotations),
    fields(question_number = question.number, activity = activity.label())
  )]
  pub async fn validate_question(
    &self,
    prompts: &Prompts,
    question: &Question,
    source_text: &str,
    annotations: &AnnotationGroups,
    activity: Activity,
  ) -> Result<ValidationVerdict, String> {
    let text = truncate_chars(source_text, SOURCE_TEXT_PROMPT_BUDGET);
    let rendered_annotations = annotations.render_for_prompt();

    let user = match question.kind {
      QuestionKind::MultipleChoice => {
        let options = question
          .options
          .iter()
          .map(|o| format!("{}) {}", o.letter, o.text))
          .collect::<Vec<_>>()
          .join("\n");
        let chosen_text = question.correct_option_text().unwrap_or("Unknown");
        let answer = format!("{}) {}", question.correct_answer, chosen_text);
        fill_template(&prompts.validation_mc_user_template, &[
          ("text", text),
          ("activity", activity.label()),
          ("annotations", rendered_annotations.as_str()),
          ("question", question.text.as_str()),
          ("options", options.as_str()),
          ("answer", answer.as_str()),
        ])
      }
      QuestionKind::OpenEnded => fill_template(&prompts.validation_oe_user_template, &[
        ("text", text),
        ("activity", activity.label()),
        ("annotations", rendered_annotations.as_str()),
        ("question", question.text.as_str()),
        ("answer", question.correct_answer.as_str()),
      ]),
    };

    let reply = self.chat_plain(Some(&prompts.validation_system), &user, 0.3, 512).await?;
    if reply.is_empty() {
      return Err("empty validation reply".into());
    }
    Ok(parse_validation_reply(&reply))
  }
}

/// Map the validator's free-text reply onto a structured verdict.
/// Missing sections degrade to fixed placeholder strings rather than
/// failing the whole call.
pub fn parse_validation_reply(reply: &str) -> ValidationVerdict {
  let is_valid = reply.contains("VALIDA: Sì") || reply.contains("VALIDA: Si");
  let suggestion = labeled_line(reply, "SUGGERIMENTO: ")
    .unwrap_or("No specific suggestion provided.")
    .to_string();
  let motivation = labeled_line(reply, "MOTIVAZIONE: ")
    .unwrap_or("No explanation provided.")
    .to_string();
  ValidationVerdict { is_valid, suggestion, motivation }
}

fn labeled_line<'a>(reply: &'a str, marker: &str) -> Option<&'a str> {
  let start = reply.find(marker)? + marker.len();
  let rest = &reply[start..];
  Some(rest.split('\n').next().unwrap_or(rest).trim_end())
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenRouter error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn positive_verdict_is_parsed_from_the_reply() {
    let reply = "VALIDA: Sì\nSUGGERIMENTO: La risposta è corretta\nMOTIVAZIONE: Coerente con il testo.";
    let v = parse_validation_reply(reply);
    assert!(v.is_valid);
    assert_eq!(v.suggestion, "La risposta è corretta");
    assert_eq!(v.motivation, "Coerente con il testo.");
  }

  #[test]
  fn unaccented_si_counts_as_valid() {
    assert!(parse_validation_reply("VALIDA: Si").is_valid);
  }

  #[test]
  fn negative_or_malformed_sections_degrade_to_placeholders() {
    let v = parse_validation_reply("VALIDA: No");
    assert!(!v.is_valid);
    assert_eq!(v.suggestion, "No specific suggestion provided.");
    assert_eq!(v.motivation, "No explanation provided.");
  }

  #[test]
  fn sections_stop_at_the_end_of_their_line() {
    let reply = "VALIDA: No\nSUGGERIMENTO: Scegli B\nMOTIVAZIONE: Il testo indica B\naltro rumore";
    let v = parse_validation_reply(reply);
    assert_eq!(v.suggestion, "Scegli B");
    assert_eq!(v.motivation, "Il testo indica B");
  }
}
