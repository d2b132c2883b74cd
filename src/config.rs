//! Loading prompt configuration from TOML.
//!
//! Validation prompts are the only tunable surface: schools tend to tweak
//! tone and rubric wording without touching code. Everything structural
//! (the quiz format markers) lives in `quiz_text.rs` and is not configurable.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts used by the validation calls. Defaults match the platform's
/// standard Italian rubric; override them in TOML to tune tone/structure.
///
/// User templates understand `{text}`, `{activity}`, `{annotations}`,
/// `{question}`, `{options}`, `{answer}` placeholders.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub validation_system: String,
  pub validation_mc_user_template: String,
  pub validation_oe_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      validation_system:
        "Sei un revisore di quiz scolastici. Valuti se la risposta indicata è davvero corretta rispetto al testo e alle annotazioni. Rispondi sempre nel formato richiesto, senza testo aggiuntivo.".into(),
      validation_mc_user_template:
        "Valuta se la risposta selezionata per questa domanda è corretta, basandoti sul testo e sulle annotazioni fornite.\n\n\
         TESTO:\n{text}\n\n\
         ANNOTAZIONI ({activity}):\n{annotations}\n\n\
         DOMANDA:\n{question}\n\n\
         OPZIONI:\n{options}\n\n\
         RISPOSTA SELEZIONATA: {answer}\n\n\
         Valuta se la risposta è corretta in base al testo. Rispondi in questo formato:\n\
         VALIDA: [Sì/No]\n\
         SUGGERIMENTO: [La tua raccomandazione se \"No\", o \"La risposta è corretta\" se \"Sì\"]\n\
         MOTIVAZIONE: [Breve spiegazione]".into(),
      validation_oe_user_template:
        "Valuta se la risposta fornita per questa domanda a risposta aperta è corretta.\n\n\
         TESTO:\n{text}\n\n\
         ANNOTAZIONI ({activity}):\n{annotations}\n\n\
         DOMANDA:\n{question}\n\n\
         RISPOSTA FORNITA:\n{answer}\n\n\
         Valuta la risposta. Rispondi in questo formato:\n\
         VALIDA: [Sì/No]\n\
         SUGGERIMENTO: [Il tuo suggerimento se necessario, o \"La risposta è corretta\" se adeguata]\n\
         MOTIVAZIONE: [Breve spiegazione]".into(),
    }
  }
}

/// Attempt to load `AppConfig` from QUADERNO_CONFIG_PATH.
/// On any parsing/IO error, returns None and the defaults apply.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUADERNO_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quaderno_backend", %path, "Loaded prompt config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quaderno_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quaderno_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn toml_overrides_only_what_it_names() {
    let cfg: AppConfig = toml::from_str(
      r#"
        [prompts]
        validation_system = "custom"
        validation_mc_user_template = "mc {question}"
        validation_oe_user_template = "oe {answer}"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.prompts.validation_system, "custom");

    let empty: AppConfig = toml::from_str("").unwrap();
    assert!(empty.prompts.validation_mc_user_template.contains("VALIDA"));
  }
}
