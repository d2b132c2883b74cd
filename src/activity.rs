//! Per-activity prompt builders for quiz generation and student feedback.
//!
//! Each `Activity` variant owns its own task framing; the structural format
//! rules are shared because the parser depends on them. The builders return
//! plain prompt strings; quality of the generated content is entirely the
//! external model's business.

use crate::annotations::AnnotationGroups;
use crate::domain::{Activity, AnswerOption, QuestionKind};
use crate::util::{fill_template, truncate_chars};

/// Character budget for the source-text excerpt embedded in feedback prompts.
const FEEDBACK_TEXT_EXCERPT_CHARS: usize = 500;

/// Predominant language of the uploaded text, detected from indicator words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextLanguage {
  Italian,
  English,
}

/// Crude but effective: count common function words of each language.
/// Ties resolve to Italian, the platform's primary audience.
pub fn detect_text_language(text: &str) -> TextLanguage {
  const ITALIAN: [&str; 10] = ["il", "la", "di", "che", "è", "sono", "della", "del", "una", "un"];
  const ENGLISH: [&str; 10] = ["the", "is", "are", "was", "were", "of", "and", "to", "in", "a"];

  let lower = text.to_lowercase();
  let count = |words: &[&str]| -> usize {
    words.iter().map(|w| lower.matches(&format!(" {} ", w)).count()).sum()
  };
  if count(&ENGLISH) > count(&ITALIAN) { TextLanguage::English } else { TextLanguage::Italian }
}

// The structural markers in this block are protocol tokens the parser relies
// on; they stay in Italian regardless of the content language.
const QUIZ_FORMAT_RULES: &str = r#"FORMATO RICHIESTO:
- Numero e tipo di domanda (es. "1. [Scelta Multipla]" o "3. [Risposta Aperta]")
- Per le domande a scelta multipla, opzioni una per riga e risposta corretta a capo dopo le opzioni:

    numero domanda. [Scelta Multipla] testo della domanda:
        - A) opzione A
        - B) opzione B
        - C) opzione C
        - D) opzione D

        ✅ Risposta corretta: lettera della risposta corretta

- Per le domande a risposta aperta, la risposta corretta segue il testo della domanda:

    numero domanda. [Risposta Aperta] testo della domanda:
    ✅ Risposta: testo della risposta corretta

NON usare un modello fisso di domande: crea domande originali adattate al testo fornito.
NON aggiungere spiegazioni o commenti extra al quiz."#;

const LANGUAGE_RULES_IT: &str = r#"Regola lingua (OBBLIGATORIA):
- Il testo è in italiano, quindi il quiz deve essere generato in italiano.
- NON tradurre i contenuti del testo; conserva nomi propri e citazioni come nell'originale.
- Mantieni SEMPRE le etichette di struttura "[Scelta Multipla]", "[Risposta Aperta]",
  "✅ Risposta corretta:", "✅ Risposta:" e i marcatori A) B) C) D) esattamente come indicato."#;

const LANGUAGE_RULES_EN: &str = r#"LANGUAGE RULE (MANDATORY):
- The input text is in ENGLISH, so the quiz MUST be generated in ENGLISH.
- Do NOT translate the text content; keep proper nouns and citations as in the text.
- Exception: keep the Italian structural labels "[Scelta Multipla]", "[Risposta Aperta]",
  "✅ Risposta corretta:", "✅ Risposta:" and the A) B) C) D) markers exactly as given."#;

const QUIZ_PROMPT_TEMPLATE: &str = r#"{persona}

TESTO:
{text}

ANNOTAZIONI ({activity}):
{annotations}

ISTRUZIONI:
{task}

{format_rules}

{language_rules}
"#;

impl Activity {
  fn quiz_persona(&self) -> &'static str {
    match self {
      Activity::FiveW => {
        "Sei un assistente educativo specializzato nella creazione di quiz basati sulle 5W (Who, What, When, Where, Why)."
      }
      Activity::Thesis => {
        "Sei un assistente educativo esperto nell'individuazione della TESI di un testo e delle sue riformulazioni."
      }
      Activity::Argument => {
        "Sei un assistente educativo esperto nell'analisi del TESTO ARGOMENTATIVO: tesi, antitesi, argomenti a sostegno e controargomentazioni."
      }
      Activity::Connective => {
        "Sei un assistente educativo specializzato nell'analisi di connettivi testuali."
      }
    }
  }

  fn quiz_task(&self, lang: TextLanguage) -> String {
    let lead = match lang {
      TextLanguage::Italian => "Crea un quiz di comprensione in italiano basato sulle annotazioni fornite.",
      TextLanguage::English => "Create a comprehension quiz in ENGLISH grounded in the provided annotations.",
    };
    let focus = match self {
      Activity::FiveW => {
        "Il quiz deve includere:\n\
         1. 2 domande a scelta multipla (4 opzioni ciascuna): una su CHI o COSA, una su QUANDO, DOVE o PERCHÉ.\n\
         2. 1 domanda a risposta aperta che richieda di collegare più elementi delle 5W.\n\
         Ogni domanda deve testare la comprensione specifica degli elementi 5W e avere risposte verificabili dal testo."
      }
      Activity::Thesis => {
        "Il quiz deve includere:\n\
         1. 2 domande a scelta multipla (4 opzioni ciascuna) sull'identificazione della tesi e sulla sua funzione nel testo.\n\
         2. 1 domanda a risposta aperta che chieda di riformulare la tesi con parole proprie.\n\
         Ogni domanda deve distinguere la tesi dalle opinioni secondarie presenti nel testo."
      }
      Activity::Argument => {
        "Genera esattamente 3 domande basate sulle annotazioni:\n\
         1. [Scelta Multipla] identificazione della TESI o dell'ANTITESI.\n\
         2. [Scelta Multipla] riconoscimento degli ARGOMENTI a sostegno o dei CONTROARGOMENTI.\n\
         3. [Risposta Aperta] valutazione della struttura logica (tesi, argomenti, controargomenti, conclusione).\n\
         Le domande devono valutare la capacità di distinguere argomenti a favore e argomenti che confutano."
      }
      Activity::Connective => {
        "Il quiz deve includere:\n\
         1. 2 domande a scelta multipla (4 opzioni ciascuna): una sulla funzione dei connettivi annotati, una sul loro effetto sulla struttura del testo.\n\
         2. 1 domanda a risposta aperta sulla riscrittura di un passaggio con connettivi diversi.\n\
         Ogni domanda deve essere basata sulle annotazioni e testare la comprensione dei connettivi."
      }
    };
    format!("{lead} {focus}")
  }

  /// Prompt asking the generator for a fresh quiz over `text`.
  pub fn build_quiz_prompt(&self, text: &str, annotations: &AnnotationGroups) -> String {
    let lang = detect_text_language(text);
    let language_rules = match lang {
      TextLanguage::Italian => LANGUAGE_RULES_IT,
      TextLanguage::English => LANGUAGE_RULES_EN,
    };
    let rendered_annotations = annotations.render_for_prompt();
    let task = self.quiz_task(lang);
    fill_template(QUIZ_PROMPT_TEMPLATE, &[
      ("persona", self.quiz_persona()),
      ("text", text),
      ("activity", self.label()),
      ("annotations", rendered_annotations.as_str()),
      ("task", task.as_str()),
      ("format_rules", QUIZ_FORMAT_RULES),
      ("language_rules", language_rules),
    ])
  }

  fn feedback_focus(&self) -> &'static str {
    match self {
      Activity::FiveW => "le annotazioni 5W (Who, What, When, Where, Why)",
      Activity::Thesis => "la tesi annotata e le sue riformulazioni",
      Activity::Argument => "la struttura argomentativa annotata (tesi, antitesi, argomenti, controargomenti)",
      Activity::Connective => "i connettivi annotati e la loro funzione testuale",
    }
  }

  /// Prompt asking the generator to comment on a student answer.
  pub fn build_feedback_prompt(&self, req: &FeedbackRequest<'_>) -> String {
    let excerpt = excerpt_for_feedback(req.source_text);
    let annotations = req.annotations.render_for_prompt();
    match req.kind {
      QuestionKind::MultipleChoice => {
        let options = req
          .options
          .iter()
          .map(|o| format!("{}) {}", o.letter, o.text))
          .collect::<Vec<_>>()
          .join("\n");
        let correct_text = option_text(req.options, req.correct_answer);
        let student_text = option_text(req.options, req.student_answer);
        format!(
          "Sei un tutor educativo che fornisce feedback per domande a scelta multipla basate su testi annotati. \
           Chiarisci le incomprensioni rimandando con precisione a {focus} e al testo.\n\n\
           DOMANDA: {question}\n\n\
           OPZIONI:\n{options}\n\n\
           RISPOSTA CORRETTA: {correct}) {correct_text}\n\
           RISPOSTA DELLO STUDENTE: {student}) {student_text}\n\n\
           ANNOTAZIONI DI RIFERIMENTO ({activity}):\n{annotations}\n\n\
           CONTESTO TESTUALE:\n{excerpt}\n\n\
           ISTRUZIONI OPERATIVE:\n\
           - Se la risposta dello studente è CORRETTA: una sola riga \"✅ Corretto:\" con un riferimento testuale a supporto.\n\
           - Se è SBAGLIATA: tre sezioni brevi con ESATTAMENTE questi titoli:\n\
           **☀️ RICONOSCIMENTO:** [1 frase sull'impegno o sulla logica dello studente]\n\
           **🎯 CHIARIMENTO:** [perché la risposta corretta è giusta e dove la scelta dello studente è imprecisa; richiama un'annotazione]\n\
           **📍 RIFERIMENTO TESTUALE:** [dove rileggere: citazione ≤8 parole o annotazione]\n\
           - Non confondere mai la risposta dello studente con quella corretta.\n\
           - Se la scelta dello studente è vuota o non è A, B, C oppure D, scrivi: \"Risposta non valida: seleziona A,B,C oppure D\" e chiudi.\n\n\
           FEEDBACK:",
          focus = self.feedback_focus(),
          question = req.question_text,
          options = options,
          correct = req.correct_answer,
          correct_text = correct_text,
          student = req.student_answer,
          student_text = student_text,
          activity = self.label(),
          annotations = annotations,
          excerpt = excerpt,
        )
      }
      QuestionKind::OpenEnded => format!(
        "Sei un tutor educativo che fornisce feedback basato su testi annotati. Guida lo studente verso una \
         comprensione più precisa attraverso riferimenti a {focus}. Rispondi SOLO in italiano.\n\n\
         DOMANDA: {question}\n\n\
         RISPOSTA ATTESA (modello): {correct}\n\n\
         RISPOSTA DELLO STUDENTE (da valutare): {student}\n\n\
         ANNOTAZIONI DI RIFERIMENTO ({activity}):\n{annotations}\n\n\
         CONTESTO TESTUALE (estratto):\n{excerpt}\n\n\
         ISTRUZIONI DI OUTPUT (OBBLIGATORIE):\n\
         - Produci ESATTAMENTE tre sezioni con questi titoli, frasi brevi, massimo ~120 parole totali:\n\
         **☀️ ASPETTI POSITIVI:** [uno o due elementi corretti della risposta dello studente, con l'annotazione pertinente]\n\
         **🎯 SUGGERIMENTO PER MIGLIORARE:** [un solo suggerimento operativo collegato a un'annotazione o a un passaggio preciso]\n\
         **🤔 DOMANDA METACOGNITIVA:** [una sola domanda breve che rimandi a una sezione del testo o a un'annotazione]\n\
         - Valuta SOLO la risposta dello studente, senza confonderla con quella attesa.\n\
         - Se la risposta dello studente è vuota, fuori tema o sotto le 5 parole, segnala la criticità e proponi un micro-passo per riprovare.\n\n\
         FEEDBACK:",
        focus = self.feedback_focus(),
        question = req.question_text,
        correct = req.correct_answer,
        student = req.student_answer,
        activity = self.label(),
        annotations = annotations,
        excerpt = excerpt,
      ),
    }
  }
}

/// Everything a feedback prompt needs about one student answer.
pub struct FeedbackRequest<'a> {
  pub kind: QuestionKind,
  pub question_text: &'a str,
  pub options: &'a [AnswerOption],
  pub correct_answer: &'a str,
  pub student_answer: &'a str,
  pub annotations: &'a AnnotationGroups,
  pub source_text: &'a str,
}

fn option_text(options: &[AnswerOption], letter: &str) -> String {
  let wanted = letter.chars().next();
  options
    .iter()
    .find(|o| Some(o.letter) == wanted)
    .map(|o| o.text.clone())
    .unwrap_or_default()
}

fn excerpt_for_feedback(text: &str) -> String {
  let cut = truncate_chars(text, FEEDBACK_TEXT_EXCERPT_CHARS);
  if cut.len() < text.len() { format!("{cut}...") } else { cut.to_string() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::annotations::{group_annotations, AnnotationRow};

  fn groups() -> AnnotationGroups {
    let rows = vec![AnnotationRow {
      title: Some("Who".into()),
      text: Some("Napoleone".into()),
    }];
    group_annotations(&rows).groups
  }

  #[test]
  fn language_detection_prefers_function_word_majority() {
    let it = "Il generale attraversò la pianura e la cavalleria lo seguì verso il fiume della valle.";
    let en = "The general crossed the plain and the cavalry followed him to the river of the valley.";
    assert_eq!(detect_text_language(it), TextLanguage::Italian);
    assert_eq!(detect_text_language(en), TextLanguage::English);
  }

  #[test]
  fn quiz_prompt_embeds_text_annotations_and_protocol_tokens() {
    let prompt = Activity::FiveW.build_quiz_prompt("Il testo di prova è qui.", &groups());
    assert!(prompt.contains("TESTO:\nIl testo di prova è qui."));
    assert!(prompt.contains("- Who: Napoleone"));
    assert!(prompt.contains("[Scelta Multipla]"));
    assert!(prompt.contains("✅ Risposta corretta:"));
  }

  #[test]
  fn every_activity_builds_a_distinct_quiz_prompt() {
    let text = "Un breve testo di prova.";
    let g = groups();
    let all: Vec<String> = [Activity::FiveW, Activity::Thesis, Activity::Argument, Activity::Connective]
      .iter()
      .map(|a| a.build_quiz_prompt(text, &g))
      .collect();
    for (i, a) in all.iter().enumerate() {
      for b in &all[i + 1..] {
        assert_ne!(a, b);
      }
    }
  }

  #[test]
  fn mc_feedback_prompt_names_both_answers() {
    let options = vec![AnswerOption::new('A', "Parigi"), AnswerOption::new('B', "Lione")];
    let g = groups();
    let req = FeedbackRequest {
      kind: QuestionKind::MultipleChoice,
      question_text: "Qual è la capitale?",
      options: &options,
      correct_answer: "A",
      student_answer: "B",
      annotations: &g,
      source_text: "testo",
    };
    let prompt = Activity::Argument.build_feedback_prompt(&req);
    assert!(prompt.contains("RISPOSTA CORRETTA: A) Parigi"));
    assert!(prompt.contains("RISPOSTA DELLO STUDENTE: B) Lione"));
  }

  #[test]
  fn feedback_excerpt_is_truncated_to_budget() {
    let long = "x".repeat(2 * FEEDBACK_TEXT_EXCERPT_CHARS);
    let g = groups();
    let req = FeedbackRequest {
      kind: QuestionKind::OpenEnded,
      question_text: "Q?",
      options: &[],
      correct_answer: "atteso",
      student_answer: "dato",
      annotations: &g,
      source_text: &long,
    };
    let prompt = Activity::FiveW.build_feedback_prompt(&req);
    assert!(prompt.contains(&format!("{}...", "x".repeat(FEEDBACK_TEXT_EXCERPT_CHARS))));
  }
}
