//! Annotation grouping: turns the flat (tag, snippet) rows of an uploaded
//! annotation sheet into ordered per-tag groups.
//!
//! Ordering matters twice: tags keep their first-seen order, and snippets keep
//! the original row order within each tag. Nothing is deduplicated or dropped
//! silently; rows missing a field are skipped and reported.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::QuizError;

/// One row of an uploaded annotation sheet.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AnnotationRow {
  /// Tag / category label, e.g. "Who" or "Thesis".
  #[serde(default)]
  pub title: Option<String>,
  /// Annotated snippet from the source text.
  #[serde(default)]
  pub text: Option<String>,
}

/// Tag -> ordered snippets, tags in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationGroups(pub IndexMap<String, Vec<String>>);

impl AnnotationGroups {
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
    self.0.iter()
  }

  /// Render the groups for inclusion in a prompt. At most three snippets are
  /// shown per tag, with an overflow note for the rest.
  pub fn render_for_prompt(&self) -> String {
    if self.0.is_empty() {
      return "Nessuna annotazione disponibile".to_string();
    }
    let mut lines = Vec::with_capacity(self.0.len());
    for (tag, items) in &self.0 {
      let shown = items.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
      if items.len() > 3 {
        lines.push(format!("- {}: {} (e altri {})", tag, shown, items.len() - 3));
      } else {
        lines.push(format!("- {}: {}", tag, shown));
      }
    }
    lines.join("\n")
  }
}

/// Result of grouping one uploaded sheet: the groups plus the rows that had
/// to be skipped (reported, not silently swallowed).
#[derive(Debug, Default)]
pub struct GroupingOutcome {
  pub groups: AnnotationGroups,
  pub skipped: Vec<QuizError>,
}

/// Group annotation rows by tag. A row missing its tag or snippet aborts
/// grouping for that row only; every other row is still grouped.
pub fn group_annotations(rows: &[AnnotationRow]) -> GroupingOutcome {
  let mut outcome = GroupingOutcome::default();
  for (i, row) in rows.iter().enumerate() {
    let tag = match row.title.as_deref().map(str::trim) {
      Some(t) if !t.is_empty() => t,
      _ => {
        warn!(target: "annotations", row = i, "Skipping annotation row: missing tag");
        outcome.skipped.push(QuizError::MalformedRow { row: i, reason: "missing tag".into() });
        continue;
      }
    };
    let text = match row.text.as_deref().map(str::trim) {
      Some(t) if !t.is_empty() => t,
      _ => {
        warn!(target: "annotations", row = i, tag = %tag, "Skipping annotation row: missing snippet");
        outcome.skipped.push(QuizError::MalformedRow { row: i, reason: "missing snippet".into() });
        continue;
      }
    };
    outcome.groups.0.entry(tag.to_string()).or_default().push(text.to_string());
  }
  outcome
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(title: &str, text: &str) -> AnnotationRow {
    AnnotationRow { title: Some(title.into()), text: Some(text.into()) }
  }

  #[test]
  fn tags_keep_first_seen_order_and_rows_keep_source_order() {
    let rows = vec![
      row("Who", "Napoleone"),
      row("Where", "Parigi"),
      row("Who", "l'esercito"),
      row("Why", "la campagna di Russia"),
      row("Who", "lo zar"),
    ];
    let outcome = group_annotations(&rows);
    assert!(outcome.skipped.is_empty());
    let tags: Vec<&String> = outcome.groups.0.keys().collect();
    assert_eq!(tags, ["Who", "Where", "Why"]);
    assert_eq!(outcome.groups.0["Who"], ["Napoleone", "l'esercito", "lo zar"]);
  }

  #[test]
  fn duplicate_snippets_are_not_deduplicated() {
    let rows = vec![row("What", "battaglia"), row("What", "battaglia")];
    let outcome = group_annotations(&rows);
    assert_eq!(outcome.groups.0["What"].len(), 2);
  }

  #[test]
  fn malformed_rows_are_skipped_and_reported_without_aborting_the_batch() {
    let rows = vec![
      row("Who", "Napoleone"),
      AnnotationRow { title: None, text: Some("orfano".into()) },
      AnnotationRow { title: Some("When".into()), text: Some("  ".into()) },
      row("When", "1812"),
    ];
    let outcome = group_annotations(&rows);
    assert_eq!(outcome.skipped.len(), 2);
    assert_eq!(outcome.groups.0["Who"], ["Napoleone"]);
    assert_eq!(outcome.groups.0["When"], ["1812"]);
  }

  #[test]
  fn prompt_rendering_caps_snippets_per_tag() {
    let rows = vec![
      row("Who", "a"),
      row("Who", "b"),
      row("Who", "c"),
      row("Who", "d"),
      row("Who", "e"),
    ];
    let outcome = group_annotations(&rows);
    let rendered = outcome.groups.render_for_prompt();
    assert_eq!(rendered, "- Who: a, b, c (e altri 2)");
  }

  #[test]
  fn empty_groups_render_placeholder() {
    let groups = AnnotationGroups::default();
    assert_eq!(groups.render_for_prompt(), "Nessuna annotazione disponibile");
  }
}
