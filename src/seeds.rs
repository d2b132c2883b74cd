//! Built-in example content: a short annotated text that makes the app
//! demonstrable before any real upload happens.

use crate::annotations::AnnotationRow;

/// Example passage used by the demo session.
pub fn example_source_text() -> String {
  "Nel giugno del 1812 Napoleone attraversò il fiume Niemen e invase la Russia \
   con la Grande Armata. L'esercito avanzò rapidamente verso Mosca, ma lo zar \
   Alessandro rifiutò di trattare. Con l'arrivo dell'inverno, la mancanza di \
   rifornimenti costrinse i francesi a una ritirata disastrosa: dei seicentomila \
   uomini partiti, solo una piccola parte fece ritorno."
    .to_string()
}

/// Annotation rows matching the example passage (5W tagging).
pub fn example_annotation_rows() -> Vec<AnnotationRow> {
  let rows = [
    ("Who", "Napoleone"),
    ("Who", "lo zar Alessandro"),
    ("What", "invase la Russia con la Grande Armata"),
    ("What", "una ritirata disastrosa"),
    ("When", "Nel giugno del 1812"),
    ("When", "Con l'arrivo dell'inverno"),
    ("Where", "il fiume Niemen"),
    ("Where", "verso Mosca"),
    ("Why", "la mancanza di rifornimenti"),
  ];
  rows
    .iter()
    .map(|(title, text)| AnnotationRow {
      title: Some((*title).to_string()),
      text: Some((*text).to_string()),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::annotations::group_annotations;

  #[test]
  fn example_rows_group_cleanly() {
    let outcome = group_annotations(&example_annotation_rows());
    assert!(outcome.skipped.is_empty());
    let tags: Vec<&String> = outcome.groups.0.keys().collect();
    assert_eq!(tags, ["Who", "What", "When", "Where", "Why"]);
  }
}
