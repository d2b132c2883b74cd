//! Per-question record of the latest AI validation verdict, keyed by the
//! question's 0-based position in the document (not by its display number).
//!
//! The ledger must be reindexed in the same logical step as the document
//! mutation it follows, so it can never reference a position outside the
//! document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::ValidationVerdict;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLedger {
  entries: HashMap<usize, ValidationVerdict>,
}

impl ValidationLedger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, index: usize, verdict: ValidationVerdict) {
    self.entries.insert(index, verdict);
  }

  pub fn get(&self, index: usize) -> Option<&ValidationVerdict> {
    self.entries.get(&index)
  }

  pub fn is_set(&self, index: usize) -> bool {
    self.entries.contains_key(&index)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn iter(&self) -> impl Iterator<Item = (usize, &ValidationVerdict)> {
    self.entries.iter().map(|(k, v)| (*k, v))
  }

  /// The question at `index` was deleted: drop its entry and shift every
  /// entry above it down by one.
  pub fn on_delete(&mut self, index: usize) {
    self.entries.remove(&index);
    let mut shifted = HashMap::with_capacity(self.entries.len());
    for (k, v) in self.entries.drain() {
      let key = if k > index { k - 1 } else { k };
      shifted.insert(key, v);
    }
    self.entries = shifted;
  }

  /// A question was appended: its index is `len - 1` and necessarily unset,
  /// so there is nothing to shift.
  pub fn on_insert_at_end(&mut self) {}
}

#[cfg(test)]
mod tests {
  use super::*;

  fn verdict(tag: &str) -> ValidationVerdict {
    ValidationVerdict { is_valid: true, suggestion: tag.into(), motivation: String::new() }
  }

  #[test]
  fn delete_compacts_and_shifts_entries() {
    let mut ledger = ValidationLedger::new();
    for i in [0usize, 1, 3, 4] {
      ledger.set(i, verdict(&format!("q{i}")));
    }

    ledger.on_delete(1);

    let mut keys: Vec<usize> = ledger.iter().map(|(k, _)| k).collect();
    keys.sort_unstable();
    assert_eq!(keys, [0, 2, 3]);
    assert_eq!(ledger.get(2).unwrap().suggestion, "q3");
    assert_eq!(ledger.get(3).unwrap().suggestion, "q4");
    assert!(ledger.get(1).is_none());
  }

  #[test]
  fn delete_of_unset_index_still_shifts_higher_entries() {
    let mut ledger = ValidationLedger::new();
    ledger.set(2, verdict("q2"));
    ledger.on_delete(0);
    assert!(ledger.get(2).is_none());
    assert_eq!(ledger.get(1).unwrap().suggestion, "q2");
  }

  #[test]
  fn append_leaves_existing_entries_alone() {
    let mut ledger = ValidationLedger::new();
    ledger.set(0, verdict("q0"));
    ledger.on_insert_at_end();
    assert_eq!(ledger.len(), 1);
    assert!(ledger.is_set(0));
    assert!(!ledger.is_set(1));
  }

  #[test]
  fn set_is_last_write_wins() {
    let mut ledger = ValidationLedger::new();
    ledger.set(0, verdict("first"));
    ledger.set(0, verdict("second"));
    assert_eq!(ledger.get(0).unwrap().suggestion, "second");
  }
}
