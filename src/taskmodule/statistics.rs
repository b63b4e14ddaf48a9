// ============================================================
// Layer 4 — Encoding Statistics
// ============================================================
// Counters for candidate relations seen while encoding:
//
//   category                       key
//   entity_token_alignment_error   gold label | TO_PREDICT
//   out_of_token_window            gold label | TO_PREDICT
//   candidates                     gold label | TO_PREDICT
//
// Skipped candidates are not errors; this is how they stay
// visible. Printed as JSON through tracing.

use std::collections::BTreeMap;

use serde::Serialize;

pub const ALIGNMENT_ERROR: &str = "entity_token_alignment_error";
pub const OUT_OF_WINDOW:   &str = "out_of_token_window";
pub const CANDIDATES:      &str = "candidates";

/// Key used for candidates without a gold label (inference).
pub const TO_PREDICT: &str = "TO_PREDICT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EncodingStatistics(BTreeMap<String, BTreeMap<String, usize>>);

impl EncodingStatistics {
    pub fn record(&mut self, category: &str, key: &str) {
        *self
            .0
            .entry(category.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(0) += 1;
    }

    pub fn get(&self, category: &str, key: &str) -> usize {
        self.0
            .get(category)
            .and_then(|counts| counts.get(key))
            .copied()
            .unwrap_or(0)
    }

    /// Sum over all keys of one category.
    pub fn total(&self, category: &str) -> usize {
        self.0.get(category).map(|counts| counts.values().sum()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn log(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => tracing::info!("statistics:\n{}", json),
            Err(e) => tracing::warn!("cannot serialise statistics: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_category_and_key() {
        let mut stats = EncodingStatistics::default();
        stats.record(OUT_OF_WINDOW, "met_person");
        stats.record(OUT_OF_WINDOW, "met_person");
        stats.record(OUT_OF_WINDOW, TO_PREDICT);
        stats.record(ALIGNMENT_ERROR, "no_relation");

        assert_eq!(stats.get(OUT_OF_WINDOW, "met_person"), 2);
        assert_eq!(stats.total(OUT_OF_WINDOW), 3);
        assert_eq!(stats.get(CANDIDATES, TO_PREDICT), 0);
    }

    #[test]
    fn test_serialises_as_nested_object() {
        let mut stats = EncodingStatistics::default();
        stats.record(CANDIDATES, "x");
        assert_eq!(serde_json::to_string(&stats).unwrap(), r#"{"candidates":{"x":1}}"#);

        stats.clear();
        assert!(stats.is_empty());
    }
}
