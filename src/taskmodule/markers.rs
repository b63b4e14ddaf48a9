// ============================================================
// Layer 4 — Argument Markers
// ============================================================
// Four synthetic tokens frame the two arguments of a candidate
// relation:
//
//   [H] Alice [/H] met [T] Bob [/T] in Paris
//
// With `add_type_to_marker` there is one set per entity type:
//
//   [H:PER] Alice [/H:PER] met [T:PER] Bob [/T:PER]
//
// The marker set is a pure function of (entity labels, typed
// flag). Markers are added to the tokenizer as special tokens in
// sorted string order, which makes their ids reproducible when
// a saved module is loaded again.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::{Error, Result};
use crate::infra::tokenizer::TransformerTokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgumentRole {
    Head,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Boundary {
    Start,
    End,
}

/// (role, boundary, optional entity type)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerKey {
    pub role:        ArgumentRole,
    pub boundary:    Boundary,
    pub entity_type: Option<String>,
}

impl MarkerKey {
    fn token(&self) -> String {
        let slash = match self.boundary {
            Boundary::Start => "",
            Boundary::End => "/",
        };
        let role = match self.role {
            ArgumentRole::Head => "H",
            ArgumentRole::Tail => "T",
        };
        match &self.entity_type {
            Some(entity_type) => format!("[{slash}{role}:{entity_type}]"),
            None => format!("[{slash}{role}]"),
        }
    }
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

const ROLES: [ArgumentRole; 2] = [ArgumentRole::Head, ArgumentRole::Tail];
const BOUNDARIES: [Boundary; 2] = [Boundary::Start, Boundary::End];

// ─── ArgumentMarkers ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default)]
pub struct ArgumentMarkers {
    typed:   bool,
    markers: BTreeMap<MarkerKey, String>,
    ids:     BTreeMap<String, u32>,
}

impl ArgumentMarkers {
    pub fn new(entity_labels: &[String], add_type_to_marker: bool) -> Self {
        let mut markers = BTreeMap::new();
        for role in ROLES {
            for boundary in BOUNDARIES {
                if add_type_to_marker {
                    for label in entity_labels {
                        let key = MarkerKey { role, boundary, entity_type: Some(label.clone()) };
                        markers.insert(key.clone(), key.token());
                    }
                } else {
                    let key = MarkerKey { role, boundary, entity_type: None };
                    markers.insert(key.clone(), key.token());
                }
            }
        }
        Self { typed: add_type_to_marker, markers, ids: BTreeMap::new() }
    }

    /// Marker strings in registration order (sorted).
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.markers.values().cloned().collect();
        tokens.sort();
        tokens.dedup();
        tokens
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn is_registered(&self) -> bool {
        !self.ids.is_empty()
    }

    /// Add every marker to the tokenizer as a special token and
    /// remember the resulting ids.
    pub fn register<T: TransformerTokenizer>(&mut self, tokenizer: &mut T) -> Result<()> {
        let tokens = self.tokens();
        let added = tokenizer.add_special_tokens(&tokens);
        let mut ids = BTreeMap::new();
        for token in tokens {
            let id = tokenizer
                .token_to_id(&token)
                .ok_or_else(|| Error::MarkerNotRegistered(token.clone()))?;
            ids.insert(token, id);
        }
        tracing::debug!("Registered {} argument markers ({} new tokens)", ids.len(), added);
        self.ids = ids;
        Ok(())
    }

    /// Marker string for `role`/`boundary`; `entity_type` is only consulted
    /// for typed markers.
    pub fn marker(&self, role: ArgumentRole, boundary: Boundary, entity_type: &str) -> Result<&str> {
        let key = MarkerKey {
            role,
            boundary,
            entity_type: self.typed.then(|| entity_type.to_string()),
        };
        self.markers
            .get(&key)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownEntityType(entity_type.to_string()))
    }

    /// Tokenizer id of a marker.
    pub fn id(&self, role: ArgumentRole, boundary: Boundary, entity_type: &str) -> Result<u32> {
        let marker = self.marker(role, boundary, entity_type)?;
        self.ids
            .get(marker)
            .copied()
            .ok_or_else(|| Error::MarkerNotRegistered(marker.to_string()))
    }

    /// True if `token_id` is one of the registered marker ids.
    pub fn contains_id(&self, token_id: u32) -> bool {
        self.ids.values().any(|&id| id == token_id)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer::HfTokenizer;
    use crate::infra::tokenizer_store::TokenizerStore;

    fn labels() -> Vec<String> {
        vec!["PER".to_string(), "LOC".to_string()]
    }

    #[test]
    fn test_untyped_markers() {
        let markers = ArgumentMarkers::new(&labels(), false);
        assert_eq!(markers.len(), 4);
        assert_eq!(markers.tokens(), vec!["[/H]", "[/T]", "[H]", "[T]"]);
        assert_eq!(markers.marker(ArgumentRole::Head, Boundary::Start, "ANY").unwrap(), "[H]");
        assert_eq!(markers.marker(ArgumentRole::Tail, Boundary::End, "PER").unwrap(), "[/T]");
    }

    #[test]
    fn test_typed_markers() {
        let markers = ArgumentMarkers::new(&labels(), true);
        assert_eq!(markers.len(), 8);
        assert_eq!(
            markers.marker(ArgumentRole::Head, Boundary::End, "LOC").unwrap(),
            "[/H:LOC]"
        );
        assert!(matches!(
            markers.marker(ArgumentRole::Head, Boundary::Start, "ORG"),
            Err(Error::UnknownEntityType(t)) if t == "ORG"
        ));
    }

    #[test]
    fn test_ids_before_registration_fail() {
        let markers = ArgumentMarkers::new(&labels(), false);
        assert!(matches!(
            markers.id(ArgumentRole::Head, Boundary::Start, "PER"),
            Err(Error::MarkerNotRegistered(_))
        ));
    }

    #[test]
    fn test_registration_order_is_reproducible() {
        let texts = vec!["Alice met Bob in Paris".to_string()];
        let mut first  = HfTokenizer::new(TokenizerStore::build_word_level(&texts, 100).unwrap()).unwrap();
        let mut second = first.clone();

        let mut a = ArgumentMarkers::new(&labels(), true);
        // Same labels, different order
        let mut b = ArgumentMarkers::new(&["LOC".to_string(), "PER".to_string()], true);
        a.register(&mut first).unwrap();
        b.register(&mut second).unwrap();

        for role in ROLES {
            for boundary in BOUNDARIES {
                for label in ["PER", "LOC"] {
                    assert_eq!(a.id(role, boundary, label).unwrap(), b.id(role, boundary, label).unwrap());
                }
            }
        }
        let head_start = a.id(ArgumentRole::Head, Boundary::Start, "PER").unwrap();
        assert!(a.contains_id(head_start));
        assert!(!a.contains_id(0));
    }
}
