// ============================================================
// Layer 3 — Annotation Domain Types
// ============================================================
// The annotation graph a Document carries:
//
//   LabeledSpan     — half-open character range [start, end)
//                     with one label or a set of labels
//   BinaryRelation  — ordered (head, tail) pair of spans
//                     with a label and an optional score
//
// Equality and hashing are by VALUE (position + label), never
// by score. Two predictions of the same span with different
// confidences are the same annotation, and a (head, tail)
// tuple can be used directly as a HashMap key.
//
// Reference: Rust Book §5 (Structs), §10 (Traits: Hash / Eq)

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

// ─── Label ────────────────────────────────────────────────────────────────────
/// A single label or a multi-label set.
///
/// Serialised untagged: `"PER"` or `["PER", "ORG"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Single(String),
    Multi(Vec<String>),
}

impl Label {
    /// All labels as a slice, regardless of the variant.
    pub fn labels(&self) -> &[String] {
        match self {
            Label::Single(label) => std::slice::from_ref(label),
            Label::Multi(labels) => labels,
        }
    }

    pub fn is_multilabel(&self) -> bool {
        matches!(self, Label::Multi(_))
    }

    /// The label of a single-label annotation, `None` for multi-label ones.
    pub fn single(&self) -> Option<&str> {
        match self {
            Label::Single(label) => Some(label),
            Label::Multi(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Single(label) => f.write_str(label),
            Label::Multi(labels) => f.write_str(&labels.join(",")),
        }
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Label::Single(label.to_string())
    }
}

impl From<String> for Label {
    fn from(label: String) -> Self {
        Label::Single(label)
    }
}

impl From<Vec<String>> for Label {
    fn from(labels: Vec<String>) -> Self {
        Label::Multi(labels)
    }
}

// ─── Score ────────────────────────────────────────────────────────────────────
/// Confidence attached to a predicted annotation.
/// Mirrors `Label`: one probability, or one per label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Single(f32),
    Multi(Vec<f32>),
}

// ─── LabeledSpan ──────────────────────────────────────────────────────────────
/// A labelled character span `[start, end)` in the document text.
///
/// Offsets count Unicode scalar values (chars), not bytes.
/// An unlabelled span is a `LabeledSpan` with `Label::Multi(vec![])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawLabeledSpan")]
pub struct LabeledSpan {
    pub start: usize,
    pub end:   usize,
    pub label: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Unchecked wire form of a span; `start <= end` is enforced on conversion.
#[derive(Deserialize)]
struct RawLabeledSpan {
    start: usize,
    end:   usize,
    label: Label,
    #[serde(default)]
    score: Option<f32>,
}

impl TryFrom<RawLabeledSpan> for LabeledSpan {
    type Error = String;

    fn try_from(raw: RawLabeledSpan) -> std::result::Result<Self, Self::Error> {
        if raw.start > raw.end {
            return Err(format!("span start ({}) must not exceed end ({})", raw.start, raw.end));
        }
        Ok(Self { start: raw.start, end: raw.end, label: raw.label, score: raw.score })
    }
}

impl LabeledSpan {
    /// Create a span without a score.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize, label: impl Into<Label>) -> Self {
        assert!(start <= end, "span start ({start}) must not exceed end ({end})");
        Self { start, end, label: label.into(), score: None }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if this span lies fully inside `[start, end)`.
    pub fn is_contained_in(&self, start: usize, end: usize) -> bool {
        start <= self.start && self.end <= end
    }
}

impl PartialEq for LabeledSpan {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end && self.label == other.label
    }
}

impl Eq for LabeledSpan {}

impl Hash for LabeledSpan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start.hash(state);
        self.end.hash(state);
        self.label.hash(state);
    }
}

// ─── BinaryRelation ───────────────────────────────────────────────────────────
/// A directed relation from `head` to `tail`.
/// The argument spans are held by value, so a relation stays valid
/// when it is moved into a copied document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryRelation {
    pub head:  LabeledSpan,
    pub tail:  LabeledSpan,
    pub label: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

impl BinaryRelation {
    pub fn new(head: LabeledSpan, tail: LabeledSpan, label: impl Into<Label>) -> Self {
        Self { head, tail, label: label.into(), score: None }
    }

    pub fn with_score(mut self, score: Score) -> Self {
        self.score = Some(score);
        self
    }
}

impl PartialEq for BinaryRelation {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.tail == other.tail && self.label == other.label
    }
}

impl Eq for BinaryRelation {}

impl Hash for BinaryRelation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.head.hash(state);
        self.tail.hash(state);
        self.label.hash(state);
    }
}

// ─── Annotation ───────────────────────────────────────────────────────────────
/// Any annotation a task module can emit during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Annotation {
    LabeledSpan(LabeledSpan),
    BinaryRelation(BinaryRelation),
}

impl From<LabeledSpan> for Annotation {
    fn from(span: LabeledSpan) -> Self {
        Annotation::LabeledSpan(span)
    }
}

impl From<BinaryRelation> for Annotation {
    fn from(relation: BinaryRelation) -> Self {
        Annotation::BinaryRelation(relation)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_span_equality_ignores_score() {
        let a = LabeledSpan::new(0, 5, "PER");
        let b = LabeledSpan::new(0, 5, "PER").with_score(0.3);
        assert_eq!(a, b);
        assert_ne!(a, LabeledSpan::new(0, 5, "ORG"));
        assert_ne!(a, LabeledSpan::new(0, 4, "PER"));
    }

    #[test]
    fn test_head_tail_pair_as_map_key() {
        let alice = LabeledSpan::new(0, 5, "PER");
        let bob   = LabeledSpan::new(10, 13, "PER");

        let mut map = HashMap::new();
        map.insert((alice.clone(), bob.clone()), "met_person");

        // A structurally equal copy finds the same entry
        let key = (LabeledSpan::new(0, 5, "PER"), LabeledSpan::new(10, 13, "PER"));
        assert_eq!(map.get(&key), Some(&"met_person"));
        assert_eq!(map.get(&(bob, alice)), None);
    }

    #[test]
    fn test_relation_equality_ignores_score() {
        let head = LabeledSpan::new(0, 5, "PER");
        let tail = LabeledSpan::new(10, 13, "PER");
        let gold = BinaryRelation::new(head.clone(), tail.clone(), "met");
        let pred = BinaryRelation::new(head, tail, "met").with_score(Score::Single(0.9));
        assert_eq!(gold, pred);
    }

    #[test]
    fn test_label_views() {
        let single = Label::from("PER");
        assert_eq!(single.labels(), ["PER".to_string()]);
        assert_eq!(single.single(), Some("PER"));
        assert!(!single.is_multilabel());

        let multi = Label::from(vec!["a".to_string(), "b".to_string()]);
        assert!(multi.is_multilabel());
        assert_eq!(multi.single(), None);
        assert_eq!(multi.to_string(), "a,b");
    }

    #[test]
    fn test_label_serialises_untagged() {
        let span = LabeledSpan::new(1, 2, "X");
        let json = serde_json::to_string(&span).unwrap();
        assert_eq!(json, r#"{"start":1,"end":2,"label":"X"}"#);

        let back: LabeledSpan = serde_json::from_str(r#"{"start":1,"end":2,"label":["X","Y"]}"#).unwrap();
        assert!(back.label.is_multilabel());
    }

    #[test]
    #[should_panic]
    fn test_inverted_span_panics() {
        let _ = LabeledSpan::new(5, 4, "PER");
    }

    #[test]
    fn test_inverted_span_is_rejected_on_deserialize() {
        let result = serde_json::from_str::<LabeledSpan>(r#"{"start": 5, "end": 2, "label": "PER"}"#);
        assert!(result.is_err());

        let span: LabeledSpan =
            serde_json::from_str(r#"{"start": 2, "end": 2, "label": "PER", "score": 0.5}"#).unwrap();
        assert!(span.is_empty());
        assert_eq!(span.score, Some(0.5));
    }

    #[test]
    fn test_containment() {
        let span = LabeledSpan::new(3, 6, "X");
        assert!(span.is_contained_in(0, 6));
        assert!(span.is_contained_in(3, 6));
        assert!(!span.is_contained_in(4, 10));
        assert!(!span.is_contained_in(0, 5));
    }
}
