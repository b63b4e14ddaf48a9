// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A Document owns its text plus named annotation layers:
//
//   span layers      name → AnnotationLayer<LabeledSpan>
//                    (entities, sentences, ...)
//   relation layers  name → AnnotationLayer<BinaryRelation>
//
// Every layer keeps gold annotations and, separately, the
// predictions a task module appends during decoding. Gold
// annotations are never replaced by predictions.
//
// Task encodings refer back to their source document through a
// DocumentRef — a shared handle whose identity (pointer) is what
// decode uses to regroup encodings by document.
//
// Reference: Rust Book §15 (Rc<T> and RefCell<T>)

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::domain::annotation::{Annotation, BinaryRelation, LabeledSpan};
use crate::domain::error::{Error, Result};

// ─── AnnotationLayer ──────────────────────────────────────────────────────────
/// Gold annotations in insertion order, plus predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "A: Deserialize<'de>"))]
pub struct AnnotationLayer<A> {
    #[serde(default)]
    gold: Vec<A>,
    #[serde(default)]
    predictions: Vec<A>,
}

impl<A> Default for AnnotationLayer<A> {
    fn default() -> Self {
        Self { gold: Vec::new(), predictions: Vec::new() }
    }
}

impl<A> AnnotationLayer<A> {
    pub fn gold(&self) -> &[A] {
        &self.gold
    }

    pub fn predictions(&self) -> &[A] {
        &self.predictions
    }

    pub fn push(&mut self, annotation: A) {
        self.gold.push(annotation);
    }

    pub fn push_prediction(&mut self, annotation: A) {
        self.predictions.push(annotation);
    }

    pub fn len(&self) -> usize {
        self.gold.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gold.is_empty()
    }
}

// ─── Document ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Optional identifier, kept for traceability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    text: String,

    #[serde(default)]
    spans: BTreeMap<String, AnnotationLayer<LabeledSpan>>,

    #[serde(default)]
    relations: BTreeMap<String, AnnotationLayer<BinaryRelation>>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id:        None,
            text:      text.into(),
            spans:     BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Create an empty span layer (no-op if it already exists).
    pub fn add_span_layer(&mut self, name: &str) -> &mut AnnotationLayer<LabeledSpan> {
        self.spans.entry(name.to_string()).or_default()
    }

    /// Create an empty relation layer (no-op if it already exists).
    pub fn add_relation_layer(&mut self, name: &str) -> &mut AnnotationLayer<BinaryRelation> {
        self.relations.entry(name.to_string()).or_default()
    }

    /// Append a gold span, creating the layer on first use.
    pub fn add_span(&mut self, layer: &str, span: LabeledSpan) {
        self.add_span_layer(layer).push(span);
    }

    /// Append a gold relation, creating the layer on first use.
    pub fn add_relation(&mut self, layer: &str, relation: BinaryRelation) {
        self.add_relation_layer(layer).push(relation);
    }

    pub fn span_layer(&self, name: &str) -> Result<&AnnotationLayer<LabeledSpan>> {
        self.spans.get(name).ok_or_else(|| Error::missing_span_layer(name))
    }

    pub fn relation_layer(&self, name: &str) -> Result<&AnnotationLayer<BinaryRelation>> {
        self.relations.get(name).ok_or_else(|| Error::missing_relation_layer(name))
    }

    pub fn has_relation_layer(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Append a predicted annotation to the `predictions` of layer `name`.
    /// The layer is created if the document does not have it yet.
    pub fn add_prediction(&mut self, name: &str, annotation: Annotation) {
        match annotation {
            Annotation::LabeledSpan(span) => {
                self.add_span_layer(name).push_prediction(span);
            }
            Annotation::BinaryRelation(relation) => {
                self.add_relation_layer(name).push_prediction(relation);
            }
        }
    }
}

// ─── DocumentRef ──────────────────────────────────────────────────────────────
/// Shared handle to a Document.
///
/// Cloning the handle does NOT copy the document; use `deep_copy`
/// for that. Two handles are the same document iff `ptr_eq`.
#[derive(Debug, Clone)]
pub struct DocumentRef(Rc<RefCell<Document>>);

impl DocumentRef {
    pub fn new(document: Document) -> Self {
        Self(Rc::new(RefCell::new(document)))
    }

    pub fn borrow(&self) -> Ref<'_, Document> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Document> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &DocumentRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A new handle to an independent copy of the document.
    pub fn deep_copy(&self) -> Self {
        Self::new(self.borrow().clone())
    }

    /// A snapshot of the current document state.
    pub fn to_document(&self) -> Document {
        self.borrow().clone()
    }
}

impl From<Document> for DocumentRef {
    fn from(document: Document) -> Self {
        Self::new(document)
    }
}
