// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums, and traits that define what the
// system works ON: documents and their annotation graph.
//
// Rules for this layer:
//   - NO Burn tensors
//   - NO tokenizer types
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// LabeledSpan, BinaryRelation, Label, Score
pub mod annotation;

/// Document, AnnotationLayer, and the shared DocumentRef handle
pub mod document;

/// The library-wide error enum
pub mod error;

/// DocumentSource and Persistable
pub mod traits;
