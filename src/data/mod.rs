// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between annotated JSON on disk and tensor batches
// that is not specific to one task module:
//
//   JSON documents
//       │
//       ▼
//   JsonDocumentLoader  → Vec<Document>
//       │
//       ▼  (task module: tokenize, align, window, insert markers)
//   alignment           → char ↔ token slices, token windows
//       │
//       ▼
//   ReDataset           → implements Burn's Dataset trait
//       │
//       ▼
//   ReBatcher           → pads and stacks samples into tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Character/token slice conversion and token windows
pub mod alignment;

/// Loads documents from JSON files
pub mod loader;

/// Implements Burn's Dataset trait for relation samples
pub mod dataset;

/// Implements Burn's Batcher trait with dynamic padding
pub mod batcher;
