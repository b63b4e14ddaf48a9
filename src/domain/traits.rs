// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the domain and the outer layers:
//
//   DocumentSource — anything that yields Documents
//                    (JsonDocumentLoader, test fixtures)
//   Persistable    — anything whose full state can be written
//                    to a directory and restored identically
//                    (prepared task modules)
//
// The task-module contract itself lives in `taskmodule`, next to
// the encodings it produces.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use crate::domain::document::Document;
use crate::domain::error::Result;

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can load documents from a source.
pub trait DocumentSource {
    /// Load all available documents, in source order.
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
///
/// `load(save(x))` must rebuild a component that behaves exactly
/// like `x` (same label ids, same marker token ids).
pub trait Persistable: Sized {
    /// Save this component's state into the directory `dir`
    fn save(&self, dir: &Path) -> Result<()>;

    /// Restore a component previously written with `save`
    fn load(dir: &Path) -> Result<Self>;
}
