// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// One error enum for the whole library. Three families:
//
//   Contract violations   — pipeline ordering bugs, missing layers,
//                           overlapping arguments. Never retried.
//   Unsupported config    — feature combinations that are not
//                           implemented (e.g. typed markers on
//                           multi-label entities).
//   Collaborator errors   — tokenizer, tensor, record, IO, JSON.
//
// Alignment failures (a span that does not map onto tokens, a
// pair that does not fit the window) are NOT errors: those
// candidates are skipped and counted in the encoding statistics.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use thiserror::Error;

/// Result type for task-module operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// `targets()` was read before `encode_target` assigned them.
    #[error("task encoding has no targets; call encode_target first")]
    TargetsNotSet,

    /// A document lacks an annotation layer the task module needs.
    #[error("document has no {kind} annotations with name '{layer}'")]
    MissingLayer { layer: String, kind: &'static str },

    #[error("the head {head:?} and tail {tail:?} token slices are not allowed to overlap")]
    OverlappingArguments { head: (usize, usize), tail: (usize, usize) },

    #[error("task module is not prepared; call prepare() or load a prepared config")]
    NotPrepared,

    #[error("task module is already prepared")]
    AlreadyPrepared,

    #[error("{encodings} task encodings but {outputs} task outputs")]
    OutputCountMismatch { encodings: usize, outputs: usize },

    #[error("cannot collate an empty list of task encodings")]
    EmptyBatch,

    #[error("label '{0}' is not in the label vocabulary")]
    UnknownLabel(String),

    #[error("label id {0} is not in the label vocabulary")]
    UnknownLabelId(usize),

    #[error("entity type '{0}' has no argument markers")]
    UnknownEntityType(String),

    #[error("argument marker '{0}' is not in the tokenizer vocabulary")]
    MarkerNotRegistered(String),

    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("tensor error: {0}")]
    Tensor(String),

    #[error("record error: {0}")]
    Record(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn missing_span_layer(layer: impl Into<String>) -> Self {
        Error::MissingLayer { layer: layer.into(), kind: "span" }
    }

    pub fn missing_relation_layer(layer: impl Into<String>) -> Self {
        Error::MissingLayer { layer: layer.into(), kind: "relation" }
    }

    pub fn tokenizer(err: impl std::fmt::Display) -> Self {
        Error::Tokenizer(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_layer_message_names_the_layer() {
        let err = Error::missing_relation_layer("relations");
        assert_eq!(
            err.to_string(),
            "document has no relation annotations with name 'relations'"
        );
    }
}
