// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concerns shared by the other layers that belong to none of
// them:
//
//   tokenizer.rs       — TransformerTokenizer, the tokenizer
//                        surface task modules use (char offsets,
//                        special tokens, added marker tokens),
//                        and its HuggingFace implementation.
//
//   tokenizer_store.rs — Tokenizer persistence
//                        Builds a word-level tokenizer from the
//                        document texts if none exists, or loads
//                        a previously saved one.
//
//   checkpoint.rs      — Task module config, model config and
//                        model weights in one directory.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Task module, model config and weights persistence
pub mod checkpoint;

/// Tokenizer abstraction used by task modules
pub mod tokenizer;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;
