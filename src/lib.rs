// ============================================================
// ie_taskmodules
// ============================================================
// Task modules for information extraction: encode annotated
// documents into transformer-ready batches, decode model
// outputs back into document annotations.
//
//   Layer 1 — cli          argument parsing, printing
//   Layer 2 — application  prepare / encode / predict workflows
//   Layer 3 — domain       documents, annotations, errors
//   Layer 4 — data         alignment, loading, datasets, batching
//             taskmodule   the encode/decode contract and the
//                          relation classification module
//   Layer 5 — ml           model contract, classifier, pipeline
//   Layer 6 — infra        tokenizer, tokenizer store, checkpoints

#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod taskmodule;
pub mod ml;
pub mod infra;

pub use domain::error::{Error, Result};
