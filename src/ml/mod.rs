// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The model side of the encode → model → decode loop.
//
//   TaskModel    — what a task module's batch is fed into:
//                  forward(batch) → output, e.g. logits
//
//   model.rs     — TransformerTextClassifier, a small encoder
//                  that classifies a marker-augmented sequence
//                  from its [CLS] position:
//                  • Token + positional embeddings
//                  • Masked multi-head self-attention
//                  • Feed-forward networks (GELU activation)
//                  • Classification head [batch, num_labels]
//
//   pipeline.rs  — Pipeline: encode → collate → forward →
//                  unbatch → decode over a list of documents
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use burn::prelude::*;

/// Transformer encoder text classifier
pub mod model;

/// Document-level inference over a task module and a model
pub mod pipeline;

/// Output of a text classification model.
#[derive(Debug, Clone)]
pub struct TextClassificationOutput<B: Backend> {
    /// Unnormalised scores — shape: [batch_size, num_labels]
    pub logits: Tensor<B, 2>,
}

/// A model a task module's batches can be fed into.
pub trait TaskModel<B: Backend> {
    type Input;
    type Output;

    fn forward(&self, input: Self::Input) -> Self::Output;
}
