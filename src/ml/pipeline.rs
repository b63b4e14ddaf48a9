// ============================================================
// Layer 5 — Inference Pipeline
// ============================================================
// Runs a model over documents through a task module:
//
//   documents ─ encode (inference) ─┬─ batch 1 ─ collate ─ forward ─ unbatch ─┐
//                                   ├─ batch 2 ─ ...                        ├─ decode
//                                   └─ ...                                  ┘
//
// Batches are processed in encoding order, so the collected task
// outputs line up with the encodings positionally, which is what
// decode expects.

use burn::prelude::*;

use crate::domain::document::DocumentRef;
use crate::domain::error::Result;
use crate::ml::TaskModel;
use crate::taskmodule::{Collate, DecodeMode, TaskModule};

pub struct Pipeline<B, T, M>
where
    B: Backend,
    T: Collate<B>,
    M: TaskModel<B, Input = T::Batch, Output = T::ModelOutput>,
{
    taskmodule: T,
    model:      M,
    device:     B::Device,
    batch_size: usize,
}

impl<B, T, M> Pipeline<B, T, M>
where
    B: Backend,
    T: Collate<B>,
    M: TaskModel<B, Input = T::Batch, Output = T::ModelOutput>,
{
    /// # Panics
    /// Panics if `batch_size` is 0.
    pub fn new(taskmodule: T, model: M, device: B::Device, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        Self { taskmodule, model, device, batch_size }
    }

    pub fn taskmodule(&self) -> &T {
        &self.taskmodule
    }

    /// Predict annotations for `documents`. The returned documents are in
    /// input order, one per input document.
    pub fn predict(&self, documents: &[DocumentRef], mode: DecodeMode) -> Result<Vec<DocumentRef>> {
        let encoded = self.taskmodule.encode(documents, false)?;

        let mut task_outputs = Vec::with_capacity(encoded.len());
        for (i, chunk) in encoded.task_encodings().chunks(self.batch_size).enumerate() {
            let batch  = <T as Collate<B>>::collate(&self.taskmodule, chunk, &self.device)?;
            let output = self.model.forward(batch);
            task_outputs.extend(<T as Collate<B>>::unbatch_output(&self.taskmodule, output)?);
            tracing::debug!("Processed batch {} ({} encodings)", i + 1, chunk.len());
        }

        tracing::info!(
            "Predicted {} candidates over {} documents",
            task_outputs.len(),
            documents.len()
        );
        self.taskmodule.decode(encoded, task_outputs, mode)
    }
}
