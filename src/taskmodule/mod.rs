// ============================================================
// Layer 4 — Task Modules
// ============================================================
// A task module translates between documents and model tensors.
//
//   Document(s)
//       │  prepare            learn label vocab, add marker tokens
//       │  encode_input       0..n TaskEncodings per document
//       │  encode_target      attach targets (training only)
//       ▼
//   collate                   → model batch           (Collate<B>)
//       │  model.forward
//       ▼
//   unbatch_output            → one TaskOutput per encoding
//       │  create_annotations_from_output
//       │  combine_output     append predictions to documents
//       ▼
//   decode                    → unique documents, original order
//
// Required steps are required trait methods; `prepare` and the
// `on_inputs_start` / `on_inputs_encoded` hooks are optional with
// no-op defaults.
// Everything between encode_input and decode is provided here
// once, for every module.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behavior)
//            Rust Book §19 (Associated Types)

/// TaskEncoding, TaskEncodingSequence, EncodedDocuments
pub mod encoding;

/// Argument marker tokens for relation classification
pub mod markers;

/// Per-category candidate counters
pub mod statistics;

/// Relation classification with entity markers
pub mod re_text_classification;

/// Config-driven task module construction
pub mod auto;

use burn::prelude::Backend;

use crate::domain::annotation::Annotation;
use crate::domain::document::DocumentRef;
use crate::domain::error::{Error, Result};
use encoding::{EncodedDocuments, TaskEncoding, TaskEncodingSequence};

/// The concrete TaskEncoding type of module `M`.
pub type TaskEncodingOf<M> = TaskEncoding<
    <M as TaskModule>::InputEncoding,
    <M as TaskModule>::TargetEncoding,
    <M as TaskModule>::Metadata,
>;

// ─── DecodeMode ───────────────────────────────────────────────────────────────
/// Where decode writes its predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Append predictions to the caller's documents.
    #[default]
    InPlace,
    /// Copy every affected document once and annotate the copies;
    /// the caller's documents stay untouched.
    Copy,
}

// ─── TaskModule ───────────────────────────────────────────────────────────────
pub trait TaskModule: Sized {
    type InputEncoding: Clone;
    type TargetEncoding: Clone;
    type Metadata: Clone;
    /// Per-example model output after `unbatch_output`.
    type TaskOutput;

    /// Learn whatever static data the module needs from training documents.
    fn prepare(&mut self, _documents: &[DocumentRef]) -> Result<()> {
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        true
    }

    /// Encode one document into zero or more task encodings.
    fn encode_input(
        &self,
        document:    &DocumentRef,
        is_training: bool,
    ) -> Result<Vec<TaskEncodingOf<Self>>>;

    /// Compute the target of one encoding from its document's gold annotations.
    fn encode_target(&self, encoding: &TaskEncodingOf<Self>) -> Result<Self::TargetEncoding>;

    /// (layer name, annotation) pairs to add for one encoding. May be empty.
    fn create_annotations_from_output(
        &self,
        encoding: &TaskEncodingOf<Self>,
        output:   &Self::TaskOutput,
    ) -> Result<Vec<(String, Annotation)>>;

    /// Called once before every `encode_inputs` pass.
    fn on_inputs_start(&self) {}

    /// Called once after every `encode_inputs` pass.
    fn on_inputs_encoded(&self) {}

    // ─── Provided ─────────────────────────────────────────────────────────────

    /// Encode documents in order. Training mode returns a plain list,
    /// inference mode a sequence that remembers every document.
    fn encode_inputs(
        &self,
        documents:   &[DocumentRef],
        is_training: bool,
    ) -> Result<EncodedDocuments<TaskEncodingOf<Self>>> {
        self.on_inputs_start();
        let mut task_encodings = Vec::new();
        for document in documents {
            task_encodings.extend(self.encode_input(document, is_training)?);
        }
        self.on_inputs_encoded();

        tracing::debug!(
            "Encoded {} documents into {} task encodings",
            documents.len(),
            task_encodings.len()
        );

        if is_training {
            Ok(EncodedDocuments::Unordered(task_encodings))
        } else {
            Ok(EncodedDocuments::Ordered(TaskEncodingSequence::new(
                task_encodings,
                documents.to_vec(),
            )))
        }
    }

    fn encode_targets(&self, task_encodings: &mut [TaskEncodingOf<Self>]) -> Result<()> {
        for encoding in task_encodings.iter_mut() {
            let targets = self.encode_target(encoding)?;
            encoding.set_targets(targets);
        }
        Ok(())
    }

    /// `encode_inputs`, then `encode_targets` when `encode_target` is set.
    /// A single document is passed as `std::slice::from_ref(&doc)`.
    fn encode(
        &self,
        documents:     &[DocumentRef],
        encode_target: bool,
    ) -> Result<EncodedDocuments<TaskEncodingOf<Self>>> {
        let mut encoded = self.encode_inputs(documents, encode_target)?;
        if encode_target {
            self.encode_targets(encoded.task_encodings_mut())?;
        }
        Ok(encoded)
    }

    /// Append the annotations for one encoding to its document's predictions.
    fn combine_output(&self, encoding: &TaskEncodingOf<Self>, output: &Self::TaskOutput) -> Result<()> {
        let annotations = self.create_annotations_from_output(encoding, output)?;
        let mut document = encoding.document().borrow_mut();
        for (layer, annotation) in annotations {
            document.add_prediction(&layer, annotation);
        }
        Ok(())
    }

    /// Pairs encodings and outputs positionally.
    fn combine_outputs(
        &self,
        task_encodings: &[TaskEncodingOf<Self>],
        task_outputs:   &[Self::TaskOutput],
    ) -> Result<()> {
        if task_encodings.len() != task_outputs.len() {
            return Err(Error::OutputCountMismatch {
                encodings: task_encodings.len(),
                outputs:   task_outputs.len(),
            });
        }
        for (encoding, output) in task_encodings.iter().zip(task_outputs) {
            self.combine_output(encoding, output)?;
        }
        Ok(())
    }

    /// Write model outputs back onto documents.
    ///
    /// Returns every document referenced by the encodings exactly once:
    /// in the original input order for an ordered sequence (documents
    /// without encodings included), otherwise in first-seen order.
    /// With `DecodeMode::Copy` the returned documents are fresh copies.
    fn decode(
        &self,
        task_encodings: EncodedDocuments<TaskEncodingOf<Self>>,
        task_outputs:   Vec<Self::TaskOutput>,
        mode:           DecodeMode,
    ) -> Result<Vec<DocumentRef>> {
        let (mut encodings, documents_in_order) = task_encodings.into_parts();
        if encodings.len() != task_outputs.len() {
            return Err(Error::OutputCountMismatch {
                encodings: encodings.len(),
                outputs:   task_outputs.len(),
            });
        }

        let in_order = documents_in_order.unwrap_or_default();
        let mut documents: Vec<DocumentRef> = Vec::with_capacity(in_order.len());
        for document in in_order.iter().chain(encodings.iter().map(|e| e.document())) {
            if !documents.iter().any(|d| d.ptr_eq(document)) {
                documents.push(document.clone());
            }
        }

        if mode == DecodeMode::Copy {
            let copies: Vec<DocumentRef> = documents.iter().map(DocumentRef::deep_copy).collect();
            for encoding in &mut encodings {
                let index = documents.iter().position(|d| d.ptr_eq(encoding.document()));
                if let Some(index) = index {
                    encoding.rebind(copies[index].clone());
                }
            }
            documents = copies;
        }

        self.combine_outputs(&encodings, &task_outputs)?;
        Ok(documents)
    }
}

// ─── Collate ──────────────────────────────────────────────────────────────────
/// The tensor side of a task module, per burn backend.
pub trait Collate<B: Backend>: TaskModule {
    type Batch;
    type ModelOutput;

    /// Batch encodings into model input. Targets are included only
    /// when every encoding has them.
    fn collate(&self, task_encodings: &[TaskEncodingOf<Self>], device: &B::Device) -> Result<Self::Batch>;

    /// Split one batched model output into per-example outputs, in batch order.
    fn unbatch_output(&self, model_output: Self::ModelOutput) -> Result<Vec<Self::TaskOutput>>;
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotation::LabeledSpan;
    use crate::domain::document::Document;

    /// One encoding per gold entity; the "model output" is the label to predict.
    struct EntityRelabeler;

    impl TaskModule for EntityRelabeler {
        type InputEncoding  = LabeledSpan;
        type TargetEncoding = String;
        type Metadata       = ();
        type TaskOutput     = String;

        fn encode_input(&self, document: &DocumentRef, _is_training: bool) -> Result<Vec<TaskEncodingOf<Self>>> {
            let spans = document.borrow().span_layer("entities")?.gold().to_vec();
            Ok(spans
                .into_iter()
                .map(|span| TaskEncoding::new(document.clone(), span, ()))
                .collect())
        }

        fn encode_target(&self, encoding: &TaskEncodingOf<Self>) -> Result<String> {
            Ok(encoding.inputs().label.to_string())
        }

        fn create_annotations_from_output(
            &self,
            encoding: &TaskEncodingOf<Self>,
            output:   &String,
        ) -> Result<Vec<(String, Annotation)>> {
            if output == "O" {
                return Ok(Vec::new());
            }
            let span = encoding.inputs();
            Ok(vec![(
                "entities".to_string(),
                LabeledSpan::new(span.start, span.end, output.as_str()).into(),
            )])
        }
    }

    fn doc(text: &str, entities: &[(usize, usize)]) -> DocumentRef {
        let mut document = Document::new(text);
        document.add_span_layer("entities");
        for &(start, end) in entities {
            document.add_span("entities", LabeledSpan::new(start, end, "X"));
        }
        DocumentRef::new(document)
    }

    fn predictions(doc: &DocumentRef) -> usize {
        doc.borrow().span_layer("entities").unwrap().predictions().len()
    }

    #[test]
    fn test_training_encode_sets_targets() {
        let docs = vec![doc("ab cd", &[(0, 2), (3, 5)])];
        let encoded = EntityRelabeler.encode(&docs, true).unwrap();
        assert!(matches!(encoded, EncodedDocuments::Unordered(_)));
        assert_eq!(encoded.len(), 2);
        assert!(encoded.task_encodings().iter().all(|e| e.has_targets()));
    }

    #[test]
    fn test_inference_decode_keeps_order_and_empty_documents() {
        let first  = doc("ab", &[(0, 2)]);
        let empty  = doc("nothing here", &[]);
        let third  = doc("cd ef", &[(0, 2), (3, 5)]);
        let docs   = vec![first.clone(), empty.clone(), third.clone()];

        let encoded = EntityRelabeler.encode(&docs, false).unwrap();
        assert!(encoded.task_encodings().iter().all(|e| !e.has_targets()));
        let outputs = vec!["A".to_string(), "B".to_string(), "O".to_string()];

        let decoded = EntityRelabeler.decode(encoded, outputs, DecodeMode::InPlace).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(decoded[0].ptr_eq(&first));
        assert!(decoded[1].ptr_eq(&empty));
        assert!(decoded[2].ptr_eq(&third));

        assert_eq!(predictions(&first), 1);
        assert_eq!(predictions(&empty), 0);
        // "O" is dropped
        assert_eq!(predictions(&third), 1);
    }

    #[test]
    fn test_unordered_decode_uses_first_seen_order() {
        let a = doc("ab", &[(0, 2)]);
        let b = doc("cd", &[(0, 2)]);
        let encoded = EntityRelabeler.encode(&[b.clone(), a.clone()], true).unwrap();
        let decoded = EntityRelabeler
            .decode(encoded, vec!["Y".into(), "Y".into()], DecodeMode::InPlace)
            .unwrap();
        assert!(decoded[0].ptr_eq(&b));
        assert!(decoded[1].ptr_eq(&a));
    }

    #[test]
    fn test_copy_mode_leaves_originals_untouched() {
        let a = doc("ab cd", &[(0, 2), (3, 5)]);
        let b = doc("ef", &[(0, 2)]);
        let encoded = EntityRelabeler.encode(&[a.clone(), b.clone()], false).unwrap();
        let outputs = vec!["P".to_string(), "Q".to_string(), "R".to_string()];

        let decoded = EntityRelabeler.decode(encoded, outputs, DecodeMode::Copy).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(!decoded[0].ptr_eq(&a));
        assert!(!decoded[1].ptr_eq(&b));

        assert_eq!(predictions(&a), 0);
        assert_eq!(predictions(&b), 0);
        // Both encodings of `a` landed on the same single copy
        assert_eq!(predictions(&decoded[0]), 2);
        assert_eq!(predictions(&decoded[1]), 1);
    }

    #[test]
    fn test_repeated_document_is_decoded_once() {
        let a = doc("ab", &[(0, 2)]);
        let encoded = EntityRelabeler.encode(&[a.clone(), a.clone()], false).unwrap();
        assert_eq!(encoded.len(), 2);
        let decoded = EntityRelabeler
            .decode(encoded, vec!["P".into(), "Q".into()], DecodeMode::InPlace)
            .unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].ptr_eq(&a));
        assert_eq!(predictions(&a), 2);
    }

    #[test]
    fn test_repeated_document_gets_one_copy() {
        let a = doc("ab", &[(0, 2)]);
        let encoded = EntityRelabeler.encode(&[a.clone(), a.clone()], false).unwrap();
        let decoded = EntityRelabeler
            .decode(encoded, vec!["P".into(), "Q".into()], DecodeMode::Copy)
            .unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(!decoded[0].ptr_eq(&a));
        assert_eq!(predictions(&decoded[0]), 2);
        assert_eq!(predictions(&a), 0);
    }

    #[test]
    fn test_decode_rejects_count_mismatch() {
        let docs = vec![doc("ab", &[(0, 2)])];
        let encoded = EntityRelabeler.encode(&docs, false).unwrap();
        let err = EntityRelabeler.decode(encoded, Vec::new(), DecodeMode::InPlace).unwrap_err();
        assert!(matches!(err, Error::OutputCountMismatch { encodings: 1, outputs: 0 }));
    }

    #[test]
    fn test_missing_layer_propagates() {
        let docs = vec![DocumentRef::new(Document::new("no layers"))];
        let err = EntityRelabeler.encode(&docs, false).unwrap_err();
        assert!(matches!(err, Error::MissingLayer { .. }));
    }
}
