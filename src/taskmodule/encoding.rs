// ============================================================
// Layer 4 — Task Encodings
// ============================================================
// TaskEncoding          one model-ready example: fixed inputs,
//                       optional targets, module metadata, and a
//                       back-reference to the source document.
//
// TaskEncodingSequence  the encodings of an inference run plus
//                       every input document in its original
//                       order, including documents that produced
//                       no encodings at all. decode() uses the
//                       document list to rebuild the full output.
//
// EncodedDocuments      what encode() hands back: a plain list
//                       (training) or an ordered sequence
//                       (inference).

use crate::domain::document::DocumentRef;
use crate::domain::error::{Error, Result};

// ─── TaskEncoding ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TaskEncoding<I, T, M> {
    document: DocumentRef,
    inputs:   I,
    targets:  Option<T>,
    metadata: M,
}

impl<I, T, M> TaskEncoding<I, T, M> {
    pub fn new(document: DocumentRef, inputs: I, metadata: M) -> Self {
        Self { document, inputs, targets: None, metadata }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn inputs(&self) -> &I {
        &self.inputs
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn has_targets(&self) -> bool {
        self.targets.is_some()
    }

    /// The target payload.
    ///
    /// # Errors
    /// `Error::TargetsNotSet` if `encode_target` has not run for this encoding.
    pub fn targets(&self) -> Result<&T> {
        self.targets.as_ref().ok_or(Error::TargetsNotSet)
    }

    pub fn set_targets(&mut self, targets: T) {
        self.targets = Some(targets);
    }

    /// Point the encoding at another document (a decode-time copy).
    pub(crate) fn rebind(&mut self, document: DocumentRef) {
        self.document = document;
    }
}

// ─── TaskEncodingSequence ─────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TaskEncodingSequence<E> {
    task_encodings:     Vec<E>,
    documents_in_order: Vec<DocumentRef>,
}

impl<E> TaskEncodingSequence<E> {
    pub fn new(task_encodings: Vec<E>, documents_in_order: Vec<DocumentRef>) -> Self {
        Self { task_encodings, documents_in_order }
    }

    pub fn task_encodings(&self) -> &[E] {
        &self.task_encodings
    }

    pub fn documents_in_order(&self) -> &[DocumentRef] {
        &self.documents_in_order
    }

    pub fn into_parts(self) -> (Vec<E>, Vec<DocumentRef>) {
        (self.task_encodings, self.documents_in_order)
    }
}

// ─── EncodedDocuments ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub enum EncodedDocuments<E> {
    /// Training mode: documents without encodings are forgotten.
    Unordered(Vec<E>),
    /// Inference mode: original document order is kept for decode.
    Ordered(TaskEncodingSequence<E>),
}

impl<E> EncodedDocuments<E> {
    pub fn task_encodings(&self) -> &[E] {
        match self {
            EncodedDocuments::Unordered(encodings) => encodings,
            EncodedDocuments::Ordered(sequence) => sequence.task_encodings(),
        }
    }

    pub fn task_encodings_mut(&mut self) -> &mut [E] {
        match self {
            EncodedDocuments::Unordered(encodings) => encodings,
            EncodedDocuments::Ordered(sequence) => &mut sequence.task_encodings,
        }
    }

    pub fn len(&self) -> usize {
        self.task_encodings().len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_encodings().is_empty()
    }

    /// Encodings plus the original document order, if one was kept.
    pub fn into_parts(self) -> (Vec<E>, Option<Vec<DocumentRef>>) {
        match self {
            EncodedDocuments::Unordered(encodings) => (encodings, None),
            EncodedDocuments::Ordered(sequence) => {
                let (encodings, documents) = sequence.into_parts();
                (encodings, Some(documents))
            }
        }
    }

    pub fn into_task_encodings(self) -> Vec<E> {
        self.into_parts().0
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::Document;

    #[test]
    fn test_targets_before_assignment_is_an_error() {
        let doc = DocumentRef::new(Document::new("x"));
        let mut enc: TaskEncoding<u32, u32, ()> = TaskEncoding::new(doc, 7, ());
        assert!(!enc.has_targets());
        assert!(matches!(enc.targets(), Err(Error::TargetsNotSet)));

        enc.set_targets(3);
        assert!(enc.has_targets());
        assert_eq!(*enc.targets().unwrap(), 3);
    }

    #[test]
    fn test_rebind_changes_document_identity() {
        let original = DocumentRef::new(Document::new("x"));
        let copy     = original.deep_copy();
        let mut enc: TaskEncoding<(), (), ()> = TaskEncoding::new(original.clone(), (), ());
        enc.rebind(copy.clone());
        assert!(enc.document().ptr_eq(&copy));
        assert!(!enc.document().ptr_eq(&original));
    }

    #[test]
    fn test_ordered_parts_keep_document_list() {
        let a = DocumentRef::new(Document::new("a"));
        let b = DocumentRef::new(Document::new("b"));
        let encodings = vec![TaskEncoding::<(), (), ()>::new(b.clone(), (), ())];
        let encoded = EncodedDocuments::Ordered(TaskEncodingSequence::new(
            encodings,
            vec![a.clone(), b.clone()],
        ));
        assert_eq!(encoded.len(), 1);

        let (encodings, documents) = encoded.into_parts();
        let documents = documents.unwrap();
        assert_eq!(encodings.len(), 1);
        assert!(documents[0].ptr_eq(&a));
        assert!(documents[1].ptr_eq(&b));
    }
}
