use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// Target of one relation candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationTarget {
    /// Label id; 0 is the negative label
    Single(usize),
    /// One 0/1 slot per label id
    MultiHot(Vec<u32>),
}

/// One marker-augmented relation candidate, unpadded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReSample {
    pub input_ids: Vec<u32>,
    pub targets:   Option<RelationTarget>,
}

impl ReSample {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

pub struct ReDataset {
    samples: Vec<ReSample>,
}

impl ReDataset {
    pub fn new(samples: Vec<ReSample>) -> Self {
        Self { samples }
    }

    /// Training samples from target-encoded task encodings.
    /// Encodings without targets are skipped.
    pub fn from_encodings<'a, I>(encodings: I) -> Self
    where
        I: IntoIterator<Item = &'a crate::taskmodule::re_text_classification::ReTaskEncoding>,
    {
        let samples = encodings
            .into_iter()
            .filter_map(|encoding| {
                let targets = encoding.targets().ok()?.clone();
                Some(ReSample {
                    input_ids: encoding.inputs().input_ids.clone(),
                    targets:   Some(targets),
                })
            })
            .collect();
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<ReSample> for ReDataset {
    fn get(&self, index: usize) -> Option<ReSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotation::LabeledSpan;
    use crate::domain::document::{Document, DocumentRef};
    use crate::taskmodule::re_text_classification::{ReInputEncoding, ReMetadata, ReTaskEncoding};

    fn encoding(ids: Vec<u32>, target: Option<usize>) -> ReTaskEncoding {
        let doc = DocumentRef::new(Document::new("a b"));
        let metadata = ReMetadata { head: LabeledSpan::new(0, 1, "X"), tail: LabeledSpan::new(2, 3, "X") };
        let mut encoding = ReTaskEncoding::new(doc, ReInputEncoding { input_ids: ids }, metadata);
        if let Some(target) = target {
            encoding.set_targets(RelationTarget::Single(target));
        }
        encoding
    }

    #[test]
    fn test_from_encodings_keeps_only_targeted() {
        let encodings = vec![encoding(vec![1, 2], Some(1)), encoding(vec![3], None)];
        let dataset = ReDataset::from_encodings(&encodings);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.sample_count(), 1);

        let sample = dataset.get(0).unwrap();
        assert_eq!(sample.input_ids, vec![1, 2]);
        assert_eq!(sample.targets, Some(RelationTarget::Single(1)));
        assert!(dataset.get(1).is_none());
    }
}
