// ============================================================
// Layer 4 — Relation Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ReSample> into
// model-ready tensors.
//
// Samples arrive unpadded (marker insertion makes every sequence
// a different length), so padding happens here:
//
//   Longest    pad to the longest sample in the batch
//   MaxLength  pad to max(longest, max_length)
//
// then optionally round up to a multiple of pad_to_multiple_of.
//
//   Input:  N samples of varying length
//   Output: ReBatch with input_ids / attention_mask [N, S]
//           and targets [N] (single-label) or [N, L] (multi-hot)
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::dataset::{RelationTarget, ReSample};

// ─── Padding ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    #[default]
    Longest,
    MaxLength,
}

// ─── ReBatch ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub enum ReTargets<B: Backend> {
    /// Label ids — shape: [batch_size]
    SingleLabel(Tensor<B, 1, Int>),
    /// Multi-hot rows — shape: [batch_size, num_labels]
    MultiLabel(Tensor<B, 2, Int>),
}

#[derive(Debug, Clone)]
pub struct ReBatch<B: Backend> {
    /// Token ID sequences — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Present only when every sample carried targets
    pub targets: Option<ReTargets<B>>,
}

// ─── ReBatcher ────────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ReBatcher<B: Backend> {
    pub device:             B::Device,
    pub pad_token_id:       u32,
    pub padding:            Padding,
    pub max_length:         Option<usize>,
    pub pad_to_multiple_of: Option<usize>,
}

impl<B: Backend> ReBatcher<B> {
    pub fn new(device: B::Device, pad_token_id: u32) -> Self {
        Self {
            device,
            pad_token_id,
            padding:            Padding::Longest,
            max_length:         None,
            pad_to_multiple_of: None,
        }
    }

    pub fn with_padding(mut self, padding: Padding, max_length: Option<usize>) -> Self {
        self.padding    = padding;
        self.max_length = max_length;
        self
    }

    pub fn with_pad_to_multiple_of(mut self, multiple: Option<usize>) -> Self {
        self.pad_to_multiple_of = multiple.filter(|&m| m > 0);
        self
    }

    /// Padded sequence length for a batch whose longest sample is `longest`.
    pub fn padded_length(&self, longest: usize) -> usize {
        let length = match (self.padding, self.max_length) {
            (Padding::MaxLength, Some(max_length)) => longest.max(max_length),
            _ => longest,
        };
        match self.pad_to_multiple_of {
            Some(multiple) => length.div_ceil(multiple) * multiple,
            None => length,
        }
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<ReSample, ReBatch<B>> for ReBatcher<B> {
    fn batch(&self, items: Vec<ReSample>) -> ReBatch<B> {
        let batch_size = items.len();
        let seq_len    = self.padded_length(items.iter().map(ReSample::len).max().unwrap_or(0));

        // ── Flatten and pad input_ids / attention_mask ────────────────────────
        let mut input_flat: Vec<i32> = Vec::with_capacity(batch_size * seq_len);
        let mut mask_flat:  Vec<i32> = Vec::with_capacity(batch_size * seq_len);
        for sample in &items {
            let pad = seq_len - sample.len();
            input_flat.extend(sample.input_ids.iter().map(|&x| x as i32));
            input_flat.extend(std::iter::repeat(self.pad_token_id as i32).take(pad));
            mask_flat.extend(std::iter::repeat(1).take(sample.len()));
            mask_flat.extend(std::iter::repeat(0).take(pad));
        }

        let input_ids = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let attention_mask = Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        // ── Targets ───────────────────────────────────────────────────────────
        let targets: Option<Vec<&RelationTarget>> =
            items.iter().map(|s| s.targets.as_ref()).collect();
        let targets = targets.filter(|t| !t.is_empty()).map(|targets| self.batch_targets(&targets));

        ReBatch { input_ids, attention_mask, targets }
    }
}

impl<B: Backend> ReBatcher<B> {
    fn batch_targets(&self, targets: &[&RelationTarget]) -> ReTargets<B> {
        if let Some(RelationTarget::MultiHot(first)) = targets.first() {
            let width = first.len();
            let flat: Vec<i32> = targets
                .iter()
                .flat_map(|t| match t {
                    RelationTarget::MultiHot(row) => row.iter().map(|&x| x as i32).collect(),
                    RelationTarget::Single(id) => one_hot(*id, width),
                })
                .collect();
            return ReTargets::MultiLabel(
                Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
                    .reshape([targets.len(), width]),
            );
        }

        let ids: Vec<i32> = targets
            .iter()
            .map(|t| match t {
                RelationTarget::Single(id) => *id as i32,
                RelationTarget::MultiHot(row) => row.iter().position(|&x| x > 0).unwrap_or(0) as i32,
            })
            .collect();
        ReTargets::SingleLabel(Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device))
    }
}

fn one_hot(id: usize, width: usize) -> Vec<i32> {
    (0..width).map(|i| i32::from(i == id)).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn sample(ids: &[u32], target: Option<RelationTarget>) -> ReSample {
        ReSample { input_ids: ids.to_vec(), targets: target }
    }

    fn ints<const D: usize>(t: Tensor<TestBackend, D, Int>) -> Vec<i64> {
        t.into_data().convert::<i64>().to_vec::<i64>().unwrap()
    }

    #[test]
    fn test_pads_to_longest() {
        let batcher = ReBatcher::<TestBackend>::new(Default::default(), 0);
        let batch = batcher.batch(vec![
            sample(&[2, 5, 3], Some(RelationTarget::Single(1))),
            sample(&[2, 3], Some(RelationTarget::Single(0))),
        ]);
        assert_eq!(batch.input_ids.dims(), [2, 3]);
        assert_eq!(ints(batch.input_ids), vec![2, 5, 3, 2, 3, 0]);
        assert_eq!(ints(batch.attention_mask), vec![1, 1, 1, 1, 1, 0]);
        match batch.targets {
            Some(ReTargets::SingleLabel(t)) => assert_eq!(ints(t), vec![1, 0]),
            other => panic!("expected single-label targets, got {other:?}"),
        }
    }

    #[test]
    fn test_max_length_and_multiple() {
        let batcher = ReBatcher::<TestBackend>::new(Default::default(), 0)
            .with_padding(Padding::MaxLength, Some(5))
            .with_pad_to_multiple_of(Some(4));
        assert_eq!(batcher.padded_length(3), 8);
        assert_eq!(batcher.padded_length(9), 12);

        let batch = batcher.batch(vec![sample(&[2, 3], None)]);
        assert_eq!(batch.input_ids.dims(), [1, 8]);
        assert!(batch.targets.is_none());
    }

    #[test]
    fn test_longest_ignores_max_length() {
        let batcher = ReBatcher::<TestBackend>::new(Default::default(), 0)
            .with_padding(Padding::Longest, Some(16));
        assert_eq!(batcher.padded_length(3), 3);
    }

    #[test]
    fn test_multi_hot_targets() {
        let batcher = ReBatcher::<TestBackend>::new(Default::default(), 0);
        let batch = batcher.batch(vec![
            sample(&[1], Some(RelationTarget::MultiHot(vec![0, 1, 1]))),
            sample(&[1], Some(RelationTarget::MultiHot(vec![1, 0, 0]))),
        ]);
        match batch.targets {
            Some(ReTargets::MultiLabel(t)) => {
                assert_eq!(t.dims(), [2, 3]);
                assert_eq!(ints(t), vec![0, 1, 1, 1, 0, 0]);
            }
            other => panic!("expected multi-label targets, got {other:?}"),
        }
    }

    #[test]
    fn test_padding_serialises_snake_case() {
        assert_eq!(serde_json::to_string(&Padding::MaxLength).unwrap(), r#""max_length""#);
    }
}
