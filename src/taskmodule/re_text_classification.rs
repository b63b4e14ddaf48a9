// ============================================================
// Layer 4 — Relation Classification Task Module
// ============================================================
// Marker-based relation extraction. Every candidate (head, tail)
// entity pair becomes one token sequence in which four marker
// tokens frame the two arguments:
//
//   [CLS] [H] alice [/H] met [T] bob [/T] in paris [SEP]
//
// and a text classifier predicts the relation label of the pair.
//
// Encoding, per document and per partition (sentence, ...):
//   1. tokenize the partition text (raw when windowing is on)
//   2. enumerate ordered entity pairs inside the partition
//   3. map both entities to token slices; skip unaligned pairs
//   4. optionally cut a token window around both entities;
//      skip pairs that do not fit
//   5. insert the markers, first argument in text order first
//   6. add [CLS]/[SEP] manually if windowing skipped them in 1
//
// Label ids: the negative label is 0, all other relation labels
// follow in sorted order from 1.
//
// Reference: Baldini Soares et al. (2019) "Matching the Blanks"
//            Zhou & Chen (2021) "An Improved Baseline for
//            Sentence-level Relation Extraction"

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, softmax};
use serde::{Deserialize, Serialize};

use crate::data::alignment::{get_token_slice, get_window_around_slice};
use crate::data::batcher::{Padding, ReBatch, ReBatcher};
use crate::data::dataset::{RelationTarget, ReSample};
use crate::domain::annotation::{Annotation, BinaryRelation, Label, LabeledSpan, Score};
use crate::domain::document::DocumentRef;
use crate::domain::error::{Error, Result};
use crate::domain::traits::Persistable;
use crate::infra::tokenizer::{HfTokenizer, TransformerTokenizer};
use crate::ml::TextClassificationOutput;
use crate::taskmodule::auto::{TaskModuleConfig, CONFIG_NAME};
use crate::taskmodule::encoding::TaskEncoding;
use crate::taskmodule::markers::{ArgumentMarkers, ArgumentRole, Boundary};
use crate::taskmodule::statistics::{
    EncodingStatistics, ALIGNMENT_ERROR, CANDIDATES, OUT_OF_WINDOW, TO_PREDICT,
};
use crate::taskmodule::{Collate, TaskEncodingOf, TaskModule};

/// Marker tokens added around the two arguments.
const NUM_MARKERS: usize = 4;

// ─── Config ───────────────────────────────────────────────────────────────────
fn default_entity_annotation() -> String {
    "entities".to_string()
}
fn default_relation_annotation() -> String {
    "relations".to_string()
}
fn default_none_label() -> String {
    "no_relation".to_string()
}
fn default_true() -> bool {
    true
}
fn default_threshold() -> f32 {
    0.5
}

/// Full reconstruction state of the module. `label_to_id` and
/// `entity_labels` are filled in by `prepare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReTextClassificationConfig {
    /// `tokenizer.json` file or a directory containing one
    pub tokenizer_name_or_path: String,
    #[serde(default = "default_entity_annotation")]
    pub entity_annotation: String,
    #[serde(default = "default_relation_annotation")]
    pub relation_annotation: String,
    /// Span layer whose annotations scope pair enumeration (e.g. sentences)
    #[serde(default)]
    pub partition_annotation: Option<String>,
    #[serde(default = "default_none_label")]
    pub none_label: String,
    #[serde(default)]
    pub padding: Padding,
    #[serde(default = "default_true")]
    pub truncation: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub pad_to_multiple_of: Option<usize>,
    #[serde(default)]
    pub multi_label: bool,
    #[serde(default = "default_threshold")]
    pub multi_label_threshold: f32,
    #[serde(default)]
    pub label_to_id: Option<BTreeMap<String, usize>>,
    #[serde(default)]
    pub add_type_to_marker: bool,
    #[serde(default)]
    pub entity_labels: Option<Vec<String>>,
    /// Upper bound on tokens per encoding, markers and special tokens included
    #[serde(default)]
    pub max_window: Option<usize>,
    #[serde(default)]
    pub show_statistics: bool,
}

impl ReTextClassificationConfig {
    pub fn new(tokenizer_name_or_path: impl Into<String>) -> Self {
        Self {
            tokenizer_name_or_path: tokenizer_name_or_path.into(),
            entity_annotation:      default_entity_annotation(),
            relation_annotation:    default_relation_annotation(),
            partition_annotation:   None,
            none_label:             default_none_label(),
            padding:                Padding::default(),
            truncation:             true,
            max_length:             None,
            pad_to_multiple_of:     None,
            multi_label:            false,
            multi_label_threshold:  default_threshold(),
            label_to_id:            None,
            add_type_to_marker:     false,
            entity_labels:          None,
            max_window:             None,
            show_statistics:        false,
        }
    }
}

// ─── Encodings ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReInputEncoding {
    /// Marker-augmented token ids, special tokens included
    pub input_ids: Vec<u32>,
}

/// The candidate pair an encoding was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReMetadata {
    pub head: LabeledSpan,
    pub tail: LabeledSpan,
}

/// Per-example prediction. Holds `[none_label]` for a negative prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReTaskOutput {
    pub labels:        Vec<String>,
    pub probabilities: Vec<f32>,
}

pub type ReTaskEncoding = TaskEncoding<ReInputEncoding, RelationTarget, ReMetadata>;

// ─── Pair enumeration ─────────────────────────────────────────────────────────
/// Ordered pairs of distinct entities. With a `partition`, both
/// entities must lie inside it; with `relations`, only pairs that
/// have a gold relation are kept.
pub fn enumerate_entity_pairs<'a>(
    entities:  &'a [LabeledSpan],
    partition: Option<(usize, usize)>,
    relations: Option<&'a HashSet<(LabeledSpan, LabeledSpan)>>,
) -> impl Iterator<Item = (&'a LabeledSpan, &'a LabeledSpan)> + 'a {
    let inside = move |span: &LabeledSpan| match partition {
        Some((start, end)) => span.is_contained_in(start, end),
        None => true,
    };
    entities
        .iter()
        .filter(move |head| inside(*head))
        .flat_map(move |head| {
            entities
                .iter()
                .filter(move |tail| inside(*tail))
                .map(move |tail| (head, tail))
        })
        .filter(|(head, tail)| head != tail)
        .filter(move |(head, tail)| match relations {
            Some(existing) => existing.contains(&((*head).clone(), (*tail).clone())),
            None => true,
        })
}

fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

// ─── Task module ──────────────────────────────────────────────────────────────
#[derive(Debug)]
pub struct ReTextClassificationTaskModule<T = HfTokenizer> {
    config:      ReTextClassificationConfig,
    tokenizer:   T,
    markers:     Option<ArgumentMarkers>,
    id_to_label: BTreeMap<usize, String>,
    statistics:  RefCell<EncodingStatistics>,
}

impl ReTextClassificationTaskModule<HfTokenizer> {
    /// Load the tokenizer named in the config and build the module.
    pub fn new(config: ReTextClassificationConfig) -> Result<Self> {
        let tokenizer = HfTokenizer::from_path(&config.tokenizer_name_or_path)?;
        Self::with_tokenizer(config, tokenizer)
    }

    /// Write the config to `dir/taskmodule_config.json`.
    pub fn save_pretrained(&self, dir: impl AsRef<Path>) -> Result<()> {
        if !self.is_prepared() {
            return Err(Error::NotPrepared);
        }
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let config = TaskModuleConfig::ReTextClassification(self.config.clone());
        let path = dir.join(CONFIG_NAME);
        fs::write(&path, serde_json::to_string_pretty(&config)?)?;
        tracing::info!("Saved task module config to '{}'", path.display());
        Ok(())
    }
}

impl<T: TransformerTokenizer> ReTextClassificationTaskModule<T> {
    /// Build the module around an already loaded tokenizer. A prepared
    /// config registers its argument markers right away.
    pub fn with_tokenizer(config: ReTextClassificationConfig, tokenizer: T) -> Result<Self> {
        let mut module = Self {
            config,
            tokenizer,
            markers:     None,
            id_to_label: BTreeMap::new(),
            statistics:  RefCell::new(EncodingStatistics::default()),
        };
        if module.is_prepared() {
            module.install_vocabulary()?;
        }
        Ok(module)
    }

    pub fn config(&self) -> &ReTextClassificationConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    pub fn label_to_id(&self) -> Option<&BTreeMap<String, usize>> {
        self.config.label_to_id.as_ref()
    }

    pub fn num_labels(&self) -> usize {
        self.id_to_label.len()
    }

    /// Counters gathered since the last call (only with `show_statistics`).
    pub fn take_statistics(&self) -> EncodingStatistics {
        std::mem::take(&mut *self.statistics.borrow_mut())
    }

    /// Build `id_to_label` and register the argument markers from the
    /// prepared config.
    fn install_vocabulary(&mut self) -> Result<()> {
        let (Some(label_to_id), Some(entity_labels)) =
            (&self.config.label_to_id, &self.config.entity_labels)
        else {
            return Err(Error::NotPrepared);
        };
        self.id_to_label = label_to_id.iter().map(|(l, &i)| (i, l.clone())).collect();

        let mut markers = ArgumentMarkers::new(entity_labels, self.config.add_type_to_marker);
        markers.register(&mut self.tokenizer)?;
        self.markers = Some(markers);
        Ok(())
    }

    fn markers(&self) -> Result<&ArgumentMarkers> {
        self.markers.as_ref().ok_or(Error::NotPrepared)
    }

    fn record(&self, category: &str, key: &str) {
        if self.config.show_statistics {
            self.statistics.borrow_mut().record(category, key);
        }
    }

    fn label_id(&self, label: &str) -> Result<usize> {
        self.config
            .label_to_id
            .as_ref()
            .and_then(|map| map.get(label))
            .copied()
            .ok_or_else(|| Error::UnknownLabel(label.to_string()))
    }

    fn marker_id(&self, role: ArgumentRole, boundary: Boundary, entity: &LabeledSpan) -> Result<u32> {
        let markers = self.markers()?;
        if !self.config.add_type_to_marker {
            return markers.id(role, boundary, "");
        }
        let entity_type = entity.label.single().ok_or_else(|| {
            Error::Unsupported("typed argument markers for multi-label entities".to_string())
        })?;
        markers.id(role, boundary, entity_type)
    }

    /// Insert the four markers into `input_ids`. Slices are token ranges
    /// into `input_ids`; the argument that comes first in the text is
    /// marked first.
    fn insert_markers(
        &self,
        input_ids:  &[u32],
        head:       (&LabeledSpan, (usize, usize)),
        tail:       (&LabeledSpan, (usize, usize)),
    ) -> Result<Vec<u32>> {
        let (head_span, head_slice) = head;
        let (tail_span, tail_slice) = tail;

        let (first, second) = if head_slice.0 < tail_slice.0 {
            if head_slice.1 > tail_slice.0 {
                return Err(Error::OverlappingArguments { head: head_slice, tail: tail_slice });
            }
            ((ArgumentRole::Head, head_span, head_slice), (ArgumentRole::Tail, tail_span, tail_slice))
        } else {
            if tail_slice.1 > head_slice.0 {
                return Err(Error::OverlappingArguments { head: head_slice, tail: tail_slice });
            }
            ((ArgumentRole::Tail, tail_span, tail_slice), (ArgumentRole::Head, head_span, head_slice))
        };
        let (first_role, first_span, (first_start, first_end)) = first;
        let (second_role, second_span, (second_start, second_end)) = second;

        let mut out = Vec::with_capacity(input_ids.len() + NUM_MARKERS);
        out.extend_from_slice(&input_ids[..first_start]);
        out.push(self.marker_id(first_role, Boundary::Start, first_span)?);
        out.extend_from_slice(&input_ids[first_start..first_end]);
        out.push(self.marker_id(first_role, Boundary::End, first_span)?);
        out.extend_from_slice(&input_ids[first_end..second_start]);
        out.push(self.marker_id(second_role, Boundary::Start, second_span)?);
        out.extend_from_slice(&input_ids[second_start..second_end]);
        out.push(self.marker_id(second_role, Boundary::End, second_span)?);
        out.extend_from_slice(&input_ids[second_end..]);
        Ok(out)
    }
}

impl<T: TransformerTokenizer> TaskModule for ReTextClassificationTaskModule<T> {
    type InputEncoding  = ReInputEncoding;
    type TargetEncoding = RelationTarget;
    type Metadata       = ReMetadata;
    type TaskOutput     = ReTaskOutput;

    fn is_prepared(&self) -> bool {
        self.config.label_to_id.is_some() && self.config.entity_labels.is_some()
    }

    fn prepare(&mut self, documents: &[DocumentRef]) -> Result<()> {
        if self.is_prepared() {
            return Err(Error::AlreadyPrepared);
        }

        let mut entity_labels   = BTreeSet::new();
        let mut relation_labels = BTreeSet::new();
        for document in documents {
            let document  = document.borrow();
            let entities  = document.span_layer(&self.config.entity_annotation)?;
            let relations = document.relation_layer(&self.config.relation_annotation)?;

            if self.config.add_type_to_marker {
                for entity in entities.gold() {
                    entity_labels.extend(entity.label.labels().iter().cloned());
                }
            }
            for relation in relations.gold() {
                relation_labels.extend(relation.label.labels().iter().cloned());
            }
        }
        relation_labels.remove(&self.config.none_label);

        let mut label_to_id: BTreeMap<String, usize> = relation_labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| (label, i + 1))
            .collect();
        label_to_id.insert(self.config.none_label.clone(), 0);

        tracing::info!(
            "Prepared task module: {} relation labels, {} entity types",
            label_to_id.len(),
            entity_labels.len()
        );

        self.config.label_to_id   = Some(label_to_id);
        self.config.entity_labels = Some(entity_labels.into_iter().collect());
        self.install_vocabulary()
    }

    fn encode_input(
        &self,
        document:    &DocumentRef,
        is_training: bool,
    ) -> Result<Vec<TaskEncodingOf<Self>>> {
        self.markers()?;
        let doc = document.borrow();

        let entities = doc.span_layer(&self.config.entity_annotation)?.gold();
        let relations: &[BinaryRelation] = if doc.has_relation_layer(&self.config.relation_annotation) {
            doc.relation_layer(&self.config.relation_annotation)?.gold()
        } else {
            &[]
        };
        let relation_mapping: HashMap<(LabeledSpan, LabeledSpan), &Label> = relations
            .iter()
            .map(|r| ((r.head.clone(), r.tail.clone()), &r.label))
            .collect();
        let existing_pairs: HashSet<(LabeledSpan, LabeledSpan)> =
            relation_mapping.keys().cloned().collect();
        let restrict_to = (is_training && !existing_pairs.is_empty()).then_some(&existing_pairs);

        let partitions: Vec<Option<(usize, usize)>> = match &self.config.partition_annotation {
            Some(name) => doc.span_layer(name)?.gold().iter().map(|p| Some((p.start, p.end))).collect(),
            None => vec![None],
        };

        let add_special_tokens = self.config.max_window.is_none();
        let mut task_encodings = Vec::new();

        for partition in partitions {
            let (offset, text) = match partition {
                Some((start, end)) => (start, char_slice(doc.text(), start, end)),
                None => (0, doc.text().to_string()),
            };
            let encoding = self.tokenizer.tokenize(
                &text,
                self.config.truncation,
                self.config.max_length,
                add_special_tokens,
            )?;

            for (head, tail) in enumerate_entity_pairs(entities, partition, restrict_to) {
                let key = relation_mapping
                    .get(&(head.clone(), tail.clone()))
                    .map(|label| label.to_string())
                    .unwrap_or_else(|| TO_PREDICT.to_string());

                let to_token = |c: usize| encoding.char_to_token(c);
                let head_slice = get_token_slice((head.start, head.end), to_token, offset);
                let tail_slice = get_token_slice((tail.start, tail.end), to_token, offset);
                let (Some(mut head_slice), Some(mut tail_slice)) = (head_slice, tail_slice) else {
                    self.record(ALIGNMENT_ERROR, &key);
                    continue;
                };

                let mut input_ids: &[u32] = &encoding.input_ids;
                if let Some(max_window) = self.config.max_window {
                    let overhead   = NUM_MARKERS + self.tokenizer.num_special_tokens_to_add();
                    let max_tokens = max_window.saturating_sub(overhead);
                    let required   = (head_slice.0.min(tail_slice.0), head_slice.1.max(tail_slice.1));
                    let Some((window_start, window_end)) =
                        get_window_around_slice(required, max_tokens, input_ids.len())
                    else {
                        self.record(OUT_OF_WINDOW, &key);
                        continue;
                    };
                    input_ids  = &input_ids[window_start..window_end];
                    head_slice = (head_slice.0 - window_start, head_slice.1 - window_start);
                    tail_slice = (tail_slice.0 - window_start, tail_slice.1 - window_start);
                }

                let mut input_ids = self.insert_markers(input_ids, (head, head_slice), (tail, tail_slice))?;
                if !add_special_tokens {
                    input_ids = self.tokenizer.build_inputs_with_special_tokens(&input_ids);
                }

                task_encodings.push(TaskEncoding::new(
                    document.clone(),
                    ReInputEncoding { input_ids },
                    ReMetadata { head: head.clone(), tail: tail.clone() },
                ));
                self.record(CANDIDATES, &key);
            }
        }

        Ok(task_encodings)
    }

    fn on_inputs_start(&self) {
        self.statistics.borrow_mut().clear();
    }

    fn on_inputs_encoded(&self) {
        if self.config.show_statistics {
            self.statistics.borrow().log();
        }
    }

    fn encode_target(&self, encoding: &TaskEncodingOf<Self>) -> Result<RelationTarget> {
        let document  = encoding.document().borrow();
        let relations = document.relation_layer(&self.config.relation_annotation)?;
        let metadata  = encoding.metadata();

        // last gold relation of a pair wins, as in the candidate statistics
        let gold = relations
            .gold()
            .iter()
            .rev()
            .find(|r| r.head == metadata.head && r.tail == metadata.tail);
        let labels: Vec<&str> = match gold {
            Some(relation) => relation.label.labels().iter().map(String::as_str).collect(),
            None => vec![self.config.none_label.as_str()],
        };

        if self.config.multi_label {
            let mut multi_hot = vec![0u32; self.num_labels()];
            for label in labels {
                let id = self.label_id(label)?;
                if let Some(slot) = multi_hot.get_mut(id) {
                    *slot = 1;
                }
            }
            return Ok(RelationTarget::MultiHot(multi_hot));
        }

        match labels.as_slice() {
            [label] => Ok(RelationTarget::Single(self.label_id(label)?)),
            _ => Err(Error::Unsupported(format!(
                "{} labels on a relation without multi_label",
                labels.len()
            ))),
        }
    }

    fn create_annotations_from_output(
        &self,
        encoding: &TaskEncodingOf<Self>,
        output:   &ReTaskOutput,
    ) -> Result<Vec<(String, Annotation)>> {
        let negative = output.labels.is_empty()
            || (output.labels.len() == 1 && output.labels[0] == self.config.none_label);
        if negative {
            return Ok(Vec::new());
        }

        let metadata = encoding.metadata();
        let (label, score) = if self.config.multi_label {
            (Label::Multi(output.labels.clone()), Score::Multi(output.probabilities.clone()))
        } else {
            (
                Label::Single(output.labels[0].clone()),
                Score::Single(output.probabilities.first().copied().unwrap_or_default()),
            )
        };
        let relation = BinaryRelation::new(metadata.head.clone(), metadata.tail.clone(), label)
            .with_score(score);
        Ok(vec![(self.config.relation_annotation.clone(), relation.into())])
    }
}

impl<B: Backend, T: TransformerTokenizer> Collate<B> for ReTextClassificationTaskModule<T> {
    type Batch       = ReBatch<B>;
    type ModelOutput = TextClassificationOutput<B>;

    fn collate(&self, task_encodings: &[TaskEncodingOf<Self>], device: &B::Device) -> Result<ReBatch<B>> {
        if task_encodings.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let with_targets = task_encodings.iter().filter(|e| e.has_targets()).count();
        let include_targets = with_targets == task_encodings.len();
        if with_targets > 0 && !include_targets {
            return Err(Error::TargetsNotSet);
        }

        let samples = task_encodings
            .iter()
            .map(|encoding| {
                let targets = if include_targets { Some(encoding.targets()?.clone()) } else { None };
                Ok(ReSample { input_ids: encoding.inputs().input_ids.clone(), targets })
            })
            .collect::<Result<Vec<_>>>()?;

        let batcher = ReBatcher::<B>::new(device.clone(), self.tokenizer.pad_token_id())
            .with_padding(self.config.padding, self.config.max_length)
            .with_pad_to_multiple_of(self.config.pad_to_multiple_of);
        Ok(batcher.batch(samples))
    }

    fn unbatch_output(&self, model_output: TextClassificationOutput<B>) -> Result<Vec<ReTaskOutput>> {
        let logits = model_output.logits;
        let [batch_size, num_classes] = logits.dims();
        let probabilities = if self.config.multi_label { sigmoid(logits) } else { softmax(logits, 1) };
        let values: Vec<f32> = probabilities
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| Error::Tensor(format!("{e:?}")))?;

        let mut outputs = Vec::with_capacity(batch_size);
        for row in values.chunks(num_classes.max(1)).take(batch_size) {
            let output = if self.config.multi_label {
                self.multi_label_output(row)?
            } else {
                self.single_label_output(row)?
            };
            outputs.push(output);
        }
        Ok(outputs)
    }
}

impl<T: TransformerTokenizer> ReTextClassificationTaskModule<T> {
    fn label_for(&self, id: usize) -> Result<String> {
        self.id_to_label.get(&id).cloned().ok_or(Error::UnknownLabelId(id))
    }

    fn single_label_output(&self, row: &[f32]) -> Result<ReTaskOutput> {
        let (best_id, best_prob) = row
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });
        Ok(ReTaskOutput { labels: vec![self.label_for(best_id)?], probabilities: vec![best_prob] })
    }

    /// Every non-negative class at or above the threshold; the negative
    /// label alone when nothing passes.
    fn multi_label_output(&self, row: &[f32]) -> Result<ReTaskOutput> {
        let none_id = self.label_id(&self.config.none_label)?;
        let mut labels        = Vec::new();
        let mut probabilities = Vec::new();
        for (id, &p) in row.iter().enumerate() {
            if id != none_id && p >= self.config.multi_label_threshold {
                labels.push(self.label_for(id)?);
                probabilities.push(p);
            }
        }
        if labels.is_empty() {
            labels.push(self.config.none_label.clone());
            probabilities.push(row.get(none_id).copied().unwrap_or_default());
        }
        Ok(ReTaskOutput { labels, probabilities })
    }
}

// ─── Persistence ──────────────────────────────────────────────────────────────
impl Persistable for ReTextClassificationTaskModule<HfTokenizer> {
    fn save(&self, dir: &Path) -> Result<()> {
        self.save_pretrained(dir)
    }

    fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_NAME);
        let config: TaskModuleConfig = serde_json::from_str(&fs::read_to_string(&path)?)?;
        match config {
            TaskModuleConfig::ReTextClassification(config) => Self::new(config),
        }
    }
}
