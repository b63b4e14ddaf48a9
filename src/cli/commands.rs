// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `prepare`, `encode` and `predict`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::encode_use_case::EncodeConfig;
use crate::application::predict_use_case::PredictConfig;
use crate::application::prepare_use_case::PrepareConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a tokenizer and prepare a relation task module from annotated documents
    Prepare(PrepareArgs),

    /// Encode documents with a prepared task module and report what was encoded
    Encode(EncodeArgs),

    /// Predict relations with a saved classifier and write annotated documents
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// JSON file or directory of JSON files with annotated documents
    #[arg(long, default_value = "data/documents")]
    pub docs: String,

    /// Directory to save the tokenizer, task module and model into
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Maximum vocabulary size of a newly built tokenizer
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Span layer holding the entities
    #[arg(long, default_value = "entities")]
    pub entity_annotation: String,

    /// Relation layer holding gold relations and receiving predictions
    #[arg(long, default_value = "relations")]
    pub relation_annotation: String,

    /// Span layer to scope entity pairs by (e.g. sentences)
    #[arg(long)]
    pub partition_annotation: Option<String>,

    /// Label of the negative class
    #[arg(long, default_value = "no_relation")]
    pub none_label: String,

    /// Use entity-typed markers such as [H:PER]
    #[arg(long)]
    pub add_type_to_marker: bool,

    /// Relations may carry several labels
    #[arg(long)]
    pub multi_label: bool,

    /// Truncate tokenized text to this many tokens
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Cut a token window of at most this size around each pair
    #[arg(long)]
    pub max_window: Option<usize>,

    /// Also initialise and save a classifier sized to the task module
    #[arg(long)]
    pub init_model: bool,

    /// Longest input sequence the classifier accepts
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    /// Embedding dimension of the classifier
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// Number of attention heads (d_model must be divisible by it)
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    /// Number of stacked encoder layers
    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 512)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            docs_path:            a.docs,
            checkpoint_dir:       a.checkpoint_dir,
            vocab_size:           a.vocab_size,
            entity_annotation:    a.entity_annotation,
            relation_annotation:  a.relation_annotation,
            partition_annotation: a.partition_annotation,
            none_label:           a.none_label,
            add_type_to_marker:   a.add_type_to_marker,
            multi_label:          a.multi_label,
            max_length:           a.max_length,
            max_window:           a.max_window,
            init_model:           a.init_model,
            max_seq_len:          a.max_seq_len,
            d_model:              a.d_model,
            num_heads:            a.num_heads,
            num_layers:           a.num_layers,
            d_ff:                 a.d_ff,
            dropout:              a.dropout,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON file or directory of JSON files with documents
    #[arg(long, default_value = "data/documents")]
    pub docs: String,

    /// Directory written by `prepare`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Attach gold labels (training mode)
    #[arg(long)]
    pub with_targets: bool,
}

impl From<EncodeArgs> for EncodeConfig {
    fn from(a: EncodeArgs) -> Self {
        EncodeConfig {
            checkpoint_dir: a.checkpoint_dir,
            docs_path:      a.docs,
            with_targets:   a.with_targets,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON file or directory of JSON files with documents
    #[arg(long, default_value = "data/documents")]
    pub docs: String,

    /// Directory written by `prepare --init-model`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Where to write the annotated documents
    #[arg(long, default_value = "predictions.json")]
    pub output: String,

    /// Number of candidate pairs per forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            checkpoint_dir: a.checkpoint_dir,
            docs_path:      a.docs,
            output_path:    a.output,
            batch_size:     a.batch_size,
        }
    }
}
