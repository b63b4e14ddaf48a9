// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Builds a ready-to-use relation task module from a corpus:
//
//   Step 1: Load JSON documents          (Layer 4 - data)
//   Step 2: Build / load tokenizer       (Layer 6 - infra)
//   Step 3: Prepare the task module      (Layer 4 - taskmodule)
//           label vocabulary, argument markers
//   Step 4: Save task module config      (Layer 6 - infra)
//   Step 5: Optionally initialise and save a classifier sized
//           to the vocabulary and label set (Layer 5 - ml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::AppBackend;
use crate::data::loader::JsonDocumentLoader;
use crate::domain::document::DocumentRef;
use crate::domain::traits::DocumentSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer::{HfTokenizer, TransformerTokenizer},
    tokenizer_store::TokenizerStore,
};
use crate::ml::model::TransformerTextClassifierConfig;
use crate::taskmodule::auto::AutoTaskModule;
use crate::taskmodule::re_text_classification::{
    ReTextClassificationConfig, ReTextClassificationTaskModule,
};
use crate::taskmodule::TaskModule;

// ─── Prepare Configuration ───────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub docs_path:            String,
    pub checkpoint_dir:       String,
    pub vocab_size:           usize,
    pub entity_annotation:    String,
    pub relation_annotation:  String,
    pub partition_annotation: Option<String>,
    pub none_label:           String,
    pub add_type_to_marker:   bool,
    pub multi_label:          bool,
    pub max_length:           Option<usize>,
    pub max_window:           Option<usize>,
    pub init_model:           bool,
    pub max_seq_len:          usize,
    pub d_model:              usize,
    pub num_heads:            usize,
    pub num_layers:           usize,
    pub d_ff:                 usize,
    pub dropout:              f64,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            docs_path:            "data/documents".to_string(),
            checkpoint_dir:       "checkpoints".to_string(),
            vocab_size:           30522,
            entity_annotation:    "entities".to_string(),
            relation_annotation:  "relations".to_string(),
            partition_annotation: None,
            none_label:           "no_relation".to_string(),
            add_type_to_marker:   false,
            multi_label:          false,
            max_length:           None,
            max_window:           None,
            init_model:           false,
            max_seq_len:          512,
            d_model:              128,
            num_heads:            4,
            num_layers:           2,
            d_ff:                 512,
            dropout:              0.1,
        }
    }
}

/// What `prepare` learned from the corpus.
#[derive(Debug, Clone, Serialize)]
pub struct PrepareReport {
    pub documents:     usize,
    pub labels:        Vec<String>,
    pub entity_labels: Vec<String>,
    pub vocab_size:    usize,
}

// ─── PrepareUseCase ──────────────────────────────────────────────────────────
pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PrepareReport> {
        let cfg = &self.config;

        // ── Step 1: Load documents ───────────────────────────────────────────
        let documents = JsonDocumentLoader::new(&cfg.docs_path).load_all()?;
        anyhow::ensure!(!documents.is_empty(), "No documents found at '{}'", cfg.docs_path);
        let texts: Vec<String> = documents.iter().map(|d| d.text().to_string()).collect();
        let documents: Vec<DocumentRef> = documents.into_iter().map(DocumentRef::new).collect();

        // ── Step 2: Build / load tokenizer ───────────────────────────────────
        let store     = TokenizerStore::new(std::path::Path::new(&cfg.checkpoint_dir).join("tokenizer"));
        let tokenizer = HfTokenizer::new(store.load_or_build(&texts, cfg.vocab_size)?)?;

        // ── Step 3: Prepare the task module ──────────────────────────────────
        let mut module_config = ReTextClassificationConfig::new(store.path().to_string_lossy());
        module_config.entity_annotation    = cfg.entity_annotation.clone();
        module_config.relation_annotation  = cfg.relation_annotation.clone();
        module_config.partition_annotation = cfg.partition_annotation.clone();
        module_config.none_label           = cfg.none_label.clone();
        module_config.add_type_to_marker   = cfg.add_type_to_marker;
        module_config.multi_label          = cfg.multi_label;
        module_config.max_length           = cfg.max_length;
        module_config.max_window           = cfg.max_window;

        let mut module = ReTextClassificationTaskModule::with_tokenizer(module_config, tokenizer)?;
        module.prepare(&documents).context("Failed to prepare the relation task module")?;

        let labels: Vec<String> = module
            .label_to_id()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        let entity_labels = module.config().entity_labels.clone().unwrap_or_default();
        let vocab_size    = module.tokenizer().vocab_size();
        let num_labels    = module.num_labels();
        tracing::info!(
            "Prepared {} relation labels and {} entity types over {} documents",
            labels.len(),
            entity_labels.len(),
            documents.len()
        );

        // ── Step 4: Save task module config ──────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir)?;
        checkpoints.save_taskmodule(&AutoTaskModule::ReTextClassification(module))?;

        // ── Step 5: Initialise the classifier ────────────────────────────────
        if cfg.init_model {
            let model_config = TransformerTextClassifierConfig::new(vocab_size, num_labels)
                .with_max_seq_len(cfg.max_seq_len)
                .with_d_model(cfg.d_model)
                .with_num_heads(cfg.num_heads)
                .with_num_layers(cfg.num_layers)
                .with_d_ff(cfg.d_ff)
                .with_dropout(cfg.dropout);
            let device = Default::default();
            let model  = model_config.init::<AppBackend>(&device);
            checkpoints.save_model_config(&model_config)?;
            checkpoints.save_model(&model)?;
            tracing::info!("Initialised classifier (vocab_size={}, num_labels={})", vocab_size, num_labels);
        }

        Ok(PrepareReport { documents: documents.len(), labels, entity_labels, vocab_size })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tests::write_corpus;

    #[test]
    fn test_prepare_writes_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let docs_path = write_corpus(dir.path());
        let checkpoint_dir = dir.path().join("ckpt");

        let report = PrepareUseCase::new(PrepareConfig {
            docs_path:          docs_path.to_string_lossy().to_string(),
            checkpoint_dir:     checkpoint_dir.to_string_lossy().to_string(),
            vocab_size:         100,
            add_type_to_marker: true,
            init_model:         true,
            max_seq_len:        32,
            d_model:            16,
            num_heads:          2,
            num_layers:         1,
            d_ff:               32,
            ..PrepareConfig::default()
        })
        .execute()
        .unwrap();

        assert_eq!(report.documents, 2);
        assert_eq!(report.labels, vec!["lives_in".to_string(), "met_person".to_string(), "no_relation".to_string()]);
        assert_eq!(report.entity_labels, vec!["LOC".to_string(), "PER".to_string()]);
        assert!(checkpoint_dir.join("taskmodule_config.json").is_file());
        assert!(checkpoint_dir.join("tokenizer").join("tokenizer.json").is_file());
        assert!(checkpoint_dir.join("model_config.json").is_file());

        let module = CheckpointManager::new(&checkpoint_dir).unwrap().load_taskmodule().unwrap();
        assert!(module.is_prepared());
    }

    #[test]
    fn test_prepare_without_documents_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = PrepareUseCase::new(PrepareConfig {
            docs_path:      dir.path().join("missing").to_string_lossy().to_string(),
            checkpoint_dir: dir.path().join("ckpt").to_string_lossy().to_string(),
            ..PrepareConfig::default()
        })
        .execute();
        assert!(result.is_err());
    }
}
