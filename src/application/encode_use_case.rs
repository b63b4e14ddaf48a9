// ============================================================
// Layer 2 — EncodeUseCase
// ============================================================
// Reloads a prepared task module and encodes a corpus with it,
// reporting what became of every candidate relation:
//
//   Step 1: Load task module config     (Layer 6 - infra)
//   Step 2: Load JSON documents         (Layer 4 - data)
//   Step 3: Encode (with or without targets)
//   Step 4: Summarise encodings and statistics

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::data::dataset::ReDataset;
use crate::data::loader::JsonDocumentLoader;
use crate::domain::document::DocumentRef;
use crate::domain::traits::DocumentSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::taskmodule::auto::TaskModuleConfig;
use crate::taskmodule::re_text_classification::ReTextClassificationTaskModule;
use crate::taskmodule::statistics::EncodingStatistics;
use crate::taskmodule::TaskModule;

#[derive(Debug, Clone)]
pub struct EncodeConfig {
    pub checkpoint_dir: String,
    pub docs_path:      String,
    /// Training mode: attach gold labels to every encoding
    pub with_targets:   bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncodeSummary {
    pub documents:    usize,
    pub encodings:    usize,
    /// Encodings per document, in input order
    pub per_document: Vec<usize>,
    /// Samples ready for training (targets attached)
    pub samples:      usize,
    pub statistics:   EncodingStatistics,
}

pub struct EncodeUseCase {
    config: EncodeConfig,
}

impl EncodeUseCase {
    pub fn new(config: EncodeConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EncodeSummary> {
        let cfg = &self.config;

        // ── Step 1: Reload with statistics switched on ───────────────────────
        let TaskModuleConfig::ReTextClassification(mut module_config) =
            CheckpointManager::new(&cfg.checkpoint_dir)?.load_taskmodule_config()?;
        module_config.show_statistics = true;
        let module = ReTextClassificationTaskModule::new(module_config)
            .context("Failed to rebuild the relation task module")?;

        // ── Step 2: Load documents ───────────────────────────────────────────
        let documents: Vec<DocumentRef> = JsonDocumentLoader::new(&cfg.docs_path)
            .load_all()?
            .into_iter()
            .map(DocumentRef::new)
            .collect();

        // ── Step 3: Encode ───────────────────────────────────────────────────
        let encoded = module.encode(&documents, cfg.with_targets)?;

        // ── Step 4: Summarise ────────────────────────────────────────────────
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for encoding in encoded.task_encodings() {
            let position = documents
                .iter()
                .position(|d| d.ptr_eq(encoding.document()))
                .unwrap_or_default();
            *counts.entry(position).or_default() += 1;
        }
        let per_document = (0..documents.len())
            .map(|i| counts.get(&i).copied().unwrap_or_default())
            .collect();

        let samples = if cfg.with_targets {
            ReDataset::from_encodings(encoded.task_encodings()).sample_count()
        } else {
            0
        };

        // already logged by the module at the end of the encode pass
        let statistics = module.take_statistics();

        Ok(EncodeSummary {
            documents: documents.len(),
            encodings: encoded.len(),
            per_document,
            samples,
            statistics,
        })
    }
}
