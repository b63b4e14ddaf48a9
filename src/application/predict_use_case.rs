// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Runs a saved classifier over a corpus and writes the documents
// back out with predicted relations attached:
//
//   Step 1: Load task module + model    (Layer 6 - infra)
//   Step 2: Load JSON documents         (Layer 4 - data)
//   Step 3: Pipeline: encode → batch → forward → decode (Layer 5)
//   Step 4: Write annotated documents as a JSON array

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::application::AppBackend;
use crate::data::loader::JsonDocumentLoader;
use crate::domain::document::{Document, DocumentRef};
use crate::domain::traits::DocumentSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::pipeline::Pipeline;
use crate::taskmodule::DecodeMode;

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub checkpoint_dir: String,
    pub docs_path:      String,
    pub output_path:    String,
    pub batch_size:     usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictReport {
    pub documents:   usize,
    pub predictions: usize,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PredictReport> {
        let cfg = &self.config;
        anyhow::ensure!(cfg.batch_size > 0, "--batch-size must be positive");

        // ── Step 1: Load task module + model ─────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let taskmodule  = checkpoints
            .load_taskmodule()?
            .into_re_text_classification()
            .context("Checkpoint does not hold a relation classification task module")?;
        let device = Default::default();
        let model  = checkpoints.load_model::<AppBackend>(&device)?;
        let layer  = taskmodule.config().relation_annotation.clone();

        // ── Step 2: Load documents ───────────────────────────────────────────
        let documents: Vec<DocumentRef> = JsonDocumentLoader::new(&cfg.docs_path)
            .load_all()?
            .into_iter()
            .map(DocumentRef::new)
            .collect();

        // ── Step 3: Predict ──────────────────────────────────────────────────
        let pipeline  = Pipeline::<AppBackend, _, _>::new(taskmodule, model, device, cfg.batch_size);
        let predicted = pipeline.predict(&documents, DecodeMode::InPlace)?;

        let predictions = predicted
            .iter()
            .map(|d| d.borrow().relation_layer(&layer).map(|l| l.predictions().len()).unwrap_or(0))
            .sum();

        // ── Step 4: Write documents ──────────────────────────────────────────
        let output: Vec<Document> = predicted.iter().map(DocumentRef::to_document).collect();
        if let Some(parent) = Path::new(&cfg.output_path).parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        fs::write(&cfg.output_path, serde_json::to_string_pretty(&output)?)
            .with_context(|| format!("Cannot write predictions to '{}'", cfg.output_path))?;
        tracing::info!("Wrote {} documents to '{}'", output.len(), cfg.output_path);

        Ok(PredictReport { documents: output.len(), predictions })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prepare_use_case::{PrepareConfig, PrepareUseCase};
    use crate::application::tests::write_corpus;
    use crate::data::loader::JsonDocumentLoader;

    #[test]
    fn test_predict_writes_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let docs_path      = write_corpus(dir.path()).to_string_lossy().to_string();
        let checkpoint_dir = dir.path().join("ckpt").to_string_lossy().to_string();
        let output_path    = dir.path().join("out").join("predicted.json");

        PrepareUseCase::new(PrepareConfig {
            docs_path:      docs_path.clone(),
            checkpoint_dir: checkpoint_dir.clone(),
            vocab_size:     100,
            init_model:     true,
            max_seq_len:    32,
            d_model:        16,
            num_heads:      2,
            num_layers:     1,
            d_ff:           32,
            ..PrepareConfig::default()
        })
        .execute()
        .unwrap();

        let report = PredictUseCase::new(PredictConfig {
            checkpoint_dir,
            docs_path,
            output_path: output_path.to_string_lossy().to_string(),
            batch_size:  3,
        })
        .execute()
        .unwrap();

        assert_eq!(report.documents, 2);
        // At most one prediction per ordered candidate pair (2 + 6)
        assert!(report.predictions <= 8);

        let written = JsonDocumentLoader::new(&output_path).load_all().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].text(), "Alice met Bob");
        // gold annotations survive untouched
        assert_eq!(written[1].relation_layer("relations").unwrap().gold().len(), 2);
    }

    #[test]
    fn test_predict_without_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let docs_path      = write_corpus(dir.path()).to_string_lossy().to_string();
        let checkpoint_dir = dir.path().join("ckpt").to_string_lossy().to_string();
        PrepareUseCase::new(PrepareConfig {
            docs_path:      docs_path.clone(),
            checkpoint_dir: checkpoint_dir.clone(),
            vocab_size:     100,
            ..PrepareConfig::default()
        })
        .execute()
        .unwrap();

        let result = PredictUseCase::new(PredictConfig {
            checkpoint_dir,
            docs_path,
            output_path: dir.path().join("p.json").to_string_lossy().to_string(),
            batch_size:  4,
        })
        .execute();
        assert!(result.is_err());
    }
}
