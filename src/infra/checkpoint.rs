// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores a relation classifier next to the task
// module that feeds it. One directory holds everything needed
// to run predictions again:
//
//   checkpoints/
//     taskmodule_config.json  ← task module (labels, markers, tokenizer path)
//     model_config.json       ← classifier architecture
//     model.mpk.gz            ← classifier weights (CompactRecorder)
//
// The model config is written separately from the weights: the
// architecture has to be rebuilt before a record can be loaded
// into it, and loading fails if the two disagree.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::{TransformerTextClassifier, TransformerTextClassifierConfig};
use crate::taskmodule::auto::{AutoTaskModule, TaskModuleConfig, CONFIG_NAME};

const MODEL_CONFIG_NAME: &str = "model_config.json";
const MODEL_WEIGHTS_NAME: &str = "model";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ─── Task module ─────────────────────────────────────────────────────────

    pub fn save_taskmodule(&self, taskmodule: &AutoTaskModule) -> Result<()> {
        taskmodule
            .save_pretrained(&self.dir)
            .with_context(|| format!("Failed to save task module to '{}'", self.dir.display()))
    }

    pub fn load_taskmodule_config(&self) -> Result<TaskModuleConfig> {
        let path = self.dir.join(CONFIG_NAME);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read task module config from '{}'. Have you run 'prepare' first?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn load_taskmodule(&self) -> Result<AutoTaskModule> {
        let config = self.load_taskmodule_config()?;
        AutoTaskModule::from_config(config)
            .with_context(|| format!("Cannot build task module from '{}'", self.dir.display()))
    }

    // ─── Model ───────────────────────────────────────────────────────────────

    pub fn save_model_config(&self, config: &TransformerTextClassifierConfig) -> Result<()> {
        let path = self.dir.join(MODEL_CONFIG_NAME);
        fs::write(&path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))?;
        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_model_config(&self) -> Result<TransformerTextClassifierConfig> {
        let path = self.dir.join(MODEL_CONFIG_NAME);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read model config from '{}'. Was the checkpoint prepared with --init-model?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Recorder appends `.mpk.gz` to the path.
    pub fn save_model<B: Backend>(&self, model: &TransformerTextClassifier<B>) -> Result<()> {
        let path = self.dir.join(MODEL_WEIGHTS_NAME);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model weights to '{}'", path.display()))?;
        tracing::debug!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Rebuild the classifier from its saved config and load its weights.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<TransformerTextClassifier<B>> {
        let config = self.load_model_config()?;
        let path   = self.dir.join(MODEL_WEIGHTS_NAME);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load model weights '{}'", path.display()))?;
        tracing::info!("Loaded classifier with {} labels", config.num_labels);
        Ok(config.init::<B>(device).load_record(record))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_config() -> TransformerTextClassifierConfig {
        TransformerTextClassifierConfig::new(12, 2)
            .with_max_seq_len(8)
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16)
            .with_dropout(0.0)
    }

    #[test]
    fn test_model_round_trip_gives_same_logits() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let device  = Default::default();
        let model   = tiny_config().init::<TestBackend>(&device);

        manager.save_model_config(&tiny_config()).unwrap();
        manager.save_model(&model).unwrap();
        let loaded = manager.load_model::<TestBackend>(&device).unwrap();

        let ids  = Tensor::<TestBackend, 1, Int>::from_ints([2i32, 5, 6, 3].as_slice(), &device).reshape([1, 4]);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1i32; 4].as_slice(), &device).reshape([1, 4]);
        let a = model.forward(ids.clone(), mask.clone()).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        let b = loaded.forward(ids, mask).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        // weights are stored in half precision
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2);
        }
    }

    #[test]
    fn test_missing_files_are_reported() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("nested")).unwrap();
        assert!(manager.dir().is_dir());
        assert!(manager.load_model_config().is_err());
        assert!(manager.load_model::<TestBackend>(&Default::default()).is_err());
        assert!(manager.load_taskmodule().is_err());
    }
}
