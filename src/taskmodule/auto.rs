// ============================================================
// Layer 4 — Task Module Registry
// ============================================================
// A saved task module is one flat JSON object whose
// "taskmodule_type" field names the implementation:
//
//   {
//     "taskmodule_type": "TransformerRETextClassificationTaskModule",
//     "tokenizer_name_or_path": "out/tokenizer",
//     "label_to_id": {"met_person": 1, "no_relation": 0},
//     ...
//   }
//
// The set of known implementations is the TaskModuleConfig enum;
// serde resolves the tag, so an unknown type is a parse error
// and there is no runtime registry to populate.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::error::Result;
use crate::taskmodule::re_text_classification::{
    ReTextClassificationConfig, ReTextClassificationTaskModule,
};
use crate::taskmodule::TaskModule;

/// File name of a saved task module config.
pub const CONFIG_NAME: &str = "taskmodule_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "taskmodule_type")]
pub enum TaskModuleConfig {
    #[serde(rename = "TransformerRETextClassificationTaskModule")]
    ReTextClassification(ReTextClassificationConfig),
}

impl TaskModuleConfig {
    pub fn taskmodule_type(&self) -> &'static str {
        match self {
            TaskModuleConfig::ReTextClassification(_) => "TransformerRETextClassificationTaskModule",
        }
    }
}

/// Names accepted in "taskmodule_type".
pub const REGISTERED_TASKMODULES: &[&str] = &["TransformerRETextClassificationTaskModule"];

// ─── AutoTaskModule ───────────────────────────────────────────────────────────
/// A task module built from its saved config.
#[derive(Debug)]
pub enum AutoTaskModule {
    ReTextClassification(ReTextClassificationTaskModule),
}

impl AutoTaskModule {
    pub fn from_config(config: TaskModuleConfig) -> Result<Self> {
        tracing::debug!("Building task module '{}'", config.taskmodule_type());
        match config {
            TaskModuleConfig::ReTextClassification(config) => Ok(AutoTaskModule::ReTextClassification(
                ReTextClassificationTaskModule::new(config)?,
            )),
        }
    }

    /// Load `dir/taskmodule_config.json` and build the module it names.
    pub fn from_pretrained(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_NAME);
        let config: TaskModuleConfig = serde_json::from_str(&fs::read_to_string(&path)?)?;
        tracing::info!("Loading {} from '{}'", config.taskmodule_type(), path.display());
        Self::from_config(config)
    }

    pub fn save_pretrained(&self, dir: impl AsRef<Path>) -> Result<()> {
        match self {
            AutoTaskModule::ReTextClassification(module) => module.save_pretrained(dir),
        }
    }

    pub fn config(&self) -> TaskModuleConfig {
        match self {
            AutoTaskModule::ReTextClassification(module) => {
                TaskModuleConfig::ReTextClassification(module.config().clone())
            }
        }
    }

    pub fn is_prepared(&self) -> bool {
        match self {
            AutoTaskModule::ReTextClassification(module) => module.is_prepared(),
        }
    }

    pub fn into_re_text_classification(self) -> Option<ReTextClassificationTaskModule> {
        match self {
            AutoTaskModule::ReTextClassification(module) => Some(module),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::Error;
    use crate::infra::tokenizer_store::TokenizerStore;

    #[test]
    fn test_config_is_tagged_and_flat() {
        let config = TaskModuleConfig::ReTextClassification(ReTextClassificationConfig::new("tok"));
        let value  = serde_json::to_value(&config).unwrap();
        assert_eq!(value["taskmodule_type"], REGISTERED_TASKMODULES[0]);
        assert_eq!(value["tokenizer_name_or_path"], "tok");
        assert_eq!(value["none_label"], "no_relation");

        let back: TaskModuleConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"taskmodule_type": "SpanClassifier", "tokenizer_name_or_path": "tok"}"#;
        assert!(serde_json::from_str::<TaskModuleConfig>(json).is_err());
    }

    #[test]
    fn test_from_pretrained_round_trip() {
        let tok_dir    = tempfile::tempdir().unwrap();
        let module_dir = tempfile::tempdir().unwrap();
        TokenizerStore::new(tok_dir.path())
            .save(&TokenizerStore::build_word_level(&["a b".to_string()], 50).unwrap())
            .unwrap();

        let mut config = ReTextClassificationConfig::new(tok_dir.path().to_string_lossy());
        config.label_to_id   = Some([("no_relation".to_string(), 0), ("r".to_string(), 1)].into());
        config.entity_labels = Some(Vec::new());

        let module = AutoTaskModule::from_config(TaskModuleConfig::ReTextClassification(config.clone())).unwrap();
        assert!(module.is_prepared());
        module.save_pretrained(module_dir.path()).unwrap();

        let loaded = AutoTaskModule::from_pretrained(module_dir.path()).unwrap();
        assert_eq!(loaded.config(), TaskModuleConfig::ReTextClassification(config));
        assert_eq!(loaded.into_re_text_classification().unwrap().num_labels(), 2);
    }

    #[test]
    fn test_from_pretrained_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(AutoTaskModule::from_pretrained(dir.path().join("x")), Err(Error::Io(_))));
    }
}
