// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and loads the word-level tokenizer used when no
// pretrained `tokenizer.json` is supplied.
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper. We sidestep the trainer entirely: count
// words ourselves, write the tokenizer JSON by hand and parse it
// back with `Tokenizer::from_str`.
//
// Layout of the generated vocabulary:
//   0 [PAD]   1 [UNK]   2 [CLS]   3 [SEP]   4 [MASK]
//   5..       words by frequency (desc), ties alphabetical
//
// Ids are contiguous, so tokens added later (argument markers)
// land directly after the last word.
//
// Reference: HuggingFace tokenizers JSON format (tokenizer.json)

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use tokenizers::Tokenizer;

const SPECIAL_TOKENS: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            let tokenizer = Self::build_word_level(texts, vocab_size)?;
            self.save(&tokenizer)?;
            Ok(tokenizer)
        }
    }

    /// Load a previously saved tokenizer from JSON file
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Write `tokenizer` (including any added marker tokens) to the store
    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot write tokenizer to '{}': {}", path.display(), e))?;
        tracing::info!("Tokenizer saved to '{}'", path.display());
        Ok(())
    }

    /// Build a word-level BERT-style tokenizer from document texts.
    /// At most `vocab_size` entries, the 5 special tokens included.
    pub fn build_word_level(texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        // ── Step 1: Count words the way the pre-tokenizer will split them ────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in split_words(text) {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS.len()));

        // ── Step 2: Vocab and added-token entries ─────────────────────────────
        let mut vocab = serde_json::Map::new();
        let mut added_tokens = Vec::new();
        for (id, token) in SPECIAL_TOKENS.iter().enumerate() {
            vocab.insert(token.to_string(), serde_json::json!(id));
            added_tokens.push(serde_json::json!({
                "id": id, "content": token, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            }));
        }
        for (word, _) in &words {
            let id = vocab.len();
            vocab.entry(word.clone()).or_insert(serde_json::json!(id));
        }

        // ── Step 3: Tokenizer JSON in HuggingFace format ──────────────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": {
                "type": "BertProcessing",
                "sep": ["[SEP]", 3],
                "cls": ["[CLS]", 2]
            },
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| anyhow::anyhow!("Cannot build tokenizer: {e}"))?;
        tracing::info!("Tokenizer built with {} entries", tokenizer.get_vocab_size(true));
        Ok(tokenizer)
    }
}

/// Lower-cased words, split like the `Whitespace` pre-tokenizer
/// (`\w+` runs and runs of punctuation).
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut current_is_word = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let is_word = c.is_alphanumeric() || c == '_';
        if !current.is_empty() && is_word != current_is_word {
            words.push(std::mem::take(&mut current));
        }
        current_is_word = is_word;
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
