// ============================================================
// Layer 6 — Tokenizer Adapter
// ============================================================
// The task modules talk to the pretrained tokenizer only through
// the `TransformerTokenizer` trait:
//
//   tokenize(text, truncation, max_length, add_special_tokens)
//       → input ids + a char→token map
//   build_inputs_with_special_tokens(ids)   → [CLS] ids [SEP]
//   add_special_tokens(tokens)              → permanent vocab additions
//   token_to_id(token)
//
// `HfTokenizer` implements it on top of the HuggingFace
// `tokenizers` crate. Offsets are requested in CHARACTERS
// (`encode_char_offsets`) so they line up with document spans.
//
// Special tokens are never produced by the HF post-processor
// directly; instead we probe it once at construction to learn
// the prefix/suffix it wraps a single sequence with, and apply
// those ourselves. That makes "tokenize raw, insert markers,
// window, THEN wrap" possible.

use std::path::Path;

use tokenizers::{AddedToken, Tokenizer};

use crate::domain::error::{Error, Result};

// ─── TokenizedText ────────────────────────────────────────────────────────────
/// Token ids of one text plus the character span each token covers.
/// Special tokens cover no characters.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedText {
    pub input_ids: Vec<u32>,
    offsets:       Vec<Option<(usize, usize)>>,
}

impl TokenizedText {
    pub fn new(input_ids: Vec<u32>, offsets: Vec<Option<(usize, usize)>>) -> Self {
        debug_assert_eq!(input_ids.len(), offsets.len());
        Self { input_ids, offsets }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Index of the token covering character `char_index`,
    /// `None` for whitespace, truncated text, or out-of-range chars.
    pub fn char_to_token(&self, char_index: usize) -> Option<usize> {
        self.offsets.iter().position(|offset| {
            matches!(offset, Some((start, end)) if *start <= char_index && char_index < *end)
        })
    }
}

// ─── TransformerTokenizer ─────────────────────────────────────────────────────
pub trait TransformerTokenizer {
    /// Tokenize `text`. With `truncation` and a `max_length`, the result
    /// holds at most `max_length` tokens, special tokens included.
    fn tokenize(
        &self,
        text:               &str,
        truncation:         bool,
        max_length:         Option<usize>,
        add_special_tokens: bool,
    ) -> Result<TokenizedText>;

    /// Wrap a single sequence with the model's special tokens.
    fn build_inputs_with_special_tokens(&self, ids: &[u32]) -> Vec<u32>;

    /// How many tokens `build_inputs_with_special_tokens` adds.
    fn num_special_tokens_to_add(&self) -> usize {
        self.build_inputs_with_special_tokens(&[]).len()
    }

    /// Register tokens as special vocabulary entries; returns how many were new.
    fn add_special_tokens(&mut self, tokens: &[String]) -> usize;

    fn token_to_id(&self, token: &str) -> Option<u32>;

    fn pad_token_id(&self) -> u32;

    /// Vocabulary size including added tokens.
    fn vocab_size(&self) -> usize;
}

// ─── HfTokenizer ──────────────────────────────────────────────────────────────
#[derive(Clone)]
pub struct HfTokenizer {
    inner:  Tokenizer,
    prefix: Vec<u32>,
    suffix: Vec<u32>,
}

impl HfTokenizer {
    pub fn new(inner: Tokenizer) -> Result<Self> {
        let (prefix, suffix) = special_token_layout(&inner)?;
        tracing::debug!(
            "Tokenizer wraps sequences with {} prefix / {} suffix special tokens",
            prefix.len(),
            suffix.len()
        );
        Ok(Self { inner, prefix, suffix })
    }

    /// Load from a `tokenizer.json` file, or a directory containing one.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = if path.is_dir() { path.join("tokenizer.json") } else { path.to_path_buf() };
        let inner = Tokenizer::from_file(&file).map_err(|e| {
            Error::Tokenizer(format!("cannot load tokenizer from '{}': {e}", file.display()))
        })?;
        Self::new(inner)
    }

    pub fn inner(&self) -> &Tokenizer {
        &self.inner
    }
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer")
            .field("vocab_size", &self.vocab_size())
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .finish()
    }
}

impl TransformerTokenizer for HfTokenizer {
    fn tokenize(
        &self,
        text:               &str,
        truncation:         bool,
        max_length:         Option<usize>,
        add_special_tokens: bool,
    ) -> Result<TokenizedText> {
        let encoding = self
            .inner
            .encode_char_offsets(text, false)
            .map_err(Error::tokenizer)?;

        let mut ids: Vec<u32> = encoding.get_ids().to_vec();
        let mut offsets: Vec<Option<(usize, usize)>> =
            encoding.get_offsets().iter().map(|&o| Some(o)).collect();

        if let (true, Some(max_length)) = (truncation, max_length) {
            let budget = if add_special_tokens {
                max_length.saturating_sub(self.num_special_tokens_to_add())
            } else {
                max_length
            };
            ids.truncate(budget);
            offsets.truncate(budget);
        }

        if !add_special_tokens {
            return Ok(TokenizedText::new(ids, offsets));
        }

        let wrapped_ids = self.build_inputs_with_special_tokens(&ids);
        let mut wrapped_offsets = vec![None; self.prefix.len()];
        wrapped_offsets.extend(offsets);
        wrapped_offsets.extend(std::iter::repeat(None).take(self.suffix.len()));
        Ok(TokenizedText::new(wrapped_ids, wrapped_offsets))
    }

    fn build_inputs_with_special_tokens(&self, ids: &[u32]) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.prefix.len() + ids.len() + self.suffix.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(ids);
        out.extend_from_slice(&self.suffix);
        out
    }

    fn add_special_tokens(&mut self, tokens: &[String]) -> usize {
        let added: Vec<AddedToken> = tokens
            .iter()
            .map(|t| AddedToken::from(t.clone(), true))
            .collect();
        self.inner.add_special_tokens(&added)
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }

    fn pad_token_id(&self) -> u32 {
        self.inner
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| self.inner.token_to_id("[PAD]"))
            .unwrap_or(0)
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

/// Find which special tokens the post-processor puts before and after
/// a single sequence, by encoding a one-word probe with special tokens.
fn special_token_layout(tokenizer: &Tokenizer) -> Result<(Vec<u32>, Vec<u32>)> {
    let probe = tokenizer.encode("probe", true).map_err(Error::tokenizer)?;
    let ids   = probe.get_ids();
    let mask  = probe.get_special_tokens_mask();

    let first_content = mask.iter().position(|&m| m == 0);
    let last_content  = mask.iter().rposition(|&m| m == 0);
    match (first_content, last_content) {
        (Some(first), Some(last)) => Ok((ids[..first].to_vec(), ids[last + 1..].to_vec())),
        _ => Ok((ids.to_vec(), Vec::new())),
    }
}
