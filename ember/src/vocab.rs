use std::path::{Path, PathBuf};

use thiserror::Error;
use tokenizers::Tokenizer;

use crate::engine::Token;

#[derive(Debug, Error)]
pub enum VocabError {
    #[error("unable to load tokenizer from {0:?}")]
    UnableToLoadTokenizer(PathBuf),
}

pub trait Vocab: Send + Sync {
    fn encode(&self, text: &str) -> Vec<Token>;

    /// Raw piece bytes for a single token. May be an incomplete fragment of
    /// a multi-byte character.
    fn token_bytes(&self, token: Token) -> Vec<u8>;
}

pub struct HfVocab {
    tokenizer: Tokenizer,
}

impl HfVocab {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, VocabError> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|_| VocabError::UnableToLoadTokenizer(path.to_path_buf()))?;
        Ok(Self::new(tokenizer))
    }
}

impl Vocab for HfVocab {
    fn encode(&self, text: &str) -> Vec<Token> {
        self.tokenizer
            .encode(text, false)
            .unwrap()
            .get_ids()
            .iter()
            .map(|&id| id as Token)
            .collect()
    }

    fn token_bytes(&self, token: Token) -> Vec<u8> {
        self.tokenizer
            .decode(&[token as u32], false)
            .map(String::into_bytes)
            .unwrap_or_default()
    }
}
