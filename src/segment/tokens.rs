use std::path::Path;
use std::str::FromStr;

use tokenizers::Tokenizer;

use super::ChunkError;

pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> Result<usize, ChunkError>;

    fn describe(&self) -> String;
}

pub struct HfTokenCounter {
    tokenizer: Tokenizer,
    source: String,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self, ChunkError> {
        let tokenizer = Tokenizer::from_file(path).map_err(|err| {
            ChunkError::Tokenizer(format!("failed to load {}: {err}", path.display()))
        })?;

        Ok(Self {
            tokenizer,
            source: path.display().to_string(),
        })
    }

    pub fn from_json(json: &str, source: &str) -> Result<Self, ChunkError> {
        let tokenizer = Tokenizer::from_str(json)
            .map_err(|err| ChunkError::Tokenizer(format!("failed to parse {source}: {err}")))?;

        Ok(Self {
            tokenizer,
            source: source.to_string(),
        })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> Result<usize, ChunkError> {
        if text.is_empty() {
            return Ok(0);
        }

        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|err| ChunkError::Tokenizer(err.to_string()))?;
        Ok(encoding.len())
    }

    fn describe(&self) -> String {
        format!("hf-tokenizer:{}", self.source)
    }
}
