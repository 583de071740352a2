mod markers;
mod semantic;
mod tokens;
mod window;

#[cfg(test)]
mod tests;

use thiserror::Error;

pub use markers::{MarkerPatterns, SectionMarkers};
pub use semantic::{SectionSegmenter, SemanticChunk};
pub use tokens::{HfTokenCounter, TokenCounter};
pub use window::{FixedChunk, WindowChunker, WindowConfig};

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("invalid chunking configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid marker pattern `{name}`: {message}")]
    InvalidPattern { name: String, message: String },
}
