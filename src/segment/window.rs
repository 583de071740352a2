use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ChunkError;
use super::tokens::TokenCounter;

pub const DEFAULT_MAX_TOKENS: usize = 512;
pub const DEFAULT_OVERLAP_TOKENS: usize = 50;

// The empty separator splits into single characters.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedChunk {
    pub chunk_id: String,
    pub content: String,
    pub char_count: usize,
    pub token_count: usize,
    /// Character (not byte) offsets into the linear document.
    pub start_offset: usize,
    pub end_offset: usize,
    pub offset_exact: bool,
}

#[derive(Debug, Clone)]
pub struct WindowChunker {
    config: WindowConfig,
}

impl WindowChunker {
    pub fn new(config: WindowConfig) -> Result<Self, ChunkError> {
        if config.max_tokens == 0 {
            return Err(ChunkError::InvalidConfig(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if config.overlap_tokens >= config.max_tokens {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap_tokens ({}) must be smaller than max_tokens ({})",
                config.overlap_tokens, config.max_tokens
            )));
        }

        Ok(Self { config })
    }

    pub fn chunk(
        &self,
        text: &str,
        counter: &dyn TokenCounter,
    ) -> Result<Vec<FixedChunk>, ChunkError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let windows = self.split(text, 0..text.len(), SEPARATORS, counter)?;
        let mut locator = OffsetLocator::new(text);
        let mut chunks = Vec::with_capacity(windows.len());

        for (index, range) in windows.into_iter().enumerate() {
            let content = &text[range.clone()];
            let located = locator.locate(content, range);
            if !located.exact {
                warn!(
                    window = index + 1,
                    fallback_start = located.start,
                    "window text not found in document, using previous offset"
                );
            }

            chunks.push(FixedChunk {
                chunk_id: format!("fixed_{:03}", index + 1),
                char_count: located.end - located.start,
                token_count: counter.count(content)?,
                start_offset: located.start,
                end_offset: located.end,
                offset_exact: located.exact,
                content: content.to_string(),
            });
        }

        debug!(windows = chunks.len(), "window chunking finished");
        Ok(chunks)
    }

    fn split(
        &self,
        text: &str,
        span: Range<usize>,
        separators: &[&str],
        counter: &dyn TokenCounter,
    ) -> Result<Vec<Range<usize>>, ChunkError> {
        let segment = &text[span.clone()];
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (index, &candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                break;
            }
            if segment.contains(candidate) {
                separator = candidate;
                remaining = &separators[index + 1..];
                break;
            }
        }

        let mut output = Vec::<Range<usize>>::new();
        let mut pending = Vec::<(Range<usize>, usize)>::new();

        for relative in split_keeping_separator(segment, separator) {
            let piece = span.start + relative.start..span.start + relative.end;
            let tokens = counter.count(&text[piece.clone()])?;
            if tokens < self.config.max_tokens {
                pending.push((piece, tokens));
                continue;
            }

            if !pending.is_empty() {
                output.extend(self.merge(text, &pending));
                pending.clear();
            }

            if remaining.is_empty() {
                output.extend(trim_range(text, piece));
            } else {
                output.extend(self.split(text, piece, remaining, counter)?);
            }
        }

        if !pending.is_empty() {
            output.extend(self.merge(text, &pending));
        }

        Ok(output)
    }

    // Pieces are contiguous, so a window is the span from its first piece to its last.
    fn merge(&self, text: &str, pieces: &[(Range<usize>, usize)]) -> Vec<Range<usize>> {
        let max = self.config.max_tokens;
        let overlap = self.config.overlap_tokens;

        let mut windows = Vec::<Range<usize>>::new();
        let mut current = VecDeque::<(Range<usize>, usize)>::new();
        let mut total = 0usize;

        for (piece, tokens) in pieces {
            if total + tokens > max && !current.is_empty() {
                windows.extend(window_range(text, &current));

                while total > overlap || (total + tokens > max && total > 0) {
                    let Some((_, dropped)) = current.pop_front() else {
                        break;
                    };
                    total -= dropped;
                }
            }

            current.push_back((piece.clone(), *tokens));
            total += tokens;
        }

        windows.extend(window_range(text, &current));
        windows
    }
}

fn window_range(text: &str, current: &VecDeque<(Range<usize>, usize)>) -> Option<Range<usize>> {
    let (first, _) = current.front()?;
    let (last, _) = current.back()?;
    trim_range(text, first.start..last.end)
}

fn trim_range(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    if leading == slice.len() {
        return None;
    }
    let trailing = slice.len() - slice.trim_end().len();
    Some(range.start + leading..range.end - trailing)
}

// Cut before every separator occurrence so each separator leads the next piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(offset, character)| offset..offset + character.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut cut = 0usize;
    for (offset, _) in text.match_indices(separator) {
        if offset > cut {
            pieces.push(cut..offset);
        }
        cut = offset;
    }
    if cut < text.len() {
        pieces.push(cut..text.len());
    }

    pieces
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Located {
    pub(super) start: usize,
    pub(super) end: usize,
    pub(super) exact: bool,
}

pub(super) struct OffsetLocator<'a> {
    text: &'a str,
    byte_cursor: usize,
    char_cursor: usize,
    previous_end: usize,
}

impl<'a> OffsetLocator<'a> {
    pub(super) fn new(text: &'a str) -> Self {
        Self {
            text,
            byte_cursor: 0,
            char_cursor: 0,
            previous_end: 0,
        }
    }

    pub(super) fn locate(&mut self, content: &str, range: Range<usize>) -> Located {
        if self.text.get(range.clone()) != Some(content) {
            return self.search(content);
        }

        let start = self.char_offset(range.start);
        let end = start + content.chars().count();
        self.previous_end = end;
        Located {
            start,
            end,
            exact: true,
        }
    }

    fn search(&mut self, content: &str) -> Located {
        let char_count = content.chars().count();

        match self.text[self.byte_cursor..].find(content) {
            Some(relative) => {
                let start = self.char_offset(self.byte_cursor + relative);
                self.previous_end = start + char_count;
                Located {
                    start,
                    end: start + char_count,
                    exact: true,
                }
            }
            None => {
                let start = self.previous_end;
                self.previous_end = start + char_count;
                Located {
                    start,
                    end: start + char_count,
                    exact: false,
                }
            }
        }
    }

    // `byte` must be a char boundary of `text`.
    fn char_offset(&mut self, byte: usize) -> usize {
        if byte < self.byte_cursor {
            self.byte_cursor = 0;
            self.char_cursor = 0;
        }
        self.char_cursor += self.text[self.byte_cursor..byte].chars().count();
        self.byte_cursor = byte;
        self.char_cursor
    }
}
