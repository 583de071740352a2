use std::ops::Range;

use serde::Serialize;
use tracing::{debug, warn};

use super::ChunkError;
use super::markers::SectionMarkers;
use super::tokens::TokenCounter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionKind {
    Metadata,
    Facts,
    Grounds,
    Ground(String),
    Ruling,
}

impl SectionKind {
    pub fn type_tag(&self) -> String {
        match self {
            Self::Metadata => "metadata".to_string(),
            Self::Facts => "facts".to_string(),
            Self::Grounds => "grounds".to_string(),
            Self::Ground(digits) => format!("ground_{digits}"),
            Self::Ruling => "ruling".to_string(),
        }
    }

    pub fn chunk_id(&self) -> String {
        match self {
            Self::Metadata => "001_metadata".to_string(),
            Self::Facts => "002_facts".to_string(),
            Self::Grounds => "003_grounds".to_string(),
            Self::Ground(digits) => format!("{:0>3}_ground_{digits}", add_two(digits)),
            Self::Ruling => "999_ruling".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticChunk {
    pub chunk_id: String,
    #[serde(rename = "type")]
    pub chunk_type: String,
    pub content: String,
    pub char_count: usize,
    pub token_count: usize,
    #[serde(skip)]
    pub source_range: Range<usize>,
}

#[derive(Debug)]
struct SectionDraft<'a> {
    kind: SectionKind,
    range: Range<usize>,
    content: &'a str,
}

#[derive(Debug, Clone)]
pub struct SectionSegmenter {
    markers: SectionMarkers,
}

impl SectionSegmenter {
    pub fn new(markers: SectionMarkers) -> Self {
        Self { markers }
    }

    pub fn segment(
        &self,
        text: &str,
        counter: &dyn TokenCounter,
    ) -> Result<Vec<SemanticChunk>, ChunkError> {
        let mut drafts = Vec::<SectionDraft<'_>>::new();
        drafts.extend(self.metadata_section(text));
        drafts.extend(self.facts_section(text));
        drafts.extend(self.grounds_sections(text));
        drafts.extend(self.ruling_section(text));

        let mut accepted = Vec::<Range<usize>>::new();
        let mut chunks = Vec::<SemanticChunk>::new();
        for draft in drafts {
            if draft.content.is_empty() {
                continue;
            }

            if accepted.iter().any(|range| overlaps(range, &draft.range)) {
                warn!(
                    section = %draft.kind.type_tag(),
                    start = draft.range.start,
                    end = draft.range.end,
                    "dropping section that overlaps an earlier one"
                );
                continue;
            }

            accepted.push(draft.range.clone());
            chunks.push(SemanticChunk {
                chunk_id: draft.kind.chunk_id(),
                chunk_type: draft.kind.type_tag(),
                content: draft.content.to_string(),
                char_count: draft.content.chars().count(),
                token_count: counter.count(draft.content)?,
                source_range: draft.range,
            });
        }

        debug!(chunks = chunks.len(), "semantic segmentation finished");
        Ok(chunks)
    }

    fn metadata_section<'a>(&self, text: &'a str) -> Option<SectionDraft<'a>> {
        let case_type = self.markers.case_type.find(text)?;
        Some(SectionDraft {
            kind: SectionKind::Metadata,
            range: 0..case_type.start(),
            content: text[..case_type.start()].trim(),
        })
    }

    fn facts_section<'a>(&self, text: &'a str) -> Option<SectionDraft<'a>> {
        let start = self.markers.facts.find(text)?.start();
        let rest = &text[start..];

        let next_marker = [
            &self.markers.grounds,
            &self.markers.law,
            &self.markers.ruling,
        ]
        .iter()
        .filter_map(|marker| marker.find(rest).map(|found| found.start()))
        .min();

        // Without a closing marker the facts are assumed to fill half of what remains.
        let end = start + next_marker.unwrap_or_else(|| char_midpoint(rest));

        Some(SectionDraft {
            kind: SectionKind::Facts,
            range: start..end,
            content: text[start..end].trim(),
        })
    }

    fn grounds_sections<'a>(&self, text: &'a str) -> Vec<SectionDraft<'a>> {
        let Some(grounds) = self.markers.grounds.find(text) else {
            return Vec::new();
        };

        let start = grounds.start();
        let end = self
            .markers
            .ruling
            .find(&text[start..])
            .map(|ruling| start + ruling.start())
            .unwrap_or(text.len());
        let span = &text[start..end];

        let numbered = self
            .markers
            .numbered_ground
            .captures_iter(span)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let number = captures.get(1)?.as_str();
                if number.is_empty() || !number.bytes().all(|byte| byte.is_ascii_digit()) {
                    warn!(marker = number, "ignoring non-decimal ground number");
                    return None;
                }
                Some((whole.start(), whole.end(), number))
            })
            .collect::<Vec<(usize, usize, &str)>>();

        if numbered.is_empty() {
            return vec![SectionDraft {
                kind: SectionKind::Grounds,
                range: start..end,
                content: span.trim(),
            }];
        }

        numbered
            .iter()
            .enumerate()
            .map(|(index, (_, body_start, number))| {
                let body_end = numbered
                    .get(index + 1)
                    .map(|(next_start, _, _)| *next_start)
                    .unwrap_or(span.len());
                SectionDraft {
                    kind: SectionKind::Ground(number.to_string()),
                    range: start + body_start..start + body_end,
                    content: span[*body_start..body_end].trim(),
                }
            })
            .collect()
    }

    fn ruling_section<'a>(&self, text: &'a str) -> Option<SectionDraft<'a>> {
        let start = self.markers.ruling.find(text)?.start();
        Some(SectionDraft {
            kind: SectionKind::Ruling,
            range: start..text.len(),
            content: text[start..].trim(),
        })
    }
}

fn overlaps(left: &Range<usize>, right: &Range<usize>) -> bool {
    left.start < right.end && right.start < left.end
}

// Decimal string addition, so ground numbers of any length keep a sortable id.
fn add_two(digits: &str) -> String {
    let mut reversed = digits
        .bytes()
        .rev()
        .map(|byte| byte - b'0')
        .collect::<Vec<u8>>();
    let mut carry = 2u8;
    for digit in reversed.iter_mut() {
        if carry == 0 {
            break;
        }
        let sum = *digit + carry;
        *digit = sum % 10;
        carry = sum / 10;
    }
    if carry > 0 {
        reversed.push(carry);
    }
    while reversed.len() > 1 && reversed.last() == Some(&0) {
        reversed.pop();
    }

    reversed
        .iter()
        .rev()
        .map(|digit| char::from(b'0' + digit))
        .collect()
}

fn char_midpoint(text: &str) -> usize {
    let half = text.chars().count() / 2;
    text.char_indices()
        .nth(half)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
