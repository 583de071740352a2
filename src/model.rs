use serde::{Deserialize, Serialize};

use crate::segment::{FixedChunk, SemanticChunk};

#[derive(Debug, Clone, Deserialize)]
pub struct MappingEntry {
    pub id: String,
    pub pdf_filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgmentEntry {
    pub id: String,
    pub pdf_filename: String,
    pub sha256: String,
    pub id_source: IdSource,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    Mapping,
    Filename,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgmentInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub mapping_path: Option<String>,
    pub judgment_count: usize,
    pub judgments: Vec<JudgmentEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkManifest {
    pub judgment_id: String,
    pub semantic_chunks: Vec<SemanticChunk>,
    pub fixed_chunks: Vec<FixedChunk>,
    pub total_semantic: usize,
    pub total_fixed: usize,
}

impl ChunkManifest {
    pub fn new(
        judgment_id: &str,
        semantic_chunks: Vec<SemanticChunk>,
        fixed_chunks: Vec<FixedChunk>,
    ) -> Self {
        Self {
            judgment_id: judgment_id.to_string(),
            total_semantic: semantic_chunks.len(),
            total_fixed: fixed_chunks.len(),
            semantic_chunks,
            fixed_chunks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Processed {
        pages: usize,
        missing_pages: usize,
        semantic_chunks: usize,
        fixed_chunks: usize,
    },
    Skipped,
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub judgment_id: String,
    pub pdf_filename: String,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCounts {
    pub selected: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ProcessCounts {
    pub fn tally(outcomes: &[DocumentOutcome]) -> Self {
        let mut counts = Self {
            selected: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome.status {
                DocumentStatus::Processed { .. } => counts.processed += 1,
                DocumentStatus::Skipped => counts.skipped += 1,
                DocumentStatus::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub pdftotext: String,
    pub tokenizer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaths {
    pub cache_root: String,
    pub pdf_dir: String,
    pub txt_dir: String,
    pub chunks_dir: String,
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub jobs: usize,
    pub force: bool,
    pub page_error_policy: String,
    pub tool_versions: ToolVersions,
    pub paths: ProcessPaths,
    pub counts: ProcessCounts,
    pub documents: Vec<DocumentOutcome>,
}
