use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::PipelineProfile;
use crate::layout::{
    BlockExtractor, LayoutClassifier, LinearDocument, Linearizer, PageErrorPolicy,
};
use crate::model::ChunkManifest;
use crate::segment::{SectionMarkers, SectionSegmenter, TokenCounter, WindowChunker};

pub struct JudgmentPipeline {
    extractor: BlockExtractor,
    linearizer: Linearizer,
    segmenter: SectionSegmenter,
    windows: WindowChunker,
    counter: Box<dyn TokenCounter>,
    page_error_policy: PageErrorPolicy,
}

impl JudgmentPipeline {
    pub fn new(
        profile: &PipelineProfile,
        extractor: BlockExtractor,
        counter: Box<dyn TokenCounter>,
        page_error_policy: PageErrorPolicy,
    ) -> Result<Self> {
        let markers = SectionMarkers::compile(&profile.markers)
            .context("failed to compile section markers")?;
        let windows =
            WindowChunker::new(profile.windows).context("invalid window configuration")?;

        Ok(Self {
            extractor,
            linearizer: Linearizer::new(LayoutClassifier::new(profile.layout.clone())),
            segmenter: SectionSegmenter::new(markers),
            windows,
            counter,
            page_error_policy,
        })
    }

    pub fn extractor(&self) -> &BlockExtractor {
        &self.extractor
    }

    pub fn token_counter(&self) -> &dyn TokenCounter {
        self.counter.as_ref()
    }

    pub fn page_error_policy(&self) -> PageErrorPolicy {
        self.page_error_policy
    }

    pub fn linearize_pdf(&self, pdf_path: &Path) -> Result<LinearDocument> {
        let pages = self
            .extractor
            .extract(pdf_path)
            .with_context(|| format!("failed to extract blocks from {}", pdf_path.display()))?;

        let document = self
            .linearizer
            .linearize(pages, self.page_error_policy)
            .with_context(|| format!("failed to linearize {}", pdf_path.display()))?;

        debug!(
            path = %pdf_path.display(),
            pages = document.page_count,
            missing_pages = document.missing_pages.len(),
            chars = document.text.chars().count(),
            "linearized judgment"
        );
        Ok(document)
    }

    pub fn chunk_text(&self, judgment_id: &str, text: &str) -> Result<ChunkManifest> {
        let counter = self.counter.as_ref();
        let semantic = self
            .segmenter
            .segment(text, counter)
            .with_context(|| format!("semantic chunking failed for {judgment_id}"))?;
        let fixed = self
            .windows
            .chunk(text, counter)
            .with_context(|| format!("window chunking failed for {judgment_id}"))?;

        info!(
            judgment_id = %judgment_id,
            semantic_chunks = semantic.len(),
            fixed_chunks = fixed.len(),
            "chunked judgment"
        );
        Ok(ChunkManifest::new(judgment_id, semantic, fixed))
    }
}
