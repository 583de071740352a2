use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ChunkArgs;
use crate::config::PipelineProfile;
use crate::layout::{BlockExtractor, PageErrorPolicy};
use crate::pipeline::JudgmentPipeline;
use crate::segment::HfTokenCounter;
use crate::util::write_json_pretty;

pub fn run(args: ChunkArgs) -> Result<()> {
    let profile = PipelineProfile::load_or_default(args.profile.as_deref())?;
    let judgment_id = match args.id {
        Some(id) => id,
        None => args
            .txt
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid text file name: {}", args.txt.display()))?,
    };

    let counter = HfTokenCounter::from_file(&args.tokenizer)
        .context("failed to load tokenizer")?;
    let pipeline = JudgmentPipeline::new(
        &profile,
        BlockExtractor::default(),
        Box::new(counter),
        PageErrorPolicy::Abort,
    )?;

    let text = fs::read_to_string(&args.txt)
        .with_context(|| format!("failed to read {}", args.txt.display()))?;
    let manifest = pipeline.chunk_text(&judgment_id, &text)?;

    let chunks_path = args.chunks_dir.join(format!("{judgment_id}_chunks.json"));
    write_json_pretty(&chunks_path, &manifest)?;
    info!(
        judgment_id = %judgment_id,
        tokenizer = %pipeline.token_counter().describe(),
        path = %chunks_path.display(),
        "wrote chunk manifest"
    );

    Ok(())
}
