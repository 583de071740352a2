use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::cli::ProcessArgs;
use crate::commands::inventory::{self, inventory_manifest_path};
use crate::config::PipelineProfile;
use crate::layout::BlockExtractor;
use crate::model::{
    DocumentOutcome, DocumentStatus, JudgmentEntry, ProcessCounts, ProcessPaths,
    ProcessRunManifest, ToolVersions,
};
use crate::pipeline::JudgmentPipeline;
use crate::segment::HfTokenCounter;
use crate::util::{
    ensure_directory, now_utc_string, utc_compact_string, write_json_pretty, write_text_atomic,
};

#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub txt_dir: PathBuf,
    pub chunks_dir: PathBuf,
}

impl OutputLayout {
    pub fn txt_path(&self, judgment_id: &str) -> PathBuf {
        self.txt_dir.join(format!("{judgment_id}.txt"))
    }

    pub fn chunks_path(&self, judgment_id: &str) -> PathBuf {
        self.chunks_dir.join(format!("{judgment_id}_chunks.json"))
    }

    pub fn is_complete(&self, judgment_id: &str) -> bool {
        self.txt_path(judgment_id).is_file() && self.chunks_path(judgment_id).is_file()
    }
}

pub fn run(args: ProcessArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_dir = args.cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;
    let run_manifest_path = manifest_dir.join(format!(
        "process_run_{}.json",
        utc_compact_string(started_ts)
    ));

    info!(cache_root = %args.cache_root.display(), run_id = %run_id, "starting process run");

    let profile = PipelineProfile::load_or_default(args.profile.as_deref())?;

    let inventory = inventory::build_manifest(&args.pdf_dir, args.mapping.as_deref())?;
    let inventory_path = inventory_manifest_path(&args.cache_root);
    write_json_pretty(&inventory_path, &inventory)?;
    info!(
        path = %inventory_path.display(),
        judgment_count = inventory.judgment_count,
        "wrote inventory manifest"
    );

    let counter = HfTokenCounter::from_file(&args.tokenizer)
        .context("failed to load tokenizer")?;
    let pipeline = JudgmentPipeline::new(
        &profile,
        BlockExtractor::new(&args.pdftotext, args.max_pages_per_doc),
        Box::new(counter),
        args.on_page_error,
    )?;

    let layout = OutputLayout {
        txt_dir: args.txt_dir.clone(),
        chunks_dir: args.chunks_dir.clone(),
    };
    ensure_directory(&layout.txt_dir)?;
    ensure_directory(&layout.chunks_dir)?;

    let selected = match args.max_docs {
        Some(limit) => &inventory.judgments[..limit.min(inventory.judgments.len())],
        None => &inventory.judgments[..],
    };
    let jobs = args.jobs.max(1);

    info!(
        selected = selected.len(),
        jobs,
        force = args.force,
        on_page_error = pipeline.page_error_policy().as_str(),
        "processing judgments"
    );

    let documents = if jobs == 1 {
        selected
            .iter()
            .map(|entry| process_document(&pipeline, &layout, &args.pdf_dir, entry, args.force))
            .collect::<Vec<_>>()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build worker pool")?;
        pool.install(|| {
            selected
                .par_iter()
                .map(|entry| {
                    process_document(&pipeline, &layout, &args.pdf_dir, entry, args.force)
                })
                .collect::<Vec<_>>()
        })
    };

    let counts = ProcessCounts::tally(&documents);
    let manifest = ProcessRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        started_at,
        finished_at: now_utc_string(),
        jobs,
        force: args.force,
        page_error_policy: pipeline.page_error_policy().as_str().to_string(),
        tool_versions: ToolVersions {
            pdftotext: pipeline
                .extractor()
                .tool_version()
                .unwrap_or_else(|| "unknown".to_string()),
            tokenizer: pipeline.token_counter().describe(),
        },
        paths: ProcessPaths {
            cache_root: args.cache_root.display().to_string(),
            pdf_dir: args.pdf_dir.display().to_string(),
            txt_dir: layout.txt_dir.display().to_string(),
            chunks_dir: layout.chunks_dir.display().to_string(),
            profile: args.profile.as_ref().map(|path| path.display().to_string()),
        },
        counts: counts.clone(),
        documents,
    };

    write_json_pretty(&run_manifest_path, &manifest)?;
    info!(path = %run_manifest_path.display(), "wrote process run manifest");
    info!(
        run_id = %run_id,
        processed = counts.processed,
        skipped = counts.skipped,
        failed = counts.failed,
        "process run completed"
    );
    if counts.failed > 0 {
        warn!(failed = counts.failed, "some judgments failed, see the run manifest");
    }

    Ok(())
}

pub fn process_document(
    pipeline: &JudgmentPipeline,
    layout: &OutputLayout,
    pdf_dir: &Path,
    entry: &JudgmentEntry,
    force: bool,
) -> DocumentOutcome {
    let status = if !force && layout.is_complete(&entry.id) {
        info!(judgment_id = %entry.id, "outputs present, skipping");
        DocumentStatus::Skipped
    } else {
        match convert(pipeline, layout, &pdf_dir.join(&entry.pdf_filename), &entry.id) {
            Ok(status) => status,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(judgment_id = %entry.id, reason = %reason, "judgment failed");
                DocumentStatus::Failed { reason }
            }
        }
    };

    DocumentOutcome {
        judgment_id: entry.id.clone(),
        pdf_filename: entry.pdf_filename.clone(),
        status,
    }
}

fn convert(
    pipeline: &JudgmentPipeline,
    layout: &OutputLayout,
    pdf_path: &Path,
    judgment_id: &str,
) -> Result<DocumentStatus> {
    let document = pipeline.linearize_pdf(pdf_path)?;
    let manifest = pipeline.chunk_text(judgment_id, &document.text)?;

    write_text_atomic(&layout.txt_path(judgment_id), &document.text)?;
    write_json_pretty(&layout.chunks_path(judgment_id), &manifest)?;

    Ok(DocumentStatus::Processed {
        pages: document.page_count,
        missing_pages: document.missing_pages.len(),
        semantic_chunks: manifest.total_semantic,
        fixed_chunks: manifest.total_fixed,
    })
}
