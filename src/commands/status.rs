use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::inventory::inventory_manifest_path;
use crate::commands::process::OutputLayout;
use crate::model::{JudgmentInventoryManifest, ProcessRunManifest};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let inventory_path = inventory_manifest_path(&args.cache_root);

    info!(cache_root = %args.cache_root.display(), "status requested");

    let inventory = if inventory_path.exists() {
        let raw = fs::read(&inventory_path)
            .with_context(|| format!("failed to read {}", inventory_path.display()))?;
        let inventory: JudgmentInventoryManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", inventory_path.display()))?;

        info!(
            generated_at = %inventory.generated_at,
            judgment_count = inventory.judgment_count,
            mapping = %inventory.mapping_path.clone().unwrap_or_default(),
            "loaded inventory manifest"
        );
        Some(inventory)
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
        None
    };

    match latest_run_manifest(&manifest_dir)? {
        Some(run_path) => {
            let raw = fs::read(&run_path)
                .with_context(|| format!("failed to read {}", run_path.display()))?;
            let run: ProcessRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", run_path.display()))?;

            info!(
                run_id = %run.run_id,
                started_at = %run.started_at,
                finished_at = %run.finished_at,
                jobs = run.jobs,
                page_error_policy = %run.page_error_policy,
                tokenizer = %run.tool_versions.tokenizer,
                processed = run.counts.processed,
                skipped = run.counts.skipped,
                failed = run.counts.failed,
                "loaded latest process run"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no process run manifest found"),
    }

    if let Some(inventory) = inventory {
        let layout = OutputLayout {
            txt_dir: args.txt_dir.clone(),
            chunks_dir: args.chunks_dir.clone(),
        };
        let txt_present = inventory
            .judgments
            .iter()
            .filter(|entry| layout.txt_path(&entry.id).is_file())
            .count();
        let chunks_present = inventory
            .judgments
            .iter()
            .filter(|entry| layout.chunks_path(&entry.id).is_file())
            .count();

        info!(
            judgments = inventory.judgment_count,
            txt_present,
            chunks_present,
            "output coverage"
        );
    }

    Ok(())
}

fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
        let path = entry.path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("process_run_") && name.ends_with(".json"))
            .unwrap_or(false);

        if is_run_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
