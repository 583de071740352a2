use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::model::{IdSource, JudgmentEntry, JudgmentInventoryManifest, MappingEntry};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.pdf_dir, args.mapping.as_deref())?;

    if args.dry_run {
        info!(
            judgment_count = manifest.judgment_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| inventory_manifest_path(&args.cache_root));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(judgment_count = manifest.judgment_count, "inventory completed");

    Ok(())
}

pub fn inventory_manifest_path(cache_root: &Path) -> PathBuf {
    cache_root.join("manifests").join("judgment_inventory.json")
}

pub fn build_manifest(pdf_dir: &Path, mapping: Option<&Path>) -> Result<JudgmentInventoryManifest> {
    let date_prefix =
        Regex::new(r"^_\d{8}_").context("failed to compile PDF date prefix regex")?;

    let mapped_ids = match mapping {
        Some(path) => load_mapping(path, &date_prefix)?,
        None => HashMap::new(),
    };

    let mut pdf_paths = discover_pdfs(pdf_dir)?;
    pdf_paths.sort();

    if pdf_paths.is_empty() {
        bail!("no PDFs found in {}", pdf_dir.display());
    }

    let mut by_id = BTreeMap::<String, JudgmentEntry>::new();
    for path in pdf_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let key = filename_key(&filename, &date_prefix);
        let (id, id_source) = match mapped_ids.get(&key) {
            Some(id) => (id.clone(), IdSource::Mapping),
            None => (derive_judgment_id(&key), IdSource::Filename),
        };

        if id.is_empty() {
            warn!(filename = %filename, "cannot derive a judgment id, skipping PDF");
            continue;
        }

        if let Some(existing) = by_id.get(&id) {
            warn!(
                judgment_id = %id,
                kept = %existing.pdf_filename,
                ignored = %filename,
                "duplicate judgment id, keeping the first PDF"
            );
            continue;
        }

        let sha256 = sha256_file(&path)?;
        by_id.insert(
            id.clone(),
            JudgmentEntry {
                id,
                pdf_filename: filename,
                sha256,
                id_source,
            },
        );
    }

    let judgments = by_id.into_values().collect::<Vec<_>>();
    let from_mapping = judgments
        .iter()
        .filter(|entry| entry.id_source == IdSource::Mapping)
        .count();
    if mapping.is_some() && from_mapping < judgments.len() {
        warn!(
            unmapped = judgments.len() - from_mapping,
            "some PDFs are missing from the mapping, ids derived from file names"
        );
    }

    Ok(JudgmentInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: pdf_dir.display().to_string(),
        mapping_path: mapping.map(|path| path.display().to_string()),
        judgment_count: judgments.len(),
        judgments,
    })
}

fn load_mapping(path: &Path, date_prefix: &Regex) -> Result<HashMap<String, String>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let entries: Vec<MappingEntry> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let mut ids = HashMap::with_capacity(entries.len());
    for entry in entries {
        if entry.id.trim().is_empty() || entry.pdf_filename.trim().is_empty() {
            continue;
        }
        ids.insert(filename_key(&entry.pdf_filename, date_prefix), entry.id);
    }

    info!(path = %path.display(), entries = ids.len(), "loaded judgment mapping");
    Ok(ids)
}

fn discover_pdfs(pdf_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries =
        fs::read_dir(pdf_dir).with_context(|| format!("failed to read {}", pdf_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", pdf_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            pdfs.push(path);
        }
    }

    Ok(pdfs)
}

/// `_20251113_snciv@s50@a2025@n30039@tO.clean.pdf` -> `snciv@s50@a2025@n30039@tO`
fn filename_key(filename: &str, date_prefix: &Regex) -> String {
    let name = filename.trim();
    let stem = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf") => {
            &name[..cut]
        }
        _ => name,
    };
    let stem = stem.strip_suffix(".clean").unwrap_or(stem);
    date_prefix.replace(stem, "").into_owned()
}

pub fn derive_judgment_id(key: &str) -> String {
    key.chars().filter(|ch| ch.is_ascii_alphanumeric()).collect()
}

pub fn judgment_id_from_path(path: &Path) -> Result<String> {
    let date_prefix =
        Regex::new(r"^_\d{8}_").context("failed to compile PDF date prefix regex")?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

    let id = derive_judgment_id(&filename_key(filename, &date_prefix));
    if id.is_empty() {
        bail!("cannot derive a judgment id from {}", path.display());
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date_prefix() -> Regex {
        Regex::new(r"^_\d{8}_").expect("regex")
    }

    #[test]
    fn filename_key_strips_date_prefix_and_clean_suffix() {
        let regex = date_prefix();
        assert_eq!(
            filename_key("_20251113_snciv@s50@a2025@n30039@tO.clean.pdf", &regex),
            "snciv@s50@a2025@n30039@tO"
        );
        assert_eq!(filename_key("snciv2025530039O.PDF", &regex), "snciv2025530039O");
        assert_eq!(
            derive_judgment_id("snciv@s50@a2025@n30039@tO"),
            "sncivs50a2025n30039tO"
        );
    }

    #[test]
    fn mapping_ids_win_over_derived_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf_dir = dir.path().join("pdf");
        fs::create_dir_all(&pdf_dir).expect("pdf dir");
        fs::write(pdf_dir.join("_20251113_snciv@s50@a2025@n30039@tO.clean.pdf"), "a")
            .expect("pdf a");
        fs::write(pdf_dir.join("snciv2025510001O.pdf"), "b").expect("pdf b");
        fs::write(pdf_dir.join("notes.txt"), "c").expect("not a pdf");

        let mapping = dir.path().join("_all_sentenze.json");
        fs::write(
            &mapping,
            r#"[
                {"id": "snciv2025530039O", "pdf_filename": "snciv@s50@a2025@n30039@tO.clean.pdf", "numero": "30039"},
                {"id": "", "pdf_filename": "ignored.pdf"}
            ]"#,
        )
        .expect("mapping");

        let manifest = build_manifest(&pdf_dir, Some(&mapping)).expect("manifest");

        let ids = manifest
            .judgments
            .iter()
            .map(|entry| (entry.id.as_str(), entry.id_source))
            .collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![
                ("snciv2025510001O", IdSource::Filename),
                ("snciv2025530039O", IdSource::Mapping),
            ]
        );
        assert_eq!(manifest.judgment_count, 2);
        assert_eq!(manifest.judgments[0].sha256.len(), 64);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(build_manifest(dir.path(), None).is_err());
    }

    #[test]
    fn id_from_path_uses_file_name_only() {
        let id = judgment_id_from_path(Path::new("/tmp/pdf/_20240101_snpen@s10@a2024@n00012@tS.clean.pdf"))
            .expect("id");
        assert_eq!(id, "snpens10a2024n00012tS");
    }
}
