use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::ExtractArgs;
use crate::commands::inventory::judgment_id_from_path;
use crate::config::PipelineProfile;
use crate::layout::{BlockExtractor, LayoutClassifier, Linearizer};
use crate::util::write_text_atomic;

pub fn run(args: ExtractArgs) -> Result<()> {
    let profile = PipelineProfile::load_or_default(args.profile.as_deref())?;
    let judgment_id = match args.id {
        Some(id) => id,
        None => judgment_id_from_path(&args.pdf)?,
    };

    let extractor = BlockExtractor::new(&args.pdftotext, args.max_pages);
    let linearizer = Linearizer::new(LayoutClassifier::new(profile.layout));

    let pages = extractor
        .extract(&args.pdf)
        .with_context(|| format!("failed to extract blocks from {}", args.pdf.display()))?;
    let document = linearizer
        .linearize(pages, args.on_page_error)
        .with_context(|| format!("failed to linearize {}", args.pdf.display()))?;

    for missing in &document.missing_pages {
        warn!(
            judgment_id = %judgment_id,
            page = missing.page,
            reason = %missing.reason,
            "page content unavailable"
        );
    }

    let txt_path = args.txt_dir.join(format!("{judgment_id}.txt"));
    write_text_atomic(&txt_path, &document.text)?;
    info!(
        judgment_id = %judgment_id,
        pages = document.page_count,
        chars = document.text.chars().count(),
        path = %txt_path.display(),
        "wrote linear text"
    );

    Ok(())
}
