use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::layout::PageErrorPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "sentenze",
    version,
    about = "Layout-aware text and chunk extraction for Cassazione judgment PDFs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Extract(ExtractArgs),
    Chunk(ChunkArgs),
    Process(ProcessArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/sentenze")]
    pub cache_root: PathBuf,

    #[arg(long, default_value = "data/pdf")]
    pub pdf_dir: PathBuf,

    #[arg(long)]
    pub mapping: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, default_value = "data/txt")]
    pub txt_dir: PathBuf,

    #[arg(long, default_value = "pdftotext")]
    pub pdftotext: PathBuf,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long)]
    pub profile: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = PageErrorPolicy::Abort)]
    pub on_page_error: PageErrorPolicy,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[arg(long)]
    pub txt: PathBuf,

    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, default_value = "data/chunks")]
    pub chunks_dir: PathBuf,

    #[arg(long)]
    pub tokenizer: PathBuf,

    #[arg(long)]
    pub profile: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    #[arg(long, default_value = ".cache/sentenze")]
    pub cache_root: PathBuf,

    #[arg(long, default_value = "data/pdf")]
    pub pdf_dir: PathBuf,

    #[arg(long)]
    pub mapping: Option<PathBuf>,

    #[arg(long, default_value = "data/txt")]
    pub txt_dir: PathBuf,

    #[arg(long, default_value = "data/chunks")]
    pub chunks_dir: PathBuf,

    #[arg(long)]
    pub tokenizer: PathBuf,

    #[arg(long)]
    pub profile: Option<PathBuf>,

    #[arg(long, default_value = "pdftotext")]
    pub pdftotext: PathBuf,

    #[arg(long)]
    pub max_pages_per_doc: Option<usize>,

    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    #[arg(long)]
    pub max_docs: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[arg(long, value_enum, default_value_t = PageErrorPolicy::Abort)]
    pub on_page_error: PageErrorPolicy,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/sentenze")]
    pub cache_root: PathBuf,

    #[arg(long, default_value = "data/txt")]
    pub txt_dir: PathBuf,

    #[arg(long, default_value = "data/chunks")]
    pub chunks_dir: PathBuf,
}
