use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::blocks::{PageBlocks, TextBlock, sort_reading_order};
use super::classify::LayoutClassifier;
use super::extract::{ExtractError, PageOutcome};

const HEADER_RULE_WIDTH: usize = 70;
pub const HEADER_NOT_FOUND: &str = "[header not found]";
pub const UNKNOWN_FIELD: &str = "[unknown]";

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageErrorPolicy {
    #[default]
    Abort,
    Flag,
}

impl PageErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Flag => "flag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingPage {
    pub page: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinearDocument {
    pub text: String,
    pub page_count: usize,
    pub missing_pages: Vec<MissingPage>,
}

impl LinearDocument {
    pub fn page_marker(page_number: usize) -> String {
        format!("--- Page {page_number} ---")
    }
}

#[derive(Debug, Clone)]
pub struct Linearizer {
    classifier: LayoutClassifier,
}

impl Linearizer {
    pub fn new(classifier: LayoutClassifier) -> Self {
        Self { classifier }
    }

    pub fn linearize(
        &self,
        pages: Vec<PageOutcome>,
        policy: PageErrorPolicy,
    ) -> Result<LinearDocument, ExtractError> {
        let mut document = LinearDocument {
            page_count: pages.len(),
            ..LinearDocument::default()
        };
        let mut parts = Vec::<String>::with_capacity(pages.len());

        for (index, outcome) in pages.into_iter().enumerate() {
            let page_number = index + 1;
            match outcome {
                Ok(page) if index == 0 => parts.push(self.first_page_text(&page)),
                Ok(page) => parts.push(self.continuation_page_text(&page, page_number)),
                Err(err) => {
                    if policy == PageErrorPolicy::Abort {
                        return Err(err);
                    }

                    let reason = err.to_string();
                    warn!(page = page_number, reason = %reason, "flagging undecodable page");
                    let placeholder =
                        format!("[page {page_number} content unavailable: {reason}]");
                    if index == 0 {
                        parts.push(placeholder);
                    } else {
                        parts.push(format!(
                            "{}\n\n{placeholder}",
                            LinearDocument::page_marker(page_number)
                        ));
                    }
                    document.missing_pages.push(MissingPage {
                        page: page_number,
                        reason,
                    });
                }
            }
        }

        document.text = parts.join("\n\n");
        Ok(document)
    }

    pub fn first_page_text(&self, page: &PageBlocks) -> String {
        let classified = self.classifier.classify_page(&page.blocks, true);
        debug!(
            page = page.page_index + 1,
            width = page.width,
            height = page.height,
            blocks = classified.len(),
            header = classified.header.len(),
            sidebar = classified.sidebar.len(),
            body = classified.body.len(),
            watermark = classified.watermark.len(),
            "classified first page"
        );

        let mut parts = vec![render_header(classified.header)];
        if !classified.sidebar.is_empty() {
            parts.push(render_sidebar(classified.sidebar));
        }

        let body = render_body(classified.body);
        if !body.is_empty() {
            parts.push(body);
        }

        parts.join("\n\n")
    }

    pub fn continuation_page_text(&self, page: &PageBlocks, page_number: usize) -> String {
        let classified = self.classifier.classify_page(&page.blocks, false);
        debug!(
            page = page_number,
            body = classified.body.len(),
            watermark = classified.watermark.len(),
            "classified continuation page"
        );

        let marker = LinearDocument::page_marker(page_number);
        let body = render_body(classified.body);
        if body.is_empty() {
            marker
        } else {
            format!("{marker}\n\n{body}")
        }
    }
}

pub fn render_body(mut blocks: Vec<&TextBlock>) -> String {
    sort_reading_order(&mut blocks);
    blocks
        .into_iter()
        .filter(|block| !block.is_blank())
        .map(|block| block.line_texts().join("\n"))
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<String>>()
        .join("\n\n")
}

fn render_header(mut blocks: Vec<&TextBlock>) -> String {
    sort_reading_order(&mut blocks);
    let lines = blocks
        .iter()
        .flat_map(|block| block.line_texts())
        .collect::<Vec<String>>();

    let rule = "=".repeat(HEADER_RULE_WIDTH);
    let content = if lines.is_empty() {
        HEADER_NOT_FOUND.to_string()
    } else {
        lines.join("\n")
    };

    format!("{rule}\n{content}\n{rule}")
}

fn render_sidebar(mut blocks: Vec<&TextBlock>) -> String {
    sort_reading_order(&mut blocks);

    let mut registry = None;
    let mut subject = None;
    let mut extra = Vec::<String>::new();

    for block in blocks {
        let flat = block.flat_text();
        if flat.trim().is_empty() {
            continue;
        }

        if registry.is_none() && flat.contains("R.G.") {
            registry = Some(block.line_texts().join(" | "));
        } else if subject.is_none() && strip_subject_label(&flat).is_some() {
            subject = strip_subject_label(&flat);
        } else {
            extra.push(flat);
        }
    }

    let mut lines = vec![
        format!("Registro: {}", registry.as_deref().unwrap_or(UNKNOWN_FIELD)),
        format!("Oggetto: {}", subject.as_deref().unwrap_or(UNKNOWN_FIELD)),
    ];
    lines.extend(extra);
    lines.join("\n")
}

fn strip_subject_label(text: &str) -> Option<String> {
    const LABEL: &str = "oggetto";

    let trimmed = text.trim_start();
    let head = trimmed.get(..LABEL.len())?;
    if !head.eq_ignore_ascii_case(LABEL) {
        return None;
    }

    let rest = trimmed[LABEL.len()..]
        .trim_start_matches(|character: char| character == ':' || character.is_whitespace())
        .trim();
    if rest.is_empty() {
        Some(UNKNOWN_FIELD.to_string())
    } else {
        Some(rest.to_string())
    }
}
